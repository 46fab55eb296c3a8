//! The knowledge base: an ordered, versioned sequence of statements.
//!
//! Every successful mutation advances the version counter. Reasoners compare
//! the version they loaded against the current one to decide whether their
//! results are stale, instead of being pushed change notifications.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{KbError, KbResult};
use crate::model::{DataSourceDeclaration, Fact, Rule, Statement};

/// A knowledge base shared between its owner (the only writer) and reasoners.
pub type SharedKnowledgeBase = Arc<RwLock<KnowledgeBase>>;

/// Ordered, mutable collection of statements with a version counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    statements: Vec<Statement>,
    #[serde(skip)]
    version: u64,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap this knowledge base for sharing with a reasoner.
    pub fn into_shared(self) -> SharedKnowledgeBase {
        Arc::new(RwLock::new(self))
    }

    /// Append a statement.
    pub fn add_statement(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
        self.version += 1;
    }

    /// Append several statements; the version advances once if any were added.
    pub fn add_statements<I>(&mut self, statements: I)
    where
        I: IntoIterator,
        I::Item: Into<Statement>,
    {
        let before = self.statements.len();
        self.statements
            .extend(statements.into_iter().map(Into::into));
        if self.statements.len() != before {
            self.version += 1;
        }
    }

    /// Remove the first occurrence of `statement`. Returns whether one was found.
    pub fn remove_statement(&mut self, statement: &Statement) -> bool {
        match self.statements.iter().position(|s| s == statement) {
            Some(index) => {
                self.statements.remove(index);
                self.version += 1;
                true
            }
            None => false,
        }
    }

    /// Monotonic counter of successful mutations.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Fact(fact) => Some(fact),
            _ => None,
        })
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    pub fn data_source_declarations(&self) -> impl Iterator<Item = &DataSourceDeclaration> {
        self.statements.iter().filter_map(|s| match s {
            Statement::DataSource(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Load a JSON array of statements.
    pub fn load_json(path: &Path) -> KbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| KbError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let statements: Vec<Statement> =
            serde_json::from_str(&content).map_err(|e| KbError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut kb = Self::new();
        kb.add_statements(statements);
        Ok(kb)
    }

    /// Save the statements as a pretty-printed JSON array.
    pub fn save_json(&self, path: &Path) -> KbResult<()> {
        let content =
            serde_json::to_string_pretty(&self.statements).map_err(|e| KbError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        std::fs::write(path, content).map_err(|e| KbError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}

impl<'a> IntoIterator for &'a KnowledgeBase {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Atom, DataSource, Predicate, Term};

    fn fact(name: &str, args: &[&str]) -> Fact {
        Fact::from_constants(name, args).unwrap()
    }

    #[test]
    fn mutations_advance_version() {
        let mut kb = KnowledgeBase::new();
        assert_eq!(kb.version(), 0);

        kb.add_statement(fact("p", &["a"]));
        assert_eq!(kb.version(), 1);

        kb.add_statements(vec![fact("p", &["b"]), fact("p", &["c"])]);
        assert_eq!(kb.version(), 2);
        assert_eq!(kb.len(), 3);

        kb.add_statements(Vec::<Statement>::new());
        assert_eq!(kb.version(), 2);
    }

    #[test]
    fn remove_missing_statement_keeps_version() {
        let mut kb = KnowledgeBase::new();
        kb.add_statement(fact("p", &["a"]));
        assert!(!kb.remove_statement(&fact("p", &["z"]).into()));
        assert_eq!(kb.version(), 1);
        assert!(kb.remove_statement(&fact("p", &["a"]).into()));
        assert_eq!(kb.version(), 2);
        assert!(kb.is_empty());
    }

    #[test]
    fn typed_views_filter_statements() {
        let mut kb = KnowledgeBase::new();
        kb.add_statement(fact("p", &["a"]));
        let head = Atom::new("q", vec![Term::universal("X")]).unwrap();
        let body = Atom::new("p", vec![Term::universal("X")]).unwrap();
        kb.add_statement(Rule::new(vec![head], vec![body.into()]).unwrap());
        kb.add_statement(DataSourceDeclaration::new(
            Predicate::new("r", 1),
            DataSource::csv_file("r.csv"),
        ));

        assert_eq!(kb.facts().count(), 1);
        assert_eq!(kb.rules().count(), 1);
        assert_eq!(kb.data_source_declarations().count(), 1);
    }

    #[test]
    fn json_roundtrip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kb.json");

        let mut kb = KnowledgeBase::new();
        kb.add_statement(fact("p", &["a", "b"]));
        kb.save_json(&path).unwrap();

        let loaded = KnowledgeBase::load_json(&path).unwrap();
        assert_eq!(loaded.statements(), kb.statements());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("kb.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = KnowledgeBase::load_json(&path).unwrap_err();
        assert!(matches!(err, KbError::Parse { .. }));
    }
}
