//! Predicates, atoms and literals.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

use super::term::{Term, TermKind};

/// A predicate symbol with a fixed arity.
///
/// Two predicates with the same name but different arities are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Predicate {
    name: String,
    arity: usize,
}

impl Predicate {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.name, self.arity)
    }
}

/// A predicate applied to an ordered list of terms.
///
/// Atoms double as positive literals; see [`PositiveLiteral`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawAtom", into = "RawAtom")]
pub struct Atom {
    predicate: Predicate,
    terms: Vec<Term>,
}

/// A positive literal is just an atom.
pub type PositiveLiteral = Atom;

impl Atom {
    /// Create an atom; the predicate arity is the number of terms.
    pub fn new(predicate: impl Into<String>, terms: Vec<Term>) -> ModelResult<Self> {
        let name = predicate.into();
        if name.is_empty() {
            return Err(ModelError::EmptyName { what: "predicate" });
        }
        if terms.iter().any(Term::has_empty_name) {
            return Err(ModelError::EmptyName { what: "term" });
        }
        Ok(Self {
            predicate: Predicate::new(name, terms.len()),
            terms,
        })
    }

    /// Create an atom over an existing predicate. Callers guarantee the arity.
    pub(crate) fn from_parts(predicate: Predicate, terms: Vec<Term>) -> Self {
        debug_assert_eq!(predicate.arity(), terms.len());
        Self { predicate, terms }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// All variables (universal and existential), in order of first occurrence.
    pub fn variables(&self) -> Vec<&Term> {
        self.distinct(|t| t.is_variable())
    }

    pub fn universal_variables(&self) -> Vec<&Term> {
        self.distinct(|t| t.kind() == TermKind::UniversalVariable)
    }

    pub fn existential_variables(&self) -> Vec<&Term> {
        self.distinct(|t| t.kind() == TermKind::ExistentialVariable)
    }

    pub fn constants(&self) -> Vec<&Term> {
        self.distinct(|t| t.is_ground())
    }

    pub fn is_ground(&self) -> bool {
        self.terms.iter().all(Term::is_ground)
    }

    fn distinct(&self, keep: impl Fn(&Term) -> bool) -> Vec<&Term> {
        let mut seen: Vec<&Term> = Vec::new();
        for term in self.terms.iter().filter(|t| keep(*t)) {
            if !seen.contains(&term) {
                seen.push(term);
            }
        }
        seen
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate.name)?;
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str(")")
    }
}

#[derive(Serialize, Deserialize)]
struct RawAtom {
    predicate: String,
    terms: Vec<Term>,
}

impl TryFrom<RawAtom> for Atom {
    type Error = ModelError;

    fn try_from(raw: RawAtom) -> ModelResult<Self> {
        Atom::new(raw.predicate, raw.terms)
    }
}

impl From<Atom> for RawAtom {
    fn from(atom: Atom) -> Self {
        RawAtom {
            predicate: atom.predicate.name,
            terms: atom.terms,
        }
    }
}

/// A possibly negated atom, as it occurs in rule bodies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Positive(Atom),
    Negative(Atom),
}

impl Literal {
    pub fn negative(atom: Atom) -> Self {
        Literal::Negative(atom)
    }

    pub fn atom(&self) -> &Atom {
        match self {
            Literal::Positive(atom) | Literal::Negative(atom) => atom,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        self.atom().predicate()
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Literal::Negative(_))
    }

    /// The underlying atom if this literal is positive.
    pub fn as_positive(&self) -> Option<&PositiveLiteral> {
        match self {
            Literal::Positive(atom) => Some(atom),
            Literal::Negative(_) => None,
        }
    }
}

impl From<Atom> for Literal {
    fn from(atom: Atom) -> Self {
        Literal::Positive(atom)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Positive(atom) => write!(f, "{atom}"),
            Literal::Negative(atom) => write!(f, "~{atom}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_follows_terms() {
        let atom = Atom::new("p", vec![Term::constant("a"), Term::constant("b")]).unwrap();
        assert_eq!(atom.predicate(), &Predicate::new("p", 2));
        assert!(atom.is_ground());
    }

    #[test]
    fn empty_predicate_name_rejected() {
        let err = Atom::new("", vec![]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyName { what: "predicate" }));
    }

    #[test]
    fn variables_are_distinct_in_order() {
        let atom = Atom::new(
            "p",
            vec![
                Term::universal("X"),
                Term::existential("Z"),
                Term::universal("X"),
                Term::constant("c"),
            ],
        )
        .unwrap();
        assert_eq!(atom.variables().len(), 2);
        assert_eq!(atom.universal_variables(), vec![&Term::universal("X")]);
        assert_eq!(atom.existential_variables(), vec![&Term::existential("Z")]);
        assert_eq!(atom.constants(), vec![&Term::constant("c")]);
    }

    #[test]
    fn literal_display_marks_negation() {
        let atom = Atom::new("p", vec![Term::universal("X")]).unwrap();
        assert_eq!(Literal::Positive(atom.clone()).to_string(), "p(?X)");
        assert_eq!(Literal::negative(atom).to_string(), "~p(?X)");
    }

    #[test]
    fn atom_deserializes_with_arity() {
        let atom: Atom =
            serde_json::from_str(r#"{"predicate":"p","terms":[{"constant":"a"}]}"#).unwrap();
        assert_eq!(atom.predicate().arity(), 1);
    }

    #[test]
    fn predicate_display_shows_arity() {
        assert_eq!(Predicate::new("edge", 2).to_string(), "edge[2]");
    }
}
