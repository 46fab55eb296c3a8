//! The reasoning backend capability consumed by the reasoner.
//!
//! The chase itself, query evaluation and acyclicity checks live in an
//! external engine. The reasoner only talks to it through [`ChaseBackend`],
//! naming predicates by their [`engine_predicate_name`](super::engine_predicate_name).
//!
//! [`RecordingBackend`] implements the capability without evaluating
//! anything: it records what it is given and answers queries from the loaded
//! tuples only. It backs dry runs (`chaseward classify`) and tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BackendError, BackendResult};
use crate::model::{Rule, Term};

use super::state::{CyclicCheck, CyclicityNotion, LogLevel, RuleRewriteStrategy};

/// Capability of an external chase engine.
pub trait ChaseBackend: Send {
    /// Start the engine with the given data source configuration.
    fn activate(&mut self, config: &str) -> BackendResult<()>;

    /// Stop the engine, discarding all loaded data and inferences.
    fn stop(&mut self);

    fn set_log_level(&mut self, level: LogLevel);

    fn set_log_file(&mut self, path: &Path) -> BackendResult<()>;

    /// Arity of a predicate backed by an external source, `None` if the
    /// source is empty.
    fn predicate_arity(&self, predicate: &str) -> BackendResult<Option<usize>>;

    /// Add in-memory tuples for a predicate.
    fn add_data(&mut self, predicate: &str, tuples: Vec<Vec<String>>) -> BackendResult<()>;

    fn set_rules(&mut self, rules: &[Rule], strategy: RuleRewriteStrategy) -> BackendResult<()>;

    /// Run the chase. Returns `true` if the fixpoint was reached before the
    /// timeout.
    fn materialize(&mut self, skolem_chase: bool, timeout: Option<Duration>)
    -> BackendResult<bool>;

    /// Answer tuples for `predicate` matching the constants in `terms`.
    fn query(
        &self,
        predicate: &str,
        terms: &[Term],
        include_nulls: bool,
    ) -> BackendResult<Vec<Vec<String>>>;

    fn write_query_csv(
        &self,
        predicate: &str,
        terms: &[Term],
        path: &Path,
        include_nulls: bool,
    ) -> BackendResult<()>;

    fn check_cyclic(&self, notion: CyclicityNotion) -> BackendResult<CyclicCheck>;
}

/// A backend that records its inputs and never derives anything.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    active: bool,
    config: Option<String>,
    data: BTreeMap<String, Vec<Vec<String>>>,
    rules: Vec<Rule>,
    strategy: RuleRewriteStrategy,
    log_level: Option<LogLevel>,
    log_file: Option<PathBuf>,
    materialize_calls: Vec<(bool, Option<Duration>)>,
    stop_calls: usize,
    source_arities: HashMap<String, usize>,
    cyclicity: HashMap<CyclicityNotion, CyclicCheck>,
    completes: bool,
    materialization_failure: Option<String>,
    materialize_delay: Option<Duration>,
}

impl RecordingBackend {
    /// A backend whose runs always reach the fixpoint.
    pub fn new() -> Self {
        Self {
            completes: true,
            ..Self::default()
        }
    }

    /// Report `arity` for an external source loaded into `predicate`.
    pub fn with_source_arity(mut self, predicate: impl Into<String>, arity: usize) -> Self {
        self.source_arities.insert(predicate.into(), arity);
        self
    }

    /// Make runs report timeout instead of completion.
    pub fn incomplete(mut self) -> Self {
        self.completes = false;
        self
    }

    /// Make runs fail as if the rules were not stratifiable.
    pub fn failing_materialization(mut self, message: impl Into<String>) -> Self {
        self.materialization_failure = Some(message.into());
        self
    }

    /// Make each run take at least `delay`.
    pub fn with_materialize_delay(mut self, delay: Duration) -> Self {
        self.materialize_delay = Some(delay);
        self
    }

    pub fn with_cyclicity(mut self, notion: CyclicityNotion, verdict: CyclicCheck) -> Self {
        self.cyclicity.insert(notion, verdict);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn data(&self) -> &BTreeMap<String, Vec<Vec<String>>> {
        &self.data
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn strategy(&self) -> RuleRewriteStrategy {
        self.strategy
    }

    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn materialize_calls(&self) -> &[(bool, Option<Duration>)] {
        &self.materialize_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls
    }

    fn ensure_active(&self) -> BackendResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(BackendError::NotStarted)
        }
    }

    fn matching(&self, predicate: &str, terms: &[Term]) -> BackendResult<Vec<Vec<String>>> {
        let known = self.data.contains_key(predicate)
            || self.source_arities.contains_key(predicate)
            || self
                .rules
                .iter()
                .flat_map(|r| r.head_predicates())
                .any(|p| super::engine_predicate_name(p) == predicate);
        if !known {
            return Err(BackendError::NonExistingPredicate {
                predicate: predicate.to_string(),
            });
        }
        let tuples = self.data.get(predicate).map(Vec::as_slice).unwrap_or(&[]);
        Ok(tuples
            .iter()
            .filter(|tuple| {
                tuple.len() == terms.len()
                    && tuple.iter().zip(terms).all(|(value, term)| {
                        term.is_variable() || term.name().as_ref() == value.as_str()
                    })
            })
            .cloned()
            .collect())
    }
}

impl ChaseBackend for RecordingBackend {
    fn activate(&mut self, config: &str) -> BackendResult<()> {
        if self.active {
            return Err(BackendError::AlreadyStarted);
        }
        self.active = true;
        self.config = Some(config.to_string());
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
        self.data.clear();
        self.rules.clear();
        self.stop_calls += 1;
    }

    fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = Some(level);
    }

    fn set_log_file(&mut self, path: &Path) -> BackendResult<()> {
        self.log_file = Some(path.to_path_buf());
        Ok(())
    }

    fn predicate_arity(&self, predicate: &str) -> BackendResult<Option<usize>> {
        self.ensure_active()?;
        Ok(self.source_arities.get(predicate).copied())
    }

    fn add_data(&mut self, predicate: &str, tuples: Vec<Vec<String>>) -> BackendResult<()> {
        self.ensure_active()?;
        self.data
            .entry(predicate.to_string())
            .or_default()
            .extend(tuples);
        Ok(())
    }

    fn set_rules(&mut self, rules: &[Rule], strategy: RuleRewriteStrategy) -> BackendResult<()> {
        self.ensure_active()?;
        self.rules = rules.to_vec();
        self.strategy = strategy;
        Ok(())
    }

    fn materialize(
        &mut self,
        skolem_chase: bool,
        timeout: Option<Duration>,
    ) -> BackendResult<bool> {
        self.ensure_active()?;
        self.materialize_calls.push((skolem_chase, timeout));
        if let Some(delay) = self.materialize_delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.materialization_failure {
            return Err(BackendError::Materialization {
                message: message.clone(),
            });
        }
        Ok(self.completes || timeout.is_none())
    }

    fn query(
        &self,
        predicate: &str,
        terms: &[Term],
        _include_nulls: bool,
    ) -> BackendResult<Vec<Vec<String>>> {
        self.ensure_active()?;
        self.matching(predicate, terms)
    }

    fn write_query_csv(
        &self,
        predicate: &str,
        terms: &[Term],
        path: &Path,
        _include_nulls: bool,
    ) -> BackendResult<()> {
        self.ensure_active()?;
        let mut out = String::new();
        for tuple in self.matching(predicate, terms)? {
            out.push_str(&tuple.join(","));
            out.push('\n');
        }
        std::fs::write(path, out).map_err(|source| BackendError::Io { source })
    }

    fn check_cyclic(&self, notion: CyclicityNotion) -> BackendResult<CyclicCheck> {
        self.ensure_active()?;
        Ok(self
            .cyclicity
            .get(&notion)
            .copied()
            .unwrap_or(CyclicCheck::Cyclic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_exclusive() {
        let mut backend = RecordingBackend::new();
        backend.activate("").unwrap();
        assert!(matches!(
            backend.activate(""),
            Err(BackendError::AlreadyStarted)
        ));
        backend.stop();
        backend.activate("").unwrap();
    }

    #[test]
    fn calls_before_activation_fail() {
        let mut backend = RecordingBackend::new();
        assert!(matches!(
            backend.add_data("p-1", vec![]),
            Err(BackendError::NotStarted)
        ));
    }

    #[test]
    fn query_filters_on_constants() {
        let mut backend = RecordingBackend::new();
        backend.activate("").unwrap();
        backend
            .add_data(
                "p-2",
                vec![
                    vec!["a".into(), "b".into()],
                    vec!["c".into(), "d".into()],
                ],
            )
            .unwrap();

        let answers = backend
            .query("p-2", &[Term::constant("a"), Term::universal("X")], true)
            .unwrap();
        assert_eq!(answers, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn unknown_predicate_is_reported() {
        let mut backend = RecordingBackend::new();
        backend.activate("").unwrap();
        assert!(matches!(
            backend.query("nope-1", &[Term::universal("X")], true),
            Err(BackendError::NonExistingPredicate { .. })
        ));
    }

    #[test]
    fn incomplete_backend_only_times_out_with_timeout() {
        let mut backend = RecordingBackend::new().incomplete();
        backend.activate("").unwrap();
        assert!(!backend.materialize(false, Some(Duration::from_secs(1))).unwrap());
        assert!(backend.materialize(false, None).unwrap());
    }
}
