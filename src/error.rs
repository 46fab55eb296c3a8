//! Rich diagnostic error types for the chaseward reasoner.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::reasoner::ReasonerState;
use crate::solver::SolverError;

/// Top-level error type for chaseward.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum ChaseError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    KnowledgeBase(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("fact {atom} is not ground")]
    #[diagnostic(
        code(chaseward::model::non_ground_fact),
        help(
            "Facts may only contain constants and language-tagged strings. \
             Write the statement as a rule if it needs variables."
        )
    )]
    NonGroundFact { atom: String },

    #[error("rule head must contain at least one atom")]
    #[diagnostic(
        code(chaseward::model::empty_head),
        help("Every rule derives something: give the head at least one positive literal.")
    )]
    EmptyHead,

    #[error("conjunction must contain at least one literal")]
    #[diagnostic(
        code(chaseward::model::empty_conjunction),
        help("Remove the empty conjunction or add a literal to it.")
    )]
    EmptyConjunction,

    #[error("language tag of string {value:?} is blank")]
    #[diagnostic(
        code(chaseward::model::blank_language_tag),
        help("Language-tagged strings need a non-blank tag such as \"en\".")
    )]
    BlankLanguageTag { value: String },

    #[error("{what} name must not be empty")]
    #[diagnostic(
        code(chaseward::model::empty_name),
        help("Predicates, constants and variables are identified by a non-empty name.")
    )]
    EmptyName { what: &'static str },
}

/// Result type for model construction.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("failed to read knowledge base: {path}")]
    #[diagnostic(
        code(chaseward::kb::read),
        help("Ensure the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write knowledge base: {path}")]
    #[diagnostic(
        code(chaseward::kb::write),
        help("Ensure the parent directory exists and you have write permissions.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse knowledge base {path}: {message}")]
    #[diagnostic(
        code(chaseward::kb::parse),
        help(
            "The file must be a JSON array of statements, each one of \
             {{\"fact\": ...}}, {{\"rule\": ...}} or {{\"data_source\": ...}}."
        )
    )]
    Parse { path: String, message: String },
}

/// Result type for knowledge base persistence.
pub type KbResult<T> = std::result::Result<T, KbError>;

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Failures reported by a [`ChaseBackend`](crate::reasoner::ChaseBackend).
///
/// The reasoner translates these into [`ReasonerError`]s; they never reach
/// callers directly.
#[derive(Debug, Error, Diagnostic)]
pub enum BackendError {
    #[error("backend has not been activated")]
    #[diagnostic(code(chaseward::backend::not_started))]
    NotStarted,

    #[error("backend is already active")]
    #[diagnostic(code(chaseward::backend::already_started))]
    AlreadyStarted,

    #[error("invalid source configuration: {message}")]
    #[diagnostic(code(chaseward::backend::edb_configuration))]
    EdbConfiguration { message: String },

    #[error("materialization failed: {message}")]
    #[diagnostic(code(chaseward::backend::materialization))]
    Materialization { message: String },

    #[error("predicate {predicate} does not exist in the backend")]
    #[diagnostic(code(chaseward::backend::non_existing_predicate))]
    NonExistingPredicate { predicate: String },

    #[error("backend I/O error: {source}")]
    #[diagnostic(code(chaseward::backend::io))]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

// ---------------------------------------------------------------------------
// Reasoner errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReasonerError {
    #[error("operation not allowed in state {state}: {message}")]
    #[diagnostic(
        code(chaseward::reasoner::state),
        help(
            "Reasoner operations follow a fixed lifecycle: load, reason, query. \
             Call reset() to undo loading and reasoning; a closed reasoner cannot \
             be reused."
        )
    )]
    State {
        state: ReasonerState,
        message: String,
    },

    #[error(
        "predicate {predicate} is declared with arity {declared}, but its source {source_desc} has arity {actual}"
    )]
    #[diagnostic(
        code(chaseward::reasoner::arity_mismatch),
        help(
            "Fix the arity in the data source declaration, or point the \
             declaration at a source with matching columns."
        )
    )]
    ArityMismatch {
        predicate: String,
        declared: usize,
        actual: usize,
        source_desc: String,
    },

    #[error("invalid data source configuration: {message}")]
    #[diagnostic(
        code(chaseward::reasoner::configuration),
        help(
            "The data sources could not be configured. Check file paths, \
             extensions and SPARQL endpoints in the source declarations."
        )
    )]
    Configuration { message: String },

    #[error("knowledge base incompatible with the evaluation strategy: {message}")]
    #[diagnostic(
        code(chaseward::reasoner::materialization),
        help(
            "Either the rules are not stratifiable, or the variables in a \
             negated atom cannot be bound by the positive body."
        )
    )]
    Materialization { message: String },

    #[error("query predicate {predicate} does not occur in the loaded knowledge base")]
    #[diagnostic(
        code(chaseward::reasoner::unknown_query_predicate),
        help("Query only predicates used by facts, rules or data source declarations.")
    )]
    UnknownQueryPredicate { predicate: String },

    #[error("reasoning timeout must be strictly positive")]
    #[diagnostic(
        code(chaseward::reasoner::invalid_timeout),
        help("Pass a positive number of seconds, or None for no timeout.")
    )]
    InvalidTimeout,

    #[error("expected a .csv extension for export file {path}")]
    #[diagnostic(
        code(chaseward::reasoner::invalid_csv_path),
        help("Query answers are exported as CSV; name the target file accordingly.")
    )]
    InvalidCsvPath { path: String },

    #[error("reasoning did not finish within {limit:?}")]
    #[diagnostic(
        code(chaseward::reasoner::supervision_timeout),
        help(
            "The reasoning thread was abandoned; the reasoner keeps its partial \
             result. Set a reasoning timeout to let the backend stop cleanly."
        )
    )]
    Supervision { limit: Duration },

    #[error("inconsistent reasoner state: {message}")]
    #[diagnostic(
        code(chaseward::reasoner::backend),
        help("The backend rejected a call the lifecycle should have allowed. File a bug report.")
    )]
    Backend { message: String },
}

impl From<BackendError> for ReasonerError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::EdbConfiguration { message } => ReasonerError::Configuration { message },
            BackendError::Materialization { message } => ReasonerError::Materialization { message },
            BackendError::NonExistingPredicate { predicate } => {
                ReasonerError::UnknownQueryPredicate { predicate }
            }
            other @ (BackendError::NotStarted
            | BackendError::AlreadyStarted
            | BackendError::Io { .. }) => ReasonerError::Backend {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for reasoner operations.
pub type ReasonerResult<T> = std::result::Result<T, ReasonerError>;

/// Convenience alias for functions returning chaseward results.
pub type ChaseResult<T> = std::result::Result<T, ChaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_converts_to_chase_error() {
        let err = ModelError::EmptyHead;
        let top: ChaseError = err.into();
        assert!(matches!(top, ChaseError::Model(ModelError::EmptyHead)));
    }

    #[test]
    fn reasoner_error_converts_to_chase_error() {
        let err = ReasonerError::InvalidTimeout;
        let top: ChaseError = err.into();
        assert!(matches!(
            top,
            ChaseError::Reasoner(ReasonerError::InvalidTimeout)
        ));
    }

    #[test]
    fn state_error_names_the_state() {
        let err = ReasonerError::State {
            state: ReasonerState::AfterClosing,
            message: "Loading is not allowed after closing.".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AFTER_CLOSING"));
        assert!(msg.contains("Loading"));
    }

    #[test]
    fn backend_errors_map_to_reasoner_errors() {
        let err: ReasonerError = BackendError::Materialization {
            message: "negation cycle".into(),
        }
        .into();
        assert!(matches!(err, ReasonerError::Materialization { .. }));

        let err: ReasonerError = BackendError::NotStarted.into();
        match err {
            ReasonerError::Backend { message } => assert!(message.contains("not been activated")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn arity_mismatch_is_descriptive() {
        let err = ReasonerError::ArityMismatch {
            predicate: "p[2]".into(),
            declared: 2,
            actual: 3,
            source_desc: "csv(\"p.csv\")".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("p[2]"));
        assert!(msg.contains('3'));
    }
}
