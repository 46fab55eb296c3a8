//! Reasoner lifecycle over a shared knowledge base.
//!
//! A [`Reasoner`] compiles the knowledge base into a [`LoadIndex`], hands the
//! result to a [`ChaseBackend`] and enforces the order in which loading,
//! reasoning and querying may happen. Query answers carry a [`Correctness`]
//! tag derived from the [`MaterialisationState`].

pub mod backend;
pub mod index;
pub mod lifecycle;
pub mod query;
pub mod state;
pub mod supervise;

pub use backend::{ChaseBackend, RecordingBackend};
pub use index::{FACT_ALIAS_SUFFIX, LoadIndex, alias_predicate, engine_predicate_name, import_rule};
pub use lifecycle::Reasoner;
pub use query::{QueryAnswerCount, QueryAnswers};
pub use state::{
    Algorithm, Correctness, CyclicCheck, CyclicityNotion, CyclicityResult, LogLevel,
    MaterialisationState, ReasonerState, RuleRewriteStrategy,
};
pub use supervise::{SharedReasoner, reason_supervised};
