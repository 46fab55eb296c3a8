// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # chaseward
//!
//! Knowledge-base compilation and reasoner lifecycle for existential
//! (Datalog+/-) rules, plus translation of rule sets for answer-set solvers.
//!
//! ## Architecture
//!
//! - **Model** (`model`): terms, atoms, literals, facts, rules and data source declarations
//! - **Knowledge base** (`knowledge_base`): ordered, versioned statement list with JSON persistence
//! - **Reasoner** (`reasoner`): EDB/IDB classification, source aliasing and the lifecycle
//!   state machine over a pluggable chase backend
//! - **Solvers** (`solver`): skolemizing clingo/DLV rendering and the solver subprocess bridge
//! - **Config** (`config`): TOML settings for reasoners and solvers
//!
//! ## Library usage
//!
//! ```
//! use chaseward::knowledge_base::KnowledgeBase;
//! use chaseward::model::{Atom, Fact, Rule, Term};
//! use chaseward::reasoner::{Reasoner, ReasonerState, RecordingBackend};
//!
//! let mut kb = KnowledgeBase::new();
//! kb.add_statement(Fact::from_constants("p", &["a"]).unwrap());
//! kb.add_statement(
//!     Rule::new(
//!         vec![Atom::new("q", vec![Term::universal("X")]).unwrap()],
//!         vec![Atom::new("p", vec![Term::universal("X")]).unwrap().into()],
//!     )
//!     .unwrap(),
//! );
//!
//! let mut reasoner = Reasoner::new(kb.into_shared(), Box::new(RecordingBackend::new()));
//! assert!(reasoner.reason().unwrap());
//! assert_eq!(reasoner.state(), ReasonerState::AfterReasoning);
//! ```

pub mod config;
pub mod error;
pub mod knowledge_base;
pub mod model;
pub mod reasoner;
pub mod solver;
