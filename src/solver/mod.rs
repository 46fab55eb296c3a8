//! Answer-set solvers run as subprocesses.
//!
//! A knowledge base is rendered one statement per line in the solver's input
//! syntax ([`transform`]), streamed into a solver process ([`process`]) and
//! the solver's output collected ([`session`]).

pub mod process;
pub mod session;
pub mod transform;

use std::fmt;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use process::SolverProcess;
pub use session::{SolverRun, render_program, run_solver};
pub use transform::{
    ClingoTransformer, DlvTransformer, SkolemContext, StatementTransformer, sanitize,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("failed to start solver: {command}")]
    #[diagnostic(
        code(chaseward::solver::spawn),
        help(
            "Check that the solver binary is installed and on PATH, or set \
             `binary` in the [clingo] / [dlv] section of the config file."
        )
    )]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver I/O error: {source}")]
    #[diagnostic(code(chaseward::solver::io))]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("solver process has not been started")]
    #[diagnostic(
        code(chaseward::solver::not_started),
        help("Call exec() before using the solver's input or output.")
    )]
    NotStarted,
}

pub type SolverResult<T> = std::result::Result<T, SolverError>;

// ---------------------------------------------------------------------------
// Solver kinds
// ---------------------------------------------------------------------------

/// Supported solvers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Clingo,
    /// Disjunctive solver; conjunctive heads are split into one rule per atom.
    Dlv,
}

impl SolverKind {
    pub fn transformer(self) -> &'static dyn StatementTransformer {
        match self {
            SolverKind::Clingo => &ClingoTransformer,
            SolverKind::Dlv => &DlvTransformer,
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Clingo => f.write_str("clingo"),
            SolverKind::Dlv => f.write_str("dlv"),
        }
    }
}
