//! Lifecycle states, result correctness tags and reasoner settings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a reasoner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonerState {
    /// Initial state; nothing has been loaded into the backend.
    BeforeLoading,
    /// Statements have been compiled and handed to the backend.
    AfterLoading,
    /// A materialisation run has been started (and possibly finished).
    AfterReasoning,
    /// The knowledge base changed since loading; results are stale.
    KnowledgeBaseChanged,
    /// Terminal: resources released.
    AfterClosing,
}

impl fmt::Display for ReasonerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReasonerState::BeforeLoading => "BEFORE_LOADING",
            ReasonerState::AfterLoading => "AFTER_LOADING",
            ReasonerState::AfterReasoning => "AFTER_REASONING",
            ReasonerState::KnowledgeBaseChanged => "KNOWLEDGE_BASE_CHANGED",
            ReasonerState::AfterClosing => "AFTER_CLOSING",
        };
        f.write_str(name)
    }
}

/// Whether the last computed result can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialisationState {
    /// No result yet, or the run stopped early (timeout).
    Incomplete,
    /// The fixpoint was reached.
    Complete,
    /// The knowledge base changed since the result was computed.
    Wrong,
}

impl MaterialisationState {
    pub fn correctness(self) -> Correctness {
        match self {
            MaterialisationState::Complete => Correctness::SoundAndComplete,
            MaterialisationState::Incomplete => Correctness::SoundButIncomplete,
            MaterialisationState::Wrong => Correctness::Incorrect,
        }
    }
}

impl fmt::Display for MaterialisationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialisationState::Incomplete => f.write_str("INCOMPLETE"),
            MaterialisationState::Complete => f.write_str("COMPLETE"),
            MaterialisationState::Wrong => f.write_str("WRONG"),
        }
    }
}

/// Correctness guarantee attached to query answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Correctness {
    /// Every answer is entailed and every entailed answer is present.
    SoundAndComplete,
    /// Every answer is entailed, some may be missing.
    SoundButIncomplete,
    /// Answers may be missing and some may no longer be entailed.
    Incorrect,
}

impl fmt::Display for Correctness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Correctness::SoundAndComplete => f.write_str("sound and complete"),
            Correctness::SoundButIncomplete => f.write_str("sound but possibly incomplete"),
            Correctness::Incorrect => f.write_str("possibly incorrect"),
        }
    }
}

/// Chase variant used for materialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[default]
    RestrictedChase,
    SkolemChase,
}

/// Rule rewriting applied by the backend before materialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleRewriteStrategy {
    #[default]
    None,
    SplitHeadPieces,
}

/// Verbosity of the backend's own logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    #[default]
    Warning,
    Info,
    Debug,
}

/// Syntactic criteria sufficient for chase termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclicityNotion {
    /// Joint acyclicity.
    Ja,
    /// Restricted joint acyclicity.
    Rja,
    /// Model-faithful acyclicity.
    Mfa,
    /// Restricted model-faithful acyclicity.
    Rmfa,
    /// Model-faithful cyclicity (a sufficient condition for non-termination).
    Mfc,
}

impl CyclicityNotion {
    pub fn as_str(self) -> &'static str {
        match self {
            CyclicityNotion::Ja => "JA",
            CyclicityNotion::Rja => "RJA",
            CyclicityNotion::Mfa => "MFA",
            CyclicityNotion::Rmfa => "RMFA",
            CyclicityNotion::Mfc => "MFC",
        }
    }
}

/// Backend verdict for a single cyclicity notion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclicCheck {
    Cyclic,
    NonCyclic,
}

/// Combined verdict over all notions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclicityResult {
    /// Some acyclicity notion holds: every chase terminates.
    Acyclic,
    /// MFC holds: some chase sequence does not terminate.
    Cyclic,
    Undetermined,
}
