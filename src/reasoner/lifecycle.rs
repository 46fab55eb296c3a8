//! The reasoner state machine.
//!
//! ```text
//! BEFORE_LOADING --load--> AFTER_LOADING --reason--> AFTER_REASONING
//!        ^                      |                          |
//!        |                      +---- KB changes ----------+--> KNOWLEDGE_BASE_CHANGED
//!        +------------------------- reset ------------------------+
//! any state --close--> AFTER_CLOSING
//! ```
//!
//! The reasoner never subscribes to the knowledge base. It remembers the
//! version it loaded and compares it with the current one whenever its state
//! is read or an operation starts.

use std::path::Path;
use std::time::Duration;

use crate::config::ReasonerConfig;
use crate::error::{BackendError, ReasonerError, ReasonerResult};
use crate::knowledge_base::SharedKnowledgeBase;
use crate::model::{Atom, DataSourceDeclaration, Predicate, Rule, Statement};

use super::backend::ChaseBackend;
use super::index::{LoadIndex, engine_predicate_name};
use super::query::{QueryAnswerCount, QueryAnswers};
use super::state::{
    Algorithm, CyclicCheck, CyclicityNotion, CyclicityResult, LogLevel, MaterialisationState,
    ReasonerState, RuleRewriteStrategy,
};
use super::supervise::RunTicket;

/// Compiles a knowledge base into a backend and tracks what its results mean.
///
/// Not internally synchronized: share it behind a `Mutex` (see
/// [`reason_supervised`](super::reason_supervised)) when more than one thread
/// needs it. Do not hold a write guard on the knowledge base while calling
/// into the reasoner.
pub struct Reasoner {
    knowledge_base: SharedKnowledgeBase,
    backend: Box<dyn ChaseBackend>,
    index: LoadIndex,
    state: ReasonerState,
    materialisation: MaterialisationState,
    config: ReasonerConfig,
    loaded_version: Option<u64>,
    reasoning_completed: bool,
    supervision: Option<RunTicket>,
}

impl Reasoner {
    pub fn new(knowledge_base: SharedKnowledgeBase, backend: Box<dyn ChaseBackend>) -> Self {
        Self {
            knowledge_base,
            backend,
            index: LoadIndex::default(),
            state: ReasonerState::BeforeLoading,
            materialisation: MaterialisationState::Incomplete,
            config: ReasonerConfig::default(),
            loaded_version: None,
            reasoning_completed: false,
            supervision: None,
        }
    }

    /// Create a reasoner and apply `config` through the regular setters.
    pub fn with_config(
        knowledge_base: SharedKnowledgeBase,
        backend: Box<dyn ChaseBackend>,
        config: &ReasonerConfig,
    ) -> ReasonerResult<Self> {
        let mut reasoner = Self::new(knowledge_base, backend);
        reasoner.set_algorithm(config.algorithm);
        reasoner.set_reasoning_timeout(config.timeout_seconds)?;
        reasoner.set_rule_rewrite_strategy(config.rule_rewrite_strategy)?;
        reasoner.set_log_level(config.log_level)?;
        Ok(reasoner)
    }

    pub fn knowledge_base(&self) -> &SharedKnowledgeBase {
        &self.knowledge_base
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Current lifecycle state, accounting for knowledge base changes since
    /// loading.
    pub fn state(&self) -> ReasonerState {
        match self.state {
            ReasonerState::AfterLoading | ReasonerState::AfterReasoning
                if self.knowledge_base_advanced() =>
            {
                ReasonerState::KnowledgeBaseChanged
            }
            state => state,
        }
    }

    pub fn materialisation_state(&self) -> MaterialisationState {
        match self.state() {
            ReasonerState::KnowledgeBaseChanged => MaterialisationState::Wrong,
            _ => self.materialisation,
        }
    }

    /// Whether the last run reached the fixpoint.
    pub fn reasoning_completed(&self) -> bool {
        self.reasoning_completed
    }

    /// Mark loaded results as stale after `statement` was added to the
    /// knowledge base. No effect before loading or after closing.
    pub fn on_statement_added(&mut self, statement: &Statement) {
        tracing::debug!(%statement, state = %self.state, "statement added");
        self.mark_knowledge_base_changed();
    }

    fn mark_knowledge_base_changed(&mut self) {
        if matches!(
            self.state,
            ReasonerState::AfterLoading | ReasonerState::AfterReasoning
        ) {
            self.state = ReasonerState::KnowledgeBaseChanged;
            self.materialisation = MaterialisationState::Wrong;
        }
    }

    fn knowledge_base_advanced(&self) -> bool {
        match self.loaded_version {
            Some(loaded) => {
                let kb = self
                    .knowledge_base
                    .read()
                    .expect("knowledge base lock poisoned");
                kb.version() != loaded
            }
            None => false,
        }
    }

    /// Commit a knowledge base change noticed since the last operation.
    fn observe(&mut self) {
        if self.knowledge_base_advanced() {
            self.mark_knowledge_base_changed();
        }
    }

    fn state_error(&self, message: &str) -> ReasonerError {
        ReasonerError::State {
            state: self.state,
            message: message.to_string(),
        }
    }

    fn ensure_open(&self, message: &str) -> ReasonerResult<()> {
        if self.state == ReasonerState::AfterClosing {
            Err(self.state_error(message))
        } else {
            Ok(())
        }
    }

    fn ensure_loaded(&self, before_loading: &str, after_closing: &str) -> ReasonerResult<()> {
        match self.state {
            ReasonerState::BeforeLoading => Err(self.state_error(before_loading)),
            ReasonerState::AfterClosing => Err(self.state_error(after_closing)),
            _ => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Compile the knowledge base and hand it to the backend.
    ///
    /// A reasoner that already loaded is reset first.
    pub fn load(&mut self) -> ReasonerResult<()> {
        self.observe();
        match self.state {
            ReasonerState::AfterClosing => {
                return Err(self.state_error("Loading is not allowed after closing."));
            }
            ReasonerState::BeforeLoading => {}
            state => {
                tracing::info!(%state, "reloading knowledge base");
                self.reset()?;
            }
        }

        let (index, version) = {
            let kb = self
                .knowledge_base
                .read()
                .expect("knowledge base lock poisoned");
            (LoadIndex::build(kb.statements()), kb.version())
        };
        self.index = index;

        if !self.index.has_edb_sources() {
            tracing::warn!("no facts have been provided");
        }

        let config = self.index.data_source_configuration()?;
        self.backend.activate(&config)?;
        if let Err(e) = self.populate_backend() {
            self.backend.stop();
            return Err(e);
        }

        self.state = ReasonerState::AfterLoading;
        self.materialisation = MaterialisationState::Incomplete;
        self.reasoning_completed = false;
        self.loaded_version = Some(version);
        Ok(())
    }

    fn populate_backend(&mut self) -> ReasonerResult<()> {
        self.backend.set_log_level(self.config.log_level);
        self.validate_source_arities()?;
        self.load_facts()?;
        self.load_rules()
    }

    fn validate_source_arities(&self) -> ReasonerResult<()> {
        for (predicate, source) in self.index.external_sources() {
            match self
                .backend
                .predicate_arity(&engine_predicate_name(predicate))?
            {
                None => {
                    tracing::warn!(%predicate, %source, "data source is empty");
                }
                Some(actual) if actual != predicate.arity() => {
                    return Err(ReasonerError::ArityMismatch {
                        predicate: predicate.to_string(),
                        declared: predicate.arity(),
                        actual,
                        source_desc: source.to_string(),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn load_facts(&mut self) -> ReasonerResult<()> {
        for (predicate, facts) in self.index.direct_edb_facts() {
            let target =
                self.index
                    .fact_target(predicate)
                    .ok_or_else(|| ReasonerError::Backend {
                        message: format!("facts for {predicate} have no target predicate"),
                    })?;
            let tuples = facts
                .iter()
                .map(|fact| {
                    tracing::debug!(%fact, %target, "loaded fact");
                    fact.terms()
                        .iter()
                        .map(|term| term.name().into_owned())
                        .collect()
                })
                .collect();
            self.backend
                .add_data(&engine_predicate_name(&target), tuples)?;
        }
        Ok(())
    }

    fn load_rules(&mut self) -> ReasonerResult<()> {
        let rules: Vec<Rule> = self.index.rules().iter().cloned().collect();
        for rule in &rules {
            tracing::debug!(%rule, "loaded rule");
        }
        self.backend
            .set_rules(&rules, self.config.rule_rewrite_strategy)?;
        Ok(())
    }

    /// Run the chase, loading first when needed. Returns whether the fixpoint
    /// was reached.
    ///
    /// Stale results (after reasoning, or after the knowledge base changed)
    /// are discarded and the knowledge base is loaded again.
    pub fn reason(&mut self) -> ReasonerResult<bool> {
        self.observe();
        match self.state {
            ReasonerState::BeforeLoading => self.load()?,
            ReasonerState::AfterLoading => {}
            ReasonerState::AfterReasoning | ReasonerState::KnowledgeBaseChanged => {
                self.reset()?;
                self.load()?;
            }
            ReasonerState::AfterClosing => {
                return Err(self.state_error("Reasoning is not allowed after closing."));
            }
        }
        self.run_chase()?;
        Ok(self.reasoning_completed)
    }

    fn run_chase(&mut self) -> ReasonerResult<()> {
        self.state = ReasonerState::AfterReasoning;

        let skolem_chase = self.config.algorithm == Algorithm::SkolemChase;
        let timeout = self.config.timeout_seconds.map(Duration::from_secs);
        self.reasoning_completed = self.backend.materialize(skolem_chase, timeout)?;
        if let Some(ticket) = &self.supervision {
            if !ticket.finish() {
                tracing::warn!("supervisor gave up on this run, result is marked incomplete");
                self.reasoning_completed = false;
            }
        }
        self.materialisation = if self.reasoning_completed {
            MaterialisationState::Complete
        } else {
            MaterialisationState::Incomplete
        };
        tracing::debug!(
            completed = self.reasoning_completed,
            ?timeout,
            "materialisation finished"
        );
        Ok(())
    }

    /// Discard loaded data and inferences.
    pub fn reset(&mut self) -> ReasonerResult<()> {
        self.observe();
        self.ensure_open("Resetting is not allowed after closing.")?;
        self.state = ReasonerState::BeforeLoading;
        self.loaded_version = None;
        self.backend.stop();
        tracing::info!(
            "reasoner has been reset, all inferences computed during reasoning have been discarded"
        );
        Ok(())
    }

    /// Release backend resources. Every later operation except `close` fails.
    pub fn close(&mut self) {
        if self.state == ReasonerState::AfterClosing {
            return;
        }
        self.state = ReasonerState::AfterClosing;
        self.loaded_version = None;
        self.backend.stop();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Answers to `query`, tagged with the current materialisation state.
    ///
    /// `include_nulls` keeps answers containing named nulls.
    pub fn answer_query(&self, query: &Atom, include_nulls: bool) -> ReasonerResult<QueryAnswers> {
        self.ensure_loaded(
            "Querying is not allowed before the reasoner is loaded.",
            "Querying is not allowed after closing.",
        )?;
        let tuples = self
            .backend
            .query(
                &engine_predicate_name(query.predicate()),
                query.terms(),
                include_nulls,
            )
            .map_err(|e| query_error(query, e))?;
        Ok(QueryAnswers::from_backend(
            tuples,
            self.materialisation_state(),
        ))
    }

    pub fn count_query_answers(
        &self,
        query: &Atom,
        include_nulls: bool,
    ) -> ReasonerResult<QueryAnswerCount> {
        let answers = self.answer_query(query, include_nulls)?;
        Ok(QueryAnswerCount {
            correctness: answers.correctness(),
            count: answers.len() as u64,
        })
    }

    /// Write the answers to `query` to a `.csv` file.
    pub fn export_query_answers_to_csv(
        &self,
        query: &Atom,
        path: impl AsRef<Path>,
        include_nulls: bool,
    ) -> ReasonerResult<MaterialisationState> {
        let path = path.as_ref();
        self.ensure_loaded(
            "Querying is not allowed before the reasoner is loaded.",
            "Querying is not allowed after closing.",
        )?;
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            return Err(ReasonerError::InvalidCsvPath {
                path: path.display().to_string(),
            });
        }
        self.backend
            .write_query_csv(
                &engine_predicate_name(query.predicate()),
                query.terms(),
                path,
                include_nulls,
            )
            .map_err(|e| query_error(query, e))?;
        Ok(self.materialisation_state())
    }

    // -----------------------------------------------------------------------
    // Acyclicity
    // -----------------------------------------------------------------------

    pub fn is_ja(&self) -> ReasonerResult<bool> {
        self.holds_acyclic(CyclicityNotion::Ja)
    }

    pub fn is_rja(&self) -> ReasonerResult<bool> {
        self.holds_acyclic(CyclicityNotion::Rja)
    }

    pub fn is_mfa(&self) -> ReasonerResult<bool> {
        self.holds_acyclic(CyclicityNotion::Mfa)
    }

    pub fn is_rmfa(&self) -> ReasonerResult<bool> {
        self.holds_acyclic(CyclicityNotion::Rmfa)
    }

    /// Whether the rules are model-faithful cyclic, i.e. some chase does not
    /// terminate.
    pub fn is_mfc(&self) -> ReasonerResult<bool> {
        Ok(self.check_cyclic(CyclicityNotion::Mfc)? == CyclicCheck::Cyclic)
    }

    /// Try the acyclicity notions in order of cost, then MFC.
    pub fn check_for_cycles(&self) -> ReasonerResult<CyclicityResult> {
        let acyclic = self.is_ja()? || self.is_rja()? || self.is_mfa()? || self.is_rmfa()?;
        if acyclic {
            Ok(CyclicityResult::Acyclic)
        } else if self.is_mfc()? {
            Ok(CyclicityResult::Cyclic)
        } else {
            Ok(CyclicityResult::Undetermined)
        }
    }

    fn holds_acyclic(&self, notion: CyclicityNotion) -> ReasonerResult<bool> {
        Ok(self.check_cyclic(notion)? == CyclicCheck::NonCyclic)
    }

    fn check_cyclic(&self, notion: CyclicityNotion) -> ReasonerResult<CyclicCheck> {
        self.ensure_loaded(
            "Checking rule acyclicity is not allowed before loading.",
            "Checking rule acyclicity is not allowed after closing.",
        )?;
        let verdict = self.backend.check_cyclic(notion)?;
        tracing::debug!(notion = notion.as_str(), ?verdict, "cyclicity check");
        Ok(verdict)
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        if self.state == ReasonerState::AfterClosing {
            tracing::warn!(?algorithm, "setting algorithm on a closed reasoner");
        }
        self.config.algorithm = algorithm;
    }

    pub fn reasoning_timeout(&self) -> Option<u64> {
        self.config.timeout_seconds
    }

    /// Bound each run to `seconds`. `None` runs until the fixpoint.
    pub fn set_reasoning_timeout(&mut self, seconds: Option<u64>) -> ReasonerResult<()> {
        if seconds == Some(0) {
            return Err(ReasonerError::InvalidTimeout);
        }
        if self.state == ReasonerState::AfterClosing {
            tracing::warn!(?seconds, "setting timeout on a closed reasoner");
        }
        self.config.timeout_seconds = seconds;
        Ok(())
    }

    pub fn rule_rewrite_strategy(&self) -> RuleRewriteStrategy {
        self.config.rule_rewrite_strategy
    }

    /// Only allowed before loading: rules are rewritten when they are loaded.
    pub fn set_rule_rewrite_strategy(&mut self, strategy: RuleRewriteStrategy) -> ReasonerResult<()> {
        self.observe();
        if self.state != ReasonerState::BeforeLoading {
            return Err(self.state_error(
                "Rules cannot be rewritten after the reasoner has been loaded. \
                 Call reset() to undo loading and reasoning.",
            ));
        }
        self.config.rule_rewrite_strategy = strategy;
        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        self.config.log_level
    }

    /// Verbosity of the backend's logger.
    pub fn set_log_level(&mut self, level: LogLevel) -> ReasonerResult<()> {
        self.ensure_open("Setting log level is not allowed after closing.")?;
        self.config.log_level = level;
        self.backend.set_log_level(level);
        Ok(())
    }

    pub fn set_log_file(&mut self, path: impl AsRef<Path>) -> ReasonerResult<()> {
        self.ensure_open("Setting log file is not allowed after closing.")?;
        self.backend.set_log_file(path.as_ref())?;
        Ok(())
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Load index
    // -----------------------------------------------------------------------

    pub fn edb_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.index.edb_predicates().keys()
    }

    pub fn idb_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.index.idb_predicates().iter()
    }

    pub fn aliased_edb_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.index.aliased_edb_predicates().iter()
    }

    pub fn alias_for(&self, declaration: &DataSourceDeclaration) -> Option<&Predicate> {
        self.index.alias_for(declaration)
    }

    /// Rules of the last load, including import rules.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.index.rules().iter()
    }

    pub fn load_index(&self) -> &LoadIndex {
        &self.index
    }

    pub fn data_source_configuration(&self) -> ReasonerResult<String> {
        self.index.data_source_configuration()
    }
}

impl Reasoner {
    /// Attach the ticket of a supervised run. A run abandoned through the
    /// ticket is recorded as incomplete.
    pub(crate) fn set_supervision(&mut self, ticket: Option<RunTicket>) {
        self.supervision = ticket;
    }
}

impl Drop for Reasoner {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Reasoner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reasoner")
            .field("state", &self.state)
            .field("materialisation", &self.materialisation)
            .field("config", &self.config)
            .field("loaded_version", &self.loaded_version)
            .finish_non_exhaustive()
    }
}

/// Name the queried predicate, not its engine name.
fn query_error(query: &Atom, err: BackendError) -> ReasonerError {
    match err {
        BackendError::NonExistingPredicate { .. } => ReasonerError::UnknownQueryPredicate {
            predicate: query.predicate().to_string(),
        },
        other => other.into(),
    }
}
