//! Load-time classification of predicates into EDB, IDB and aliased EDB.
//!
//! A [`LoadIndex`] is built from scratch from the knowledge base on every
//! load. Each statement is visited once, in order:
//!
//! - **Facts** register an implicit local-facts source for their predicate and
//!   contribute their tuple.
//! - **Rules** mark every head predicate as IDB. A predicate that was a main
//!   EDB predicate until then is demoted: its declaration becomes an alias.
//! - **Data source declarations** become the main source of their predicate if
//!   it has none. A second, different source turns both into aliases.
//!
//! Every aliased declaration gets its own alias predicate and an import rule
//! `p(X1, .., Xn) :- alias(X1, .., Xn)`. Import rules are ordinary rules for
//! everything downstream.
//!
//! The resulting partition does not depend on the order of rules and
//! declarations.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ReasonerResult;
use crate::model::{
    Atom, DataSource, DataSourceDeclaration, Fact, Literal, Predicate, Rule, Statement, Term,
};

/// Suffix of alias predicates holding a predicate's inline facts.
pub const FACT_ALIAS_SUFFIX: &str = "##FACT";

/// Name under which the backend knows `predicate`: `<name>-<arity>`.
pub fn engine_predicate_name(predicate: &Predicate) -> String {
    format!("{}-{}", predicate.name(), predicate.arity())
}

/// The synthetic predicate standing in for one source of an aliased predicate.
pub fn alias_predicate(declaration: &DataSourceDeclaration) -> Predicate {
    let predicate = declaration.predicate();
    let name = if declaration.is_local_facts() {
        format!("{}{FACT_ALIAS_SUFFIX}", predicate.name())
    } else {
        format!("{}##{}", predicate.name(), declaration.stable_id())
    };
    Predicate::new(name, predicate.arity())
}

/// `original(X1, .., Xn) :- alias(X1, .., Xn) .`
pub fn import_rule(original: &Predicate, alias: &Predicate) -> Rule {
    let terms: Vec<Term> = (1..=original.arity())
        .map(|i| Term::universal(format!("X{i}")))
        .collect();
    let head = Atom::from_parts(original.clone(), terms.clone());
    let body = Atom::from_parts(alias.clone(), terms);
    Rule::disjunctive(vec![vec![head]], vec![vec![Literal::Positive(body)]])
        .expect("import rules have a non-empty head and body")
}

/// Predicate classification and compiled rule set for one load.
#[derive(Debug, Clone, Default)]
pub struct LoadIndex {
    edb_predicates: BTreeMap<Predicate, DataSourceDeclaration>,
    aliased_edb_predicates: BTreeSet<Predicate>,
    aliases_for_edb_predicates: BTreeMap<DataSourceDeclaration, Predicate>,
    idb_predicates: BTreeSet<Predicate>,
    direct_edb_facts: BTreeMap<Predicate, Vec<Fact>>,
    rules: BTreeSet<Rule>,
}

impl LoadIndex {
    /// Classify `statements`, visiting each exactly once in order.
    pub fn build<'a>(statements: impl IntoIterator<Item = &'a Statement>) -> Self {
        let mut index = Self::default();
        for statement in statements {
            index.visit(statement);
        }
        index
    }

    fn visit(&mut self, statement: &Statement) {
        match statement {
            Statement::Fact(fact) => self.visit_fact(fact),
            Statement::Rule(rule) => self.visit_rule(rule),
            Statement::DataSource(declaration) => {
                self.register_edb_declaration(declaration.clone())
            }
        }
    }

    fn visit_fact(&mut self, fact: &Fact) {
        let predicate = fact.predicate().clone();
        self.register_edb_declaration(DataSourceDeclaration::local_facts(predicate.clone()));
        self.direct_edb_facts
            .entry(predicate)
            .or_default()
            .push(fact.clone());
    }

    fn visit_rule(&mut self, rule: &Rule) {
        self.rules.insert(rule.clone());
        for predicate in rule.head_predicates() {
            if self.idb_predicates.contains(predicate) {
                continue;
            }
            if let Some(main) = self.edb_predicates.remove(predicate) {
                self.add_edb_alias(main);
            }
            self.idb_predicates.insert(predicate.clone());
        }
    }

    fn register_edb_declaration(&mut self, declaration: DataSourceDeclaration) {
        let predicate = declaration.predicate().clone();
        if self.idb_predicates.contains(&predicate)
            || self.aliased_edb_predicates.contains(&predicate)
        {
            if !self.aliases_for_edb_predicates.contains_key(&declaration) {
                self.add_edb_alias(declaration);
            }
            return;
        }
        match self.edb_predicates.get(&predicate) {
            None => {
                self.edb_predicates.insert(predicate, declaration);
            }
            Some(main) if *main != declaration => {
                let main = main.clone();
                self.edb_predicates.remove(&predicate);
                self.add_edb_alias(main);
                self.add_edb_alias(declaration);
            }
            // Same declaration again, e.g. a second local fact.
            Some(_) => {}
        }
    }

    fn add_edb_alias(&mut self, declaration: DataSourceDeclaration) {
        let predicate = declaration.predicate().clone();
        let alias = alias_predicate(&declaration);
        tracing::debug!(%predicate, %alias, "aliasing data source");
        self.rules.insert(import_rule(&predicate, &alias));
        self.aliases_for_edb_predicates.insert(declaration, alias);
        self.aliased_edb_predicates.insert(predicate);
    }

    /// Predicates with a single, unaliased source.
    pub fn edb_predicates(&self) -> &BTreeMap<Predicate, DataSourceDeclaration> {
        &self.edb_predicates
    }

    /// Predicates fed through alias predicates and import rules.
    pub fn aliased_edb_predicates(&self) -> &BTreeSet<Predicate> {
        &self.aliased_edb_predicates
    }

    pub fn aliases_for_edb_predicates(&self) -> &BTreeMap<DataSourceDeclaration, Predicate> {
        &self.aliases_for_edb_predicates
    }

    pub fn alias_for(&self, declaration: &DataSourceDeclaration) -> Option<&Predicate> {
        self.aliases_for_edb_predicates.get(declaration)
    }

    /// Predicates occurring in some rule head.
    pub fn idb_predicates(&self) -> &BTreeSet<Predicate> {
        &self.idb_predicates
    }

    pub fn direct_edb_facts(&self) -> &BTreeMap<Predicate, Vec<Fact>> {
        &self.direct_edb_facts
    }

    /// User rules plus synthesized import rules, deduplicated.
    pub fn rules(&self) -> &BTreeSet<Rule> {
        &self.rules
    }

    pub fn has_edb_sources(&self) -> bool {
        !self.edb_predicates.is_empty() || !self.aliased_edb_predicates.is_empty()
    }

    /// The predicate the inline facts of `predicate` are loaded into.
    ///
    /// This is the predicate itself while its facts are its main source,
    /// otherwise the `##FACT` alias.
    pub fn fact_target(&self, predicate: &Predicate) -> Option<Predicate> {
        if self.edb_predicates.contains_key(predicate) {
            return Some(predicate.clone());
        }
        self.aliases_for_edb_predicates
            .get(&DataSourceDeclaration::local_facts(predicate.clone()))
            .cloned()
    }

    /// Every external source with the predicate the backend loads it into.
    ///
    /// Main sources come first (ordered by predicate), then alias sources
    /// (ordered by declaration).
    pub fn external_sources(&self) -> Vec<(&Predicate, &DataSource)> {
        let main = self
            .edb_predicates
            .iter()
            .filter_map(|(predicate, decl)| decl.source().map(|s| (predicate, s)));
        let aliased = self
            .aliases_for_edb_predicates
            .iter()
            .filter_map(|(decl, alias)| decl.source().map(|s| (alias, s)));
        main.chain(aliased).collect()
    }

    /// Backend activation configuration: one block per external source.
    pub fn data_source_configuration(&self) -> ReasonerResult<String> {
        let mut config = String::new();
        for (index, (predicate, source)) in self.external_sources().into_iter().enumerate() {
            config.push_str(&source.render_config(index, &engine_predicate_name(predicate))?);
        }
        Ok(config)
    }
}
