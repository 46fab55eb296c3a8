//! Statements: facts, rules and data source declarations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, ReasonerError, ReasonerResult};

use super::atom::{Atom, Literal, PositiveLiteral, Predicate};
use super::formula::{Conjunction, Disjunction};
use super::term::{Term, TermKind};

// ---------------------------------------------------------------------------
// Statement
// ---------------------------------------------------------------------------

/// Any statement that can be added to a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statement {
    Fact(Fact),
    Rule(Rule),
    DataSource(DataSourceDeclaration),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Fact(fact) => write!(f, "{fact}"),
            Statement::Rule(rule) => write!(f, "{rule}"),
            Statement::DataSource(decl) => write!(f, "{decl}"),
        }
    }
}

impl From<Fact> for Statement {
    fn from(fact: Fact) -> Self {
        Statement::Fact(fact)
    }
}

impl From<Rule> for Statement {
    fn from(rule: Rule) -> Self {
        Statement::Rule(rule)
    }
}

impl From<DataSourceDeclaration> for Statement {
    fn from(decl: DataSourceDeclaration) -> Self {
        Statement::DataSource(decl)
    }
}

// ---------------------------------------------------------------------------
// Fact
// ---------------------------------------------------------------------------

/// A ground positive literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Atom", into = "Atom")]
pub struct Fact(Atom);

impl Fact {
    /// Wrap an atom as a fact. Fails if the atom contains variables.
    pub fn new(atom: Atom) -> ModelResult<Self> {
        if !atom.is_ground() {
            return Err(ModelError::NonGroundFact {
                atom: atom.to_string(),
            });
        }
        Ok(Fact(atom))
    }

    /// Shorthand for a fact over plain constants.
    pub fn from_constants(predicate: &str, constants: &[&str]) -> ModelResult<Self> {
        let terms = constants.iter().map(|c| Term::constant(*c)).collect();
        Fact::new(Atom::new(predicate, terms)?)
    }

    pub fn atom(&self) -> &Atom {
        &self.0
    }

    pub fn predicate(&self) -> &Predicate {
        self.0.predicate()
    }

    pub fn terms(&self) -> &[Term] {
        self.0.terms()
    }
}

impl TryFrom<Atom> for Fact {
    type Error = ModelError;

    fn try_from(atom: Atom) -> ModelResult<Self> {
        Fact::new(atom)
    }
}

impl From<Fact> for Atom {
    fn from(fact: Fact) -> Self {
        fact.0
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A (possibly disjunctive) existential rule `head :- body`.
///
/// Head: disjunction of conjunctions of positive literals.
/// Body: disjunction of conjunctions of literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub struct Rule {
    head: Disjunction<Conjunction<PositiveLiteral>>,
    body: Disjunction<Conjunction<Literal>>,
}

impl Rule {
    /// A rule with a single conjunctive head and a single conjunctive body.
    pub fn new(head: Vec<PositiveLiteral>, body: Vec<Literal>) -> ModelResult<Self> {
        Rule::disjunctive(vec![head], vec![body])
    }

    /// A rule whose head and body are disjunctions of conjunctions.
    pub fn disjunctive(
        head: Vec<Vec<PositiveLiteral>>,
        body: Vec<Vec<Literal>>,
    ) -> ModelResult<Self> {
        if head.is_empty() || head.iter().any(Vec::is_empty) {
            return Err(ModelError::EmptyHead);
        }
        if body.is_empty() || body.iter().any(Vec::is_empty) {
            return Err(ModelError::EmptyConjunction);
        }
        Ok(Self {
            head: Disjunction::new(head.into_iter().map(Conjunction::new).collect()),
            body: Disjunction::new(body.into_iter().map(Conjunction::new).collect()),
        })
    }

    pub fn head(&self) -> &Disjunction<Conjunction<PositiveLiteral>> {
        &self.head
    }

    pub fn body(&self) -> &Disjunction<Conjunction<Literal>> {
        &self.body
    }

    /// Predicates occurring in the head, each once, in order of occurrence.
    pub fn head_predicates(&self) -> Vec<&Predicate> {
        let mut seen = Vec::new();
        for atom in self.head.literals() {
            if !seen.contains(&atom.predicate()) {
                seen.push(atom.predicate());
            }
        }
        seen
    }

    pub fn positive_body_literals(&self) -> impl Iterator<Item = &PositiveLiteral> {
        self.body.literals().filter_map(Literal::as_positive)
    }

    pub fn negative_body_literals(&self) -> impl Iterator<Item = &Literal> {
        self.body.literals().filter(|l| l.is_negated())
    }

    pub fn universal_variables(&self) -> BTreeSet<&Term> {
        self.collect_terms(TermKind::UniversalVariable)
    }

    pub fn existential_variables(&self) -> BTreeSet<&Term> {
        self.collect_terms(TermKind::ExistentialVariable)
    }

    fn collect_terms(&self, kind: TermKind) -> BTreeSet<&Term> {
        self.head
            .literals()
            .chain(self.body.literals().map(Literal::atom))
            .flat_map(|atom| atom.terms())
            .filter(|t| t.kind() == kind)
            .collect()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :- {} .", self.head, self.body)
    }
}

#[derive(Serialize, Deserialize)]
struct RawRule {
    head: Vec<Vec<PositiveLiteral>>,
    body: Vec<Vec<Literal>>,
}

impl TryFrom<RawRule> for Rule {
    type Error = ModelError;

    fn try_from(raw: RawRule) -> ModelResult<Self> {
        Rule::disjunctive(raw.head, raw.body)
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        RawRule {
            head: rule
                .head
                .disjuncts()
                .iter()
                .map(|c| c.literals().to_vec())
                .collect(),
            body: rule
                .body
                .disjuncts()
                .iter()
                .map(|c| c.literals().to_vec())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// An external source of tuples for an EDB predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// A CSV file (`.csv` or `.csv.gz`), one tuple per line.
    CsvFile { path: PathBuf },
    /// An N-Triples file (`.nt` or `.nt.gz`), loaded as a ternary relation.
    RdfFile { path: PathBuf },
    /// Answers of a SPARQL query; `variables` is the comma-separated
    /// projection in column order.
    SparqlQuery {
        endpoint: String,
        variables: String,
        query: String,
    },
}

impl DataSource {
    pub fn csv_file(path: impl Into<PathBuf>) -> Self {
        DataSource::CsvFile { path: path.into() }
    }

    pub fn rdf_file(path: impl Into<PathBuf>) -> Self {
        DataSource::RdfFile { path: path.into() }
    }

    pub fn sparql_query(
        endpoint: impl Into<String>,
        variables: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        DataSource::SparqlQuery {
            endpoint: endpoint.into(),
            variables: variables.into(),
            query: query.into(),
        }
    }

    /// Engine configuration block with `{index}` and `{predicate}` placeholders.
    pub fn config_template(&self) -> ReasonerResult<String> {
        let (kind, params) = self.config_params()?;
        Ok(config_block("{index}", "{predicate}", kind, &params))
    }

    /// The configuration block for the `index`-th source feeding `predicate`.
    ///
    /// Only the fixed keys are filled in; parameter values such as query text
    /// are emitted as given.
    pub fn render_config(&self, index: usize, predicate: &str) -> ReasonerResult<String> {
        let (kind, params) = self.config_params()?;
        Ok(config_block(&index.to_string(), predicate, kind, &params))
    }

    /// Engine source type and its positional parameters.
    fn config_params(&self) -> ReasonerResult<(&'static str, Vec<String>)> {
        match self {
            DataSource::CsvFile { path } => {
                Ok(("INMEMORY", file_params(path, &[".csv.gz", ".csv"])?))
            }
            DataSource::RdfFile { path } => {
                Ok(("INMEMORY", file_params(path, &[".nt.gz", ".nt"])?))
            }
            DataSource::SparqlQuery {
                endpoint,
                variables,
                query,
            } => {
                if endpoint.is_empty() || variables.is_empty() {
                    return Err(ReasonerError::Configuration {
                        message: format!("SPARQL source {self} needs an endpoint and variables"),
                    });
                }
                Ok((
                    "SPARQL",
                    [endpoint, variables, query]
                        .iter()
                        .map(|v| v.replace('\n', " "))
                        .collect(),
                ))
            }
        }
    }
}

fn config_block(index: &str, predicate: &str, kind: &str, params: &[String]) -> String {
    let mut block = format!("EDB{index}_predname={predicate}\nEDB{index}_type={kind}\n");
    for (n, value) in params.iter().enumerate() {
        block.push_str(&format!("EDB{index}_param{n}={value}\n"));
    }
    block.push('\n');
    block
}

fn file_params(path: &Path, extensions: &[&str]) -> ReasonerResult<Vec<String>> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ReasonerError::Configuration {
            message: format!("source path {} has no file name", path.display()),
        })?;
    let stem = extensions
        .iter()
        .find_map(|ext| file_name.strip_suffix(ext))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| ReasonerError::Configuration {
            message: format!(
                "source file {} must end in one of {}",
                path.display(),
                extensions.join(", ")
            ),
        })?;
    let dir = path
        .parent()
        .map(|p| p.display().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ".".to_string());
    Ok(vec![dir, stem.to_string()])
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::CsvFile { path } => write!(f, "load-csv(\"{}\")", path.display()),
            DataSource::RdfFile { path } => write!(f, "load-rdf(\"{}\")", path.display()),
            DataSource::SparqlQuery {
                endpoint,
                variables,
                query,
            } => write!(f, "sparql(<{endpoint}>, \"{variables}\", \"{query}\")"),
        }
    }
}

/// Declares that the tuples of `predicate` come from a source.
///
/// A declaration without a source stands for the predicate's inline facts.
/// Two such declarations for the same predicate are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataSourceDeclaration {
    predicate: Predicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<DataSource>,
}

impl DataSourceDeclaration {
    pub fn new(predicate: Predicate, source: DataSource) -> Self {
        Self {
            predicate,
            source: Some(source),
        }
    }

    /// The implicit declaration for a predicate's inline facts.
    pub fn local_facts(predicate: Predicate) -> Self {
        Self {
            predicate,
            source: None,
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    pub fn is_local_facts(&self) -> bool {
        self.source.is_none()
    }

    /// A short identifier derived from the declaration's content.
    ///
    /// Equal declarations get equal ids in every process; the id is the first
    /// eight bytes of a blake3 digest in hex.
    pub fn stable_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let mut field = |bytes: &[u8]| {
            hasher.update(&(bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        };
        field(self.predicate.name().as_bytes());
        field(&(self.predicate.arity() as u64).to_le_bytes());
        match &self.source {
            None => field(b"facts"),
            Some(DataSource::CsvFile { path }) => {
                field(b"csv");
                field(path.as_os_str().as_encoded_bytes());
            }
            Some(DataSource::RdfFile { path }) => {
                field(b"rdf");
                field(path.as_os_str().as_encoded_bytes());
            }
            Some(DataSource::SparqlQuery {
                endpoint,
                variables,
                query,
            }) => {
                field(b"sparql");
                field(endpoint.as_bytes());
                field(variables.as_bytes());
                field(query.as_bytes());
            }
        }
        hasher.finalize().to_hex()[..16].to_string()
    }
}

impl fmt::Display for DataSourceDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "@source {}: {source} .", self.predicate),
            None => write!(f, "@source {}: facts .", self.predicate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Term {
        Term::universal("X")
    }

    #[test]
    fn fact_must_be_ground() {
        let atom = Atom::new("p", vec![x()]).unwrap();
        let err = Fact::new(atom).unwrap_err();
        assert!(matches!(err, ModelError::NonGroundFact { .. }));
    }

    #[test]
    fn fact_display() {
        let fact = Fact::from_constants("p", &["a", "b"]).unwrap();
        assert_eq!(fact.to_string(), "p(a, b) .");
    }

    #[test]
    fn non_ground_fact_rejected_on_deserialize() {
        let json = r#"{"predicate":"p","terms":[{"universal_variable":"X"}]}"#;
        assert!(serde_json::from_str::<Fact>(json).is_err());
    }

    #[test]
    fn rule_head_cannot_be_empty() {
        let body = Literal::Positive(Atom::new("q", vec![x()]).unwrap());
        assert!(matches!(
            Rule::new(vec![], vec![body]).unwrap_err(),
            ModelError::EmptyHead
        ));
    }

    #[test]
    fn rule_collects_variables_and_predicates() {
        let head = Atom::new("p", vec![x(), Term::existential("Z")]).unwrap();
        let head2 = Atom::new("p", vec![x(), x()]).unwrap();
        let body = Atom::new("q", vec![x()]).unwrap();
        let rule = Rule::new(vec![head, head2], vec![body.into()]).unwrap();

        assert_eq!(rule.head_predicates(), vec![&Predicate::new("p", 2)]);
        assert_eq!(rule.universal_variables().len(), 1);
        assert_eq!(rule.existential_variables().len(), 1);
        assert_eq!(rule.to_string(), "p(?X, !Z), p(?X, ?X) :- q(?X) .");
    }

    #[test]
    fn negative_body_literals_are_kept_in_model() {
        let head = Atom::new("p", vec![x()]).unwrap();
        let pos = Atom::new("q", vec![x()]).unwrap();
        let neg = Atom::new("r", vec![x()]).unwrap();
        let rule = Rule::new(vec![head], vec![pos.into(), Literal::negative(neg)]).unwrap();
        assert_eq!(rule.positive_body_literals().count(), 1);
        assert_eq!(rule.negative_body_literals().count(), 1);
    }

    #[test]
    fn local_facts_declarations_are_equal_per_predicate() {
        let p = Predicate::new("p", 1);
        assert_eq!(
            DataSourceDeclaration::local_facts(p.clone()),
            DataSourceDeclaration::local_facts(p)
        );
    }

    #[test]
    fn stable_id_is_deterministic_and_distinguishes_sources() {
        let p = Predicate::new("p", 2);
        let a = DataSourceDeclaration::new(p.clone(), DataSource::csv_file("a.csv"));
        let b = DataSourceDeclaration::new(p, DataSource::csv_file("b.csv"));
        assert_eq!(a.stable_id(), a.clone().stable_id());
        assert_eq!(a.stable_id().len(), 16);
        assert_ne!(a.stable_id(), b.stable_id());
    }

    #[test]
    fn stable_id_separates_fields_that_display_alike() {
        let p = Predicate::new("p", 2);
        // Both display as sparql(<e>, "a", "b", "c").
        let a = DataSourceDeclaration::new(
            p.clone(),
            DataSource::sparql_query("e", "a", "b\", \"c"),
        );
        let b = DataSourceDeclaration::new(p, DataSource::sparql_query("e", "a\", \"b", "c"));
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a.stable_id(), b.stable_id());
    }

    #[cfg(unix)]
    #[test]
    fn stable_id_keeps_non_utf8_paths_apart() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let p = Predicate::new("p", 1);
        let a = DataSourceDeclaration::new(
            p.clone(),
            DataSource::csv_file(OsStr::from_bytes(b"/data/\xff.csv")),
        );
        let b = DataSourceDeclaration::new(
            p,
            DataSource::csv_file(OsStr::from_bytes(b"/data/\xfe.csv")),
        );
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a.stable_id(), b.stable_id());
    }

    #[test]
    fn placeholders_in_query_text_are_kept() {
        let source = DataSource::sparql_query(
            "https://example.org/sparql",
            "x",
            "SELECT ?x WHERE { ?x <urn:{index}> \"{predicate}\" }",
        );
        let config = source.render_config(2, "q-1").unwrap();
        assert!(config.starts_with("EDB2_predname=q-1\nEDB2_type=SPARQL\n"));
        assert!(config.contains(
            "EDB2_param2=SELECT ?x WHERE { ?x <urn:{index}> \"{predicate}\" }\n"
        ));
    }

    #[test]
    fn template_keeps_placeholders_in_keys() {
        let template = DataSource::csv_file("people.csv").config_template().unwrap();
        assert_eq!(
            template,
            "EDB{index}_predname={predicate}\nEDB{index}_type=INMEMORY\n\
             EDB{index}_param0=.\nEDB{index}_param1=people\n\n"
        );
    }

    #[test]
    fn csv_template_splits_directory_and_stem() {
        let source = DataSource::csv_file("/data/people.csv.gz");
        let config = source.render_config(3, "person-2").unwrap();
        assert_eq!(
            config,
            "EDB3_predname=person-2\nEDB3_type=INMEMORY\nEDB3_param0=/data\nEDB3_param1=people\n\n"
        );
    }

    #[test]
    fn wrong_extension_is_a_configuration_error() {
        let err = DataSource::rdf_file("triples.ttl").config_template().unwrap_err();
        assert!(matches!(err, ReasonerError::Configuration { .. }));
    }

    #[test]
    fn sparql_template_lists_parameters() {
        let source = DataSource::sparql_query(
            "https://query.wikidata.org/sparql",
            "a,b",
            "?a wdt:P22 ?b",
        );
        let config = source.render_config(0, "father-2").unwrap();
        assert!(config.contains("EDB0_type=SPARQL"));
        assert!(config.contains("EDB0_param1=a,b"));
        assert!(config.contains("EDB0_param2=?a wdt:P22 ?b"));
    }

    #[test]
    fn statement_serde_tags() {
        let statement = Statement::from(Fact::from_constants("p", &["a"]).unwrap());
        let json = serde_json::to_string(&statement).unwrap();
        assert!(json.starts_with(r#"{"fact":"#));
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, statement);
    }
}
