//! Rendering statements in answer-set solver syntax.
//!
//! ```text
//! p(a, b) .
//! q(X) :- p(X, Y) .
//! r(X, f3(X)) | s(X) :- q(X) .
//! ```
//!
//! Existential variables are skolemized per statement: the first occurrence
//! of `!Z` in a term list becomes `f<line>(<first universal variable of that
//! list>)` and every later occurrence in the same statement reuses it. Lines
//! are numbered from 1. Negative body literals are dropped and data source
//! declarations render as an empty line.

use std::collections::HashMap;

use crate::model::{Atom, Conjunction, Disjunction, Fact, Literal, Rule, Statement, Term};

const LINE_SUFFIX: &str = " .";
const RULE_SEPARATOR: &str = " :- ";
const TERM_SEPARATOR: &str = ", ";
const DISJUNCT_SEPARATOR: &str = " | ";

/// Replace every character that is not an ASCII letter or digit with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Skolem terms generated so far for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkolemContext {
    line: usize,
    memo: HashMap<String, String>,
}

impl SkolemContext {
    /// Context for the statement at zero-based position `index`.
    pub fn for_statement(index: usize) -> Self {
        Self {
            line: index + 1,
            memo: HashMap::new(),
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    /// The Skolem term standing in for `variable` within `terms`.
    fn skolemize(&mut self, variable: &str, terms: &[Term]) -> String {
        if let Some(term) = self.memo.get(variable) {
            return term.clone();
        }
        let function = format!("f{}", self.line);
        let term = match terms
            .iter()
            .find(|t| matches!(t, Term::UniversalVariable(_)))
        {
            Some(universal) => format!("{function}({})", sanitize(&universal.name())),
            None => {
                tracing::debug!(
                    variable,
                    line = self.line,
                    "no universal variable to skolemize over, using a constant"
                );
                function
            }
        };
        self.memo.insert(variable.to_string(), term.clone());
        term
    }
}

/// Renders one statement at a time in a solver's input syntax.
pub trait StatementTransformer: Sync {
    /// Render the statement at zero-based position `index`. The result never
    /// ends with a newline.
    fn transform(&self, statement: &Statement, index: usize) -> String {
        let mut ctx = SkolemContext::for_statement(index);
        match statement {
            Statement::Fact(fact) => self.fact(fact, &mut ctx),
            Statement::Rule(rule) => self.rule(rule, &mut ctx),
            Statement::DataSource(_) => String::new(),
        }
    }

    fn fact(&self, fact: &Fact, ctx: &mut SkolemContext) -> String {
        format!("{}{LINE_SUFFIX}", render_atom(fact.atom(), ctx))
    }

    fn rule(&self, rule: &Rule, ctx: &mut SkolemContext) -> String {
        let head = render_head(rule.head(), ctx);
        let body = render_body(rule.body(), ctx);
        format!("{head}{RULE_SEPARATOR}{body}{LINE_SUFFIX}")
    }
}

/// Input syntax of clingo.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClingoTransformer;

impl StatementTransformer for ClingoTransformer {}

/// Input syntax of DLV, which takes one head atom per rule.
///
/// A rule whose head is a single conjunction is split into one rule per head
/// atom, all sharing the body. Disjunctive heads render as for clingo.
#[derive(Debug, Clone, Copy, Default)]
pub struct DlvTransformer;

impl StatementTransformer for DlvTransformer {
    fn rule(&self, rule: &Rule, ctx: &mut SkolemContext) -> String {
        let [conjunction] = rule.head().disjuncts() else {
            return ClingoTransformer.rule(rule, ctx);
        };
        conjunction
            .iter()
            .map(|atom| {
                let head = render_atom(atom, ctx);
                let body = render_body(rule.body(), ctx);
                format!("{head}{RULE_SEPARATOR}{body}{LINE_SUFFIX}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_terms(terms: &[Term], ctx: &mut SkolemContext) -> String {
    let rendered: Vec<String> = terms
        .iter()
        .map(|term| match term {
            Term::ExistentialVariable(name) => ctx.skolemize(name, terms),
            other => sanitize(&other.name()),
        })
        .collect();
    format!("({})", rendered.join(TERM_SEPARATOR))
}

fn render_atom(atom: &Atom, ctx: &mut SkolemContext) -> String {
    let predicate = sanitize(atom.predicate().name());
    format!("{predicate}{}", render_terms(atom.terms(), ctx))
}

fn render_atoms<'a>(atoms: impl Iterator<Item = &'a Atom>, ctx: &mut SkolemContext) -> String {
    atoms
        .map(|atom| render_atom(atom, ctx))
        .collect::<Vec<_>>()
        .join(TERM_SEPARATOR)
}

fn render_head(head: &Disjunction<Conjunction<Atom>>, ctx: &mut SkolemContext) -> String {
    head.disjuncts()
        .iter()
        .map(|conjunction| render_atoms(conjunction.iter(), ctx))
        .collect::<Vec<_>>()
        .join(DISJUNCT_SEPARATOR)
}

fn render_body(body: &Disjunction<Conjunction<Literal>>, ctx: &mut SkolemContext) -> String {
    body.disjuncts()
        .iter()
        .map(|conjunction| render_atoms(conjunction.iter().filter_map(Literal::as_positive), ctx))
        .collect::<Vec<_>>()
        .join(DISJUNCT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataSource, DataSourceDeclaration, Predicate};

    fn atom(name: &str, terms: Vec<Term>) -> Atom {
        Atom::new(name, terms).unwrap()
    }

    fn x() -> Term {
        Term::universal("X")
    }

    fn z() -> Term {
        Term::existential("Z")
    }

    #[test]
    fn fact_rendering() {
        let fact: Statement = Fact::from_constants("p", &["a", "b"]).unwrap().into();
        assert_eq!(ClingoTransformer.transform(&fact, 0), "p(a, b) .");
    }

    #[test]
    fn rule_rendering() {
        let rule: Statement = Rule::new(
            vec![atom("q", vec![x()])],
            vec![atom("p", vec![x(), Term::universal("Y")]).into()],
        )
        .unwrap()
        .into();
        assert_eq!(ClingoTransformer.transform(&rule, 0), "q(X) :- p(X, Y) .");
    }

    #[test]
    fn existential_is_skolemized_with_line_number() {
        let rule: Statement = Rule::new(
            vec![atom("p", vec![x(), z()]), atom("r", vec![z(), x()])],
            vec![atom("q", vec![x()]).into()],
        )
        .unwrap()
        .into();
        assert_eq!(
            ClingoTransformer.transform(&rule, 3),
            "p(X, f4(X)), r(f4(X), X) :- q(X) ."
        );
    }

    #[test]
    fn skolem_terms_are_statement_scoped() {
        let rule: Statement = Rule::new(
            vec![atom("p", vec![x(), z()])],
            vec![atom("q", vec![x()]).into()],
        )
        .unwrap()
        .into();
        assert_eq!(
            ClingoTransformer.transform(&rule, 0),
            "p(X, f1(X)) :- q(X) ."
        );
        assert_eq!(
            ClingoTransformer.transform(&rule, 1),
            "p(X, f2(X)) :- q(X) ."
        );
    }

    #[test]
    fn existential_without_universal_becomes_constant() {
        let rule: Statement = Rule::new(
            vec![atom("p", vec![z()]), atom("s", vec![x(), z()])],
            vec![atom("q", vec![x()]).into()],
        )
        .unwrap()
        .into();
        assert_eq!(
            ClingoTransformer.transform(&rule, 6),
            "p(f7), s(X, f7) :- q(X) ."
        );
    }

    #[test]
    fn negative_body_literals_are_dropped() {
        let rule: Statement = Rule::new(
            vec![atom("q", vec![x()])],
            vec![
                atom("p", vec![x()]).into(),
                Literal::negative(atom("r", vec![x()])),
            ],
        )
        .unwrap()
        .into();
        assert_eq!(ClingoTransformer.transform(&rule, 0), "q(X) :- p(X) .");
    }

    #[test]
    fn disjunctive_head() {
        let rule: Statement = Rule::disjunctive(
            vec![vec![atom("a", vec![x()])], vec![atom("b", vec![x()])]],
            vec![vec![atom("c", vec![x()]).into()]],
        )
        .unwrap()
        .into();
        assert_eq!(ClingoTransformer.transform(&rule, 0), "a(X) | b(X) :- c(X) .");
        assert_eq!(DlvTransformer.transform(&rule, 0), "a(X) | b(X) :- c(X) .");
    }

    #[test]
    fn dlv_splits_conjunctive_head() {
        let rule: Statement = Rule::new(
            vec![atom("p", vec![x(), z()]), atom("r", vec![z()])],
            vec![atom("q", vec![x()]).into()],
        )
        .unwrap()
        .into();
        assert_eq!(
            DlvTransformer.transform(&rule, 2),
            "p(X, f3(X)) :- q(X) .\nr(f3(X)) :- q(X) ."
        );
    }

    #[test]
    fn data_source_renders_empty() {
        let decl: Statement =
            DataSourceDeclaration::new(Predicate::new("p", 1), DataSource::csv_file("p.csv"))
                .into();
        assert_eq!(ClingoTransformer.transform(&decl, 0), "");
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(sanitize("http://ex.org/p#1"), "http___ex_org_p_1");
        let fact: Statement = Fact::new(atom("http://ex.org/p#1", vec![Term::constant("a-b")]))
            .unwrap()
            .into();
        assert_eq!(
            ClingoTransformer.transform(&fact, 0),
            "http___ex_org_p_1(a_b) ."
        );
    }
}
