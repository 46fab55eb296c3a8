//! Solver rendering and subprocess runs through the public API.

use chaseward::config::{ChasewardConfig, SolverConfig};
use chaseward::knowledge_base::KnowledgeBase;
use chaseward::model::{Atom, DataSource, DataSourceDeclaration, Fact, Literal, Predicate, Rule, Term};
use chaseward::solver::{SolverKind, StatementTransformer, render_program, run_solver};

fn kb() -> KnowledgeBase {
    let x = || Term::universal("X");
    let mut kb = KnowledgeBase::new();
    kb.add_statement(Fact::from_constants("http://ex.org/edge", &["a", "b"]).unwrap());
    kb.add_statement(DataSourceDeclaration::new(
        Predicate::new("node", 1),
        DataSource::sparql_query("https://query.wikidata.org/sparql", "x", "?x a ?y"),
    ));
    kb.add_statement(
        Rule::new(
            vec![
                Atom::new("labelled", vec![x(), Term::existential("L")]).unwrap(),
                Atom::new("label", vec![Term::existential("L")]).unwrap(),
            ],
            vec![
                Atom::new("http://ex.org/edge", vec![x(), Term::universal("Y")])
                    .unwrap()
                    .into(),
                Literal::negative(Atom::new("hidden", vec![x()]).unwrap()),
            ],
        )
        .unwrap(),
    );
    kb
}

#[test]
fn clingo_and_dlv_programs() {
    let kb = kb();
    assert_eq!(
        render_program(SolverKind::Clingo, &kb),
        "http___ex_org_edge(a, b) .\n\
         \n\
         labelled(X, f3(X)), label(f3(X)) :- http___ex_org_edge(X, Y) .\n"
    );
    assert_eq!(
        render_program(SolverKind::Dlv, &kb),
        "http___ex_org_edge(a, b) .\n\
         \n\
         labelled(X, f3(X)) :- http___ex_org_edge(X, Y) .\n\
         label(f3(X)) :- http___ex_org_edge(X, Y) .\n"
    );
}

#[test]
fn transformers_are_selected_by_kind() {
    let kb = kb();
    let rule = &kb.statements()[2];
    let clingo = SolverKind::Clingo.transformer().transform(rule, 2);
    let dlv = SolverKind::Dlv.transformer().transform(rule, 2);
    assert_eq!(clingo.lines().count(), 1);
    assert_eq!(dlv.lines().count(), 2);
}

#[test]
fn default_solver_commands() {
    let config = ChasewardConfig::default();
    assert_eq!(
        config.solver(SolverKind::Clingo).command_line(),
        "clingo --configuration=tweety --time-limit=30 --quiet=2,2,2"
    );
    assert_eq!(config.solver(SolverKind::Dlv).command_line(), "dlv --stdin");
}

#[cfg(unix)]
#[test]
fn solver_stand_in_sees_the_rendered_program() {
    // Counts non-empty input lines and reports on stdout; chatter goes to stderr.
    let config = SolverConfig {
        binary: "/bin/sh".into(),
        args: vec![
            "-c".into(),
            "echo 'reading program' >&2; n=$(grep -c '.'); echo \"lines: $n\"".into(),
        ],
        timeout_seconds: Some(10),
        separate_diagnostics: true,
    };
    let run = run_solver(SolverKind::Dlv, &config, &kb()).unwrap();
    assert!(!run.timed_out);
    assert_eq!(run.output, vec!["lines: 3".to_string()]);
}
