//! Logical statement model: terms, atoms, literals, facts, rules and data
//! source declarations.
//!
//! All types are immutable values. Construction goes through checked
//! constructors (`Fact::new`, `Rule::new`, ...) so that a value of a model type
//! is always well formed: facts are ground, rule heads are non-empty, names are
//! non-empty.
//!
//! ## Example
//!
//! ```
//! use chaseward::model::{Atom, Literal, Rule, Term};
//!
//! // q(?X) :- p(?X, ?Y) .
//! let head = Atom::new("q", vec![Term::universal("X")]).unwrap();
//! let body = Atom::new("p", vec![Term::universal("X"), Term::universal("Y")]).unwrap();
//! let rule = Rule::new(vec![head], vec![Literal::Positive(body)]).unwrap();
//! assert_eq!(rule.to_string(), "q(?X) :- p(?X, ?Y) .");
//! ```

pub mod atom;
pub mod formula;
pub mod statement;
pub mod term;

pub use atom::{Atom, Literal, PositiveLiteral, Predicate};
pub use formula::{Conjunction, Disjunction};
pub use statement::{DataSource, DataSourceDeclaration, Fact, Rule, Statement};
pub use term::{Term, TermKind};
