//! Query answers tagged with their correctness.

use crate::model::Term;

use super::state::{Correctness, MaterialisationState};

/// Answers to a query atom, as tuples of ground terms.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswers {
    answers: Vec<Vec<Term>>,
    materialisation: MaterialisationState,
}

impl QueryAnswers {
    /// Convert raw backend tuples. Every answer term is read as a constant.
    pub(crate) fn from_backend(
        tuples: Vec<Vec<String>>,
        materialisation: MaterialisationState,
    ) -> Self {
        let answers = tuples
            .into_iter()
            .map(|tuple| tuple.into_iter().map(Term::Constant).collect())
            .collect();
        Self {
            answers,
            materialisation,
        }
    }

    pub fn answers(&self) -> &[Vec<Term>] {
        &self.answers
    }

    pub fn materialisation_state(&self) -> MaterialisationState {
        self.materialisation
    }

    pub fn correctness(&self) -> Correctness {
        self.materialisation.correctness()
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl IntoIterator for QueryAnswers {
    type Item = Vec<Term>;
    type IntoIter = std::vec::IntoIter<Vec<Term>>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.into_iter()
    }
}

/// Number of answers to a query with their correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryAnswerCount {
    pub correctness: Correctness,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tuples_become_constants() {
        let answers = QueryAnswers::from_backend(
            vec![vec!["a".into(), "b".into()]],
            MaterialisationState::Complete,
        );
        assert_eq!(
            answers.answers(),
            &[vec![Term::constant("a"), Term::constant("b")]]
        );
        assert_eq!(answers.correctness(), Correctness::SoundAndComplete);
    }
}
