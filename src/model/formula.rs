//! Conjunctions and disjunctions of literals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An ordered, non-empty conjunction of literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conjunction<T> {
    literals: Vec<T>,
}

impl<T> Conjunction<T> {
    pub fn new(literals: Vec<T>) -> Self {
        Self { literals }
    }

    pub fn literals(&self) -> &[T] {
        &self.literals
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.literals.iter()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a Conjunction<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.literals.iter()
    }
}

impl<T: fmt::Display> fmt::Display for Conjunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, literal) in self.literals.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{literal}")?;
        }
        Ok(())
    }
}

/// An ordered disjunction of conjunctions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Disjunction<C> {
    disjuncts: Vec<C>,
}

impl<C> Disjunction<C> {
    pub fn new(disjuncts: Vec<C>) -> Self {
        Self { disjuncts }
    }

    /// A disjunction with exactly one disjunct.
    pub fn single(disjunct: C) -> Self {
        Self {
            disjuncts: vec![disjunct],
        }
    }

    pub fn disjuncts(&self) -> &[C] {
        &self.disjuncts
    }

    pub fn len(&self) -> usize {
        self.disjuncts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disjuncts.is_empty()
    }
}

impl<T> Disjunction<Conjunction<T>> {
    /// Every literal of every disjunct, in order.
    pub fn literals(&self) -> impl Iterator<Item = &T> {
        self.disjuncts.iter().flat_map(|c| c.iter())
    }
}

impl<C: fmt::Display> fmt::Display for Disjunction<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, disjunct) in self.disjuncts.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{disjunct}")?;
        }
        Ok(())
    }
}
