//! Terms: constants, universal and existential variables, language-tagged
//! strings.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A term occurring as an argument of an atom.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// A named individual, e.g. `alice` or an IRI.
    Constant(String),
    /// A universally quantified variable (`?X` in rule syntax).
    UniversalVariable(String),
    /// An existentially quantified variable (`!Z` in rule syntax).
    ExistentialVariable(String),
    /// A string literal with a language tag, e.g. `"chat"@fr`.
    LanguageString { value: String, lang: String },
}

/// The kind of a [`Term`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Constant,
    UniversalVariable,
    ExistentialVariable,
    LanguageString,
}

impl Term {
    pub fn constant(name: impl Into<String>) -> Self {
        Term::Constant(name.into())
    }

    pub fn universal(name: impl Into<String>) -> Self {
        Term::UniversalVariable(name.into())
    }

    pub fn existential(name: impl Into<String>) -> Self {
        Term::ExistentialVariable(name.into())
    }

    /// Create a language-tagged string. The tag must not be blank.
    pub fn language_string(value: impl Into<String>, lang: impl Into<String>) -> ModelResult<Self> {
        let value = value.into();
        let lang = lang.into();
        if lang.trim().is_empty() {
            return Err(ModelError::BlankLanguageTag { value });
        }
        Ok(Term::LanguageString { value, lang })
    }

    pub fn kind(&self) -> TermKind {
        match self {
            Term::Constant(_) => TermKind::Constant,
            Term::UniversalVariable(_) => TermKind::UniversalVariable,
            Term::ExistentialVariable(_) => TermKind::ExistentialVariable,
            Term::LanguageString { .. } => TermKind::LanguageString,
        }
    }

    /// The name of the term as used in serializations.
    ///
    /// Language strings render as `"value"@lang` with `\` and `"` escaped.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Term::Constant(name) | Term::UniversalVariable(name) | Term::ExistentialVariable(name) => {
                Cow::Borrowed(name)
            }
            Term::LanguageString { value, lang } => Cow::Owned(format!(
                "\"{}\"@{lang}",
                value.replace('\\', "\\\\").replace('"', "\\\"")
            )),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Term::UniversalVariable(_) | Term::ExistentialVariable(_))
    }

    /// Constants and language strings are ground.
    pub fn is_ground(&self) -> bool {
        !self.is_variable()
    }

    pub(crate) fn has_empty_name(&self) -> bool {
        match self {
            Term::Constant(name) | Term::UniversalVariable(name) | Term::ExistentialVariable(name) => {
                name.is_empty()
            }
            Term::LanguageString { .. } => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::UniversalVariable(name) => write!(f, "?{name}"),
            Term::ExistentialVariable(name) => write!(f, "!{name}"),
            _ => f.write_str(&self.name()),
        }
    }
}
