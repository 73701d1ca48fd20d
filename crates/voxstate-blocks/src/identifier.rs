//! Namespaced block names (`namespace:path`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Namespace used when a name is written without one (`"stone"` → `core:stone`).
pub const DEFAULT_NAMESPACE: &str = "core";

/// Errors produced when parsing an [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The namespace part is empty.
    #[error("identifier {0:?} has an empty namespace")]
    EmptyNamespace(String),
    /// The path part is empty.
    #[error("identifier {0:?} has an empty path")]
    EmptyPath(String),
    /// A character outside the allowed set was found.
    #[error("identifier {input:?} contains invalid character {ch:?}")]
    InvalidCharacter {
        /// The full input string.
        input: String,
        /// The offending character.
        ch: char,
    },
}

/// A namespaced name such as `core:stone`, used as the registry lookup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    namespace: String,
    path: String,
}

impl Identifier {
    /// Builds an identifier from its two parts, validating both.
    pub fn new(namespace: &str, path: &str) -> Result<Self, IdentifierError> {
        let display = format!("{namespace}:{path}");
        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace(display));
        }
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath(display));
        }
        if let Some(ch) = namespace.chars().find(|&c| !is_namespace_char(c)) {
            return Err(IdentifierError::InvalidCharacter { input: display, ch });
        }
        if let Some(ch) = path.chars().find(|&c| !is_path_char(c)) {
            return Err(IdentifierError::InvalidCharacter { input: display, ch });
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Returns the namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the path part.
    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.')
}

fn is_path_char(c: char) -> bool {
    is_namespace_char(c) || c == '/'
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, s),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}
