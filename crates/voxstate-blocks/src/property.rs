//! Block properties: the independent axes along which a block's states vary.
//!
//! A property has a finite, ordered value domain. The position of a value in
//! that domain (its *index*) is the digit used by the registry's mixed-radix
//! state ID encoding, so `index_of(value(i)) == Some(i)` must hold for every
//! valid index.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A concrete value of a [`BlockProperty`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Value of a [`PropertyKind::Boolean`] property.
    Bool(bool),
    /// Value of a [`PropertyKind::Integer`] property.
    Int(i32),
    /// Value of a [`PropertyKind::Enumeration`] property.
    Enum(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Enum(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Enum(value.to_string())
    }
}

/// Errors produced when a string cannot be parsed as a property value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyParseError {
    /// Boolean properties only accept `true` and `false`.
    #[error("property {property:?}: {input:?} is not a boolean")]
    NotABoolean {
        /// Name of the property being parsed.
        property: String,
        /// The rejected input.
        input: String,
    },
    /// The input is not an integer at all.
    #[error("property {property:?}: {input:?} is not an integer")]
    NotAnInteger {
        /// Name of the property being parsed.
        property: String,
        /// The rejected input.
        input: String,
    },
    /// The integer lies outside the property's `min..=max` range.
    #[error("property {property:?}: {value} is outside {min}..={max}")]
    OutOfRange {
        /// Name of the property being parsed.
        property: String,
        /// The parsed value.
        value: i32,
        /// Inclusive lower bound.
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },
    /// The name is not one of the enumeration's values.
    #[error("property {property:?}: unknown value {input:?}")]
    UnknownVariant {
        /// Name of the property being parsed.
        property: String,
        /// The rejected input.
        input: String,
    },
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// The value domain of a property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    /// `false, true`.
    Boolean,
    /// Every integer in `min..=max`.
    Integer {
        /// Inclusive lower bound (index 0).
        min: i32,
        /// Inclusive upper bound.
        max: i32,
    },
    /// A fixed, ordered list of names.
    Enumeration(Vec<String>),
}

/// One named axis of variation of a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProperty {
    name: String,
    kind: PropertyKind,
}

impl BlockProperty {
    /// Creates a property with the given name and domain.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// A `false, true` property.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Boolean)
    }

    /// An integer property covering `min..=max`.
    pub fn integer(name: impl Into<String>, min: i32, max: i32) -> Self {
        Self::new(name, PropertyKind::Integer { min, max })
    }

    /// An enumeration property over the given names, in order.
    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            PropertyKind::Enumeration(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Returns the property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value domain.
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Returns the number of distinct values (0 for a malformed domain).
    pub fn value_count(&self) -> usize {
        match &self.kind {
            PropertyKind::Boolean => 2,
            PropertyKind::Integer { min, max } => {
                if min > max {
                    0
                } else {
                    (i64::from(*max) - i64::from(*min) + 1) as usize
                }
            }
            PropertyKind::Enumeration(values) => values.len(),
        }
    }

    /// Returns `true` if the domain is non-empty and (for enumerations) free of duplicates.
    pub fn is_valid(&self) -> bool {
        if self.value_count() == 0 {
            return false;
        }
        match &self.kind {
            PropertyKind::Enumeration(values) => values
                .iter()
                .enumerate()
                .all(|(i, v)| !values[..i].contains(v)),
            _ => true,
        }
    }

    /// Returns the value at `index`, or `None` past the end of the domain.
    pub fn value(&self, index: usize) -> Option<PropertyValue> {
        if index >= self.value_count() {
            return None;
        }
        Some(match &self.kind {
            PropertyKind::Boolean => PropertyValue::Bool(index == 1),
            PropertyKind::Integer { min, .. } => {
                PropertyValue::Int((i64::from(*min) + index as i64) as i32)
            }
            PropertyKind::Enumeration(values) => PropertyValue::Enum(values[index].clone()),
        })
    }

    /// Returns the index of `value`, or `None` if it is not part of the domain.
    pub fn index_of(&self, value: &PropertyValue) -> Option<usize> {
        match (&self.kind, value) {
            (PropertyKind::Boolean, PropertyValue::Bool(v)) => Some(usize::from(*v)),
            (PropertyKind::Integer { min, max }, PropertyValue::Int(v)) => {
                (min..=max).contains(&v).then(|| (i64::from(*v) - i64::from(*min)) as usize)
            }
            (PropertyKind::Enumeration(values), PropertyValue::Enum(v)) => {
                values.iter().position(|candidate| candidate == v)
            }
            _ => None,
        }
    }

    /// Parses the textual form of a value (`true`, `3`, `north`).
    pub fn parse(&self, input: &str) -> Result<PropertyValue, PropertyParseError> {
        match &self.kind {
            PropertyKind::Boolean => match input {
                "true" => Ok(PropertyValue::Bool(true)),
                "false" => Ok(PropertyValue::Bool(false)),
                _ => Err(PropertyParseError::NotABoolean {
                    property: self.name.clone(),
                    input: input.to_string(),
                }),
            },
            PropertyKind::Integer { min, max } => {
                let value: i32 =
                    input
                        .parse()
                        .map_err(|_| PropertyParseError::NotAnInteger {
                            property: self.name.clone(),
                            input: input.to_string(),
                        })?;
                if (*min..=*max).contains(&value) {
                    Ok(PropertyValue::Int(value))
                } else {
                    Err(PropertyParseError::OutOfRange {
                        property: self.name.clone(),
                        value,
                        min: *min,
                        max: *max,
                    })
                }
            }
            PropertyKind::Enumeration(values) => {
                if values.iter().any(|v| v == input) {
                    Ok(PropertyValue::Enum(input.to_string()))
                } else {
                    Err(PropertyParseError::UnknownVariant {
                        property: self.name.clone(),
                        input: input.to_string(),
                    })
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
