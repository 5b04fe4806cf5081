//! Core error types.

use std::fmt;

use thiserror::Error;

use crate::attribute::Attribute;
use crate::value::Value;

/// Errors raised while building definitions or working with entities.
#[derive(Debug, Error)]
pub enum Error {
    /// A definition or value was constructed with invalid arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A builder method is not applicable in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A derived value provider failed.
    #[error("value provider error: {0}")]
    Provider(String),

    /// A value could not be converted to or from its column representation.
    #[error("codec error: {0}")]
    Codec(String),

    /// A key generation query returned no rows.
    #[error("no data: {0}")]
    NoData(String),

    /// A collaborator returned malformed data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this is the "query returned no rows" error.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::NoData(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A value rejected by attribute validation.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// The attribute being validated.
    pub attribute: Attribute,
    /// The rejected value.
    pub value: Value,
    /// What kind of check failed.
    pub kind: ValidationKind,
    /// Human readable message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(
        attribute: Attribute,
        value: Value,
        kind: ValidationKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            attribute,
            value,
            kind,
            message: message.into(),
        }
    }
}

/// The check a [`ValidationError`] originates from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationKind {
    /// A non-nullable attribute has no value.
    NullValue,
    /// A numeric value is outside the allowed range.
    Range {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    /// A string value exceeds the maximum length.
    Length { maximum: usize },
    /// A value is not one of the allowed items.
    Item,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationKind::NullValue => write!(f, "null value"),
            ValidationKind::Range { .. } => write!(f, "range"),
            ValidationKind::Length { .. } => write!(f, "length"),
            ValidationKind::Item => write!(f, "item"),
        }
    }
}
