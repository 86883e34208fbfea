//! Error types for the value layer.

use thiserror::Error;

use crate::ElementKind;

/// A value could not be converted to or from the engine's representation.
///
/// Every variant that concerns a bound value carries the variable name so
/// that callers can tell which argument was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// The element kind has no engine equivalent.
    #[error("cannot marshal `{name}`: element kind {kind} has no engine equivalent")]
    UnsupportedKind { name: String, kind: ElementKind },

    /// Zero-size arrays and empty sequences are not supported.
    #[error("cannot marshal `{name}`: empty arrays are not supported")]
    EmptyArray { name: String },

    /// Multi-dimensional string data cannot be stored in the container.
    #[error("cannot marshal `{name}`: nested string lists are not supported")]
    NestedText { name: String },

    /// A sequence mixes text with nested sequences.
    #[error("cannot marshal `{name}`: sequence mixes text with nested sequences")]
    MixedText { name: String },

    /// An array's shape disagrees with its element count.
    #[error("array shape {shape:?} does not match {len} elements")]
    ShapeMismatch { shape: Vec<usize>, len: usize },

    /// A sequence item cannot be represented in the promoted class.
    #[error("cannot marshal `{name}`: {value} does not fit in {class}")]
    OutOfRange {
        name: String,
        value: String,
        class: String,
    },

    /// A struct key is not usable as an engine field name.
    #[error("cannot marshal `{name}`: `{field}` is not a valid struct field name")]
    InvalidFieldName { name: String, field: String },

    /// The engine returned a value the host model cannot hold.
    #[error("cannot unmarshal `{name}`: {what} values are not supported")]
    UnsupportedRecord { name: String, what: String },

    /// Engine char data was not valid UTF-16.
    #[error("cannot unmarshal `{name}`: char data is not valid UTF-16")]
    InvalidText { name: String },
}

/// Failed attribute access on a [`StructValue`](crate::StructValue).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// The key is not present (terminal read, or a reserved key).
    #[error("struct has no attribute `{key}`")]
    Missing { key: String },

    /// An intermediate key holds something other than a struct.
    #[error("attribute `{key}` holds a {found} value, not a struct")]
    NotAStruct { key: String, found: &'static str },
}

impl AttributeError {
    pub fn missing(key: impl Into<String>) -> Self {
        AttributeError::Missing { key: key.into() }
    }
}
