//! # edi-adapter-x12
//!
//! X12/EDIFACT delimited text parser/serializer and envelope handling.
//!
//! This crate turns interchange text into a [`Document`] tree of segments,
//! elements, repetitions and components, writes that tree back to the exact
//! text it came from, and groups segments into transaction sets. Separators
//! are inferred from the text when not supplied and follow envelope
//! redefinitions (`ISA`, `UNA`) as the stream progresses.

pub mod document;
pub mod envelopes;
pub mod parser;
pub mod serializer;
pub mod syntax;
pub mod tree;
pub mod value;

pub use document::{Component, Document, Element, Repetition, Segment};
pub use envelopes::{TransactionSet, transaction_sets};
pub use parser::DocumentParser;
pub use serializer::DocumentSerializer;
pub use syntax::{Options, Separators};
pub use value::EdiValue;

use thiserror::Error;

/// Errors that can occur when parsing/serializing EDI text
#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not infer the {0}")]
    Inference(&'static str),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("'{value}' contains the {separator}")]
    SeparatorCollision {
        value: String,
        separator: &'static str,
    },

    #[error("'{value}' is not a valid {kind}")]
    InvalidValue { value: String, kind: &'static str },

    #[error("A {kind} of length {length} is not supported")]
    UnsupportedLength { kind: &'static str, length: usize },

    #[error("Invalid options: {0}")]
    Options(#[from] serde_yaml::Error),
}

impl Error {
    /// Build an invalid-value error for text that failed coercion.
    pub fn invalid_value(value: impl Into<String>, kind: &'static str) -> Self {
        Self::InvalidValue {
            value: value.into(),
            kind,
        }
    }

    /// Whether this error is a format error: a value colliding with an
    /// active separator or text that cannot be read as the requested type.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::SeparatorCollision { .. }
                | Self::InvalidValue { .. }
                | Self::UnsupportedLength { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
