//! # edi-mapping
//!
//! Schema-driven projection of EDI segments into a labeled output tree.
//!
//! A mapping schema describes loops, segments, elements and components as a
//! nested XML document. [`Mapping::map`] walks a flat segment sequence
//! against that schema, inferring where each loop iteration ends, and
//! renders an [`edi_ir::Node`] tree with typed values. Problems with the
//! schema or the data never abort a run; they are collected as
//! [`Diagnostic`]s.

pub mod loader;
pub mod runtime;
pub mod schema;

pub use runtime::{Mapping, MappingOutput};
pub use schema::{ComponentNode, ElementNode, LoopNode, SchemaNode, SegmentNode, TypeTag};

use thiserror::Error;

/// Errors that prevent a mapping schema from being read at all
#[derive(Error, Debug)]
pub enum Error {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Schema error: {0}")]
    Schema(String),
}

/// Non-fatal problems found while loading a schema or mapping a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("'{value}' is not a valid value of type '{type_tag}'")]
    InvalidValue { value: String, type_tag: TypeTag },

    #[error("'{id}' occupies a position already taken by '{existing}'")]
    DuplicatePosition { id: String, existing: String },

    #[error("'{id}' does not have a valid position")]
    InvalidPosition { id: String },

    #[error("'{type_tag}' is not a valid type")]
    InvalidType { type_tag: String },

    #[error("Option '{value}' is already defined in '{id}'")]
    DuplicateOption { id: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
