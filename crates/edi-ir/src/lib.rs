#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # edi-ir
//!
//! Intermediate Representation for mapped EDI data.
//!
//! A mapping run projects the flat segment stream of an interchange into a
//! tree of labeled nodes (loops, segments, elements, components). The tree is
//! format-neutral: rendering it as XML, JSON or anything else is left to the
//! caller, and the same tree can be fed back to rebuild an EDI document.

/// Core tree node model used for mapped EDI data.
pub mod node;

/// Node primitives for tree structure and value typing.
pub use node::{Node, NodeType, Value};

use thiserror::Error;

/// Errors that can occur when working with the IR
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Node not found at path: {path}")]
    NodeNotFound { path: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },
}

impl Error {
    /// Build a node-not-found error with path context.
    pub fn node_not_found(path: impl Into<String>) -> Self {
        Self::NodeNotFound { path: path.into() }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for IR operations.
pub type Result<T> = std::result::Result<T, Error>;
