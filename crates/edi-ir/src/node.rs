//! Node types for the Intermediate Representation
#![allow(clippy::must_use_candidate)] // Accessors read clearly at call sites without #[must_use].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute key carrying the human-readable meaning of a code value.
pub const DEFINITION_ATTRIBUTE: &str = "definition";

/// A node in the IR tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node name (e.g., loop name, segment id, element id)
    pub name: String,

    /// Node type
    pub node_type: NodeType,

    /// Node value (if applicable)
    pub value: Option<Value>,

    /// Child nodes
    pub children: Vec<Node>,

    /// Node attributes (definition text and other annotations)
    pub attributes: BTreeMap<String, String>,

    /// Type tag the value was coerced with (e.g. `dt`, `n2`)
    pub schema_type: Option<String>,
}

/// Types of nodes in the IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Root of the mapped document
    Root,

    /// Repeatable group of segments and sub-loops
    Loop,

    /// Individual segment
    Segment,

    /// Data element (one node per repetition)
    Element,

    /// Component within a composite element
    Component,
}

/// Values that can be stored in nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// String value
    String(String),

    /// Decimal value (reals and implied-decimal numerics)
    Decimal(f64),

    /// Date value
    Date(String), // ISO 8601 format

    /// Time value
    Time(String), // ISO 8601 format
}

impl Node {
    /// Create a new node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            value: None,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            schema_type: None,
        }
    }

    /// Create a node with a value
    pub fn with_value(name: impl Into<String>, node_type: NodeType, value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::new(name, node_type)
        }
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Set an attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Get an attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set the schema type
    pub fn set_schema_type(&mut self, schema_type: impl Into<String>) -> &mut Self {
        self.schema_type = Some(schema_type.into());
        self
    }

    /// Textual form of the node value
    pub fn text(&self) -> Option<String> {
        self.value.as_ref().map(Value::as_string)
    }

    /// Find a child by name
    pub fn find_child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Find all children by name
    pub fn find_children(&self, name: &str) -> Vec<&Node> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    /// Resolve a slash-separated path of child names below this node.
    ///
    /// Each step may carry a zero-based index selecting among same-named
    /// siblings, e.g. `loop[1]/hl/hl03`. Without an index the first match wins.
    pub fn find_path(&self, path: &str) -> Result<&Node> {
        let mut current = self;
        for step in path.split('/') {
            let (name, index) = parse_step(path, step)?;
            current = current
                .children
                .iter()
                .filter(|c| c.name == name)
                .nth(index)
                .ok_or_else(|| Error::node_not_found(path))?;
        }
        Ok(current)
    }
}

fn parse_step<'a>(path: &str, step: &'a str) -> Result<(&'a str, usize)> {
    if step.is_empty() {
        return Err(Error::invalid_path(path, "empty step"));
    }

    let Some(open) = step.find('[') else {
        return Ok((step, 0));
    };

    let index = step[open + 1..]
        .strip_suffix(']')
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or_else(|| Error::invalid_path(path, format!("bad index in step '{step}'")))?;

    Ok((&step[..open], index))
}

impl Value {
    /// Convert value to string
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) | Value::Date(s) | Value::Time(s) => s.clone(),
            Value::Decimal(d) => d.to_string(),
        }
    }
}
