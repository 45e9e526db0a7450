//! Mapping schema model
//!
//! A schema is a tree of loops and segments. Segments declare elements by
//! position, elements declare components by position, and both carry an
//! optional type, a set of allowed values and a restrict flag. Matching a
//! document segment against a declaration lives here too.

use crate::Diagnostic;
use edi_adapter_x12::{EdiValue, Element, Segment};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Type of a declared value, controlling how its text is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Identifier, kept as text
    Id,
    /// Alphanumeric, kept as text
    An,
    /// Date
    Dt,
    /// Time
    Tm,
    /// Numeric with the given number of implied decimal places
    N(u8),
    /// Real number
    R,
}

impl FromStr for TypeTag {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = match s {
            "id" => Self::Id,
            "an" => Self::An,
            "dt" => Self::Dt,
            "tm" => Self::Tm,
            "r" => Self::R,
            _ => match s.strip_prefix('n').map(str::as_bytes) {
                Some(&[digit]) if digit.is_ascii_digit() => Self::N(digit - b'0'),
                _ => {
                    return Err(Diagnostic::InvalidType {
                        type_tag: s.to_string(),
                    });
                }
            },
        };
        Ok(tag)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => f.write_str("id"),
            Self::An => f.write_str("an"),
            Self::Dt => f.write_str("dt"),
            Self::Tm => f.write_str("tm"),
            Self::N(decimals) => write!(f, "n{decimals}"),
            Self::R => f.write_str("r"),
        }
    }
}

/// Allowed literal values of an element or component, each with an optional
/// definition. Values compare ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueOptions {
    entries: Vec<(String, Option<String>)>,
}

impl ValueOptions {
    /// Add an option; returns `false` if the value is already present
    pub fn insert(&mut self, value: impl Into<String>, definition: Option<String>) -> bool {
        let value = value.into();
        if self.contains(&value) {
            return false;
        }
        self.entries.push((value, definition));
        true
    }

    /// Whether `value` is one of the options
    pub fn contains(&self, value: &str) -> bool {
        self.find(value).is_some()
    }

    /// Definition attached to `value`, if the option exists and has one
    pub fn definition(&self, value: &str) -> Option<&str> {
        self.find(value)?.1.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, value: &str) -> Option<&(String, Option<String>)> {
        self.entries
            .iter()
            .find(|(option, _)| option.eq_ignore_ascii_case(value))
    }
}

/// A declared element or component. `C` is the kind of nested declaration;
/// components cannot nest further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueNode<C> {
    pub id: String,
    pub type_tag: Option<TypeTag>,
    pub restrict: bool,
    pub options: ValueOptions,
    /// Declarations by 1-based position; `None` marks an undeclared position
    pub components: Vec<Option<C>>,
}

/// A declared component
pub type ComponentNode = ValueNode<Infallible>;

/// A declared element
pub type ElementNode = ValueNode<ComponentNode>;

impl<C> ValueNode<C> {
    /// Create an unrestricted, untyped declaration
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: None,
            restrict: false,
            options: ValueOptions::default(),
            components: Vec::new(),
        }
    }

    /// Whether a single value satisfies this declaration's restriction
    pub fn accepts(&self, value: Option<&str>) -> bool {
        !self.restrict || value.is_some_and(|v| self.options.contains(v))
    }

    /// Declaration at a 1-based position
    pub fn component(&self, position: usize) -> Option<&C> {
        self.components.get(position.checked_sub(1)?)?.as_ref()
    }
}

impl ElementNode {
    /// Whether a document element (absent when `None`) satisfies this declaration
    ///
    /// Every repetition must satisfy the element's restriction and each
    /// declared component's restriction. An absent element only matches a
    /// declaration with nothing restricted.
    pub fn matches(&self, element: Option<&Element>) -> bool {
        let Some(element) = element else {
            return !self.restrict && self.components.iter().flatten().all(|c| !c.restrict);
        };

        element.repetitions.iter().all(|repetition| {
            self.accepts(repetition.value())
                && self.components.iter().enumerate().all(|(index, declared)| {
                    declared
                        .as_ref()
                        .is_none_or(|component| component.accepts(repetition.get(index + 1)))
                })
        })
    }
}

/// A declared segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentNode {
    pub id: String,
    /// Declarations by 1-based position; `None` marks an undeclared position
    pub elements: Vec<Option<ElementNode>>,
}

impl SegmentNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elements: Vec::new(),
        }
    }

    /// Declaration at a 1-based position
    pub fn element(&self, position: usize) -> Option<&ElementNode> {
        self.elements.get(position.checked_sub(1)?)?.as_ref()
    }

    /// Whether a document segment has this id (ignoring case) and satisfies
    /// every declared element position
    pub fn matches(&self, segment: &Segment) -> bool {
        self.id.eq_ignore_ascii_case(&segment.id)
            && self.elements.iter().enumerate().all(|(index, declared)| {
                declared
                    .as_ref()
                    .is_none_or(|element| element.matches(segment.element(index + 1)))
            })
    }
}

/// A repeatable group of segments and nested loops
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopNode {
    pub id: String,
    pub children: Vec<SchemaNode>,
}

impl LoopNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            children: Vec::new(),
        }
    }

    /// The segment that starts an iteration of this loop, looking through
    /// leading nested loops
    pub fn first_segment(&self) -> Option<&SegmentNode> {
        match self.children.first()? {
            SchemaNode::Segment(segment) => Some(segment),
            SchemaNode::Loop(nested) => nested.first_segment(),
        }
    }

    /// First child that accepts `segment`; a nested loop accepts it when its
    /// first segment does
    pub fn find_match(&self, segment: &Segment) -> Option<&SchemaNode> {
        self.children.iter().find(|child| match child {
            SchemaNode::Segment(declared) => declared.matches(segment),
            SchemaNode::Loop(nested) => nested
                .first_segment()
                .is_some_and(|declared| declared.matches(segment)),
        })
    }
}

/// A child of a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Loop(LoopNode),
    Segment(SegmentNode),
}

impl SchemaNode {
    pub fn id(&self) -> &str {
        match self {
            Self::Loop(node) => &node.id,
            Self::Segment(node) => &node.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edi_adapter_x12::{Document, Options};

    fn segment(text: &str) -> Segment {
        let options = Options::new()
            .segment_terminator('~')
            .element_separator('*')
            .component_separator('>')
            .repetition_separator('^');
        Document::parse_with(text, options).unwrap().segments.remove(0)
    }

    fn restricted(id: &str, values: &[&str]) -> ElementNode {
        let mut element = ElementNode::new(id);
        element.restrict = true;
        for value in values {
            element.options.insert(*value, None);
        }
        element
    }

    fn hl(option: &str) -> SegmentNode {
        let mut hl = SegmentNode::new("hl");
        hl.elements = vec![None, None, Some(restricted("hl03", &[option]))];
        hl
    }

    #[test]
    fn test_type_tag_round_trip_text() {
        for text in ["id", "an", "dt", "tm", "r", "n0", "n9"] {
            assert_eq!(text.parse::<TypeTag>().unwrap().to_string(), text);
        }
        assert_eq!("n2".parse::<TypeTag>().unwrap(), TypeTag::N(2));
    }

    #[test]
    fn test_type_tag_rejects_unknown() {
        for text in ["", "x", "n", "n10", "nx", "ID", "idx"] {
            assert_eq!(
                text.parse::<TypeTag>(),
                Err(Diagnostic::InvalidType {
                    type_tag: text.to_string()
                })
            );
        }
    }

    #[test]
    fn test_options_ignore_case() {
        let mut options = ValueOptions::default();
        assert!(options.insert("s", Some("ship".into())));
        assert!(!options.insert("S", None));
        assert!(options.contains("S"));
        assert_eq!(options.definition("S"), Some("ship"));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_segment_id_matches_ignoring_case() {
        assert!(SegmentNode::new("st").matches(&segment("ST*997~")));
        assert!(!SegmentNode::new("se").matches(&segment("ST*997~")));
    }

    #[test]
    fn test_restricted_element() {
        assert!(hl("s").matches(&segment("HL***S~")));
        assert!(!hl("o").matches(&segment("HL***S~")));
        assert!(!hl("s").matches(&segment("HL*1~")));
    }

    #[test]
    fn test_restriction_applies_to_every_repetition() {
        let mut n1 = SegmentNode::new("n1");
        n1.elements = vec![Some(restricted("n101", &["a", "b"]))];

        assert!(n1.matches(&segment("N1*A^B~")));
        assert!(!n1.matches(&segment("N1*A^C~")));
    }

    #[test]
    fn test_restricted_component() {
        let mut code = ComponentNode::new("n10102");
        code.restrict = true;
        code.options.insert("x", None);
        let mut element = ElementNode::new("n101");
        element.components = vec![None, Some(code)];
        let mut n1 = SegmentNode::new("n1");
        n1.elements = vec![Some(element)];

        assert!(n1.matches(&segment("N1*A>X~")));
        assert!(!n1.matches(&segment("N1*A>Y~")));
        assert!(!n1.matches(&segment("N1*A~")));
        assert!(!n1.matches(&segment("N1~")));
    }

    #[test]
    fn test_absent_unrestricted_element_matches() {
        let mut n1 = SegmentNode::new("n1");
        n1.elements = vec![None, None, Some(ElementNode::new("n103"))];
        assert!(n1.matches(&segment("N1*A~")));
    }

    #[test]
    fn test_loop_matches_through_leading_loops() {
        let mut inner = LoopNode::new("innerloop");
        inner.children.push(SchemaNode::Segment(hl("s")));
        let mut outer = LoopNode::new("outerloop");
        outer.children.push(SchemaNode::Loop(inner));
        let mut root = LoopNode::new("mapping");
        root.children.push(SchemaNode::Segment(SegmentNode::new("st")));
        root.children.push(SchemaNode::Loop(outer));

        assert_eq!(root.find_match(&segment("HL***S~")).map(SchemaNode::id), Some("outerloop"));
        assert_eq!(root.find_match(&segment("ST~")).map(SchemaNode::id), Some("st"));
        assert!(root.find_match(&segment("HL***O~")).is_none());
        assert!(LoopNode::new("emptyloop").first_segment().is_none());
    }
}
