//! Mapping runtime
//!
//! Walks a flat segment sequence against a [`LoopNode`] schema and renders
//! the labeled output tree.
//!
//! The data carries no loop-end markers, so the runtime infers them. Each
//! loop iteration keeps a set of segment ids that are closed: once the id
//! being read changes, the previous id cannot reappear in the same iteration,
//! and seeing it again ends the iteration. A segment no child of the current
//! loop accepts also ends the iteration when an enclosing loop could still
//! take it.

use crate::loader::{SchemaLoader, parse_xml};
use crate::schema::{ComponentNode, ElementNode, LoopNode, SchemaNode, SegmentNode, TypeTag, ValueOptions};
use crate::{Diagnostic, Result};
use edi_adapter_x12::{Component, EdiValue, Element, Repetition, Segment};
use edi_ir::node::DEFINITION_ATTRIBUTE;
use edi_ir::{Node, NodeType, Value};
use std::collections::HashSet;
use tracing::{debug, trace};

/// A loaded mapping schema
#[derive(Debug, Clone)]
pub struct Mapping {
    root: LoopNode,
    diagnostics: Vec<Diagnostic>,
}

/// Result of one mapping run
#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutput {
    /// Root node, named after the schema's root element
    pub tree: Node,
    /// Problems found in the data, in the order they were met
    pub diagnostics: Vec<Diagnostic>,
}

impl Mapping {
    /// Read a mapping schema from XML text
    ///
    /// Malformed XML is an error. Problems in the schema itself are kept as
    /// [`Mapping::diagnostics`] and the offending declarations are skipped.
    pub fn parse(xml: &str) -> Result<Self> {
        let root = parse_xml(xml)?;
        let (root, diagnostics) = SchemaLoader::new().load(&root);
        Ok(Self { root, diagnostics })
    }

    /// Use an already built schema
    pub fn from_root(root: LoopNode) -> Self {
        Self {
            root,
            diagnostics: Vec::new(),
        }
    }

    /// The schema root loop
    pub fn root(&self) -> &LoopNode {
        &self.root
    }

    /// Problems found while loading the schema
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Map a segment sequence into an output tree
    pub fn map(&self, segments: &[Segment]) -> MappingOutput {
        let mut state = MapState::new(&self.root, segments);
        let mut tree = state.map_loop(&self.root);
        tree.node_type = NodeType::Root;

        debug!(
            segments = segments.len(),
            consumed = state.cursor,
            diagnostics = state.diagnostics.len(),
            "Mapped segments"
        );
        MappingOutput {
            tree,
            diagnostics: state.diagnostics,
        }
    }
}

/// Per-iteration bookkeeping for one loop on the stack
struct Frame<'m> {
    schema: &'m LoopNode,
    closed: HashSet<String>,
}

/// Cursor and loop stack for one mapping run
struct MapState<'m, 'd> {
    root: &'m LoopNode,
    segments: &'d [Segment],
    cursor: usize,
    frames: Vec<Frame<'m>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'m, 'd> MapState<'m, 'd> {
    fn new(root: &'m LoopNode, segments: &'d [Segment]) -> Self {
        Self {
            root,
            segments,
            cursor: 0,
            frames: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn map_loop(&mut self, schema: &'m LoopNode) -> Node {
        let mut output = Node::new(&schema.id, NodeType::Loop);
        let is_root = std::ptr::eq(schema, self.root);
        let segments = self.segments;
        let mut previous: Option<&'d str> = None;
        let mut first: Option<&'d str> = None;
        self.frames.push(Frame {
            schema,
            closed: HashSet::new(),
        });
        debug!(id = %schema.id, depth = self.frames.len(), "Entering loop");

        while let Some(segment) = segments.get(self.cursor) {
            if self.current_frame().is_some_and(|f| f.closed.contains(&segment.id)) {
                trace!(id = %segment.id, "Segment id repeats, ending loop iteration");
                break;
            }

            match schema.find_match(segment) {
                Some(SchemaNode::Loop(nested)) => {
                    let child = self.map_loop(nested);
                    output.add_child(child);
                }
                Some(SchemaNode::Segment(declared)) => {
                    output.add_child(self.map_segment(segment, Some(declared)));
                    self.cursor += 1;
                }
                None => {
                    if self.owned_by_open_loop(segment) {
                        trace!(id = %segment.id, "Segment belongs to an enclosing loop");
                        break;
                    }
                    output.add_child(self.map_segment(segment, None));
                    self.cursor += 1;
                }
            }

            // The first id seen at the root stays open so the top level can
            // repeat across envelopes
            let id = segment.id.as_str();
            let closing = match previous {
                None => {
                    first = Some(id);
                    (!is_root).then_some(id)
                }
                Some(previous) if previous != id => Some(previous),
                Some(_) => None,
            }
            .filter(|&closing| !(is_root && first == Some(closing)));
            if let (Some(closing), Some(frame)) = (closing, self.frames.last_mut()) {
                frame.closed.insert(closing.to_string());
            }
            previous = Some(id);
        }

        self.frames.pop();
        debug!(id = %schema.id, consumed = self.cursor, "Leaving loop");
        output
    }

    fn current_frame(&self) -> Option<&Frame<'m>> {
        self.frames.last()
    }

    /// Whether some loop on the stack accepts `segment` and has not closed its id
    fn owned_by_open_loop(&self, segment: &Segment) -> bool {
        self.frames.iter().any(|frame| {
            !frame.closed.contains(&segment.id) && frame.schema.find_match(segment).is_some()
        })
    }

    fn map_segment(&mut self, segment: &Segment, declared: Option<&SegmentNode>) -> Node {
        let segment_id = declared.map_or(segment.id.as_str(), |d| d.id.as_str());
        let mut output = Node::new(segment_id, NodeType::Segment);

        for (index, slot) in segment.elements.iter().enumerate() {
            let Some(element) = slot else {
                continue;
            };
            let position = index + 1;
            let declaration = declared.and_then(|d| d.element(position));
            let default_id = format!("{segment_id}{position:02}");
            for child in self.map_element(element, declaration, &default_id) {
                output.add_child(child);
            }
        }
        output
    }

    /// One node per repetition
    fn map_element(
        &mut self,
        element: &Element,
        declared: Option<&ElementNode>,
        default_id: &str,
    ) -> Vec<Node> {
        let element_id = declared.map_or(default_id, |d| d.id.as_str());
        element
            .repetitions
            .iter()
            .map(|repetition| self.map_repetition(repetition, declared, element_id))
            .collect()
    }

    fn map_repetition(
        &mut self,
        repetition: &Repetition,
        declared: Option<&ElementNode>,
        element_id: &str,
    ) -> Node {
        let mut output = Node::new(element_id, NodeType::Element);

        if repetition.components.len() == 1 {
            match declared {
                Some(declared) if declared.components.is_empty() => {
                    self.assign_value(
                        &mut output,
                        repetition.value(),
                        declared.type_tag,
                        &declared.options,
                    );
                }
                Some(declared) => {
                    let child = self.map_component(
                        repetition.components[0].as_ref(),
                        declared.component(1),
                        &format!("{element_id}01"),
                    );
                    output.add_child(child);
                }
                None => output.value = Some(text_value(repetition.value())),
            }
            return output;
        }

        for (index, slot) in repetition.components.iter().enumerate() {
            let Some(component) = slot else {
                continue;
            };
            let position = index + 1;
            let declaration = declared.and_then(|d| d.component(position));
            let child = self.map_component(
                Some(component),
                declaration,
                &format!("{element_id}{position:02}"),
            );
            output.add_child(child);
        }
        output
    }

    fn map_component(
        &mut self,
        component: Option<&Component>,
        declared: Option<&ComponentNode>,
        default_id: &str,
    ) -> Node {
        let value = component.map(Component::as_str);
        match declared {
            Some(declared) => {
                let mut output = Node::new(&declared.id, NodeType::Component);
                self.assign_value(&mut output, value, declared.type_tag, &declared.options);
                output
            }
            None => {
                let mut output = Node::new(default_id, NodeType::Component);
                output.value = Some(text_value(value));
                output
            }
        }
    }

    /// Set a scalar node's value, coerced to `type_tag` when one is declared,
    /// and annotate it with the definition of a matching option
    fn assign_value(
        &mut self,
        output: &mut Node,
        raw: Option<&str>,
        type_tag: Option<TypeTag>,
        options: &ValueOptions,
    ) {
        let text = raw.unwrap_or_default();
        output.value = Some(Value::String(text.to_string()));

        if let Some(type_tag) = type_tag {
            match coerce(text, type_tag) {
                Ok(value) => {
                    output.value = Some(value);
                    output.set_schema_type(type_tag.to_string());
                }
                Err(diagnostic) => {
                    debug!(%diagnostic, "Keeping raw value");
                    self.diagnostics.push(diagnostic);
                }
            }
        }

        if let Some(definition) = options.definition(text).filter(|d| !d.trim().is_empty()) {
            output.set_attribute(DEFINITION_ATTRIBUTE, definition);
        }
    }
}

fn text_value(raw: Option<&str>) -> Value {
    Value::String(raw.unwrap_or_default().to_string())
}

/// Read EDI text as a typed value
fn coerce(text: &str, type_tag: TypeTag) -> std::result::Result<Value, Diagnostic> {
    let component = Component::new(text);
    let coerced = match type_tag {
        TypeTag::Id | TypeTag::An => Ok(Value::String(text.to_string())),
        TypeTag::Dt => component.iso_date().map(Value::Date),
        TypeTag::Tm => component.iso_time().map(Value::Time),
        TypeTag::R => component.real_value().map(Value::Decimal),
        TypeTag::N(decimals) => component
            .numeric_value(u32::from(decimals))
            .map(Value::Decimal),
    };
    coerced.map_err(|_| Diagnostic::InvalidValue {
        value: text.to_string(),
        type_tag,
    })
}
