//! Rebuilding a document from a mapped output tree
//!
//! The inverse of mapping: loop nodes are flattened, every other node below
//! them becomes a segment, and the trailing two digits of a child's name give
//! its element or component position. Typed values are written back in their
//! EDI layout using the node's schema type.

use crate::document::{Component, Document, Element, Repetition, Segment};
use crate::syntax::Options;
use crate::value::{format_date, format_numeric, format_real, format_time};
use chrono::{NaiveDate, NaiveTime};
use edi_ir::{Node, NodeType};
use tracing::{debug, trace};

const ISO_DATE: &str = "%Y-%m-%d";
const ISO_TIMES: [&str; 3] = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const EDI_DATE_LENGTH: usize = 8;

impl Document {
    /// Build a document from a mapped tree, written with `options`
    ///
    /// Real values use the decimal indicator from `options` when one is set.
    pub fn from_tree(root: &Node, options: Options) -> Self {
        let mut document = Document::new(options);
        load_loop(root, &mut document);
        debug!(segments = document.segments.len(), "Loaded document from tree");
        document
    }
}

fn is_loop(node: &Node) -> bool {
    node.node_type == NodeType::Loop || node.name.ends_with("loop")
}

fn load_loop(node: &Node, document: &mut Document) {
    for child in &node.children {
        if is_loop(child) {
            load_loop(child, document);
        } else {
            let segment = load_segment(child, &document.options);
            document.segments.push(segment);
        }
    }
}

fn load_segment(node: &Node, options: &Options) -> Segment {
    let mut segment = Segment::new(node.name.to_uppercase());
    for child in &node.children {
        let Some(index) = position_index(&child.name) else {
            trace!(name = %child.name, "Skipping node without a position");
            continue;
        };
        if segment.elements.len() <= index {
            segment.elements.resize_with(index + 1, || None);
        }
        segment.elements[index]
            .get_or_insert_with(Element::default)
            .repetitions
            .push(load_repetition(child, options));
    }
    segment
}

fn load_repetition(node: &Node, options: &Options) -> Repetition {
    if node.children.is_empty() {
        return Repetition::new(load_value(node, options));
    }

    let mut repetition = Repetition::default();
    for child in &node.children {
        let Some(index) = position_index(&child.name) else {
            continue;
        };
        if repetition.components.len() <= index {
            repetition.components.resize_with(index + 1, || None);
        }
        if repetition.components[index].is_none() {
            repetition.components[index] = Some(Component::new(load_value(child, options)));
        }
    }
    repetition
}

/// Zero-based slot from the last two digits of a node name
fn position_index(name: &str) -> Option<usize> {
    let start = name.len().checked_sub(2)?;
    let digits = name.get(start..)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok()?.checked_sub(1)
}

/// The node text in EDI layout; text that does not parse as its type is kept as is
fn load_value(node: &Node, options: &Options) -> String {
    let text = node.text().unwrap_or_default();
    let converted = match node.schema_type.as_deref() {
        None | Some("id" | "an") => None,
        Some("dt") => NaiveDate::parse_from_str(&text, ISO_DATE)
            .ok()
            .and_then(|date| format_date(EDI_DATE_LENGTH, date).ok()),
        Some("tm") => load_time(&text),
        Some("r") => text.trim().parse::<f64>().ok().map(|real| {
            let edi = format_real(real);
            match options.decimal_indicator {
                Some(indicator) => edi.replace('.', &indicator.to_string()),
                None => edi,
            }
        }),
        Some(other) => numeric_decimals(other).and_then(|decimals| {
            text.trim()
                .parse::<f64>()
                .ok()
                .map(|numeric| format_numeric(decimals, numeric))
        }),
    };

    converted.unwrap_or(text)
}

fn load_time(text: &str) -> Option<String> {
    let time = ISO_TIMES
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())?;
    let mut length = text.chars().filter(char::is_ascii_digit).count();
    if text.chars().nth(1) == Some(':') {
        length += 1;
    }
    format_time(length, time).ok()
}

/// Implied decimal places of an `nX` type
fn numeric_decimals(type_tag: &str) -> Option<u32> {
    let mut chars = type_tag.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('n'), Some(digit), None) => digit.to_digit(10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::EdiValue;
    use edi_ir::Value;

    fn typed(name: &str, node_type: NodeType, value: Value, schema_type: &str) -> Node {
        let mut node = Node::with_value(name, node_type, value);
        node.set_schema_type(schema_type);
        node
    }

    #[test]
    fn test_segments_from_loops() {
        let mut root = Node::new("mapping", NodeType::Root);
        let mut st = Node::new("st", NodeType::Segment);
        st.add_child(Node::with_value("st01", NodeType::Element, Value::String("997".into())));
        st.add_child(Node::with_value("st02", NodeType::Element, Value::String("0001".into())));
        let mut ak1loop = Node::new("ak1loop", NodeType::Loop);
        let mut ak1 = Node::new("ak1", NodeType::Segment);
        ak1.add_child(Node::with_value("ak103", NodeType::Element, Value::String("X".into())));
        ak1loop.add_child(ak1);
        let mut group = Node::new("group", NodeType::Loop);
        group.add_child(Node::new("se", NodeType::Segment));
        root.add_child(st);
        root.add_child(ak1loop);
        root.add_child(group);

        let document = Document::from_tree(&root, Options::new().segment_terminator('~'));
        let ids: Vec<&str> = document.segments.iter().map(|s| s.id.as_str()).collect();

        assert_eq!(ids, ["ST", "AK1", "SE"]);
        assert_eq!(document.segments[0].get(2), Some("0001"));
        assert_eq!(document.segments[1].elements.len(), 3);
        assert_eq!(document.segments[1].get(3), Some("X"));
        assert_eq!(document.to_edi().unwrap(), "ST*997*0001~AK1***X~SE~");
    }

    #[test]
    fn test_repeated_positions_add_repetitions() {
        let mut root = Node::new("mapping", NodeType::Root);
        let mut n1 = Node::new("n1", NodeType::Segment);
        n1.add_child(Node::with_value("n101", NodeType::Element, Value::String("A".into())));
        let mut composite = Node::new("n101", NodeType::Element);
        composite.add_child(Node::with_value("n10102", NodeType::Component, Value::String("C".into())));
        composite.add_child(Node::with_value("n10102", NodeType::Component, Value::String("D".into())));
        n1.add_child(composite);
        n1.add_child(Node::with_value("name", NodeType::Element, Value::String("skip".into())));
        root.add_child(n1);

        let document = Document::from_tree(&root, Options::new());
        let element = document.segments[0].element(1).unwrap();

        assert_eq!(element.repetitions.len(), 2);
        assert_eq!(element.repetitions[0].value(), Some("A"));
        assert_eq!(element.repetitions[1].components.len(), 2);
        assert_eq!(element.repetitions[1].get(2), Some("C"));
        assert_eq!(document.segments[0].elements.len(), 1);
    }

    #[test]
    fn test_typed_values_written_in_edi_layout() {
        let mut root = Node::new("mapping", NodeType::Root);
        let mut dtm = Node::new("dtm", NodeType::Segment);
        dtm.add_child(typed("dtm01", NodeType::Element, Value::Date("2012-03-15".into()), "dt"));
        dtm.add_child(typed("dtm02", NodeType::Element, Value::Time("12:30".into()), "tm"));
        dtm.add_child(typed("dtm03", NodeType::Element, Value::Time("12:30:45.01".into()), "tm"));
        dtm.add_child(typed("dtm04", NodeType::Element, Value::Decimal(99.7), "n1"));
        dtm.add_child(typed("dtm05", NodeType::Element, Value::Decimal(12.5), "r"));
        dtm.add_child(typed("dtm06", NodeType::Element, Value::String("ABC".into()), "n2"));
        root.add_child(dtm);

        let document = Document::from_tree(&root, Options::new().decimal_indicator(','));
        let dtm = &document.segments[0];

        assert_eq!(dtm.get(1), Some("20120315"));
        assert_eq!(dtm.get(2), Some("1230"));
        assert_eq!(dtm.get(3), Some("12304501"));
        assert_eq!(dtm.get(4), Some("997"));
        assert_eq!(dtm.get(5), Some("12,5"));
        assert_eq!(dtm.get(6), Some("ABC"));
    }

    #[test]
    fn test_position_index() {
        assert_eq!(position_index("st01"), Some(0));
        assert_eq!(position_index("isa16"), Some(15));
        assert_eq!(position_index("st00"), None);
        assert_eq!(position_index("st"), None);
        assert_eq!(position_index("x"), None);
    }

    #[test]
    fn test_numeric_decimals() {
        assert_eq!(numeric_decimals("n0"), Some(0));
        assert_eq!(numeric_decimals("n4"), Some(4));
        assert_eq!(numeric_decimals("nx"), None);
        assert_eq!(numeric_decimals("n12"), None);
        assert_eq!(numeric_decimals("an"), None);
    }
}
