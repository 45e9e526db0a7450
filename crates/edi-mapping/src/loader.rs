//! Reading mapping schemas from XML
//!
//! The document is first read into a plain element tree, then interpreted:
//! an element whose local name ends in `loop` is a loop, any other element
//! is a segment. Inside a segment, the last two digits of a child's name give
//! its element position, and the same rule places components inside an
//! element. `option` children list allowed values.

use crate::schema::{ComponentNode, ElementNode, LoopNode, SchemaNode, SegmentNode, TypeTag, ValueNode};
use crate::{Diagnostic, Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use tracing::{debug, warn};

const LOOP_SUFFIX: &str = "loop";
const OPTION: &str = "option";
const TYPE_ATTRIBUTE: &str = "type";
const RESTRICT_ATTRIBUTE: &str = "restrict";
const DEFINITION_ATTRIBUTE: &str = "definition";

/// An XML element reduced to what the schema needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut element = Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            ..Self::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            element.attributes.insert(key, value);
        }
        Ok(element)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Read XML text into an element tree, returning the root element
pub fn parse_xml(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| Error::Schema("XML is missing a root element".to_string()))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Builds a schema from an element tree, collecting diagnostics on the way
#[derive(Debug, Default)]
pub struct SchemaLoader {
    diagnostics: Vec<Diagnostic>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the root element as a loop
    pub fn load(mut self, root: &XmlElement) -> (LoopNode, Vec<Diagnostic>) {
        let schema = self.read_loop(root);
        debug!(
            root = %schema.id,
            diagnostics = self.diagnostics.len(),
            "Loaded mapping schema"
        );
        (schema, self.diagnostics)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "Mapping schema problem");
        self.diagnostics.push(diagnostic);
    }

    fn read_node(&mut self, xml: &XmlElement) -> SchemaNode {
        if xml.name.ends_with(LOOP_SUFFIX) {
            SchemaNode::Loop(self.read_loop(xml))
        } else {
            SchemaNode::Segment(self.read_segment(xml))
        }
    }

    fn read_loop(&mut self, xml: &XmlElement) -> LoopNode {
        LoopNode {
            id: xml.name.clone(),
            children: xml.children.iter().map(|child| self.read_node(child)).collect(),
        }
    }

    fn read_segment(&mut self, xml: &XmlElement) -> SegmentNode {
        let mut segment = SegmentNode::new(&xml.name);
        for child in &xml.children {
            let Some(index) = self.position_index(&child.name) else {
                continue;
            };
            let element = self.read_element(child);
            self.place(&mut segment.elements, index, element);
        }
        segment
    }

    fn read_element(&mut self, xml: &XmlElement) -> ElementNode {
        let mut element = self.read_value(xml);
        for child in xml.children.iter().filter(|child| child.name != OPTION) {
            let Some(index) = self.position_index(&child.name) else {
                continue;
            };
            let component = self.read_component(child);
            self.place(&mut element.components, index, component);
        }
        element
    }

    fn read_component(&mut self, xml: &XmlElement) -> ComponentNode {
        self.read_value(xml)
    }

    /// Id, type, restrict flag and options shared by elements and components
    fn read_value<C>(&mut self, xml: &XmlElement) -> ValueNode<C> {
        let mut node = ValueNode::new(&xml.name);
        node.type_tag = xml
            .attribute(TYPE_ATTRIBUTE)
            .and_then(|text| match text.parse::<TypeTag>() {
                Ok(tag) => Some(tag),
                Err(diagnostic) => {
                    self.report(diagnostic);
                    None
                }
            });
        node.restrict = xml.attribute(RESTRICT_ATTRIBUTE) == Some("true");

        for option in xml.children.iter().filter(|child| child.name == OPTION) {
            let definition = option.attribute(DEFINITION_ATTRIBUTE).map(str::to_string);
            if !node.options.insert(option.text.clone(), definition) {
                self.report(Diagnostic::DuplicateOption {
                    id: xml.name.clone(),
                    value: option.text.clone(),
                });
            }
        }
        node
    }

    /// Zero-based slot from the trailing two digits of a name
    fn position_index(&mut self, name: &str) -> Option<usize> {
        let index = name
            .len()
            .checked_sub(2)
            .and_then(|start| name.get(start..))
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<usize>().ok())
            .and_then(|position| position.checked_sub(1));

        if index.is_none() {
            self.report(Diagnostic::InvalidPosition {
                id: name.to_string(),
            });
        }
        index
    }

    /// Store a declaration at its slot; the first declaration for a slot wins
    fn place<C>(&mut self, slots: &mut Vec<Option<ValueNode<C>>>, index: usize, node: ValueNode<C>) {
        if slots.len() <= index {
            slots.resize_with(index + 1, || None);
        }
        match &slots[index] {
            Some(existing) => {
                let diagnostic = Diagnostic::DuplicatePosition {
                    id: node.id,
                    existing: existing.id.clone(),
                };
                self.report(diagnostic);
            }
            None => slots[index] = Some(node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(xml: &str) -> (LoopNode, Vec<Diagnostic>) {
        SchemaLoader::new().load(&parse_xml(xml).unwrap())
    }

    #[test]
    fn test_parse_xml_tree() {
        let root = parse_xml(
            r#"<?xml version="1.0"?>
            <mapping>
                <st>
                    <st01 type="n1"><option definition="a &amp; b">850</option></st01>
                </st>
                <x:ctt xmlns:x="urn:example"/>
            </mapping>"#,
        )
        .unwrap();

        assert_eq!(root.name, "mapping");
        assert_eq!(root.children.len(), 2);
        let st01 = &root.children[0].children[0];
        assert_eq!(st01.attribute("type"), Some("n1"));
        assert_eq!(st01.children[0].text, "850");
        assert_eq!(st01.children[0].attribute("definition"), Some("a & b"));
        assert_eq!(root.children[1].name, "ctt");
    }

    #[test]
    fn test_parse_xml_requires_root() {
        assert!(matches!(parse_xml(""), Err(Error::Schema(_))));
    }

    #[test]
    fn test_parse_xml_rejects_mismatched_tags() {
        assert!(matches!(parse_xml("<a><b></a>"), Err(Error::Xml(_))));
    }

    #[test]
    fn test_loops_and_segments() {
        let (schema, diagnostics) = load(
            "<mapping><st/><hlloop><hl/><n1loop><n1/></n1loop></hlloop><se/></mapping>",
        );

        assert!(diagnostics.is_empty());
        assert_eq!(schema.id, "mapping");
        let ids: Vec<&str> = schema.children.iter().map(SchemaNode::id).collect();
        assert_eq!(ids, ["st", "hlloop", "se"]);
        let SchemaNode::Loop(hlloop) = &schema.children[1] else {
            panic!("expected a loop");
        };
        assert!(matches!(hlloop.children[1], SchemaNode::Loop(_)));
    }

    #[test]
    fn test_elements_components_and_options() {
        let (schema, diagnostics) = load(
            r#"<mapping>
                <st>
                    <st01 type="n1" restrict="true">
                        <option definition="purchase order">850</option>
                        <option>997</option>
                    </st01>
                    <st03>
                        <st0302 type="dt"><option>x</option></st0302>
                    </st03>
                </st>
            </mapping>"#,
        );

        assert!(diagnostics.is_empty());
        let SchemaNode::Segment(st) = &schema.children[0] else {
            panic!("expected a segment");
        };
        assert_eq!(st.elements.len(), 3);
        let st01 = st.element(1).unwrap();
        assert_eq!(st01.type_tag, Some(TypeTag::N(1)));
        assert!(st01.restrict);
        assert_eq!(st01.options.definition("850"), Some("purchase order"));
        assert!(st01.options.contains("997"));
        assert!(st.element(2).is_none());
        let st0302 = st.element(3).unwrap().component(2).unwrap();
        assert_eq!(st0302.type_tag, Some(TypeTag::Dt));
        assert!(st0302.options.contains("X"));
    }

    #[test]
    fn test_schema_diagnostics() {
        let (schema, diagnostics) = load(
            r#"<mapping>
                <st>
                    <st01 type="bogus"/>
                    <first02/>
                    <second02/>
                    <name/>
                    <st00/>
                    <st04><option>A</option><option>a</option></st04>
                </st>
            </mapping>"#,
        );

        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::InvalidType {
                    type_tag: "bogus".into()
                },
                Diagnostic::DuplicatePosition {
                    id: "second02".into(),
                    existing: "first02".into()
                },
                Diagnostic::InvalidPosition { id: "name".into() },
                Diagnostic::InvalidPosition { id: "st00".into() },
                Diagnostic::DuplicateOption {
                    id: "st04".into(),
                    value: "a".into()
                },
            ]
        );
        let SchemaNode::Segment(st) = &schema.children[0] else {
            panic!("expected a segment");
        };
        assert_eq!(st.element(1).unwrap().type_tag, None);
        assert_eq!(st.element(2).unwrap().id, "first02");
        assert_eq!(st.element(4).unwrap().options.len(), 1);
    }
}
