//! Document tree for delimited EDI text
//!
//! A [`Document`] owns an ordered list of [`Segment`]s. Segments hold sparse,
//! 1-based element slots; each [`Element`] holds one or more [`Repetition`]s,
//! and each repetition holds sparse [`Component`] slots carrying the text.
#![allow(clippy::must_use_candidate)] // Accessors read clearly at call sites without #[must_use].
#![allow(clippy::return_self_not_must_use)] // Fluent constructors return Self for ergonomics.

use crate::envelopes::{TransactionSet, transaction_sets};
use crate::parser::DocumentParser;
use crate::serializer::DocumentSerializer;
use crate::syntax::Options;
use crate::value::EdiValue;
use crate::Result;

/// A component element: the leaf of the tree, holding raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    value: String,
}

/// One repetition of an element's component structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repetition {
    /// Component slots; `None` marks an empty position
    pub components: Vec<Option<Component>>,
}

/// A data element, made of one or more repetitions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Repetitions in order
    pub repetitions: Vec<Repetition>,
}

/// A segment: an id followed by sparse element slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment id (e.g. `ISA`, `ST`)
    pub id: String,
    /// Element slots; `None` marks an empty position
    pub elements: Vec<Option<Element>>,
}

/// An EDI document: the options it is written with and its segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Separators used when writing this document
    pub options: Options,
    /// Segments in document order
    pub segments: Vec<Segment>,
}

/// Read the value at a 1-based position of a sparse slot list
fn slot_value<T: EdiValue>(slots: &[Option<T>], position: usize) -> Option<&str> {
    slot(slots, position)?.value()
}

fn slot<T>(slots: &[Option<T>], position: usize) -> Option<&T> {
    slots.get(position.checked_sub(1)?)?.as_ref()
}

fn slot_mut<T>(slots: &mut [Option<T>], position: usize) -> Option<&mut T> {
    slots.get_mut(position.checked_sub(1)?)?.as_mut()
}

/// Place or clear a node at a 1-based position, growing the list as needed.
/// Clearing a position past the end leaves the list untouched.
fn place<T>(slots: &mut Vec<Option<T>>, position: usize, node: Option<T>) {
    let Some(index) = position.checked_sub(1) else {
        return;
    };
    match node {
        Some(node) => {
            if slots.len() <= index {
                slots.resize_with(index + 1, || None);
            }
            slots[index] = Some(node);
        }
        None => {
            if let Some(existing) = slots.get_mut(index) {
                *existing = None;
            }
        }
    }
}

/// Index of the last populated slot
pub(crate) fn last_populated<T>(slots: &[Option<T>]) -> Option<usize> {
    slots.iter().rposition(Option::is_some)
}

impl Component {
    /// Create a component holding `value`
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The component text
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl EdiValue for Component {
    fn value(&self) -> Option<&str> {
        Some(&self.value)
    }

    fn set_value(&mut self, value: String) {
        self.value = value;
    }
}

impl Repetition {
    /// Create a repetition with a single component
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            components: vec![Some(Component::new(value))],
        }
    }

    /// Value of the component at a 1-based position
    pub fn get(&self, position: usize) -> Option<&str> {
        slot_value(&self.components, position)
    }

    /// Set the component at a 1-based position; an empty value clears it
    pub fn set(&mut self, position: usize, value: impl Into<String>) {
        let value = value.into();
        let node = (!value.is_empty()).then(|| Component::new(value));
        place(&mut self.components, position, node);
    }

    /// The component at a 1-based position
    pub fn component(&self, position: usize) -> Option<&Component> {
        slot(&self.components, position)
    }

    /// Whether no component slot is populated
    pub fn is_empty(&self) -> bool {
        last_populated(&self.components).is_none()
    }
}

impl EdiValue for Repetition {
    fn value(&self) -> Option<&str> {
        slot_value(&self.components, 1)
    }

    fn set_value(&mut self, value: String) {
        self.components = vec![Some(Component::new(value))];
    }
}

impl Element {
    /// Create an element with a single repetition holding `value`
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            repetitions: vec![Repetition::new(value)],
        }
    }

    /// Components of the first repetition
    pub fn components(&self) -> &[Option<Component>] {
        match self.repetitions.first() {
            Some(repetition) => &repetition.components,
            None => &[],
        }
    }

    /// Mutable components of the first repetition, creating it if absent
    pub fn components_mut(&mut self) -> &mut Vec<Option<Component>> {
        if self.repetitions.is_empty() {
            self.repetitions.push(Repetition::default());
        }
        &mut self.repetitions[0].components
    }

    /// Value of the first repetition's component at a 1-based position
    pub fn get(&self, position: usize) -> Option<&str> {
        slot_value(self.components(), position)
    }

    /// Set the first repetition's component at a 1-based position; an empty
    /// value clears it
    pub fn set(&mut self, position: usize, value: impl Into<String>) {
        let value = value.into();
        let node = (!value.is_empty()).then(|| Component::new(value));
        place(self.components_mut(), position, node);
    }

    /// The first repetition's component at a 1-based position
    pub fn component(&self, position: usize) -> Option<&Component> {
        slot(self.components(), position)
    }
}

impl EdiValue for Element {
    fn value(&self) -> Option<&str> {
        self.repetitions.first()?.value()
    }

    fn set_value(&mut self, value: String) {
        self.repetitions = vec![Repetition::new(value)];
    }
}

impl Segment {
    /// Create a segment with no elements
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            elements: Vec::new(),
        }
    }

    /// Append an element slot
    pub fn with_element(mut self, element: Option<Element>) -> Self {
        self.elements.push(element);
        self
    }

    /// Value of the element at a 1-based position
    pub fn get(&self, position: usize) -> Option<&str> {
        slot_value(&self.elements, position)
    }

    /// Set the element at a 1-based position to a single value; an empty
    /// value clears it
    pub fn set(&mut self, position: usize, value: impl Into<String>) {
        let value = value.into();
        let node = (!value.is_empty()).then(|| Element::new(value));
        place(&mut self.elements, position, node);
    }

    /// The element at a 1-based position
    pub fn element(&self, position: usize) -> Option<&Element> {
        slot(&self.elements, position)
    }

    /// Mutable element at a 1-based position
    pub fn element_mut(&mut self, position: usize) -> Option<&mut Element> {
        slot_mut(&mut self.elements, position)
    }

    /// Place or clear an element at a 1-based position
    pub fn set_element(&mut self, position: usize, element: Option<Element>) {
        place(&mut self.elements, position, element);
    }

    /// Whether this segment has the given id, ignoring case
    pub fn is(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

impl Document {
    /// Create an empty document written with `options`
    pub fn new(options: Options) -> Self {
        Self {
            options,
            segments: Vec::new(),
        }
    }

    /// Parse EDI text, inferring every separator
    pub fn parse(text: &str) -> Result<Self> {
        DocumentParser::new().parse(text)
    }

    /// Parse EDI text with some separators supplied up front
    pub fn parse_with(text: &str, options: Options) -> Result<Self> {
        DocumentParser::with_options(options).parse(text)
    }

    /// Write this document back to EDI text
    pub fn to_edi(&self) -> Result<String> {
        DocumentSerializer::new().serialize(self)
    }

    /// Group this document's segments into transaction sets
    pub fn transaction_sets(&self) -> Vec<TransactionSet<'_>> {
        transaction_sets(&self.segments)
    }
}
