//! Delimited EDI text serializer
//!
//! Writes a [`Document`] back to text. Envelope segments are re-read on the
//! way out so the separators they declare apply to the segments after them,
//! which makes parse-then-serialize reproduce the input exactly.

use crate::document::{Component, Document, Element, Repetition, Segment, last_populated};
use crate::syntax::{
    ISA_COMPONENT_POSITION, ISA_REPETITION_POSITION, ISA_VERSION_POSITION, Options, Separators,
    is_id, isa_repetition_separator,
};
use crate::value::EdiValue;
use crate::{Error, Result};
use tracing::{debug, trace};

/// Serializer for [`Document`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentSerializer;

impl DocumentSerializer {
    /// Create a new serializer
    pub fn new() -> Self {
        Self
    }

    /// Serialize a document using its own options
    ///
    /// Fails with a format error when a component contains a separator that
    /// is active at its position. Nothing is escaped on write.
    pub fn serialize(&self, document: &Document) -> Result<String> {
        let mut active = document.options.clone();
        let mut output = String::new();

        for segment in &document.segments {
            if segment.is("ISA") {
                redefine_from_isa(segment, &mut active);
            } else if segment.is("UNA") {
                redefine_from_una(segment, &mut active);
            }

            let separators = active.separators();
            write_segment(&mut output, segment, &separators)?;
            output.push(separators.segment);
            if active.add_line_breaks {
                output.push('\n');
            }
        }

        debug!(
            segments = document.segments.len(),
            bytes = output.len(),
            "Serialized document"
        );
        Ok(output)
    }
}

fn redefine_from_isa(isa: &Segment, active: &mut Options) {
    active.repetition_separator = isa_repetition_separator(
        isa.get(ISA_REPETITION_POSITION),
        isa.get(ISA_VERSION_POSITION),
    );
    if let Some(separator) = isa.get(ISA_COMPONENT_POSITION).and_then(|v| v.chars().next()) {
        active.component_separator = Some(separator);
    }
    trace!(
        component_separator = ?active.component_separator,
        repetition_separator = ?active.repetition_separator,
        "ISA separators"
    );
}

fn redefine_from_una(una: &Segment, active: &mut Options) {
    let Some(advice) = una.get(1) else {
        return;
    };
    let mut service = advice.chars();
    if let Some(separator) = service.next() {
        active.component_separator = Some(separator);
    }
    // Kept alongside the parser's view; nothing written depends on it.
    if let Some(indicator) = service.nth(1) {
        active.decimal_indicator = Some(indicator);
    }
}

fn write_segment(output: &mut String, segment: &Segment, separators: &Separators) -> Result<()> {
    output.push_str(&segment.id);
    let Some(last) = last_populated(&segment.elements) else {
        return Ok(());
    };

    if segment.is("UNA") {
        for element in segment.elements[..=last].iter().flatten() {
            output.push_str(element.value().unwrap_or_default());
        }
        return Ok(());
    }

    let is_isa = is_id(&segment.id, "ISA");
    for (index, slot) in segment.elements[..=last].iter().enumerate() {
        output.push(separators.element);
        let Some(element) = slot else {
            continue;
        };
        if is_isa && is_separator_definition(index + 1, element, separators) {
            output.push_str(element.value().unwrap_or_default());
        } else {
            write_element(output, element, separators)?;
        }
    }
    Ok(())
}

/// ISA slots that declare a separator hold that separator as their value
fn is_separator_definition(position: usize, element: &Element, separators: &Separators) -> bool {
    let single = element.repetitions.len() == 1 && element.components().len() == 1;
    let Some(value) = element.value().filter(|v| single && v.chars().count() == 1) else {
        return false;
    };
    let c = value.chars().next();

    match position {
        ISA_COMPONENT_POSITION => c == Some(separators.component),
        ISA_REPETITION_POSITION => separators.repetition.is_some() && c == separators.repetition,
        _ => false,
    }
}

fn write_element(output: &mut String, element: &Element, separators: &Separators) -> Result<()> {
    let Some(last) = element.repetitions.iter().rposition(|r| !r.is_empty()) else {
        return Ok(());
    };

    for (index, repetition) in element.repetitions[..=last].iter().enumerate() {
        if index > 0 {
            output.push(separators.repetition_or_default());
        }
        write_repetition(output, repetition, separators)?;
    }
    Ok(())
}

fn write_repetition(
    output: &mut String,
    repetition: &Repetition,
    separators: &Separators,
) -> Result<()> {
    let Some(last) = last_populated(&repetition.components) else {
        return Ok(());
    };

    for (index, slot) in repetition.components[..=last].iter().enumerate() {
        if index > 0 {
            output.push(separators.component);
        }
        if let Some(component) = slot {
            write_component(output, component, separators)?;
        }
    }
    Ok(())
}

fn write_component(output: &mut String, component: &Component, separators: &Separators) -> Result<()> {
    let value = component.as_str();
    if let Some(separator) = separators.collision(value) {
        return Err(Error::SeparatorCollision {
            value: value.to_string(),
            separator,
        });
    }
    output.push_str(value);
    Ok(())
}
