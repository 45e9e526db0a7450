//! Delimited EDI text parser
//!
//! Turns interchange text into a [`Document`]. Separators that were not
//! supplied are inferred from the text, and envelope segments redefine the
//! component and repetition separators for the segments that follow them.

use crate::document::{Component, Document, Element, Repetition, Segment};
use crate::syntax::{
    ISA_COMPONENT_POSITION, ISA_REPETITION_POSITION, ISA_TERMINATOR_OFFSET, ISA_VERSION_POSITION,
    Options, is_id, isa_repetition_separator, split_escaped, starts_with_ignore_case, unescape,
};
use crate::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// A control character or `~` followed only by whitespace up to the end of the text
static TRAILING_TERMINATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\x00-\x1f~])\s*$").expect("trailing terminator pattern is valid")
});

const UNA_TERMINATOR_OFFSET: usize = 8;
const UNA_ELEMENT_OFFSET: usize = 4;
const UNA_RELEASE_OFFSET: usize = 6;
const UNA_ADVICE_LENGTH: usize = 5;

/// Infer the segment terminator from the text
///
/// An `ISA` header has it at a fixed offset, as does a `UNA` service string
/// advice. Otherwise the terminator is the last control character or `~`
/// before any trailing whitespace.
pub fn infer_segment_terminator(text: &str) -> Result<char> {
    if starts_with_ignore_case(text, "ISA") {
        return text
            .chars()
            .nth(ISA_TERMINATOR_OFFSET)
            .ok_or(Error::Inference("segment terminator"));
    }
    if starts_with_ignore_case(text, "UNA") {
        return text
            .chars()
            .nth(UNA_TERMINATOR_OFFSET)
            .ok_or(Error::Inference("segment terminator"));
    }

    TRAILING_TERMINATOR
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|m| m.as_str().chars().next())
        .ok_or(Error::Inference("segment terminator"))
}

/// Infer the element separator: fixed in a `UNA` header, otherwise the first
/// character that is not an ASCII letter or digit
pub fn infer_element_separator(text: &str) -> Result<char> {
    if starts_with_ignore_case(text, "UNA") {
        return text
            .chars()
            .nth(UNA_ELEMENT_OFFSET)
            .ok_or(Error::Inference("element separator"));
    }

    text.chars()
        .find(|c| !c.is_ascii_alphanumeric())
        .ok_or(Error::Inference("element separator"))
}

/// Infer the release character; only a `UNA` header declares one
pub fn infer_release_character(text: &str) -> Option<char> {
    if !starts_with_ignore_case(text, "UNA") {
        return None;
    }
    text.chars()
        .nth(UNA_RELEASE_OFFSET)
        .filter(|&c| c != ' ')
}

/// Parser for delimited EDI text
#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    options: Options,
}

impl DocumentParser {
    /// Create a parser that infers every separator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with some separators supplied up front
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    /// Parse a complete document
    ///
    /// The returned document keeps the supplied options plus the inferred
    /// segment terminator, element separator and release character.
    /// Separators declared by envelope segments are not kept; the serializer
    /// derives them again from the same segments.
    pub fn parse(&self, text: &str) -> Result<Document> {
        let mut active = self.options.clone();
        let terminator = match active.segment_terminator {
            Some(terminator) => terminator,
            None => infer_segment_terminator(text)?,
        };
        let element_separator = match active.element_separator {
            Some(separator) => separator,
            None => infer_element_separator(text)?,
        };
        let release = active
            .release_character
            .or_else(|| infer_release_character(text));

        active.segment_terminator = Some(terminator);
        active.element_separator = Some(element_separator);
        active.release_character = release;

        debug!(
            terminator = ?terminator,
            element_separator = ?element_separator,
            release = ?release,
            "Resolved separators"
        );

        let mut document = Document::new(Options {
            segment_terminator: Some(terminator),
            element_separator: Some(element_separator),
            release_character: release,
            ..self.options.clone()
        });

        let raw_segments = split_escaped(text, terminator, release);
        let last = raw_segments.len() - 1;
        for (index, raw_segment) in raw_segments.into_iter().enumerate() {
            if index == last && raw_segment.trim().is_empty() {
                break;
            }

            let raw_segment = raw_segment.trim_start();
            let segment = if starts_with_ignore_case(raw_segment, "UNA") {
                parse_service_advice(raw_segment, &mut active)?
            } else {
                parse_segment(raw_segment, &mut active)
            };
            document.segments.push(segment);
        }

        debug!(segments = document.segments.len(), "Parsed document");
        Ok(document)
    }
}

/// Read a `UNA` record: its five service characters are kept verbatim as a
/// single element, and define the component separator and decimal indicator.
/// The decimal indicator only travels with the active options; real values
/// accept any indicator when read.
fn parse_service_advice(raw_segment: &str, active: &mut Options) -> Result<Segment> {
    let id: String = raw_segment.chars().take(3).collect();
    let advice: String = raw_segment.chars().skip(3).take(UNA_ADVICE_LENGTH).collect();
    let service: Vec<char> = advice.chars().collect();
    if service.len() < UNA_ADVICE_LENGTH {
        return Err(Error::Syntax(format!(
            "service string advice '{raw_segment}' is shorter than {UNA_ADVICE_LENGTH} characters"
        )));
    }

    active.component_separator = Some(service[0]);
    active.decimal_indicator = Some(service[2]);
    trace!(
        component_separator = ?service[0],
        decimal_indicator = ?service[2],
        "Service string advice"
    );

    Ok(Segment::new(id).with_element(Some(Element::new(advice))))
}

fn parse_segment(raw_segment: &str, active: &mut Options) -> Segment {
    let element_separator = active
        .element_separator
        .unwrap_or(crate::syntax::DEFAULT_ELEMENT_SEPARATOR);
    let tokens = split_escaped(raw_segment, element_separator, active.release_character);
    let mut segment = Segment::new(tokens[0]);
    let is_isa = is_id(&segment.id, "ISA");

    for (position, token) in tokens.iter().copied().enumerate().skip(1) {
        if is_isa && position == ISA_COMPONENT_POSITION {
            if let Some(separator) = token.chars().next() {
                active.component_separator = Some(separator);
                trace!(component_separator = ?separator, "ISA redefines component separator");
                segment.elements.push(Some(Element::new(token)));
                continue;
            }
        }

        if is_isa && position == ISA_REPETITION_POSITION {
            let version = tokens.get(ISA_VERSION_POSITION).copied();
            match isa_repetition_separator(Some(token), version) {
                Some(separator) => {
                    active.repetition_separator = Some(separator);
                    trace!(repetition_separator = ?separator, "ISA redefines repetition separator");
                    segment.elements.push(Some(Element::new(token)));
                    continue;
                }
                None => {
                    trace!(version = ?version, "ISA disables repetition separator");
                    active.repetition_separator = None;
                }
            }
        }

        let element = (!token.is_empty()).then(|| parse_element(token, active));
        segment.elements.push(element);
    }

    segment
}

fn parse_element(raw_element: &str, active: &Options) -> Element {
    let raw_repetitions = match active.repetition_separator {
        Some(separator) => split_escaped(raw_element, separator, active.release_character),
        None => vec![raw_element],
    };

    Element {
        repetitions: raw_repetitions
            .into_iter()
            .map(|raw| parse_repetition(raw, active))
            .collect(),
    }
}

fn parse_repetition(raw_repetition: &str, active: &Options) -> Repetition {
    if raw_repetition.is_empty() {
        return Repetition::default();
    }

    let raw_components = match active.component_separator {
        Some(separator) => split_escaped(raw_repetition, separator, active.release_character),
        None => vec![raw_repetition],
    };

    Repetition {
        components: raw_components
            .into_iter()
            .map(|raw| {
                (!raw.is_empty()).then(|| match active.release_character {
                    Some(release) => Component::new(unescape(raw, release)),
                    None => Component::new(raw),
                })
            })
            .collect(),
    }
}
