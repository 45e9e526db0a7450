//! Separator configuration and escape-aware tokenizing
//!
//! This module holds the [`Options`] value that configures parsing and
//! serialization, the default separators used when an option is unset, and
//! the low-level splitting helpers that honour the release character.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Default segment terminator when none is configured
pub const DEFAULT_SEGMENT_TERMINATOR: char = '\r';
/// Default element separator when none is configured
pub const DEFAULT_ELEMENT_SEPARATOR: char = '*';
/// Default component separator when none is configured
pub const DEFAULT_COMPONENT_SEPARATOR: char = '>';
/// Default repetition separator when none is configured
pub const DEFAULT_REPETITION_SEPARATOR: char = '^';

/// Lowest ISA12 interchange control version whose ISA11 carries a
/// repetition separator. Compared as a zero-padded string.
pub const REPETITION_SEPARATOR_VERSION: &str = "00402";

/// Position of the repetition separator in an ISA segment
pub const ISA_REPETITION_POSITION: usize = 11;
/// Position of the interchange control version in an ISA segment
pub const ISA_VERSION_POSITION: usize = 12;
/// Position of the component separator in an ISA segment
pub const ISA_COMPONENT_POSITION: usize = 16;
/// Offset of the segment terminator in a fixed-width ISA segment
pub const ISA_TERMINATOR_OFFSET: usize = 105;

/// Separator characters and flags used when reading or writing EDI text.
///
/// Every field is optional. Unset separators are inferred from the text on
/// parse, and fall back to the `DEFAULT_*` constants on write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Segment terminator
    pub segment_terminator: Option<char>,
    /// Element separator
    pub element_separator: Option<char>,
    /// Component separator
    pub component_separator: Option<char>,
    /// Repetition separator
    pub repetition_separator: Option<char>,
    /// Decimal indicator
    pub decimal_indicator: Option<char>,
    /// Release (escape) character
    pub release_character: Option<char>,
    /// Emit a line feed after each segment terminator when writing
    pub add_line_breaks: bool,
}

impl Options {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a YAML document; missing keys stay unset
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Set the segment terminator
    pub fn segment_terminator(mut self, terminator: char) -> Self {
        self.segment_terminator = Some(terminator);
        self
    }

    /// Set the element separator
    pub fn element_separator(mut self, separator: char) -> Self {
        self.element_separator = Some(separator);
        self
    }

    /// Set the component separator
    pub fn component_separator(mut self, separator: char) -> Self {
        self.component_separator = Some(separator);
        self
    }

    /// Set the repetition separator
    pub fn repetition_separator(mut self, separator: char) -> Self {
        self.repetition_separator = Some(separator);
        self
    }

    /// Set the decimal indicator
    pub fn decimal_indicator(mut self, indicator: char) -> Self {
        self.decimal_indicator = Some(indicator);
        self
    }

    /// Set the release character
    pub fn release_character(mut self, release: char) -> Self {
        self.release_character = Some(release);
        self
    }

    /// Emit a line feed after each segment
    pub fn add_line_breaks(mut self, add_line_breaks: bool) -> Self {
        self.add_line_breaks = add_line_breaks;
        self
    }

    /// Resolve the separators to use right now, applying defaults for unset fields
    pub fn separators(&self) -> Separators {
        Separators {
            segment: self.segment_terminator.unwrap_or(DEFAULT_SEGMENT_TERMINATOR),
            element: self.element_separator.unwrap_or(DEFAULT_ELEMENT_SEPARATOR),
            component: self
                .component_separator
                .unwrap_or(DEFAULT_COMPONENT_SEPARATOR),
            repetition: self.repetition_separator,
            release: self.release_character,
        }
    }
}

/// The separators active at one point of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separators {
    /// Segment terminator
    pub segment: char,
    /// Element separator
    pub element: char,
    /// Component separator
    pub component: char,
    /// Repetition separator, `None` when repetitions are not delimited
    pub repetition: Option<char>,
    /// Release character, if any
    pub release: Option<char>,
}

impl Separators {
    /// Character used to join repetitions
    pub fn repetition_or_default(&self) -> char {
        self.repetition.unwrap_or(DEFAULT_REPETITION_SEPARATOR)
    }

    /// Name of the first active delimiter contained in `value`
    pub fn collision(&self, value: &str) -> Option<&'static str> {
        if value.contains(self.segment) {
            Some("segment terminator")
        } else if value.contains(self.element) {
            Some("element separator")
        } else if self.repetition.is_some_and(|r| value.contains(r)) {
            Some("repetition separator")
        } else if value.contains(self.component) {
            Some("component separator")
        } else {
            None
        }
    }
}

/// Split `text` on `separator`, treating any character that follows the
/// release character as literal. Release characters stay in the returned
/// pieces; see [`unescape`].
pub fn split_escaped(text: &str, separator: char, release: Option<char>) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices();

    while let Some((index, c)) = chars.next() {
        if Some(c) == release {
            chars.next();
        } else if c == separator {
            pieces.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }

    pieces.push(&text[start..]);
    pieces
}

/// Remove release characters, keeping the character each one escapes.
/// A release character at the very end is kept as is.
pub fn unescape(text: &str, release: char) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == release {
            match chars.next() {
                Some(escaped) => result.push(escaped),
                None => result.push(c),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Repetition separator declared by an ISA segment, if its version enables one.
///
/// ISA11 only carries a repetition separator from version 00402 on, and only
/// when it is not a letter or digit (older versions put a standards id there).
pub fn isa_repetition_separator(isa11: Option<&str>, isa12: Option<&str>) -> Option<char> {
    let version = isa12?;
    let separator = isa11?.chars().next()?;
    (version >= REPETITION_SEPARATOR_VERSION && !separator.is_alphanumeric()).then_some(separator)
}

/// Case-insensitive check for a segment id
pub(crate) fn is_id(id: &str, expected: &str) -> bool {
    id.eq_ignore_ascii_case(expected)
}

/// Case-insensitive prefix check that never splits a character
pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
