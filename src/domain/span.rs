//! Detected spans and the entity kinds they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a sensitive entity.
///
/// Serialized as its upper-case label (`PERSON`, `EMAIL`, ...). Labels that
/// are not one of the built-in kinds are kept verbatim in [`EntityKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityKind {
    Person,
    Email,
    Organization,
    Age,
    Other(String),
}

impl EntityKind {
    /// Maps a detector label onto a kind.
    ///
    /// Accepts the NER short forms (`PER`, `ORG`) next to the full names.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "PERSON" | "PER" => Self::Person,
            "EMAIL" => Self::Email,
            "ORGANIZATION" | "ORG" => Self::Organization,
            "AGE" => Self::Age,
            _ => Self::Other(normalized),
        }
    }

    /// Returns the canonical label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Email => "EMAIL",
            Self::Organization => "ORGANIZATION",
            Self::Age => "AGE",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EntityKind {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<EntityKind> for String {
    fn from(kind: EntityKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A detected candidate: the source substring, its kind and its position.
///
/// `start` and `end` are character offsets (not bytes) into the text the
/// span was detected in, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    text: String,
    kind: EntityKind,
    start: usize,
    end: usize,
}

impl Span {
    pub fn new(text: impl Into<String>, kind: EntityKind, start: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            start,
            end,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Interval overlap test on character offsets.
    pub fn overlaps(&self, other: &Span) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }

    /// True when the interval is empty or inverted.
    pub fn is_degenerate(&self) -> bool {
        self.start >= self.end
    }
}

/// Byte/char offset translation for one text.
///
/// Regex matches report byte offsets while spans carry character offsets;
/// this table converts between the two without rescanning the text.
#[derive(Debug, Clone)]
pub struct CharOffsets {
    starts: Vec<usize>,
    byte_len: usize,
}

impl CharOffsets {
    pub fn new(text: &str) -> Self {
        Self {
            starts: text.char_indices().map(|(i, _)| i).collect(),
            byte_len: text.len(),
        }
    }

    /// Number of characters in the text.
    pub fn char_len(&self) -> usize {
        self.starts.len()
    }

    /// Character index of a byte offset (which must lie on a char boundary).
    pub fn to_char(&self, byte: usize) -> usize {
        match self.starts.binary_search(&byte) {
            Ok(idx) | Err(idx) => idx,
        }
    }

    /// Byte offset of a character index; `char_len()` maps to the text length.
    pub fn to_byte(&self, ch: usize) -> Option<usize> {
        if ch == self.starts.len() {
            Some(self.byte_len)
        } else {
            self.starts.get(ch).copied()
        }
    }

    /// Slices `text` by character offsets.
    pub fn slice<'a>(&self, text: &'a str, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        let from = self.to_byte(start)?;
        let to = self.to_byte(end)?;
        text.get(from..to)
    }

    /// Builds a span from a byte range of `text`.
    pub fn span(&self, text: &str, kind: EntityKind, byte_start: usize, byte_end: usize) -> Span {
        Span::new(
            &text[byte_start..byte_end],
            kind,
            self.to_char(byte_start),
            self.to_char(byte_end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(EntityKind::from_label("PER"), EntityKind::Person);
        assert_eq!(EntityKind::from_label("org"), EntityKind::Organization);
        assert_eq!(
            EntityKind::from_label("phone"),
            EntityKind::Other("PHONE".to_string())
        );
        assert_eq!(EntityKind::Organization.to_string(), "ORGANIZATION");
    }

    #[test]
    fn test_overlap() {
        let a = Span::new("Jean Dupont", EntityKind::Person, 8, 19);
        let b = Span::new("Dupont", EntityKind::Person, 13, 19);
        let c = Span::new("at", EntityKind::Person, 19, 21);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_char_offsets_with_accents() {
        let text = "Zoé a 34 ans";
        let offsets = CharOffsets::new(text);
        let byte = text.find("34").unwrap();
        assert_eq!(byte, 7);
        assert_eq!(offsets.to_char(byte), 6);
        assert_eq!(offsets.to_byte(6), Some(7));
        assert_eq!(offsets.slice(text, 6, 12), Some("34 ans"));
        assert_eq!(offsets.to_byte(offsets.char_len()), Some(text.len()));
        assert_eq!(offsets.slice(text, 4, 99), None);
    }
}
