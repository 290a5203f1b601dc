//! Edit steps over a character-sequence document and the position mapper.
//!
//! A document is a plain `&str` addressed by *character* gaps: position 0 sits
//! before the first character and position `len` after the last. Steps never
//! validate their arguments when mapping; callers (the session) clamp inputs
//! before constructing them. Only `Step::apply` checks bounds because it has to
//! slice real text.

use thiserror::Error;

pub mod map;
pub mod mapping;

pub use map::{MappingResult, map, map_with_bias};
pub use mapping::Mapping;

/// A gap between characters.
pub type Position = usize;

/// Which side of an insertion a position exactly at the insertion point ends up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bias {
    /// Stay before the inserted content.
    Left,
    /// Move past the inserted content (typing behaviour).
    #[default]
    Right,
}

impl Bias {
    /// Signed form used by step-map style APIs: `-1` left, `1` right.
    pub fn as_signed(self) -> i8 {
        match self {
            Bias::Left => -1,
            Bias::Right => 1,
        }
    }

    /// Any negative value is left, everything else right.
    pub fn from_signed(value: i64) -> Self {
        if value < 0 { Bias::Left } else { Bias::Right }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Bias::Left => "left",
            Bias::Right => "right",
        }
    }
}

/// One atomic edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Insert { from: Position, text: String },
    /// Half-open range `[from, to)`. `Step::delete` orders the bounds; a
    /// literal with `from > to` is read as `[to, from)`.
    Delete { from: Position, to: Position },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("position {pos} is outside document of length {len}")]
    OutOfRange { pos: Position, len: usize },
}

impl Step {
    pub fn insert(from: Position, text: impl Into<String>) -> Self {
        Step::Insert {
            from,
            text: text.into(),
        }
    }

    /// Build a delete, swapping the bounds if they arrive reversed.
    pub fn delete(from: Position, to: Position) -> Self {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        Step::Delete { from, to }
    }

    /// Ordered `(start, end)` of the affected pre-edit range; empty at
    /// `from` for inserts.
    pub fn range(&self) -> (Position, Position) {
        match self {
            Step::Insert { from, .. } => (*from, *from),
            Step::Delete { from, to } => ((*from).min(*to), (*from).max(*to)),
        }
    }

    pub fn from(&self) -> Position {
        self.range().0
    }

    /// End of the affected range in the pre-edit document (`from` for inserts).
    pub fn to(&self) -> Position {
        self.range().1
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Step::Insert { .. })
    }

    /// Number of characters inserted (0 for deletes).
    pub fn inserted_len(&self) -> usize {
        match self {
            Step::Insert { text, .. } => text.chars().count(),
            Step::Delete { .. } => 0,
        }
    }

    /// Number of characters removed (0 for inserts).
    pub fn deleted_len(&self) -> usize {
        match self {
            Step::Insert { .. } => 0,
            Step::Delete { .. } => {
                let (from, to) = self.range();
                to - from
            }
        }
    }

    /// Signed change in document length.
    pub fn size_delta(&self) -> isize {
        self.inserted_len() as isize - self.deleted_len() as isize
    }

    /// True when the step leaves every position (and the document) untouched.
    pub fn is_identity(&self) -> bool {
        match self {
            Step::Insert { text, .. } => text.is_empty(),
            Step::Delete { from, to } => from == to,
        }
    }

    /// Inclusive gap range to highlight on the pre-edit ruler.
    pub fn highlight_range(&self) -> (Position, Position) {
        (self.from(), self.to())
    }

    /// Produce the post-edit document.
    pub fn apply(&self, doc: &str) -> Result<String, StepError> {
        match self {
            Step::Insert { from, text } => {
                let at = byte_offset(doc, *from)?;
                let mut out = String::with_capacity(doc.len() + text.len());
                out.push_str(&doc[..at]);
                out.push_str(text);
                out.push_str(&doc[at..]);
                Ok(out)
            }
            Step::Delete { .. } => {
                let (from, to) = self.range();
                let start = byte_offset(doc, from)?;
                let end = byte_offset(doc, to)?;
                let mut out = String::with_capacity(doc.len() - (end - start));
                out.push_str(&doc[..start]);
                out.push_str(&doc[end..]);
                Ok(out)
            }
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Insert { from, text } => write!(f, "insert \"{text}\" at {from}"),
            Step::Delete { from, to } => write!(f, "delete [{from}, {to})"),
        }
    }
}

/// Byte offset of character gap `pos`, or `OutOfRange` past the end.
fn byte_offset(doc: &str, pos: Position) -> Result<usize, StepError> {
    if pos == 0 {
        return Ok(0);
    }
    match doc.char_indices().nth(pos) {
        Some((idx, _)) => Ok(idx),
        None => {
            let len = doc.chars().count();
            if pos == len {
                Ok(doc.len())
            } else {
                Err(StepError::OutOfRange { pos, len })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_example_document() {
        let step = Step::insert(2, "XYZ");
        assert_eq!(step.apply("HELLO").unwrap(), "HEXYZLLO");
    }

    #[test]
    fn delete_example_document() {
        let step = Step::delete(1, 3);
        assert_eq!(step.apply("HELLO").unwrap(), "HLO");
    }

    #[test]
    fn delete_constructor_normalizes_reversed_range() {
        assert_eq!(Step::delete(4, 1), Step::Delete { from: 1, to: 4 });
    }

    #[test]
    fn reversed_delete_literal_reads_as_ordered_range() {
        let step = Step::Delete { from: 3, to: 1 };
        assert_eq!(step.range(), (1, 3));
        assert_eq!(step.deleted_len(), 2);
        assert_eq!(step.size_delta(), -2);
        assert_eq!(step.highlight_range(), (1, 3));
        assert_eq!(step.apply("HELLO").unwrap(), "HLO");
        assert_eq!(map::map(4, &step).new_pos, 2);
        assert!(map::map(2, &step).deleted);
    }

    #[test]
    fn apply_counts_characters_not_bytes() {
        let step = Step::insert(1, "é");
        assert_eq!(step.apply("añb").unwrap(), "aéñb");
        let del = Step::delete(1, 2);
        assert_eq!(del.apply("añb").unwrap(), "ab");
    }

    #[test]
    fn apply_at_document_end() {
        assert_eq!(Step::insert(5, "!").apply("HELLO").unwrap(), "HELLO!");
        assert_eq!(Step::delete(4, 5).apply("HELLO").unwrap(), "HELL");
    }

    #[test]
    fn apply_rejects_out_of_range() {
        let err = Step::insert(7, "X").apply("HELLO").unwrap_err();
        assert_eq!(err, StepError::OutOfRange { pos: 7, len: 5 });
        assert!(Step::delete(2, 9).apply("HELLO").is_err());
    }

    #[test]
    fn size_delta_matches_length_change() {
        let doc = "HELLO";
        for step in [Step::insert(0, "AB"), Step::delete(1, 4), Step::insert(3, "")] {
            let after = step.apply(doc).unwrap();
            let expected = doc.chars().count() as isize + step.size_delta();
            assert_eq!(after.chars().count() as isize, expected, "{step}");
        }
    }

    #[test]
    fn highlight_for_insert_is_a_single_gap() {
        assert_eq!(Step::insert(3, "XYZ").highlight_range(), (3, 3));
        assert_eq!(Step::delete(1, 3).highlight_range(), (1, 3));
    }

    #[test]
    fn bias_signed_round_trip() {
        assert_eq!(Bias::from_signed(-3), Bias::Left);
        assert_eq!(Bias::from_signed(0), Bias::Right);
        assert_eq!(Bias::Left.as_signed(), -1);
        assert_eq!(Bias::default(), Bias::Right);
    }
}
