//! Character rulers and gap pointers.
//!
//! Each character sits in a box `| c ` whose width is the character's display
//! width plus three border/padding columns. Gap `i` is drawn on the border
//! column before character `i`; every index, range marker and pointer is
//! placed on those measured columns.

use crate::{RenderOptions, Tone, paint};
use unicode_width::UnicodeWidthChar;

/// Columns a one-column character occupies, border included.
pub const CELL: usize = 4;

/// Display width of `c` inside a cell. Zero-width and control characters
/// still get one column so every box stays visible.
pub fn char_cols(c: char) -> usize {
    c.width().unwrap_or(1).max(1)
}

/// Column layout of one document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ruler {
    chars: Vec<char>,
    /// `gap_cols[i]` is the terminal column of gap `i`; `len + 1` entries.
    gap_cols: Vec<usize>,
}

impl Ruler {
    pub fn new(content: &str) -> Self {
        let chars: Vec<char> = content.chars().collect();
        let mut gap_cols = Vec::with_capacity(chars.len() + 1);
        let mut col = 0;
        gap_cols.push(col);
        for &c in &chars {
            col += char_cols(c) + CELL - 1;
            gap_cols.push(col);
        }
        Self { chars, gap_cols }
    }

    /// Number of characters (the last gap index).
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Column of gap `pos`, clamped to the last gap.
    pub fn col(&self, pos: usize) -> usize {
        self.gap_cols[pos.min(self.len())]
    }

    /// Box row for the characters, e.g. `| H | E |`.
    pub fn cells_line(&self) -> String {
        let mut s = String::with_capacity(1 + self.chars.len() * CELL);
        s.push('|');
        for &c in &self.chars {
            s.push(' ');
            s.push(c);
            s.push_str(" |");
        }
        s
    }

    /// Gap indices under the box borders. Indices inside `highlight`
    /// (inclusive) are painted when colour is on. A label wider than its
    /// cell pushes the next one right by a single space.
    pub fn index_line(&self, highlight: Option<(usize, usize)>, opts: &RenderOptions) -> String {
        let mut s = String::with_capacity(self.col(self.len()) + 4);
        let mut cursor = 0;
        for (i, &target) in self.gap_cols.iter().enumerate() {
            if i > 0 {
                let pad = target.saturating_sub(cursor).max(1);
                s.push_str(&" ".repeat(pad));
                cursor += pad;
            }
            let label = i.to_string();
            let lit = highlight.is_some_and(|(a, b)| i >= a && i <= b);
            if lit {
                s.push_str(&paint(&label, Tone::Highlight, opts));
            } else {
                s.push_str(&label);
            }
            cursor += label.len();
        }
        s
    }

    /// Marker row for an inclusive gap range: `+` for an empty range,
    /// `[===]` spanning the columns otherwise.
    pub fn range_line(&self, start: usize, end: usize, opts: &RenderOptions) -> String {
        let from = self.col(start);
        let to = self.col(end);
        let mut s = " ".repeat(from);
        let marker = if to <= from {
            "+".to_string()
        } else {
            format!("[{}]", "=".repeat(to - from - 1))
        };
        s.push_str(&paint(&marker, Tone::Highlight, opts));
        s
    }

    /// `^` under gap `pos` followed by `label`.
    pub fn pointer_line(&self, pos: usize, label: &str, tone: Tone, opts: &RenderOptions) -> String {
        let mut s = " ".repeat(self.col(pos));
        s.push_str(&paint(&format!("^ {label}"), tone, opts));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use unicode_width::UnicodeWidthStr;

    fn plain() -> RenderOptions {
        RenderOptions { color: false }
    }

    /// Display columns of every `|` in a cells line.
    fn border_cols(line: &str) -> Vec<usize> {
        let mut cols = Vec::new();
        let mut col = 0;
        for c in line.chars() {
            if c == '|' {
                cols.push(col);
            }
            col += c.width().unwrap_or(0);
        }
        cols
    }

    /// Display columns where each index label starts.
    fn label_cols(line: &str) -> Vec<usize> {
        let mut cols = Vec::new();
        let mut prev_space = true;
        for (col, c) in line.chars().enumerate() {
            if c != ' ' && prev_space {
                cols.push(col);
            }
            prev_space = c == ' ';
        }
        cols
    }

    #[test]
    fn cells_and_indices_line_up() {
        let r = Ruler::new("HELLO");
        assert_eq!(r.cells_line(), "| H | E | L | L | O |");
        assert_eq!(r.index_line(None, &plain()), "0   1   2   3   4   5");
    }

    #[test]
    fn empty_document_has_one_gap() {
        let r = Ruler::new("");
        assert!(r.is_empty());
        assert_eq!(r.cells_line(), "|");
        assert_eq!(r.index_line(None, &plain()), "0");
    }

    #[test]
    fn two_digit_indices_keep_the_grid() {
        let line = Ruler::new("ABCDEFGHIJK").index_line(None, &plain());
        assert_eq!(line.find("10"), Some(10 * CELL));
        assert_eq!(line.find("11"), Some(11 * CELL));
    }

    #[test]
    fn wide_characters_keep_borders_over_gaps() {
        let r = Ruler::new("你好a");
        let cells = r.cells_line();
        assert_eq!(border_cols(&cells), vec![0, 5, 10, 14]);
        assert_eq!(cells.width(), 15);
        assert_eq!(label_cols(&r.index_line(None, &plain())), vec![0, 5, 10, 14]);
        assert_eq!(r.range_line(1, 2, &plain()), "     [====]");
        assert_eq!(
            r.pointer_line(2, "cursor 2", Tone::Cursor, &plain()),
            "          ^ cursor 2"
        );
    }

    #[test]
    fn range_markers() {
        let r = Ruler::new("HELLO");
        assert_eq!(r.range_line(2, 2, &plain()), "        +");
        assert_eq!(r.range_line(1, 3, &plain()), "    [=======]");
    }

    #[test]
    fn pointer_sits_under_gap() {
        let r = Ruler::new("HELLO");
        assert_eq!(
            r.pointer_line(2, "cursor 2", Tone::Cursor, &plain()),
            "        ^ cursor 2"
        );
        // out-of-range gaps clamp to the end
        assert_eq!(r.col(99), r.col(5));
    }

    #[test]
    fn colour_wraps_highlight_in_escape_codes() {
        let opts = RenderOptions { color: true };
        let line = Ruler::new("HI").range_line(0, 0, &opts);
        assert!(line.contains('\u{1b}'));
        assert!(line.contains('+'));
    }
}
