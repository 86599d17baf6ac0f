//! Offset to line/column conversion.
//!
//! Lines are split on `\n` and `\r\n`, a `\r\n` pair counting as a single
//! boundary. Columns count UTF-16 code units from the start of the line, the
//! way the TypeScript compiler and editors count them. Offsets are bytes.

use tracing::warn;

/// Zero-based line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LinePos {
    pub row: usize,
    pub col: usize,
}

/// Precomputed line table for one text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// `(line_start, line_len)` for every line, line terminator excluded.
    lines: Vec<(usize, usize)>,
    /// `(end, extra)` for every character longer in UTF-8 than in UTF-16:
    /// its end offset and the extra bytes of all such characters so far.
    wide: Vec<(usize, usize)>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    lines.push((start, i - start));
                    start = i + 1;
                }
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    lines.push((start, i - start));
                    i += 1;
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        lines.push((start, bytes.len() - start));

        let mut wide = Vec::new();
        let mut extra = 0;
        for (offset, c) in text.char_indices().filter(|(_, c)| !c.is_ascii()) {
            extra += c.len_utf8() - c.len_utf16();
            wide.push((offset + c.len_utf8(), extra));
        }

        Self {
            lines,
            wide,
            len: bytes.len(),
        }
    }

    /// Extra UTF-8 bytes of the characters ending at or before `offset`.
    fn extra_before(&self, offset: usize) -> usize {
        let index = self.wide.partition_point(|&(end, _)| end <= offset);
        index.checked_sub(1).map_or(0, |i| self.wide[i].1)
    }

    /// Length in UTF-16 code units of the text between two byte offsets.
    pub fn width(&self, start: usize, end: usize) -> usize {
        let end = end.max(start);
        (end - start) - (self.extra_before(end) - self.extra_before(start))
    }

    /// Locate `offset`, or `None` when it lies past the end of the text.
    ///
    /// An offset that points at a line terminator belongs to the line it ends.
    pub fn locate(&self, offset: usize) -> Option<LinePos> {
        if offset > self.len {
            return None;
        }
        // Last line whose start is <= offset.
        let row = self
            .lines
            .partition_point(|(start, _)| *start <= offset)
            .saturating_sub(1);
        let (start, _) = self.lines[row];
        Some(LinePos {
            row,
            col: self.width(start, offset),
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Text of the zero-based line `row`, without its terminator.
    pub fn line_text<'a>(&self, text: &'a str, row: usize) -> Option<&'a str> {
        let (start, len) = *self.lines.get(row)?;
        text.get(start..start + len)
    }
}

/// Convert a byte offset in `text` into a zero-based row and column.
///
/// Offsets past the end of the text are logged and mapped to `(0, 0)`.
pub fn offset_to_line(text: &str, offset: usize) -> LinePos {
    LineIndex::new(text).locate(offset).unwrap_or_else(|| {
        warn!(offset, len = text.len(), "offset is outside of the text");
        LinePos::default()
    })
}

/// Position of `template_offset` inside a template that itself starts at
/// `embedding_offset` in `file_text`.
///
/// External templates pass an embedding offset of 0 and their own text.
pub fn template_offset_to_line(
    file_text: &str,
    embedding_offset: usize,
    template_offset: usize,
) -> LinePos {
    offset_to_line(file_text, embedding_offset + template_offset)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pos(row: usize, col: usize) -> LinePos {
        LinePos { row, col }
    }

    #[test]
    fn first_line() {
        assert_eq!(offset_to_line("abc\ndef", 0), pos(0, 0));
        assert_eq!(offset_to_line("abc\ndef", 2), pos(0, 2));
    }

    #[test]
    fn newline_belongs_to_the_line_it_ends() {
        assert_eq!(offset_to_line("abc\ndef", 3), pos(0, 3));
        assert_eq!(offset_to_line("abc\ndef", 4), pos(1, 0));
    }

    #[test]
    fn crlf_is_one_boundary() {
        let text = "ab\r\ncd\r\nef";
        assert_eq!(offset_to_line(text, 4), pos(1, 0));
        assert_eq!(offset_to_line(text, 5), pos(1, 1));
        assert_eq!(offset_to_line(text, 8), pos(2, 0));
        assert_eq!(LineIndex::new(text).line_count(), 3);
    }

    #[test]
    fn lone_carriage_return_is_not_a_boundary() {
        assert_eq!(offset_to_line("a\rb\nc", 2), pos(0, 2));
        assert_eq!(offset_to_line("a\rb\nc", 4), pos(1, 0));
    }

    #[test]
    fn empty_lines() {
        let text = "a\n\n\nb";
        assert_eq!(offset_to_line(text, 2), pos(1, 0));
        assert_eq!(offset_to_line(text, 3), pos(2, 0));
        assert_eq!(offset_to_line(text, 4), pos(3, 0));
    }

    #[test]
    fn end_of_text_is_in_range() {
        assert_eq!(offset_to_line("ab\ncd", 5), pos(1, 2));
        assert_eq!(offset_to_line("", 0), pos(0, 0));
    }

    #[test]
    fn out_of_range_maps_to_origin() {
        assert_eq!(offset_to_line("ab\ncd", 6), pos(0, 0));
        assert_eq!(LineIndex::new("ab").locate(3), None);
    }

    #[test]
    fn inline_template_adds_embedding_offset() {
        let file = "@Component({\n  template: `\n<p>{{ flags['x'] }}</p>`\n})";
        let embedding = file.find('`').unwrap() + 1;
        let template = &file[embedding..file.rfind('`').unwrap()];
        let key = template.find("'x'").unwrap();

        let at = template_offset_to_line(file, embedding, key);
        assert_eq!(at, offset_to_line(file, embedding + key));
        assert_eq!(at, pos(2, 12));
    }

    #[test]
    fn external_template_uses_its_own_text() {
        let template = "<div>\n  {{ flags['y'] }}\n</div>\n";
        let key = template.find("'y'").unwrap();
        assert_eq!(template_offset_to_line(template, 0, key), pos(1, 11));
    }

    #[test]
    fn columns_count_utf16_code_units() {
        let text = "// caf\u{e9} \u{1F6A9}\nflags['x']; // \u{e9}\u{e9} ok";
        let index = LineIndex::new(text);
        assert_eq!(index.locate(text.find(" \u{1F6A9}").unwrap()), Some(pos(0, 7)));
        assert_eq!(index.locate(text.find('\n').unwrap()), Some(pos(0, 10)));
        assert_eq!(index.locate(text.find("'x'").unwrap()), Some(pos(1, 6)));
        assert_eq!(index.locate(text.find(" ok").unwrap()), Some(pos(1, 17)));
        assert_eq!(index.width(0, text.find('\n').unwrap()), 10);
    }

    #[test]
    fn line_text_strips_terminators() {
        let text = "one\r\ntwo\nthree";
        let index = LineIndex::new(text);
        assert_eq!(index.line_text(text, 0), Some("one"));
        assert_eq!(index.line_text(text, 1), Some("two"));
        assert_eq!(index.line_text(text, 2), Some("three"));
        assert_eq!(index.line_text(text, 3), None);
    }
}
