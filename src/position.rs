// SPDX-License-Identifier: SEE LICENSE IN LICENSE.md
// SPDX-FileCopyrightText: 2023 CYBERTEC PostgreSQL International GmbH
// <office@cybertec.at>

//! Byte-offset/line-column conversion for editor-facing diagnostics.
//!
//! Byte offsets are 0-based and used everywhere internally (lexemes, AST
//! node spans). Line/column pairs are 1-based, for editor parity, and only
//! ever computed at the boundary when a caller asks for one.

use unicode_width::UnicodeWidthChar;

/// A 1-based line/column pair, as consumed by editors (LSP, IntelliSense).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// Converts a 0-based byte offset into a 1-based line/column pair.
///
/// `\n` is treated as the sole line separator, per spec. Column accounting
/// uses display width (so that wide CJK characters occupying a quoted
/// identifier still line up in a fixed-width editor).
pub fn byte_offset_to_line_col(text: &str, offset: usize) -> LineCol {
    let offset = offset.min(text.len());
    let mut line = 1usize;
    let mut column = 1usize;

    for ch in text[..offset].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += ch.width().unwrap_or(0).max(1);
        }
    }

    LineCol { line, column }
}

/// Converts a 1-based line/column pair back into a 0-based byte offset.
/// Returns `None` if the line or column does not exist in `text`.
pub fn line_col_to_byte_offset(text: &str, pos: LineCol) -> Option<usize> {
    if pos.line == 0 || pos.column == 0 {
        return None;
    }

    let mut line = 1usize;
    let mut column = 1usize;
    let mut offset = 0usize;

    for ch in text.chars() {
        if line == pos.line && column == pos.column {
            return Some(offset);
        }
        if ch == '\n' {
            if line == pos.line {
                // Requested column is past the end of this line.
                return None;
            }
            line += 1;
            column = 1;
        } else {
            column += ch.width().unwrap_or(0).max(1);
        }
        offset += ch.len_utf8();
    }

    if line == pos.line && column == pos.column {
        Some(offset)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_first_column() {
        let pos = byte_offset_to_line_col("select 1", 0);
        assert_eq!(pos, LineCol { line: 1, column: 1 });
    }

    #[test]
    fn crosses_newline() {
        let text = "select 1\nfrom t";
        let pos = byte_offset_to_line_col(text, text.find("from").unwrap());
        assert_eq!(pos, LineCol { line: 2, column: 1 });
    }

    #[test]
    fn round_trips() {
        let text = "select a,\n       b\nfrom t";
        let offset = text.find('b').unwrap();
        let pos = byte_offset_to_line_col(text, offset);
        assert_eq!(line_col_to_byte_offset(text, pos), Some(offset));
    }
}
