//! Byte cursor over assembly source.
//!
//! The grammar is ASCII-only (`original_source/src/asm.c`'s `IS_TOKEN_*`
//! macros never look past byte 127), so unlike `faxc-lex::Cursor` this
//! one indexes by byte rather than by `char` - there is no multi-byte
//! case to fall back on.

pub struct Cursor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Cursor { source, bytes: source.as_bytes(), position: 0, line: 0, column: 0 }
    }

    /// Byte at the cursor, or `\0` at end of input (matches the C source's
    /// NUL-terminated-string sentinel).
    #[inline]
    pub fn current(&self) -> u8 {
        self.peek(0)
    }

    #[inline]
    pub fn peek(&self, offset: usize) -> u8 {
        *self.bytes.get(self.position + offset).unwrap_or(&0)
    }

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    /// Advance by one byte, tracking line/column. `\n` starts a new line;
    /// callers are expected to consume the newline itself via this, not
    /// `advance_n`, so line tracking stays correct.
    #[inline]
    pub fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.bytes[self.position] == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    pub fn advance_n(&mut self, count: usize) {
        for _ in 0..count {
            if self.is_at_end() {
                break;
            }
            self.advance();
        }
    }

    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_line_and_column() {
        let mut c = Cursor::new("ab\ncd");
        assert_eq!((c.line(), c.column()), (0, 0));
        c.advance_n(3); // "ab\n"
        assert_eq!((c.line(), c.column()), (1, 0));
        c.advance();
        assert_eq!((c.line(), c.column()), (1, 1));
    }

    #[test]
    fn current_is_nul_at_end() {
        let mut c = Cursor::new("a");
        c.advance();
        assert_eq!(c.current(), 0);
        assert!(c.is_at_end());
    }

    #[test]
    fn slice_from_captures_consumed_text() {
        let mut c = Cursor::new("label   ");
        let start = c.position();
        c.advance_n(5);
        assert_eq!(c.slice_from(start), "label");
    }
}
