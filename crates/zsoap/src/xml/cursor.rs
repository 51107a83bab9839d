//! Byte scanner over XML input

use crate::error::Pos;

/// Scanner over the input bytes, tracking line and column for error spans
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    input: &'a [u8],
    offset: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    pub const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.offset).copied()
    }

    pub fn rest(&self) -> &'a [u8] {
        self.input.get(self.offset..).unwrap_or_default()
    }

    pub const fn is_eof(&self) -> bool {
        self.offset >= self.input.len()
    }

    pub const fn position(&self) -> Pos {
        Pos::new(self.offset, self.line, self.col)
    }

    /// Step over one byte
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.offset += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    /// Consume `expected` if it comes next
    pub fn eat_byte(&mut self, expected: u8) -> bool {
        let found = self.peek() == Some(expected);
        if found {
            self.bump();
        }
        found
    }

    /// Consume `markup` if the input continues with it
    pub fn eat(&mut self, markup: &[u8]) -> bool {
        let found = self.rest().starts_with(markup);
        if found {
            self.skip(markup.len());
        }
        found
    }

    /// Consume bytes while `pred` holds and return them
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let rest = self.rest();
        let len = rest.iter().position(|&b| !pred(b)).unwrap_or(rest.len());
        self.skip(len);
        rest.get(..len).unwrap_or_default()
    }

    /// Consume up to and including `terminator`, returning what precedes it.
    /// `None` when the terminator never appears; nothing is consumed then.
    pub fn take_until(&mut self, terminator: &[u8]) -> Option<&'a [u8]> {
        let rest = self.rest();
        let len = rest
            .windows(terminator.len())
            .position(|window| window == terminator)?;
        self.skip(len + terminator.len());
        rest.get(..len)
    }

    /// XML whitespace: space, tab, CR, LF
    pub fn skip_blanks(&mut self) {
        self.take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'));
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            if self.bump().is_none() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_lines() {
        let mut cursor = Cursor::new(b"  \t\n<a>");
        cursor.skip_blanks();
        assert_eq!(cursor.peek(), Some(b'<'));
        assert_eq!(cursor.position().line, 2);
        assert_eq!(cursor.position().col, 1);
    }

    #[test]
    fn test_eat_markup() {
        let mut cursor = Cursor::new(b"<![CDATA[x]]>");
        assert!(!cursor.eat(b"<!--"));
        assert!(cursor.eat(b"<![CDATA["));
        assert_eq!(cursor.take_until(b"]]>"), Some(&b"x"[..]));
        assert!(cursor.is_eof());
    }

    #[test]
    fn test_unterminated_consumes_nothing() {
        let mut cursor = Cursor::new(b"abc -");
        assert_eq!(cursor.take_until(b"-->"), None);
        assert_eq!(cursor.rest(), b"abc -");
    }

    #[test]
    fn test_take_while() {
        let mut cursor = Cursor::new(b"ns1:item attr");
        let name = cursor.take_while(|b| b != b' ');
        assert_eq!(name, b"ns1:item");
        assert!(cursor.eat_byte(b' '));
        assert!(!cursor.eat_byte(b'z'));
        assert_eq!(cursor.bump(), Some(b'a'));
    }
}
