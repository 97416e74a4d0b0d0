//! Char-indexed text primitives shared by every text host.
//!
//! All offsets in this crate count Unicode scalar values (`char`s) from the
//! start of the string, never bytes. Surfaces, triggers and the session engine
//! exchange offsets in this unit so a caret position read from one surface can
//! be fed straight back into a `Buffer` edit.

use ropey::Rope;
use std::fmt;

pub mod geometry;

pub use geometry::Rect;

/// A text buffer backed by a `ropey::Rope`, addressed by char offsets.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    rope: Rope,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Content may be user text; only the size is reported.
        f.debug_struct("Buffer")
            .field("len_chars", &self.rope.len_chars())
            .finish()
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl From<&str> for Buffer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Buffer {
    pub fn new(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
        }
    }

    /// Number of chars in the buffer.
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Owned copy of the char range `[start,end)`, clamped to the buffer.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let len = self.rope.len_chars();
        let e = end.min(len);
        let s = start.min(e);
        self.rope.slice(s..e).to_string()
    }

    /// Char immediately before `idx`, if any.
    pub fn char_before(&self, idx: usize) -> Option<char> {
        if idx == 0 || idx > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.char(idx - 1))
    }

    /// Replace the char range `[start,end)` with `text`. Offsets are clamped and
    /// normalized so `start <= end`. Returns the char offset just past the
    /// inserted text.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> usize {
        let len = self.rope.len_chars();
        let mut s = start.min(len);
        let mut e = end.min(len);
        if s > e {
            std::mem::swap(&mut s, &mut e);
        }
        if s < e {
            self.rope.remove(s..e);
        }
        self.rope.insert(s, text);
        s + char_len(text)
    }

    /// Insert `text` at `idx` (clamped). Returns the offset past the insertion.
    pub fn insert(&mut self, idx: usize, text: &str) -> usize {
        self.replace(idx, idx, text)
    }

    /// Replace the whole content.
    pub fn set(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
    }
}

/// Char count of `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the char offset `idx` in `s`, clamped to `s.len()`.
pub fn char_to_byte(s: &str, idx: usize) -> usize {
    s.char_indices().nth(idx).map(|(b, _)| b).unwrap_or(s.len())
}

/// Char offset of the byte index `byte` in `s`. `byte` must sit on a char boundary.
pub fn byte_to_char(s: &str, byte: usize) -> usize {
    s[..byte.min(s.len())].chars().count()
}

/// Borrow the char range `[start,end)` of `s`, clamped.
pub fn slice_chars(s: &str, start: usize, end: usize) -> &str {
    let e = char_to_byte(s, end);
    let b = char_to_byte(s, start).min(e);
    &s[b..e]
}

/// Return `s` with the char range `[start,end)` replaced by `with`.
pub fn replace_chars(s: &str, start: usize, end: usize, with: &str) -> String {
    let e = char_to_byte(s, end);
    let b = char_to_byte(s, start).min(e);
    let mut out = String::with_capacity(s.len() - (e - b) + with.len());
    out.push_str(&s[..b]);
    out.push_str(with);
    out.push_str(&s[e..]);
    out
}

/// Offset just past the last whitespace char before `cursor` (0 when the
/// prefix contains no whitespace). Everything in `[result, cursor)` is the
/// partially typed word under the caret.
pub fn word_start_before(s: &str, cursor: usize) -> usize {
    let prefix = slice_chars(s, 0, cursor);
    match prefix.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
        Some((byte, c)) => byte_to_char(prefix, byte + c.len_utf8()),
        None => 0,
    }
}

/// Collapse every run of line breaks (`\n`, `\r\n`, `\r`) into one space.
pub fn collapse_newlines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_break = false;
    for c in s.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(c);
            in_break = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_replace_returns_end_of_insertion() {
        let mut b = Buffer::new("AI:Gre");
        let end = b.replace(0, 6, "Hello World!");
        assert_eq!(b.to_string(), "Hello World!");
        assert_eq!(end, 12);
    }

    #[test]
    fn buffer_replace_clamps_and_orders_range() {
        let mut b = Buffer::new("abc");
        let end = b.replace(10, 1, "X");
        assert_eq!(b.to_string(), "aX");
        assert_eq!(end, 2);
    }

    #[test]
    fn buffer_is_char_indexed() {
        let mut b = Buffer::new("h\u{e9}llo");
        assert_eq!(b.len_chars(), 5);
        assert_eq!(b.slice(1, 3), "\u{e9}l");
        assert_eq!(b.char_before(2), Some('\u{e9}'));
        b.insert(2, "\u{1F600}");
        assert_eq!(b.to_string(), "h\u{e9}\u{1F600}llo");
    }

    #[test]
    fn debug_hides_content() {
        let b = Buffer::new("secret");
        assert!(!format!("{b:?}").contains("secret"));
    }

    #[test]
    fn slice_and_replace_chars_handle_multibyte() {
        let s = "\u{e4}\u{f6}\u{fc} xyz";
        assert_eq!(slice_chars(s, 1, 3), "\u{f6}\u{fc}");
        assert_eq!(replace_chars(s, 0, 3, "abc"), "abc xyz");
        assert_eq!(slice_chars(s, 5, 100), "yz");
        assert_eq!(slice_chars(s, 9, 4), "");
    }

    #[test]
    fn word_start_before_finds_partial_word() {
        assert_eq!(word_start_before("say hel", 7), 4);
        assert_eq!(word_start_before("hel", 3), 0);
        assert_eq!(word_start_before("a b\tc", 5), 4);
        assert_eq!(word_start_before("trailing ", 9), 9);
        assert_eq!(word_start_before("one two", 3), 0);
    }

    proptest::proptest! {
        #[test]
        fn buffer_replace_agrees_with_string_helper(
            text in "[a-z\u{e9} ]{0,24}",
            a in 0usize..30,
            b in 0usize..30,
            with in "[A-Z]{0,5}",
        ) {
            let (start, end) = (a.min(b), a.max(b));
            let mut buf = Buffer::new(&text);
            buf.replace(start, end, &with);
            proptest::prop_assert_eq!(buf.to_string(), replace_chars(&text, start, end, &with));
        }
    }

    #[test]
    fn collapse_newlines_merges_runs() {
        assert_eq!(collapse_newlines("a\nb"), "a b");
        assert_eq!(collapse_newlines("a\r\n\r\nb\n"), "a b ");
        assert_eq!(collapse_newlines("plain"), "plain");
    }
}
