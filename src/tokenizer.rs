//! Zero-copy line and field tokenizing over raw export text.
//!
//! The export is CRLF-delimited records with comma-delimited fields. All
//! tokenizing works on byte spans into the caller's buffer; nothing here
//! allocates or copies. A missing delimiter is a normal signal (end of
//! buffer, terminal field), never an error.

use memchr::{memchr, memmem};

/// Counts CRLF-terminated lines in the buffer.
///
/// Used to pre-size the record array before parsing. Matches exactly the
/// number of spans [`Lines`] will yield for the same buffer, including the
/// header and footer lines that record parsing later skips.
pub fn count_lines(buf: &[u8]) -> usize {
    memmem::find_iter(buf, b"\r\n").count()
}

/// Cursor over CRLF-terminated line spans.
///
/// Yields the content between the cursor and the next CRLF, then advances
/// past the terminator. Trailing bytes without a terminator are not a line
/// and are never yielded.
pub struct Lines<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = memmem::find(rest, b"\r\n")?;
        self.pos += end + 2;
        Some(&rest[..end])
    }
}

/// Cursor over comma-delimited field spans within one line.
///
/// `next` yields the span before the next comma and advances past it.
/// No comma before the line's end is the terminal-field indicator: `next`
/// returns `None` and the unconsumed remainder is available via [`rest`].
///
/// [`rest`]: Fields::rest
pub struct Fields<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Fields<'a> {
    pub fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    /// Resumes field scanning from an absolute offset within the line.
    pub fn from_offset(line: &'a [u8], offset: usize) -> Self {
        Self {
            line,
            pos: offset.min(line.len()),
        }
    }

    /// Returns the unconsumed remainder of the line (the terminal field).
    pub fn rest(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let rest = &self.line[self.pos..];
        let end = memchr(b',', rest)?;
        self.pos += end + 1;
        Some(&rest[..end])
    }
}

/// Finds the closing quote of a quote-delimited leading field.
///
/// The search starts past the first byte (the opening quote), so a path
/// field may contain commas without breaking field extraction. Returns the
/// absolute index of the closing quote, or `None` when the line does not
/// start with a quote or the quote is unterminated.
pub fn closing_quote(line: &[u8]) -> Option<usize> {
    if line.first() != Some(&b'"') {
        return None;
    }
    memchr(b'"', &line[1..]).map(|i| i + 1)
}
