//! Export record format and per-line decoding.
//!
//! One data line per filesystem entry:
//!
//! ```text
//! "<path>",<size>,<allocated>,<modified>,<attributes>
//! ```
//!
//! The path field is quote-delimited and may itself contain commas, so its
//! end is the second quote in the line, not a comma boundary. A line that
//! fails any decode step is not a data record (the header and footer lines
//! fail this way by construction) and is skipped, never an error.

use bitflags::bitflags;
use chrono::{DateTime, FixedOffset};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::tokenizer::{closing_quote, Fields};

// ---------------------------------------------------------------------------
// Attribute flags
// ---------------------------------------------------------------------------

bitflags! {
    /// File attribute bits as written by the scanning tool.
    ///
    /// Values match the Windows file attribute constants. Bits outside the
    /// named set are preserved opaquely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FileAttributes: u32 {
        const READ_ONLY  = 0x0001;
        const HIDDEN     = 0x0002;
        const SYSTEM     = 0x0004;
        const ARCHIVE    = 0x0020;
        const COMPRESSED = 0x0800;
    }
}

impl Serialize for FileAttributes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileAttributes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_bits_retain(u32::deserialize(deserializer)?))
    }
}

// ---------------------------------------------------------------------------
// Export format configuration
// ---------------------------------------------------------------------------

/// Shape of the export the scanning tool produces.
#[derive(Debug, Clone, Copy)]
pub struct ExportFormat {
    /// Directory separator byte; a path ending in it marks a directory.
    pub separator: u8,
    /// Header and footer lines that are not data records. Only used to
    /// pre-size record storage; a different export configuration must
    /// adjust this.
    pub non_data_lines: usize,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self {
            separator: b'\\',
            non_data_lines: 2,
        }
    }
}

impl ExportFormat {
    /// Format with a custom directory separator.
    pub fn with_separator(separator: u8) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One decoded export entry, before tree linking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Full path as written in the export. Non-empty; a trailing separator
    /// marks a directory.
    pub path: String,
    /// Logical byte size.
    pub size: i64,
    /// Bytes allocated on storage. May differ from `size` for sparse or
    /// compressed files.
    pub allocated: i64,
    /// Last modification time, with UTC offset.
    pub modified: DateTime<FixedOffset>,
    /// Attribute flag bits.
    pub attributes: FileAttributes,
    /// Whether the path carried a trailing separator.
    pub is_dir: bool,
}

impl Record {
    /// Decodes one line span into a record.
    ///
    /// Returns `None` for anything that is not a well-formed data record:
    /// missing or unterminated quotes, non-numeric size/allocated/attribute
    /// fields, unparseable timestamps, empty paths. The caller skips such
    /// lines and continues.
    pub fn parse(line: &[u8], format: &ExportFormat) -> Option<Self> {
        let quote = closing_quote(line)?;
        let path = std::str::from_utf8(&line[1..quote]).ok()?;
        if path.is_empty() {
            return None;
        }
        // The closing quote must be followed by the field delimiter.
        if line.get(quote + 1) != Some(&b',') {
            return None;
        }
        let is_dir = path.as_bytes().last() == Some(&format.separator);

        let mut fields = Fields::from_offset(line, quote + 2);
        let size: i64 = parse_field(fields.next()?)?;
        let allocated: i64 = parse_field(fields.next()?)?;
        let modified = std::str::from_utf8(fields.next()?)
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?;
        let bits: u32 = parse_field(fields.rest())?;

        Some(Self {
            path: path.to_string(),
            size,
            allocated,
            modified,
            attributes: FileAttributes::from_bits_retain(bits),
            is_dir,
        })
    }

    /// Re-serializes the record in the export's line format (without the
    /// CRLF terminator). Parsing the result reproduces the record exactly.
    pub fn to_line(&self) -> String {
        format!(
            "\"{}\",{},{},{},{}",
            self.path,
            self.size,
            self.allocated,
            self.modified.to_rfc3339(),
            self.attributes.bits()
        )
    }
}

fn parse_field<T: std::str::FromStr>(field: &[u8]) -> Option<T> {
    std::str::from_utf8(field).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt() -> ExportFormat {
        ExportFormat::default()
    }

    #[test]
    fn parse_file_record() {
        let line = b"\"C:\\Foo\\bar.txt\",5,8,2020-01-01T00:00:00+00:00,32";
        let record = Record::parse(line, &fmt()).unwrap();
        assert_eq!(record.path, "C:\\Foo\\bar.txt");
        assert_eq!(record.size, 5);
        assert_eq!(record.allocated, 8);
        assert_eq!(record.modified.to_rfc3339(), "2020-01-01T00:00:00+00:00");
        assert_eq!(record.attributes, FileAttributes::ARCHIVE);
        assert!(!record.is_dir);
    }

    #[test]
    fn parse_directory_record() {
        let line = b"\"C:\\Foo\\\",0,0,2020-01-01T00:00:00+00:00,0";
        let record = Record::parse(line, &fmt()).unwrap();
        assert!(record.is_dir);
        assert_eq!(record.attributes, FileAttributes::empty());
    }

    #[test]
    fn path_may_contain_commas() {
        let line = b"\"C:\\a, b\\c.txt\",1,1,2021-06-05T12:30:00+02:00,0";
        let record = Record::parse(line, &fmt()).unwrap();
        assert_eq!(record.path, "C:\\a, b\\c.txt");
    }

    #[test]
    fn unterminated_quote_is_not_a_record() {
        assert!(Record::parse(b"\"C:\\Bad,1,2,notadate,0", &fmt()).is_none());
    }

    #[test]
    fn header_and_footer_are_not_records() {
        assert!(Record::parse(b"Path,Size,Allocated,Modified,Attributes", &fmt()).is_none());
        assert!(Record::parse(b"Total: 3 entries", &fmt()).is_none());
    }

    #[test]
    fn bad_fields_invalidate_the_record() {
        let fmt = fmt();
        // non-numeric size
        assert!(Record::parse(b"\"C:\\a\",x,0,2020-01-01T00:00:00+00:00,0", &fmt).is_none());
        // non-numeric allocated
        assert!(Record::parse(b"\"C:\\a\",0,x,2020-01-01T00:00:00+00:00,0", &fmt).is_none());
        // unparseable timestamp
        assert!(Record::parse(b"\"C:\\a\",0,0,notadate,0", &fmt).is_none());
        // non-numeric attributes
        assert!(Record::parse(b"\"C:\\a\",0,0,2020-01-01T00:00:00+00:00,x", &fmt).is_none());
        // empty path
        assert!(Record::parse(b"\"\",0,0,2020-01-01T00:00:00+00:00,0", &fmt).is_none());
        // missing comma after the closing quote
        assert!(Record::parse(b"\"C:\\a\"0,0,2020-01-01T00:00:00+00:00,0", &fmt).is_none());
        // trailing extra field folds into attributes and fails
        assert!(Record::parse(b"\"C:\\a\",0,0,2020-01-01T00:00:00+00:00,0,9", &fmt).is_none());
    }

    #[test]
    fn round_trip_preserves_fields() {
        let lines: &[&[u8]] = &[
            b"\"C:\\\",0,0,2020-01-01T00:00:00+00:00,0",
            b"\"C:\\Foo\\bar.txt\",5,8,2019-12-31T23:59:59+05:30,2081",
            b"\"C:\\neg\",-1,-1,2020-02-29T01:02:03-08:00,4294901760",
        ];
        for line in lines {
            let record = Record::parse(line, &fmt()).unwrap();
            assert_eq!(record.to_line().as_bytes(), *line);
            let reparsed = Record::parse(record.to_line().as_bytes(), &fmt()).unwrap();
            assert_eq!(reparsed, record);
        }
    }

    #[test]
    fn unknown_attribute_bits_are_preserved() {
        let attrs = FileAttributes::from_bits_retain(0xFFFF_0001);
        assert!(attrs.contains(FileAttributes::READ_ONLY));
        assert_eq!(attrs.bits(), 0xFFFF_0001);
    }

    #[test]
    fn custom_separator() {
        let fmt = ExportFormat::with_separator(b'/');
        let record = Record::parse(b"\"/var/log/\",0,0,2020-01-01T00:00:00+00:00,0", &fmt).unwrap();
        assert!(record.is_dir);
    }

    #[test]
    fn attributes_serde_as_raw_bits() {
        let attrs = FileAttributes::from_bits_retain(0x0821);
        let json = serde_json::to_string(&attrs).unwrap();
        assert_eq!(json, "2081");
        let back: FileAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attrs);
    }
}
