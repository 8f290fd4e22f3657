//! Export parsing pipeline: raw text in, reconstructed tree out.
//!
//! The pipeline is single-threaded and synchronous: the whole export text
//! is in memory before tokenizing starts, records are decoded in one pass,
//! then the tree is wired in a second pass over the same array. Producing
//! the export (running the scanning tool, waiting for the file, deleting
//! it afterwards) is the caller's job, abstracted behind [`ExportSource`].

use std::path::Path;

use crate::error::{ExportError, Result};
use crate::record::{ExportFormat, Record};
use crate::tokenizer::{count_lines, Lines};
use crate::tree::Tree;

/// Parse diagnostics.
///
/// Skipped lines are recovered-from locally and never abort the parse;
/// the counter keeps the skip observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// CRLF-terminated lines seen, including header and footer.
    pub lines: usize,
    /// Lines decoded into records.
    pub records: usize,
    /// Lines that were not data records (header, footer, malformed).
    pub skipped: usize,
}

/// Parses the full export text and builds the tree.
///
/// The only fatal input condition is total absence of text. Individual
/// lines that fail decoding are skipped; an export with no data records at
/// all yields an empty tree whose `root()` reports the condition.
pub fn parse_export(text: &[u8], format: &ExportFormat) -> Result<Tree> {
    parse_export_with_stats(text, format).map(|(tree, _)| tree)
}

/// Like [`parse_export`], also returning parse diagnostics.
pub fn parse_export_with_stats(
    text: &[u8],
    format: &ExportFormat,
) -> Result<(Tree, ParseStats)> {
    if text.is_empty() {
        return Err(ExportError::EmptyInput);
    }

    let line_count = count_lines(text);
    // Pre-size for every line except the expected non-data ones; malformed
    // lines leave the vector shorter than capacity, which is fine.
    let mut records = Vec::with_capacity(line_count.saturating_sub(format.non_data_lines));
    let mut stats = ParseStats::default();

    for (number, line) in Lines::new(text).enumerate() {
        stats.lines += 1;
        match Record::parse(line, format) {
            Some(record) => {
                stats.records += 1;
                records.push(record);
            }
            None => {
                stats.skipped += 1;
                log::debug!("skipping non-record line {}", number + 1);
            }
        }
    }

    let tree = Tree::build(records)?;
    Ok((tree, stats))
}

/// Collaborator that produces the export text.
///
/// How the text is obtained (subprocess invocation, file watch, network
/// fetch) is up to the implementation; it must return the contents complete
/// and stable.
pub trait ExportSource {
    fn produce_export(&mut self, target: &Path) -> Result<String>;
}

impl Tree {
    /// Obtains an export for `target` from the source and parses it.
    pub fn from_source<S: ExportSource>(
        source: &mut S,
        target: &Path,
        format: &ExportFormat,
    ) -> Result<Self> {
        let text = source.produce_export(target)?;
        parse_export(text.as_bytes(), format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HEADER: &str = "Path,Size,Allocated,Modified,Attributes\r\n";
    const FOOTER: &str = "Total: done\r\n";

    fn fmt() -> ExportFormat {
        ExportFormat::default()
    }

    #[test]
    fn parses_a_small_export() {
        let text = format!(
            "{HEADER}\
             \"C:\\\",0,0,2020-01-01T00:00:00+00:00,0\r\n\
             \"C:\\Foo\\\",0,0,2020-01-01T00:00:00+00:00,0\r\n\
             \"C:\\Foo\\bar.txt\",5,8,2020-01-01T00:00:00+00:00,32\r\n\
             {FOOTER}"
        );

        let (tree, stats) = parse_export_with_stats(text.as_bytes(), &fmt()).unwrap();
        assert_eq!(stats.lines, 5);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.skipped, 2);

        let root = tree.root().unwrap();
        assert_eq!(root.path(), "C:\\");
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn malformed_line_is_dropped_and_parsing_continues() {
        let text = "\"C:\\\",0,0,2020-01-01T00:00:00+00:00,0\r\n\
                    \"C:\\Bad,1,2,notadate,0\r\n\
                    \"C:\\ok.txt\",1,2,2020-01-01T00:00:00+00:00,0\r\n";

        let (tree, stats) = parse_export_with_stats(text.as_bytes(), &fmt()).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped, 1);

        let paths: Vec<_> = tree.iter().map(|n| n.path()).collect();
        assert_eq!(paths, vec!["C:\\", "C:\\ok.txt"]);
    }

    #[test]
    fn empty_text_is_fatal() {
        assert!(matches!(
            parse_export(b"", &fmt()),
            Err(ExportError::EmptyInput)
        ));
    }

    #[test]
    fn header_and_footer_only_yield_an_empty_tree() {
        let text = format!("{HEADER}{FOOTER}");
        let (tree, stats) = parse_export_with_stats(text.as_bytes(), &fmt()).unwrap();
        assert!(tree.is_empty());
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.records, 0);
        assert!(matches!(tree.root(), Err(ExportError::NoRecords)));
    }

    #[test]
    fn truncated_final_line_is_ignored() {
        let text = "\"C:\\\",0,0,2020-01-01T00:00:00+00:00,0\r\n\
                    \"C:\\cut.txt\",1,1,2020-01-01T00:00:0";

        let tree = parse_export(text.as_bytes(), &fmt()).unwrap();
        assert_eq!(tree.len(), 1);
    }

    struct FixedSource(String);

    impl ExportSource for FixedSource {
        fn produce_export(&mut self, _target: &Path) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn tree_from_source() {
        let text = format!(
            "{HEADER}\"C:\\\",0,0,2020-01-01T00:00:00+00:00,0\r\n{FOOTER}"
        );
        let mut source = FixedSource(text);
        let tree = Tree::from_source(&mut source, &PathBuf::from("C:\\"), &fmt()).unwrap();
        assert_eq!(tree.root().unwrap().path(), "C:\\");
    }
}
