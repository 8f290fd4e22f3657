//! Disk-scan export parsing and directory tree reconstruction.
//!
//! This crate consumes the flat, pre-order text export written by an
//! external disk scanning tool and rebuilds the directory tree it implies,
//! without touching the filesystem itself:
//! - Zero-copy line/field tokenizing over the raw export text
//! - Per-line record decoding with silent skip of non-data lines
//! - Single-pass, linear-time tree building from path prefix containment
//! - Arena node storage with index-based parent/child links

pub mod error;
pub mod export;
pub mod record;
pub mod tokenizer;
pub mod tree;

// Re-export main types
pub use error::{ExportError, Result};
pub use export::{parse_export, parse_export_with_stats, ExportSource, ParseStats};
pub use record::{ExportFormat, FileAttributes, Record};
pub use tree::{Node, NodeIndex, Tree};
