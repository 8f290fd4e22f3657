//! Arena directory tree reconstructed from pre-order export records.
//!
//! All nodes live in one contiguous `Vec`; parent and child links are
//! indices into that arena, so the tree has no ownership cycles and the
//! arena order doubles as the pre-order traversal order.
//!
//! The builder exploits the export's ordering guarantee: a directory entry
//! is immediately followed by the contiguous block of all its descendants,
//! before the next sibling. That makes a plain byte-prefix test on full
//! paths sufficient to find each entry's parent in a single linear pass.
//! The guarantee comes from the scanning tool and is not re-verified here.

use chrono::{DateTime, FixedOffset};
use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thin_vec::ThinVec;

use crate::error::{ExportError, Result};
use crate::record::{FileAttributes, Record};

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

/// A compact 32-bit index into the node arena.
///
/// u32::MAX is reserved as the `OptionNodeIndex` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    /// Index of the root node. The export guarantees the root is the first
    /// record.
    pub const ROOT: Self = Self(0);

    /// Creates a new NodeIndex from a usize.
    ///
    /// # Panics
    /// Panics if `index >= u32::MAX` (reserved for the None sentinel).
    #[inline]
    pub fn new(index: usize) -> Self {
        assert!(
            index < u32::MAX as usize,
            "node index must be less than u32::MAX"
        );
        Self(index as u32)
    }

    /// Returns the index as a usize.
    #[inline]
    pub fn get(&self) -> usize {
        self.0 as usize
    }
}

impl Serialize for NodeIndex {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeIndex {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        if value == u32::MAX {
            return Err(D::Error::custom("NodeIndex cannot be u32::MAX"));
        }
        Ok(Self(value))
    }
}

/// An optional arena index using u32::MAX as the None sentinel.
///
/// Fits in 4 bytes instead of the 8 an `Option<NodeIndex>` would take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct OptionNodeIndex(u32);

impl OptionNodeIndex {
    /// Creates a None value.
    #[inline]
    pub fn none() -> Self {
        Self(u32::MAX)
    }

    /// Creates a Some value from a NodeIndex.
    #[inline]
    pub fn some(index: NodeIndex) -> Self {
        Self(index.0)
    }

    /// Converts to an Option<NodeIndex>.
    #[inline]
    pub fn to_option(self) -> Option<NodeIndex> {
        if self.0 == u32::MAX {
            None
        } else {
            Some(NodeIndex(self.0))
        }
    }
}

impl Default for OptionNodeIndex {
    fn default() -> Self {
        Self::none()
    }
}

impl Serialize for OptionNodeIndex {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OptionNodeIndex {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self(u32::deserialize(deserializer)?))
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// One entry of the reconstructed tree.
///
/// Metadata fields are fixed at parse time; `parent`, `children` and `depth`
/// are populated exactly once by the tree builder and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    path: String,
    size: i64,
    allocated: i64,
    modified: DateTime<FixedOffset>,
    attributes: FileAttributes,
    is_dir: bool,
    parent: OptionNodeIndex,
    children: ThinVec<NodeIndex>,
    depth: u32,
}

impl Node {
    fn from_record(record: Record) -> Self {
        Self {
            path: record.path,
            size: record.size,
            allocated: record.allocated,
            modified: record.modified,
            attributes: record.attributes,
            is_dir: record.is_dir,
            parent: OptionNodeIndex::none(),
            children: ThinVec::new(),
            depth: 0,
        }
    }

    /// Full path as written in the export.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Logical byte size.
    #[inline]
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Bytes allocated on storage.
    #[inline]
    pub fn allocated(&self) -> i64 {
        self.allocated
    }

    /// Last modification time, with UTC offset.
    #[inline]
    pub fn modified(&self) -> DateTime<FixedOffset> {
        self.modified
    }

    /// Attribute flag bits.
    #[inline]
    pub fn attributes(&self) -> FileAttributes {
        self.attributes
    }

    /// Returns true if this entry is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Returns true if this entry is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    /// Index of the containing directory, or None for the root.
    #[inline]
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent.to_option()
    }

    /// Directly contained entries, in export order.
    #[inline]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Distance from the root (root = 0). Cached during construction.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// The reconstructed directory tree over a flat node arena.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Builds the tree from parse-ordered records.
    ///
    /// An empty record set produces an empty tree (building is a no-op).
    /// A root record that is not a directory is a structural violation and
    /// fails fast rather than producing an undefined tree.
    pub fn build(records: Vec<Record>) -> Result<Self> {
        let mut nodes: Vec<Node> = records.into_iter().map(Node::from_record).collect();

        if let Some(root) = nodes.first() {
            if !root.is_dir {
                return Err(ExportError::Structure(format!(
                    "root record {:?} is not a directory",
                    root.path
                )));
            }
            let mut cursor = 0;
            attach(&mut nodes, 0, &mut cursor);
        }

        Ok(Self { nodes })
    }

    /// Number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the export yielded no data records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node (arena index 0).
    pub fn root(&self) -> Result<&Node> {
        self.nodes.first().ok_or(ExportError::NoRecords)
    }

    /// Looks up a node by arena index.
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index.get())
    }

    /// Pre-order traversal of all nodes.
    ///
    /// Arena order is the export's pre-order, so this is a plain pass over
    /// the arena: lazy, finite, and restartable.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Nodes whose path starts with the given prefix, in pre-order.
    pub fn path_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes
            .iter()
            .filter(move |node| node.path.starts_with(prefix))
    }

    /// The node farthest from the root.
    ///
    /// Ties resolve to the first node in arena order. Uses the depth cached
    /// during construction, so the whole query is one linear pass.
    pub fn deepest(&self) -> Option<&Node> {
        let mut best: Option<&Node> = None;
        for node in &self.nodes {
            match best {
                Some(current) if node.depth <= current.depth => {}
                _ => best = Some(node),
            }
        }
        best
    }
}

/// Attaches the descendant block of `dir` by advancing the shared cursor.
///
/// Every slot whose path is prefix-contained in `dir`'s path is a direct
/// child at this level (transitive descendants are consumed by the nested
/// call before the loop resumes). The first non-prefixed slot ends the
/// block: rewind one so the caller re-examines it at its own level.
///
/// Recursion depth equals tree depth; each slot is advanced over exactly
/// once, so total work is linear in the record count.
fn attach(nodes: &mut [Node], dir: usize, cursor: &mut usize) {
    while *cursor + 1 < nodes.len() {
        *cursor += 1;
        let next = *cursor;
        if !nodes[next].path.as_bytes().starts_with(nodes[dir].path.as_bytes()) {
            *cursor -= 1;
            return;
        }

        nodes[next].parent = OptionNodeIndex::some(NodeIndex::new(dir));
        nodes[next].depth = nodes[dir].depth + 1;
        let child = NodeIndex::new(next);
        nodes[dir].children.push(child);

        if nodes[next].is_dir {
            attach(nodes, next, cursor);
        }
    }
}
