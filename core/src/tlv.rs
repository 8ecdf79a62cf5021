//! BER-TLV support for EMV data objects.
//!
//! A [`TlvDb`] is a forest of records parsed from one buffer. All nodes live in an arena owned by
//! the forest and are addressed with [`NodeId`]s, so a node can point back at its parent without
//! owning it. Ids are only meaningful for the forest that handed them out.

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    #[error("Buffer ended in the middle of a tag")]
    TruncatedTag,

    #[error("Buffer ended in the middle of a length")]
    TruncatedLength,

    #[error("Declared length {declared} exceeds the {remaining} octets left in the buffer")]
    Truncated { declared: usize, remaining: usize },

    #[error("Tags longer than 3 octets are not supported")]
    TagTooLong,

    #[error("Length fields of {0} octets are not supported")]
    LengthTooLong(usize),

    #[error("Indefinite lengths are not supported")]
    IndefiniteLength,

    #[error("Records nested deeper than {0} levels are not supported")]
    TooDeep(usize),

    #[error("{0} octets left over after the record")]
    TrailingData(usize),
}

pub type Result<T> = std::result::Result<T, TlvError>;

const MAX_TAG_SIZE: usize = 3;
const MAX_LENGTH_SIZE: usize = 4;

/// Deepest nesting accepted by the parser, the top level being depth 0.
pub const MAX_DEPTH: usize = 32;

/// A tag number, kept as the big-endian value of its 1 to 3 octets (e.g. `0xBF0C`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Tag(pub u32);

impl Tag {
    /// Number of octets the tag takes on the wire.
    pub fn size(self) -> usize {
        match self.0 {
            0..=0xFF => 1,
            0x100..=0xFFFF => 2,
            _ => 3,
        }
    }

    /// The leading octet, which carries the class and the constructed bit.
    pub fn first_octet(self) -> u8 {
        (self.0 >> (8 * (self.size() - 1))) as u8
    }

    /// Whether records with this tag contain other records.
    pub fn is_constructed(self) -> bool {
        self.first_octet() & 0x20 != 0
    }

    pub fn to_bytes(self) -> Vec<u8> {
        debug_assert!(self.0 <= 0xFF_FFFF, "tag {:X} is longer than 3 octets", self.0);
        self.0.to_be_bytes()[4 - self.size()..].to_vec()
    }
}

impl From<u32> for Tag {
    fn from(tag: u32) -> Self {
        Self(tag)
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0width$X}", self.0, width = self.size() * 2)
    }
}

/// Handle of a node inside a [`TlvDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single record of the forest.
#[derive(Debug, Clone)]
pub struct Tlv {
    tag: Tag,
    len: usize,
    value: Vec<u8>,
    constructed: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Tlv {
    fn primitive(tag: Tag, value: Vec<u8>, parent: Option<NodeId>) -> Self {
        Self {
            tag,
            len: value.len(),
            value,
            constructed: false,
            parent,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The declared length of the value, in octets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value octets of a primitive record. Empty for constructed ones.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Whether the record has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Cursor over a buffer of BER-TLV data.
struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    fn next(&mut self) -> Option<u8> {
        let byte = *self.buffer.get(self.cursor)?;
        self.cursor += 1;
        Some(byte)
    }

    fn read(&mut self, length: usize) -> Option<&'a [u8]> {
        if length > self.remaining() {
            return None;
        }

        let bytes = &self.buffer[self.cursor..self.cursor + length];
        self.cursor += length;
        Some(bytes)
    }

    fn read_tag(&mut self) -> Result<Tag> {
        let head = self.next().ok_or(TlvError::TruncatedTag)?;
        let mut tag = head as u32;
        if head & 0x1f != 0x1f {
            return Ok(Tag(tag));
        }

        for _ in 1..MAX_TAG_SIZE {
            let byte = self.next().ok_or(TlvError::TruncatedTag)?;
            tag = (tag << 8) | byte as u32;
            if byte & 0x80 == 0 {
                return Ok(Tag(tag));
            }
        }

        Err(TlvError::TagTooLong)
    }

    fn read_length(&mut self) -> Result<usize> {
        let head = self.next().ok_or(TlvError::TruncatedLength)?;
        if head & 0x80 == 0 {
            return Ok(head as usize);
        }

        let size = (head & 0x7f) as usize;
        if size == 0 {
            return Err(TlvError::IndefiniteLength);
        }
        if size > MAX_LENGTH_SIZE {
            return Err(TlvError::LengthTooLong(size));
        }

        let bytes = self.read(size).ok_or(TlvError::TruncatedLength)?;
        Ok(bytes
            .iter()
            .fold(0usize, |length, byte| (length << 8) | *byte as usize))
    }
}

fn write_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// An ordered forest of TLV records.
#[derive(Debug, Clone, Default)]
pub struct TlvDb {
    nodes: Vec<Tlv>,
    roots: Vec<NodeId>,
}

impl TlvDb {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Default::default()
    }

    /// Parses a buffer holding exactly one record.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut db = Self::new();
        let mut reader = Reader::new(buf);

        let root = db.parse_one(&mut reader, None, 0)?;
        if reader.remaining() > 0 {
            return Err(TlvError::TrailingData(reader.remaining()));
        }

        db.roots.push(root);
        Ok(db)
    }

    /// Parses a buffer holding any number of concatenated records.
    pub fn parse_multi(buf: &[u8]) -> Result<Self> {
        let mut db = Self::new();
        let mut reader = Reader::new(buf);

        while reader.remaining() > 0 {
            let root = db.parse_one(&mut reader, None, 0)?;
            db.roots.push(root);
        }

        Ok(db)
    }

    /// Builds a forest of a single primitive record from the value.
    /// The tag must be a primitive one.
    pub fn fixed(tag: Tag, value: &[u8]) -> Self {
        debug_assert!(!tag.is_constructed(), "tag {} is constructed", tag);

        let mut db = Self::new();
        let root = db.push(Tlv::primitive(tag, value.to_vec(), None));
        db.roots.push(root);
        db
    }

    fn push(&mut self, node: Tlv) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn parse_one(
        &mut self,
        reader: &mut Reader,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        if depth > MAX_DEPTH {
            return Err(TlvError::TooDeep(MAX_DEPTH));
        }

        let tag = reader.read_tag()?;
        let len = reader.read_length()?;
        let remaining = reader.remaining();
        let value = reader.read(len).ok_or(TlvError::Truncated {
            declared: len,
            remaining,
        })?;

        if !tag.is_constructed() {
            return Ok(self.push(Tlv::primitive(tag, value.to_vec(), parent)));
        }

        let id = self.push(Tlv {
            tag,
            len,
            value: Vec::new(),
            constructed: true,
            parent,
            children: Vec::new(),
        });

        let mut inner = Reader::new(value);
        while inner.remaining() > 0 {
            let child = self.parse_one(&mut inner, Some(id), depth + 1)?;
            self.nodes[id.0].children.push(child);
        }

        Ok(id)
    }

    /// Number of records in the forest, nested ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Releases every record of the forest.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    /// Top-level records, in order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Gets the record behind the id.
    ///
    /// # Panics
    /// Panics if the id was handed out by another forest.
    pub fn node(&self, id: NodeId) -> &Tlv {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.parent(id) {
            Some(parent) => self.children(parent),
            None => &self.roots,
        }
    }

    fn find_in(&self, level: &[NodeId], tag: Tag) -> Option<NodeId> {
        level.iter().copied().find(|id| self.node(*id).tag == tag)
    }

    /// Finds the first top-level record with the tag. Children are not searched.
    pub fn find(&self, tag: Tag) -> Option<NodeId> {
        self.find_in(&self.roots, tag)
    }

    /// Finds the next record with the tag among the siblings following `prev`.
    pub fn find_next(&self, prev: NodeId, tag: Tag) -> Option<NodeId> {
        let siblings = self.siblings(prev);
        let position = siblings.iter().position(|id| *id == prev)?;

        self.find_in(&siblings[position + 1..], tag)
    }

    /// Finds the first record with the tag anywhere in the forest, depth first.
    pub fn find_full(&self, tag: Tag) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.tag == tag {
                return Some(id);
            }

            stack.extend(node.children.iter().rev());
        }

        None
    }

    /// Descends the forest along the tags, one level per tag, starting from the top level.
    /// Gives the record matched by the last tag, or nothing if any level is missing.
    pub fn find_path(&self, path: &[Tag]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        let mut current = self.find(*first)?;

        for tag in rest {
            current = self.find_in(self.children(current), *tag)?;
        }

        Some(current)
    }

    /// Gets the first immediate child of the record with the tag.
    pub fn get_inchild(&self, id: NodeId, tag: Tag) -> Option<&Tlv> {
        self.find_in(self.children(id), tag)
            .map(|child| self.node(child))
    }

    /// Walks the forest depth first, calling `f` with each record, its depth and whether it is
    /// a leaf. Children of a record are visited only if `f` returns `true` for it.
    pub fn visit<F>(&self, mut f: F)
    where
        F: FnMut(NodeId, &Tlv, usize, bool) -> bool,
    {
        self.visit_level(&self.roots, 0, &mut f);
    }

    fn visit_level<F>(&self, level: &[NodeId], depth: usize, f: &mut F)
    where
        F: FnMut(NodeId, &Tlv, usize, bool) -> bool,
    {
        for id in level {
            let node = self.node(*id);
            if f(*id, node, depth, node.is_leaf()) {
                self.visit_level(&node.children, depth + 1, f);
            }
        }
    }

    /// Appends the top-level records of the other forest after the ones of this forest.
    pub fn add(&mut self, other: TlvDb) {
        let offset = self.nodes.len();
        let shift = |id: NodeId| NodeId(id.0 + offset);

        self.nodes.extend(other.nodes.into_iter().map(|mut node| {
            node.parent = node.parent.map(shift);
            node.children.iter_mut().for_each(|id| *id = shift(*id));
            node
        }));
        self.roots.extend(other.roots.into_iter().map(shift));
    }

    /// Serialises the forest back to BER-TLV octets, using the shortest length forms.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for id in &self.roots {
            self.encode_node(*id, &mut out);
        }

        out
    }

    fn encode_node(&self, id: NodeId, out: &mut Vec<u8>) {
        let node = self.node(id);
        let body = if node.constructed {
            let mut body = Vec::new();
            for child in &node.children {
                self.encode_node(*child, &mut body);
            }
            body
        } else {
            node.value.clone()
        };

        out.extend(node.tag.to_bytes());
        write_length(body.len(), out);
        out.extend(body);
    }
}

#[cfg(feature = "serde")]
struct NodeRef<'a> {
    db: &'a TlvDb,
    id: NodeId,
}

#[cfg(feature = "serde")]
impl serde::Serialize for NodeRef<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let node = self.db.node(self.id);
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("tag", &node.tag.to_string())?;

        if node.constructed {
            let children: Vec<NodeRef> = node
                .children
                .iter()
                .map(|id| NodeRef { db: self.db, id: *id })
                .collect();
            map.serialize_entry("children", &children)?;
        } else {
            map.serialize_entry("value", &hex::encode_upper(&node.value))?;
        }

        map.end()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for TlvDb {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.roots.iter().map(|id| NodeRef { db: self, id: *id }))
    }
}
