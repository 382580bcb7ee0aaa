//! Canonical schema IR.
//!
//! Records live in an arena owned by [`Registry`] and are addressed by
//! [`RecordId`]. A container field refers to its record by id; the field's
//! own name is stored on the [`Field`], never on the shared record.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecordId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Kind {
    UInt,
    Bool,
    Bytes,
    BitVector,
    BitList,
    Vector,
    List,
    Container,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Fixed(u64),
    /// `fixed_part` is the node's own fixed region: its offset table for
    /// vectors of dynamic items, its fixed fields plus offset slots for
    /// containers, zero for lists.
    Dynamic { fixed_part: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BytesLen {
    Fixed(u64),
    Max(u64),
}

/// In-memory representation of a byte sequence in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteRepr {
    /// `Vec<u8>`
    Vec,
    /// `[u8; N]`
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BitListRepr {
    /// Raw `Vec<u8>` holding the delimited encoding.
    Bytes,
    /// A bit-list capability type, by its declared path.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Uint { bytes: u8 },
    Bool,
    Bytes { len: BytesLen, repr: ByteRepr },
    BitVector { bits: u64, repr: ByteRepr },
    BitList { max: Option<u64>, repr: BitListRepr },
    Vector { elem: Box<Node>, len: u64 },
    List { elem: Box<Node>, max: u64 },
    Container { record: RecordId, boxed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub shape: Shape,
    pub layout: Layout,
}

impl Node {
    pub fn kind(&self) -> Kind {
        match &self.shape {
            Shape::Uint { .. } => Kind::UInt,
            Shape::Bool => Kind::Bool,
            Shape::Bytes { .. } => Kind::Bytes,
            Shape::BitVector { .. } => Kind::BitVector,
            Shape::BitList { .. } => Kind::BitList,
            Shape::Vector { .. } => Kind::Vector,
            Shape::List { .. } => Kind::List,
            Shape::Container { .. } => Kind::Container,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.layout, Layout::Dynamic { .. })
    }

    pub fn fixed_size(&self) -> Option<u64> {
        match self.layout {
            Layout::Fixed(n) => Some(n),
            Layout::Dynamic { .. } => None,
        }
    }

    /// Declared length, element count or capacity, depending on the kind.
    pub fn bound_size(&self) -> Option<u64> {
        match &self.shape {
            Shape::Bytes {
                len: BytesLen::Fixed(n) | BytesLen::Max(n),
                ..
            } => Some(*n),
            Shape::BitVector { bits, .. } => Some(*bits),
            Shape::BitList { max, .. } => *max,
            Shape::Vector { len, .. } => Some(*len),
            Shape::List { max, .. } => Some(*max),
            Shape::Uint { .. } | Shape::Bool | Shape::Container { .. } => None,
        }
    }

    pub fn element(&self) -> Option<&Node> {
        match &self.shape {
            Shape::Vector { elem, .. } | Shape::List { elem, .. } => Some(elem),
            _ => None,
        }
    }

    /// Bytes this node occupies in its parent's fixed region.
    pub fn offset_contribution(&self) -> u64 {
        match self.layout {
            Layout::Fixed(n) => n,
            Layout::Dynamic { .. } => crate::classify::BYTES_PER_LENGTH_OFFSET,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub node: Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,
    /// Name of the unit that declares the record.
    pub unit: String,
    pub fields: Vec<Field>,
    pub layout: Layout,
}

impl Record {
    pub fn is_dynamic(&self) -> bool {
        matches!(self.layout, Layout::Dynamic { .. })
    }

    /// Size of the fixed region: the whole encoding for fixed records.
    pub fn fixed_region(&self) -> u64 {
        match self.layout {
            Layout::Fixed(n) | Layout::Dynamic { fixed_part: n } => n,
        }
    }
}

/// Resolved records of one generation run. Write-once per name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registry {
    records: Vec<Record>,
    #[serde(skip)]
    by_name: BTreeMap<String, RecordId>,
}

impl Registry {
    pub fn get(&self, id: RecordId) -> &Record {
        &self.records[id.0 as usize]
    }

    pub fn lookup(&self, name: &str) -> Option<RecordId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, r)| (RecordId(idx as u32), r))
    }

    /// `roots` plus every record reachable from them through container
    /// fields, at any nesting depth.
    pub fn closure(&self, roots: impl IntoIterator<Item = RecordId>) -> BTreeSet<RecordId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<RecordId> = roots.into_iter().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for f in &self.get(id).fields {
                let mut node = &f.node;
                while let Some(elem) = node.element() {
                    node = elem;
                }
                if let Shape::Container { record, .. } = &node.shape {
                    stack.push(*record);
                }
            }
        }
        seen
    }

    /// First insertion of a name wins; later inserts return the existing id.
    pub(crate) fn insert(&mut self, record: Record) -> RecordId {
        if let Some(id) = self.lookup(&record.name) {
            return id;
        }
        let id = RecordId(self.records.len() as u32);
        self.by_name.insert(record.name.clone(), id);
        self.records.push(record);
        id
    }
}
