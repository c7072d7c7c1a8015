//! Tag tree model
//!
//! Owned composite nodes, no back references. Compound keys are unique and
//! keep insertion order so a rewritten document differs from the upload only
//! where pruning removed entries.

use indexmap::IndexMap;

/// Binary tag type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TagId {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl TagId {
    pub fn from_u8(id: u8) -> Option<Self> {
        Some(match id {
            0 => TagId::End,
            1 => TagId::Byte,
            2 => TagId::Short,
            3 => TagId::Int,
            4 => TagId::Long,
            5 => TagId::Float,
            6 => TagId::Double,
            7 => TagId::ByteArray,
            8 => TagId::String,
            9 => TagId::List,
            10 => TagId::Compound,
            11 => TagId::IntArray,
            12 => TagId::LongArray,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One node of the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(NbtList),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn id(&self) -> TagId {
        match self {
            Tag::Byte(_) => TagId::Byte,
            Tag::Short(_) => TagId::Short,
            Tag::Int(_) => TagId::Int,
            Tag::Long(_) => TagId::Long,
            Tag::Float(_) => TagId::Float,
            Tag::Double(_) => TagId::Double,
            Tag::ByteArray(_) => TagId::ByteArray,
            Tag::String(_) => TagId::String,
            Tag::List(_) => TagId::List,
            Tag::Compound(_) => TagId::Compound,
            Tag::IntArray(_) => TagId::IntArray,
            Tag::LongArray(_) => TagId::LongArray,
        }
    }

    pub fn as_compound(&self) -> Option<&NbtCompound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_compound_mut(&mut self) -> Option<&mut NbtCompound> {
        match self {
            Tag::Compound(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NbtList> {
        match self {
            Tag::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Tag::String(value.to_string())
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Tag::String(value)
    }
}

impl From<i32> for Tag {
    fn from(value: i32) -> Self {
        Tag::Int(value)
    }
}

impl From<NbtCompound> for Tag {
    fn from(value: NbtCompound) -> Self {
        Tag::Compound(value)
    }
}

impl From<NbtList> for Tag {
    fn from(value: NbtList) -> Self {
        Tag::List(value)
    }
}

/// Ordered list with a declared element type
///
/// Homogeneity is checked by the encoder, not on every push.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtList {
    element_id: TagId,
    items: Vec<Tag>,
}

impl NbtList {
    pub fn new(element_id: TagId, items: Vec<Tag>) -> Self {
        Self { element_id, items }
    }

    pub fn empty(element_id: TagId) -> Self {
        Self::new(element_id, Vec::new())
    }

    pub fn element_id(&self) -> TagId {
        self.element_id
    }

    pub fn push(&mut self, tag: Tag) {
        if self.items.is_empty() && self.element_id == TagId::End {
            self.element_id = tag.id();
        }
        self.items.push(tag);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tag> {
        self.items.iter_mut()
    }

    pub fn is_homogeneous(&self) -> bool {
        self.items.iter().all(|t| t.id() == self.element_id)
    }
}

/// Element type is taken from the first item (`End` when empty)
impl From<Vec<Tag>> for NbtList {
    fn from(items: Vec<Tag>) -> Self {
        let element_id = items.first().map(Tag::id).unwrap_or(TagId::End);
        Self { element_id, items }
    }
}

/// String-keyed map with unique keys, iterated in insertion order
///
/// Equality ignores key order, matching how the format treats compounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: IndexMap<String, Tag>,
}

impl NbtCompound {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced entry keeps its position
    pub fn insert(&mut self, key: impl Into<String>, tag: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), tag)
    }

    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Tag> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and close the gap, so the remaining order is unchanged
    pub fn remove(&mut self, key: &str) -> Option<Tag> {
        self.entries.shift_remove(key)
    }

    /// Keep entries for which `keep` returns true; returns how many were removed
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&str, &Tag) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|k, t| keep(k, t));
        before - self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Tag)> {
        self.entries.iter_mut().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Tag)> for NbtCompound {
    fn from_iter<I: IntoIterator<Item = (K, Tag)>>(iter: I) -> Self {
        let mut compound = NbtCompound::new();
        for (key, tag) in iter {
            compound.insert(key, tag);
        }
        compound
    }
}

/// A whole file: named root compound
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtDocument {
    pub root_name: String,
    pub root: NbtCompound,
}

impl NbtDocument {
    pub fn new(root_name: impl Into<String>, root: NbtCompound) -> Self {
        Self {
            root_name: root_name.into(),
            root,
        }
    }
}
