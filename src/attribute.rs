use crate::wire::{put_u32, Compress, Reader};
use crate::Error;
use alloc::collections::btree_set::{self, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// An opaque attribute identifier, usually a UTF-8 label such as `"finance"`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute(Vec<u8>);

impl Attribute {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Attribute(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Attribute {
    fn from(s: &str) -> Self {
        Attribute(s.as_bytes().to_vec())
    }
}

impl From<String> for Attribute {
    fn from(s: String) -> Self {
        Attribute(s.into_bytes())
    }
}

impl From<&[u8]> for Attribute {
    fn from(b: &[u8]) -> Self {
        Attribute(b.to_vec())
    }
}

impl From<Vec<u8>> for Attribute {
    fn from(b: Vec<u8>) -> Self {
        Attribute(b)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(&self.0) {
            Ok(s) => f.write_str(s),
            Err(_) => {
                f.write_str("0x")?;
                self.0.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attribute({})", self)
    }
}

impl Compress for Attribute {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_u32(out, self.0.len());
        out.extend_from_slice(&self.0);
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = reader.length()?;
        Ok(Attribute(reader.take(len)?.to_vec()))
    }
}

/// An ordered set of attributes, the label of a ciphertext.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AttributeSet(BTreeSet<Attribute>);

impl AttributeSet {
    pub fn new() -> Self {
        AttributeSet(BTreeSet::new())
    }

    /// Adds an attribute, returns `false` if it was already present.
    pub fn insert(&mut self, attr: impl Into<Attribute>) -> bool {
        self.0.insert(attr.into())
    }

    pub fn contains(&self, attr: &Attribute) -> bool {
        self.0.contains(attr)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the attributes in ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, Attribute> {
        self.0.iter()
    }
}

impl<A: Into<Attribute>> FromIterator<A> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        AttributeSet(iter.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Attribute>, const N: usize> From<[A; N]> for AttributeSet {
    fn from(attrs: [A; N]) -> Self {
        attrs.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a Attribute;
    type IntoIter = btree_set::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Compress for AttributeSet {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_u32(out, self.0.len());
        for attr in &self.0 {
            attr.write_bytes(out);
        }
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let count = reader.length()?;
        let mut set = AttributeSet::new();
        for _ in 0..count {
            let attr = Attribute::read_bytes(reader)?;
            // Canonical encodings are strictly ascending.
            if set.0.last().map_or(false, |last| *last >= attr) {
                return Err(Error::Malformed);
            }
            set.insert(attr);
        }

        Ok(set)
    }
}
