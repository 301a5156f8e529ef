//! Immutable type descriptors.
//!
//! A descriptor is a flat arena of nodes; tuple and array nodes reference their
//! children through a contiguous range of a shared child-index vector. Nodes are
//! pushed in post-order, so the root is always the last node.

use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Range,
    str::FromStr,
};

use super::{parse, util::WORD};
use crate::{config::Limits, errors::AbiError};

/// The kind of a type node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `bool`
    Bool,
    /// Unsigned integer of the given bit width.
    Uint(u16),
    /// Signed integer of the given bit width.
    Int(u16),
    /// A 20-byte account address.
    Address,
    /// `bytes1` through `bytes32`.
    FixedBytes(u8),
    /// Dynamic byte string.
    Bytes,
    /// Dynamic UTF-8 string.
    String,
    /// Homogeneous array, with a length when it is fixed.
    Array(Option<u32>),
    /// Ordered, possibly heterogeneous members.
    Tuple,
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    kind: Kind,
    dynamic: bool,
    /// Inline encoded size. Only meaningful for static nodes.
    static_size: usize,
    children: Range<u32>,
    name: Option<String>,
}

/// Accumulates nodes while a signature is being parsed.
#[derive(Default)]
pub(crate) struct Builder {
    nodes: Vec<Node>,
    children: Vec<u32>,
}

impl Builder {
    pub(crate) fn push_scalar(&mut self, kind: Kind) -> u32 {
        let dynamic = match kind {
            Kind::Bytes | Kind::String => true,
            Kind::Array(_) | Kind::Tuple => unreachable!("composite kinds have children"),
            _ => false,
        };
        self.push(Node {
            kind,
            dynamic,
            static_size: if dynamic { 0 } else { WORD },
            children: 0..0,
            name: None,
        })
    }

    /// Returns `None` when the inline size of the array does not fit in `usize`.
    pub(crate) fn push_array(&mut self, element: u32, len: Option<u32>) -> Option<u32> {
        let elem = &self.nodes[element as usize];
        let dynamic = len.is_none() || elem.dynamic;
        let static_size = if dynamic {
            0
        } else {
            elem.static_size.checked_mul(len.unwrap_or(0) as usize)?
        };
        let children = self.push_children(std::iter::once(element));
        Some(self.push(Node {
            kind: Kind::Array(len),
            dynamic,
            static_size,
            children,
            name: None,
        }))
    }

    /// Returns `None` when the inline size of the tuple does not fit in `usize`.
    pub(crate) fn push_tuple(&mut self, members: &[u32]) -> Option<u32> {
        let mut dynamic = false;
        let mut static_size = 0usize;
        for &member in members {
            let node = &self.nodes[member as usize];
            dynamic |= node.dynamic;
            static_size = static_size.checked_add(node.static_size)?;
        }
        let children = self.push_children(members.iter().copied());
        Some(self.push(Node {
            kind: Kind::Tuple,
            dynamic,
            static_size: if dynamic { 0 } else { static_size },
            children,
            name: None,
        }))
    }

    pub(crate) fn set_name(&mut self, id: u32, name: String) {
        self.nodes[id as usize].name = Some(name);
    }

    pub(crate) fn finish(self) -> TypeDescriptor {
        let mut desc = TypeDescriptor {
            nodes: self.nodes,
            children: self.children,
            canonical: String::new(),
        };
        desc.canonical = desc.root().to_string();
        desc
    }

    fn push(&mut self, node: Node) -> u32 {
        self.nodes.push(node);
        (self.nodes.len() - 1) as u32
    }

    fn push_children(&mut self, ids: impl Iterator<Item = u32>) -> Range<u32> {
        let start = self.children.len() as u32;
        self.children.extend(ids);
        start..self.children.len() as u32
    }
}

/// Parsed representation of a canonical type signature such as `(uint256,bytes32[3][])`.
///
/// Descriptors never change after construction and may be shared freely between
/// threads. Equality and hashing consider only the canonical form, so member names
/// do not distinguish two descriptors.
#[derive(Clone)]
pub struct TypeDescriptor {
    nodes: Vec<Node>,
    children: Vec<u32>,
    canonical: String,
}

impl TypeDescriptor {
    /// Parses `signature` with the default [`Limits`].
    pub fn parse(signature: &str) -> Result<Self, AbiError> {
        parse::parse(signature, &Limits::default())
    }

    /// Parses `signature`, rejecting it once it exceeds `limits`.
    pub fn parse_with_limits(signature: &str, limits: &Limits) -> Result<Self, AbiError> {
        parse::parse(signature, limits)
    }

    /// The root node of the type tree.
    pub fn root(&self) -> TypeRef<'_> {
        TypeRef {
            desc: self,
            id: (self.nodes.len() - 1) as u32,
        }
    }

    /// The canonical signature, with aliases expanded and names and whitespace removed.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The kind of the root node.
    pub fn kind(&self) -> Kind {
        self.root().kind()
    }

    /// Whether the root type is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.root().is_dynamic()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({})", self.canonical)
    }
}

impl FromStr for TypeDescriptor {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A borrowed handle to one node of a [`TypeDescriptor`].
#[derive(Clone, Copy)]
pub struct TypeRef<'a> {
    desc: &'a TypeDescriptor,
    id: u32,
}

impl<'a> TypeRef<'a> {
    fn node(&self) -> &'a Node {
        &self.desc.nodes[self.id as usize]
    }

    fn child(&self, id: u32) -> TypeRef<'a> {
        TypeRef {
            desc: self.desc,
            id,
        }
    }

    fn child_ids(&self) -> &'a [u32] {
        let range = &self.node().children;
        &self.desc.children[range.start as usize..range.end as usize]
    }

    /// The kind of this node.
    pub fn kind(&self) -> Kind {
        self.node().kind
    }

    /// Whether the encoded length of a value of this type depends on the value.
    pub fn is_dynamic(&self) -> bool {
        self.node().dynamic
    }

    /// The member name given in the signature, if any.
    pub fn name(&self) -> Option<&'a str> {
        self.node().name.as_deref()
    }

    /// The element type of an array.
    pub fn element(&self) -> Option<TypeRef<'a>> {
        match self.kind() {
            Kind::Array(_) => Some(self.child(self.child_ids()[0])),
            _ => None,
        }
    }

    /// The declared length of a fixed-length array.
    pub fn fixed_len(&self) -> Option<usize> {
        match self.kind() {
            Kind::Array(len) => len.map(|len| len as usize),
            _ => None,
        }
    }

    /// The members of a tuple. Empty for every other kind.
    pub fn members(&self) -> Members<'a> {
        let ids = match self.kind() {
            Kind::Tuple => self.child_ids(),
            _ => &[],
        };
        Members {
            desc: self.desc,
            ids: ids.iter(),
        }
    }

    /// Number of tuple members, zero for every other kind.
    pub fn member_count(&self) -> usize {
        self.members().len()
    }

    /// Bytes this type occupies in the head of its enclosing block: one offset word
    /// for dynamic types, the full inline encoding for static ones.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            WORD
        } else {
            self.node().static_size
        }
    }
}

impl fmt::Display for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Bool => f.write_str("bool"),
            Kind::Uint(bits) => write!(f, "uint{}", bits),
            Kind::Int(bits) => write!(f, "int{}", bits),
            Kind::Address => f.write_str("address"),
            Kind::FixedBytes(len) => write!(f, "bytes{}", len),
            Kind::Bytes => f.write_str("bytes"),
            Kind::String => f.write_str("string"),
            Kind::Array(len) => {
                let element = self.child(self.child_ids()[0]);
                match len {
                    Some(len) => write!(f, "{}[{}]", element, len),
                    None => write!(f, "{}[]", element),
                }
            }
            Kind::Tuple => {
                f.write_str("(")?;
                for (i, member) in self.members().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Debug for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Iterator over the members of a tuple type.
#[derive(Clone)]
pub struct Members<'a> {
    desc: &'a TypeDescriptor,
    ids: std::slice::Iter<'a, u32>,
}

impl<'a> Iterator for Members<'a> {
    type Item = TypeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next().map(|&id| TypeRef {
            desc: self.desc,
            id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Members<'_> {}
