//! Sink module

use log::trace;

use super::{
    ty::{Kind, TypeRef},
    util::{self, WORD},
    value::{self, Value},
    TypeDescriptor,
};
use crate::errors::AbiError;

/// Sink for one head/tail block.
///
/// Static members are written in place into the head; dynamic members are written
/// to the tail and leave an offset, relative to the start of the block, in the head.
pub(crate) struct Sink {
    head_len: usize,
    head: Vec<u8>,
    tail: Vec<u8>,
}

impl Sink {
    /// New sink for a block whose head occupies `head_len` bytes.
    pub(crate) fn new(head_len: usize) -> Self {
        Sink {
            head_len,
            head: Vec::with_capacity(head_len),
            tail: Vec::new(),
        }
    }

    fn top_ptr(&self) -> usize {
        self.head_len + self.tail.len()
    }

    /// Consume `value` to the Sink. `value` must already be validated against `ty`.
    pub(crate) fn push(&mut self, ty: TypeRef<'_>, value: &Value) {
        if ty.is_dynamic() {
            let top_ptr = self.top_ptr();
            encode_value(ty, value, &mut self.tail);
            self.head.extend_from_slice(&util::pad_usize(top_ptr));
        } else {
            encode_value(ty, value, &mut self.head);
        }
    }

    /// Drain current Sink to the target vector
    pub(crate) fn drain_to(self, target: &mut Vec<u8>) {
        debug_assert_eq!(
            self.head.len(),
            self.head_len,
            "pushed members do not fill the declared head"
        );
        target.reserve(self.head.len() + self.tail.len());
        target.extend_from_slice(&self.head);
        target.extend_from_slice(&self.tail);
    }
}

/// Encodes `value` as a standalone argument list: a tuple root encodes its members,
/// any other root is treated as a single argument.
pub(crate) fn encode_root(value: &Value, desc: &TypeDescriptor) -> Result<Vec<u8>, AbiError> {
    let root = desc.root();
    trace!("encoding value as `{}`", desc);
    let mut out = match root.kind() {
        Kind::Tuple => Vec::with_capacity(value.validate(root)?),
        _ => Vec::with_capacity(value::sequence_len(root, std::iter::once((root, value)))?),
    };
    match root.kind() {
        Kind::Tuple => encode_value(root, value, &mut out),
        _ => encode_sequence(std::iter::once((root, value)), root.head_size(), &mut out),
    }
    Ok(out)
}

/// Encodes `values` as the members of the tuple `ty`.
pub(crate) fn encode_members(
    ty: TypeRef<'_>,
    values: &[Value],
    out: &mut Vec<u8>,
) -> Result<(), AbiError> {
    if ty.kind() != Kind::Tuple || values.len() != ty.member_count() {
        return Err(AbiError::TypeMismatch {
            expected: ty.to_string(),
            found: format!("{} arguments", values.len()),
        });
    }
    out.reserve(value::sequence_len(ty, ty.members().zip(values))?);
    encode_sequence(ty.members().zip(values), head_len(ty.members()), out);
    Ok(())
}

fn head_len<'t>(types: impl Iterator<Item = TypeRef<'t>>) -> usize {
    types.map(|ty| ty.head_size()).sum()
}

fn encode_sequence<'t, 'v>(
    items: impl Iterator<Item = (TypeRef<'t>, &'v Value)>,
    head_len: usize,
    out: &mut Vec<u8>,
) {
    let mut sink = Sink::new(head_len);
    for (ty, value) in items {
        sink.push(ty, value);
    }
    sink.drain_to(out);
}

fn encode_value(ty: TypeRef<'_>, value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bool(b) => out.extend_from_slice(&util::pad_usize(*b as usize)),
        Value::Uint(v) | Value::Int(v) => out.extend_from_slice(&util::pad_uint(v)),
        Value::Address(a) => {
            out.extend_from_slice(&[0u8; WORD - 20]);
            out.extend_from_slice(a.as_bytes());
        }
        Value::FixedBytes(b) => {
            out.extend_from_slice(b);
            out.resize(out.len() + (WORD - b.len()), 0);
        }
        Value::Bytes(b) => encode_byte_string(b, out),
        Value::String(s) => encode_byte_string(s.as_bytes(), out),
        Value::Array(items) => {
            if let Some(element) = ty.element() {
                if ty.fixed_len().is_none() {
                    out.extend_from_slice(&util::pad_usize(items.len()));
                }
                encode_sequence(
                    std::iter::repeat(element).zip(items),
                    element.head_size() * items.len(),
                    out,
                );
            }
        }
        Value::Tuple(items) => encode_sequence(ty.members().zip(items), head_len(ty.members()), out),
    }
}

fn encode_byte_string(data: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&util::pad_usize(data.len()));
    out.extend_from_slice(data);
    let len = data.len();
    if len % WORD != 0 {
        out.resize(out.len() + (WORD - len % WORD), 0);
    }
}
