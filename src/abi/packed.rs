//! Non-standard packed encoding.
//!
//! Scalars take their natural width, `bytes` and `string` are written raw, and there
//! are no offsets or length words. Array elements are each padded to a whole number
//! of words. Without length words only layouts with at most one dynamic member per
//! tuple can be unpacked again, see [`decode_packed`].

use log::{debug, trace};

use super::{
    stream,
    ty::{Kind, TypeRef},
    util::{self, WORD},
    value::Value,
    TypeDescriptor,
};
use crate::{config::Limits, errors::AbiError};

/// Packs `value` against `desc`. The value is validated first, so nothing is
/// written for a nonconforming value.
pub fn encode_packed(value: &Value, desc: &TypeDescriptor) -> Result<Vec<u8>, AbiError> {
    trace!("packing value as `{}`", desc);

    let root = desc.root();
    value.validate(root)?;
    let mut out = Vec::new();
    pack(root, value, false, &mut out);
    Ok(out)
}

/// Appends the packed form of `value`, which must already be validated against `ty`.
/// Inside arrays every element is widened to whole words.
pub(super) fn pack(ty: TypeRef<'_>, value: &Value, in_array: bool, out: &mut Vec<u8>) {
    let width = match ty.kind() {
        _ if in_array => WORD,
        Kind::Bool => 1,
        Kind::Uint(bits) | Kind::Int(bits) => bits as usize / 8,
        Kind::Address => 20,
        Kind::FixedBytes(len) => len as usize,
        _ => 0,
    };
    match value {
        Value::Bool(b) => {
            out.resize(out.len() + width - 1, 0);
            out.push(*b as u8);
        }
        Value::Uint(v) | Value::Int(v) => {
            out.extend_from_slice(&util::pad_uint(v)[WORD - width..]);
        }
        Value::Address(a) => {
            out.resize(out.len() + width - 20, 0);
            out.extend_from_slice(a.as_bytes());
        }
        Value::FixedBytes(b) => {
            out.extend_from_slice(b);
            out.resize(out.len() + width - b.len(), 0);
        }
        Value::Bytes(b) => pack_raw(b, in_array, out),
        Value::String(s) => pack_raw(s.as_bytes(), in_array, out),
        Value::Array(items) => {
            if let Some(element) = ty.element() {
                for item in items {
                    pack(element, item, true, out);
                }
            }
        }
        Value::Tuple(items) => {
            for (member, item) in ty.members().zip(items) {
                pack(member, item, in_array, out);
            }
        }
    }
}

fn pack_raw(data: &[u8], in_array: bool, out: &mut Vec<u8>) {
    out.extend_from_slice(data);
    if in_array && data.len() % WORD != 0 {
        out.resize(out.len() + WORD - data.len() % WORD, 0);
    }
}

/// Unpacks `data` against `desc`, reversing [`encode_packed`].
///
/// A tuple may hold any number of static members and at most one dynamic member,
/// which takes whatever bytes the static members leave over. The dynamic member must
/// be `bytes`, `string` or an array of static elements. A non-tuple root is unpacked
/// as a tuple of that one type.
pub fn decode_packed(data: &[u8], desc: &TypeDescriptor) -> Result<Value, AbiError> {
    trace!("unpacking {} bytes as `{}`", data.len(), desc);

    let root = desc.root();
    let result = match root.kind() {
        Kind::Tuple => unpack_members(root.members().collect(), data, 0, data.len()).map(Value::Tuple),
        _ => unpack_members(vec![root], data, 0, data.len())
            .map(|mut values| values.pop().unwrap_or(Value::Tuple(Vec::new()))),
    };
    result.map_err(|err| {
        debug!("failed to unpack `{}`: {}", desc, err);
        err
    })
}

/// Packed size of a static type: natural widths at the top level, whole words
/// inside arrays.
fn packed_len(ty: TypeRef<'_>) -> Option<usize> {
    if ty.is_dynamic() {
        return None;
    }
    match ty.kind() {
        Kind::Bool => Some(1),
        Kind::Uint(bits) | Kind::Int(bits) => Some(bits as usize / 8),
        Kind::Address => Some(20),
        Kind::FixedBytes(len) => Some(len as usize),
        Kind::Array(_) => Some(ty.head_size()),
        Kind::Tuple => ty
            .members()
            .try_fold(0usize, |acc, member| acc.checked_add(packed_len(member)?)),
        Kind::Bytes | Kind::String => None,
    }
}

fn unpack_members(
    types: Vec<TypeRef<'_>>,
    data: &[u8],
    start: usize,
    end: usize,
) -> Result<Vec<Value>, AbiError> {
    let mut lens = Vec::with_capacity(types.len());
    let mut dynamic = None;
    let mut static_len = 0usize;
    for (i, &ty) in types.iter().enumerate() {
        let len = packed_len(ty);
        match len {
            Some(len) => {
                static_len = static_len
                    .checked_add(len)
                    .ok_or_else(|| unsupported(ty, "packed length overflows"))?;
            }
            None if dynamic.is_some() => {
                return Err(unsupported(ty, "more than one dynamic member"))
            }
            None => dynamic = Some(i),
        }
        lens.push(len);
    }

    let available = end - start;
    if available < static_len {
        return Err(AbiError::BufferUnderrun {
            position: start,
            needed: static_len,
            available,
        });
    }
    if dynamic.is_none() && available > static_len {
        return Err(AbiError::TrailingBytes {
            position: start + static_len,
            found: available - static_len,
        });
    }

    let mut values = Vec::with_capacity(types.len());
    let mut position = start;
    for (ty, len) in types.into_iter().zip(lens) {
        let len = len.unwrap_or(available - static_len);
        values.push(unpack(ty, data, position, position + len)?);
        position += len;
    }
    Ok(values)
}

/// Unpacks one value occupying exactly `data[start..end]`.
fn unpack(ty: TypeRef<'_>, data: &[u8], start: usize, end: usize) -> Result<Value, AbiError> {
    let bytes = &data[start..end];
    let value = match ty.kind() {
        Kind::Bytes => Value::Bytes(bytes.to_vec()),
        Kind::String => match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => return Err(AbiError::InvalidUtf8 { position: start }),
        },
        Kind::Tuple if ty.is_dynamic() => {
            return Err(unsupported(ty, "nested tuple with a dynamic member"))
        }
        Kind::Tuple => Value::Tuple(unpack_members(ty.members().collect(), data, start, end)?),
        Kind::Array(len) => Value::Array(unpack_array(ty, len, data, start, end)?),
        kind => stream::decode_word(kind, &widen(kind, bytes), start)?,
    };
    Ok(value)
}

fn unpack_array(
    ty: TypeRef<'_>,
    len: Option<u32>,
    data: &[u8],
    start: usize,
    end: usize,
) -> Result<Vec<Value>, AbiError> {
    let element = match ty.element() {
        Some(element) if !element.is_dynamic() => element,
        _ => return Err(unsupported(ty, "array of dynamic elements")),
    };
    let size = element.head_size();
    let count = match len {
        Some(len) => len as usize,
        None if size == 0 => return Err(unsupported(ty, "array of zero-sized elements")),
        None => {
            let rem = (end - start) % size;
            if rem != 0 {
                return Err(AbiError::BufferUnderrun {
                    position: end - rem,
                    needed: size,
                    available: rem,
                });
            }
            (end - start) / size
        }
    };

    let limits = Limits::default();
    (0..count)
        .map(|i| stream::decode_static(element, &data[..end], start + i * size, &limits))
        .collect()
}

/// Widens a natural-width scalar to the word the standard encoding would hold.
fn widen(kind: Kind, bytes: &[u8]) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    match kind {
        Kind::FixedBytes(_) => word[..bytes.len()].copy_from_slice(bytes),
        Kind::Int(_) => {
            if bytes.first().map_or(false, |b| b & 0x80 != 0) {
                word = [0xff; WORD];
            }
            word[WORD - bytes.len()..].copy_from_slice(bytes);
        }
        _ => word[WORD - bytes.len()..].copy_from_slice(bytes),
    }
    word
}

fn unsupported(ty: TypeRef<'_>, reason: &'static str) -> AbiError {
    AbiError::PackedUnsupported {
        ty: ty.to_string(),
        reason,
    }
}
