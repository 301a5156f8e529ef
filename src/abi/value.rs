//! Dynamically typed ABI values.

use super::{
    ty::{Kind, TypeRef},
    util::{self, WORD},
};
use crate::{
    errors::AbiError,
    types::{Address, U256},
};

/// A value that can be encoded against, or results from decoding with, a
/// [`TypeDescriptor`](super::TypeDescriptor).
///
/// Signed integers are held as 256-bit two's complement; use [`Value::int`] and
/// [`Value::as_i128`] to move between them and native integers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `uintN`
    Uint(U256),
    /// `intN`, two's complement.
    Int(U256),
    /// `address`
    Address(Address),
    /// `bytesN`, exactly `N` bytes.
    FixedBytes(Vec<u8>),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `string`
    String(String),
    /// `T[]` and `T[k]`
    Array(Vec<Value>),
    /// `(T1,..,Tn)`
    Tuple(Vec<Value>),
}

impl Value {
    /// An unsigned integer value.
    pub fn uint(value: u128) -> Self {
        Value::Uint(U256::from(value))
    }

    /// A signed integer value.
    pub fn int(value: i128) -> Self {
        Value::Int(util::int_from_i128(value))
    }

    /// The contents of a `bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The unsigned value, if it fits in a `u128`.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Value::Uint(v) if v.bits() <= 128 => Some(v.low_u128()),
            _ => None,
        }
    }

    /// The signed value, if it fits in an `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => util::int_to_i128(v),
            _ => None,
        }
    }

    /// The contents of an `address` value.
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Value::Address(a) => Some(a),
            _ => None,
        }
    }

    /// The contents of `bytes` and `bytesN` values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) | Value::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    /// The contents of a `string` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The elements of an array or the members of a tuple.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Value::Bool(_) => "bool".to_string(),
            Value::Uint(_) => "unsigned integer".to_string(),
            Value::Int(_) => "signed integer".to_string(),
            Value::Address(_) => "address".to_string(),
            Value::FixedBytes(b) => format!("{} fixed bytes", b.len()),
            Value::Bytes(_) => "bytes".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Array(items) => format!("array of {} elements", items.len()),
            Value::Tuple(items) => format!("tuple of {} members", items.len()),
        }
    }

    /// Checks that `self` conforms to `ty` and returns the length of its standard
    /// encoding (for dynamic types, excluding the offset word in the parent's head).
    pub fn validate(&self, ty: TypeRef<'_>) -> Result<usize, AbiError> {
        match (ty.kind(), self) {
            (Kind::Bool, Value::Bool(_)) | (Kind::Address, Value::Address(_)) => Ok(WORD),
            (Kind::Uint(bits), Value::Uint(v)) => {
                if util::fits_unsigned(v, bits) {
                    Ok(WORD)
                } else {
                    Err(out_of_range(ty, "exceeds bit width"))
                }
            }
            (Kind::Int(bits), Value::Int(v)) => {
                if util::fits_signed(v, bits) {
                    Ok(WORD)
                } else {
                    Err(out_of_range(ty, "exceeds signed bit width"))
                }
            }
            (Kind::FixedBytes(len), Value::FixedBytes(b)) if b.len() == len as usize => Ok(WORD),
            (Kind::Bytes, Value::Bytes(b)) => byte_string_len(ty, b.len()),
            (Kind::String, Value::String(s)) => byte_string_len(ty, s.len()),
            (Kind::Array(len), Value::Array(items)) => {
                let element = match ty.element() {
                    Some(element) => element,
                    None => return Err(mismatch(ty, self)),
                };
                match len {
                    Some(len) if len as usize != items.len() => Err(mismatch(ty, self)),
                    Some(_) => sequence_len(ty, std::iter::repeat(element).zip(items)),
                    None => sequence_len(ty, std::iter::repeat(element).zip(items))?
                        .checked_add(WORD)
                        .ok_or_else(|| length_overflow(ty, items.len())),
                }
            }
            (Kind::Tuple, Value::Tuple(items)) if items.len() == ty.member_count() => {
                sequence_len(ty, ty.members().zip(items))
            }
            _ => Err(mismatch(ty, self)),
        }
    }
}

/// Validates each item and sums the size of the head/tail block they form.
pub(crate) fn sequence_len<'t, 'v>(
    parent: TypeRef<'_>,
    items: impl Iterator<Item = (TypeRef<'t>, &'v Value)>,
) -> Result<usize, AbiError> {
    let mut total = 0usize;
    let mut count = 0usize;
    for (ty, value) in items {
        let len = value.validate(ty)?;
        let len = if ty.is_dynamic() {
            len.checked_add(WORD)
        } else {
            Some(len)
        };
        count += 1;
        total = len
            .and_then(|len| total.checked_add(len))
            .ok_or_else(|| length_overflow(parent, count))?;
    }
    Ok(total)
}

fn byte_string_len(ty: TypeRef<'_>, len: usize) -> Result<usize, AbiError> {
    util::padded_len(len)
        .and_then(|padded| padded.checked_add(WORD))
        .ok_or_else(|| length_overflow(ty, len))
}

pub(crate) fn mismatch(ty: TypeRef<'_>, value: &Value) -> AbiError {
    AbiError::TypeMismatch {
        expected: ty.to_string(),
        found: value.describe(),
    }
}

fn out_of_range(ty: TypeRef<'_>, reason: &'static str) -> AbiError {
    AbiError::ValueOutOfRange {
        ty: ty.to_string(),
        reason,
    }
}

fn length_overflow(ty: TypeRef<'_>, len: usize) -> AbiError {
    AbiError::LengthOverflow {
        ty: ty.to_string(),
        len,
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Value::Uint(v)
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(s: &'a str) -> Self {
        Value::String(s.to_string())
    }
}
