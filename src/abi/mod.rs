//! Contract-call ABI: type signatures, values and the head/tail codec.

#![warn(missing_docs)]

mod cache;
mod event;
mod function;
mod packed;
mod parse;
mod sink;
mod stream;
mod ty;
mod util;
mod value;

#[cfg(feature = "keccak")]
pub use self::function::Keccak256;
pub use self::{
    cache::TypeCache,
    event::Event,
    function::{selector, Function, SignatureHasher},
    packed::{decode_packed, encode_packed},
    ty::{Kind, Members, TypeDescriptor, TypeRef},
    value::Value,
};
use crate::{config::Limits, errors::AbiError};

/// Encodes `value` with the standard head/tail scheme.
///
/// A tuple descriptor encodes as the argument list of its members. Any other
/// descriptor encodes as a list of one argument, so a lone `bytes` value is preceded
/// by its offset word.
pub fn encode(value: &Value, desc: &TypeDescriptor) -> Result<Vec<u8>, AbiError> {
    sink::encode_root(value, desc)
}

/// Decodes `data` against `desc` with the default [`Limits`].
pub fn decode(data: &[u8], desc: &TypeDescriptor) -> Result<Value, AbiError> {
    stream::decode_root(data, desc, &Limits::default())
}

/// Decodes `data` against `desc`, bounding the number of decoded values by
/// `limits.max_decoded_values`.
pub fn decode_with_limits(
    data: &[u8],
    desc: &TypeDescriptor,
    limits: &Limits,
) -> Result<Value, AbiError> {
    stream::decode_root(data, desc, limits)
}
