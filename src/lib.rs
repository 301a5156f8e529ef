//! Contract ABI and RLP codecs.
//!
//! The [`abi`] module parses canonical type signatures into immutable
//! [`TypeDescriptor`](abi::TypeDescriptor)s and encodes/decodes [`Value`](abi::Value)s
//! with the head/tail scheme. The [`rlp`] module implements recursive length-prefix
//! encoding over byte strings and lists.

#[macro_use]
extern crate fixed_hash;
#[macro_use]
extern crate uint;

pub mod abi;
pub mod config;
pub mod errors;
pub mod rlp;
pub mod types;

pub mod prelude {
    pub use crate::{
        abi::{decode, encode, Event, Function, Kind, TypeCache, TypeDescriptor, TypeRef, Value},
        config::Limits,
        errors::{AbiError, RlpError},
        types::*,
    };
}
