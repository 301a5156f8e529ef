//! Recursive length-prefix serialization.
//!
//! Use [`Item`] to build and encode an owned tree, [`Rlp`] for a zero-copy view onto
//! untrusted input, and [`sequence`] for buffers holding several concatenated items.
//!
//! ```
//! use oasis_abi::rlp::{self, Item};
//!
//! let cat = Item::from("cat");
//! let out = cat.encode();
//! assert_eq!(out, vec![0x83, b'c', b'a', b't']);
//! assert_eq!(rlp::decode(&out).unwrap(), cat);
//! ```

mod decode;
mod encode;

pub use self::{
    decode::{decode, sequence, DataType, Rlp, RlpIter, Sequence},
    encode::{encode_list, encode_string, Item},
};

/// The RLP encoded empty string.
pub const NULL_RLP: [u8; 1] = [0x80];
/// The RLP encoded empty list.
pub const EMPTY_LIST_RLP: [u8; 1] = [0xc0];

const STRING_OFFSET: u8 = 0x80;
const LIST_OFFSET: u8 = 0xc0;
/// Payloads shorter than this use the single-byte length form.
const SHORT_LIMIT: usize = 56;
