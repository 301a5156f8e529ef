//! Stream module

use std::collections::HashSet;

use log::{debug, trace};

use super::{
    ty::{Kind, TypeRef},
    util::{self, WORD},
    value::Value,
    TypeDescriptor,
};
use crate::{
    config::Limits,
    errors::AbiError,
    types::{Address, U256},
};

/// Stream interpretation of one head/tail block of an incoming payload.
///
/// Positions are absolute within the payload so that errors point at the offending
/// byte; offsets read from the head are resolved against `base`.
///
/// `tail_end` is how far, relative to `base`, the block's tail has been consumed by
/// the members decoded so far. An offset below it must repeat an earlier offset.
pub(crate) struct Stream<'a> {
    payload: &'a [u8],
    base: usize,
    head_len: usize,
    position: usize,
    tail_end: usize,
    offsets: HashSet<usize>,
}

impl<'a> Stream<'a> {
    /// New stream for known payload
    pub(crate) fn new(raw: &'a [u8]) -> Self {
        Stream::at(raw, 0, 0)
    }

    fn at(payload: &'a [u8], base: usize, head_len: usize) -> Self {
        Stream {
            payload,
            base,
            head_len,
            position: base,
            tail_end: head_len,
            offsets: HashSet::new(),
        }
    }

    /// Current position for the stream
    pub(crate) fn position(&self) -> usize {
        self.position
    }

    /// Bytes left between the current position and the end of the payload.
    pub(crate) fn remaining(&self) -> usize {
        self.payload.len() - self.position
    }

    /// Stream payload
    pub(crate) fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Advance stream position for `amount` bytes, returning the old position.
    pub(crate) fn advance(&mut self, amount: usize) -> Result<usize, AbiError> {
        match self.position.checked_add(amount) {
            Some(end) if end <= self.payload.len() => {
                let old_position = self.position;
                self.position = end;
                Ok(old_position)
            }
            _ => Err(self.underrun(amount)),
        }
    }

    /// Reads the next word.
    pub(crate) fn word(&mut self) -> Result<&'a [u8], AbiError> {
        let start = self.advance(WORD)?;
        Ok(&self.payload[start..self.position])
    }

    /// Opens a block at the current position whose head spans `head_len` bytes.
    fn block(&self, head_len: usize) -> Result<Stream<'a>, AbiError> {
        if head_len > self.remaining() {
            return Err(self.underrun(head_len));
        }
        Ok(Stream::at(self.payload, self.position, head_len))
    }

    /// Resolves the offset word at the current position to a stream positioned at
    /// its target.
    ///
    /// The target must lie within the block and must not point back into tail data
    /// already consumed, unless it is an offset an earlier member of this block used.
    fn follow(&mut self) -> Result<Stream<'a>, AbiError> {
        let position = self.position;
        let word = self.word()?;
        let max = self.payload.len() - self.base;
        let offset = match util::read_usize(word) {
            Some(offset) if offset >= self.head_len && offset <= max => offset,
            _ => {
                return Err(AbiError::OffsetOutOfBounds {
                    position,
                    offset: U256::from_big_endian(word).to_string(),
                    min: self.head_len,
                    max,
                })
            }
        };
        if offset < self.tail_end && !self.offsets.contains(&offset) {
            return Err(AbiError::OffsetOutOfBounds {
                position,
                offset: offset.to_string(),
                min: self.tail_end,
                max,
            });
        }
        self.offsets.insert(offset);
        Ok(Stream::at(self.payload, self.base + offset, 0))
    }

    /// Records that tail data up to the absolute position `end` has been decoded.
    fn consumed(&mut self, end: usize) {
        self.tail_end = self.tail_end.max(end - self.base);
    }

    fn underrun(&self, needed: usize) -> AbiError {
        AbiError::BufferUnderrun {
            position: self.position,
            needed,
            available: self.remaining(),
        }
    }
}

/// Decodes values out of streams while tracking the decoded-value budget.
pub(crate) struct Decoder {
    remaining: usize,
    max: usize,
}

impl Decoder {
    pub(crate) fn new(limits: &Limits) -> Self {
        Decoder {
            remaining: limits.max_decoded_values,
            max: limits.max_decoded_values,
        }
    }

    fn reserve(&self, count: usize) -> Result<(), AbiError> {
        if count > self.remaining {
            return Err(AbiError::LimitExceeded {
                limit: "max_decoded_values",
                max: self.max,
            });
        }
        Ok(())
    }

    fn charge(&mut self) -> Result<(), AbiError> {
        self.reserve(1)?;
        self.remaining -= 1;
        Ok(())
    }

    /// Pop next member of a block: static members are read in place, dynamic ones
    /// through their offset.
    fn pop(&mut self, ty: TypeRef<'_>, stream: &mut Stream<'_>) -> Result<Value, AbiError> {
        if ty.is_dynamic() {
            let mut nested = stream.follow()?;
            let value = self.decode_value(ty, &mut nested)?;
            stream.consumed(nested.position());
            Ok(value)
        } else {
            self.decode_value(ty, stream)
        }
    }

    /// Decodes `count` members laid out as a head/tail block at the current position,
    /// leaving `stream` just past the last tail data the block's members used.
    fn decode_sequence<'t>(
        &mut self,
        types: impl Iterator<Item = TypeRef<'t>>,
        count: usize,
        head_len: Option<usize>,
        stream: &mut Stream<'_>,
    ) -> Result<Vec<Value>, AbiError> {
        let head_len = match head_len {
            Some(head_len) => head_len,
            None => return Err(stream.underrun(usize::max_value())),
        };
        let mut block = stream.block(head_len)?;
        self.reserve(count)?;

        let mut values = Vec::with_capacity(count);
        for ty in types.take(count) {
            values.push(self.pop(ty, &mut block)?);
        }
        stream.advance(block.tail_end)?;
        Ok(values)
    }

    fn decode_value(&mut self, ty: TypeRef<'_>, stream: &mut Stream<'_>) -> Result<Value, AbiError> {
        self.charge()?;
        let position = stream.position();
        let value = match ty.kind() {
            kind @ Kind::Bool
            | kind @ Kind::Uint(_)
            | kind @ Kind::Int(_)
            | kind @ Kind::Address
            | kind @ Kind::FixedBytes(_) => decode_word(kind, stream.word()?, position)?,
            Kind::Bytes => Value::Bytes(decode_byte_string(stream)?.to_vec()),
            Kind::String => {
                let data = decode_byte_string(stream)?;
                match std::str::from_utf8(data) {
                    Ok(s) => Value::String(s.to_string()),
                    Err(_) => {
                        return Err(AbiError::InvalidUtf8 {
                            position: position + WORD,
                        })
                    }
                }
            }
            Kind::Array(len) => {
                let element = match ty.element() {
                    Some(element) => element,
                    None => unreachable!("array nodes always have an element"),
                };
                let count = match len {
                    Some(len) => len as usize,
                    None => read_count(stream)?,
                };
                let head_len = element.head_size().checked_mul(count);
                Value::Array(self.decode_sequence(
                    std::iter::repeat(element),
                    count,
                    head_len,
                    stream,
                )?)
            }
            Kind::Tuple => Value::Tuple(self.decode_sequence(
                ty.members(),
                ty.member_count(),
                members_head_len(ty),
                stream,
            )?),
        };
        Ok(value)
    }
}

/// Checks and converts one word holding a single-word scalar of `kind`.
pub(crate) fn decode_word(kind: Kind, word: &[u8], position: usize) -> Result<Value, AbiError> {
    let value = match kind {
        Kind::Bool => match (util::is_zero_extended(word, 1), word[WORD - 1]) {
            (true, 0) => Value::Bool(false),
            (true, 1) => Value::Bool(true),
            _ => return Err(AbiError::InvalidBool { position }),
        },
        Kind::Uint(bits) => {
            if !util::is_zero_extended(word, bits as usize / 8) {
                return Err(AbiError::PaddingViolation { position });
            }
            Value::Uint(U256::from_big_endian(word))
        }
        Kind::Int(bits) => {
            if !util::is_sign_extended(word, bits as usize / 8) {
                return Err(AbiError::PaddingViolation { position });
            }
            Value::Int(U256::from_big_endian(word))
        }
        Kind::Address => {
            if !util::is_zero_extended(word, 20) {
                return Err(AbiError::PaddingViolation { position });
            }
            Value::Address(Address::from_slice(&word[WORD - 20..]))
        }
        Kind::FixedBytes(len) => {
            let len = len as usize;
            if word[len..].iter().any(|b| *b != 0) {
                return Err(AbiError::PaddingViolation { position });
            }
            Value::FixedBytes(word[..len].to_vec())
        }
        Kind::Bytes | Kind::String | Kind::Array(_) | Kind::Tuple => {
            unreachable!("`{:?}` does not fit in one word", kind)
        }
    };
    Ok(value)
}

/// Decodes the inline encoding of the static type `ty` starting at `position`.
pub(crate) fn decode_static(
    ty: TypeRef<'_>,
    payload: &[u8],
    position: usize,
    limits: &Limits,
) -> Result<Value, AbiError> {
    debug_assert!(!ty.is_dynamic());
    let mut stream = Stream::new(payload);
    stream.advance(position)?;
    Decoder::new(limits).decode_value(ty, &mut stream)
}

fn members_head_len(ty: TypeRef<'_>) -> Option<usize> {
    ty.members()
        .try_fold(0usize, |acc, member| acc.checked_add(member.head_size()))
}

fn read_count(stream: &mut Stream<'_>) -> Result<usize, AbiError> {
    let word = stream.word()?;
    match util::read_usize(word) {
        Some(count) => Ok(count),
        None => Err(stream.underrun(usize::max_value())),
    }
}

/// Reads a length word followed by that many bytes and their zero padding.
fn decode_byte_string<'a>(stream: &mut Stream<'a>) -> Result<&'a [u8], AbiError> {
    let len = read_count(stream)?;
    let padded = match util::padded_len(len) {
        Some(padded) => padded,
        None => return Err(stream.underrun(usize::max_value())),
    };
    let start = stream.advance(padded)?;
    let payload = stream.payload();
    if payload[start + len..start + padded].iter().any(|b| *b != 0) {
        return Err(AbiError::PaddingViolation {
            position: start + len,
        });
    }
    Ok(&payload[start..start + len])
}

/// Decodes `data` as the argument list described by `desc`, mirroring
/// [`encode_root`](super::sink::encode_root).
pub(crate) fn decode_root(
    data: &[u8],
    desc: &TypeDescriptor,
    limits: &Limits,
) -> Result<Value, AbiError> {
    trace!("decoding {} bytes as `{}`", data.len(), desc);

    let root = desc.root();
    let mut decoder = Decoder::new(limits);
    let mut stream = Stream::new(data);
    let result = match root.kind() {
        Kind::Tuple => decoder.decode_value(root, &mut stream),
        _ => stream
            .block(root.head_size())
            .and_then(|mut block| decoder.pop(root, &mut block)),
    };
    result.map_err(|err| {
        debug!("failed to decode `{}`: {}", desc, err);
        err
    })
}

/// Decodes `data` as the members of the tuple `ty`, one value per member.
pub(crate) fn decode_members(
    data: &[u8],
    ty: TypeRef<'_>,
    limits: &Limits,
) -> Result<Vec<Value>, AbiError> {
    trace!("decoding {} bytes as members of `{}`", data.len(), ty);

    Decoder::new(limits)
        .decode_sequence(
            ty.members(),
            ty.member_count(),
            members_head_len(ty),
            &mut Stream::new(data),
        )
        .map_err(|err| {
            debug!("failed to decode members of `{}`: {}", ty, err);
            err
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(sig: &str, data: &[u8]) -> Result<Value, AbiError> {
        decode_root(data, &TypeDescriptor::parse(sig).unwrap(), &Limits::default())
    }

    fn word(hex_word: &str) -> Vec<u8> {
        let mut word = vec![0u8; WORD];
        let bytes = hex::decode(hex_word).unwrap();
        word[WORD - bytes.len()..].copy_from_slice(&bytes);
        word
    }

    #[test]
    fn stream_bounds() {
        let data = [0u8; 40];
        let mut stream = Stream::new(&data);
        assert_eq!(stream.advance(32), Ok(0));
        assert_eq!(stream.remaining(), 8);
        assert_eq!(
            stream.word(),
            Err(AbiError::BufferUnderrun {
                position: 32,
                needed: 32,
                available: 8
            })
        );
        assert!(stream.advance(usize::max_value()).is_err());
        assert_eq!(stream.position(), 32);
    }

    #[test]
    fn scalars() {
        assert_eq!(decode("uint32", &word("45")), Ok(Value::uint(69)));
        assert_eq!(decode("bool", &word("01")), Ok(Value::Bool(true)));
        assert_eq!(decode("int16", &[0xff; 32]), Ok(Value::int(-1)));
        assert_eq!(
            decode("bytes3", &hex::decode(format!("616263{}", "00".repeat(29))).unwrap()),
            Ok(Value::FixedBytes(b"abc".to_vec()))
        );
    }

    #[test]
    fn padding_is_checked() {
        assert_eq!(
            decode("uint8", &word("0100")),
            Err(AbiError::PaddingViolation { position: 0 })
        );
        // -1 as int8 but with a positive sign extension
        assert_eq!(
            decode("int8", &word("ff")),
            Err(AbiError::PaddingViolation { position: 0 })
        );
        assert_eq!(
            decode("bool", &word("02")),
            Err(AbiError::InvalidBool { position: 0 })
        );
        let mut data = word("61");
        data[0] = 0x61;
        assert_eq!(
            decode("bytes1", &data),
            Err(AbiError::PaddingViolation { position: 0 })
        );
    }

    #[test]
    fn byte_string_padding() {
        let mut data = [word("20"), word("01"), word("")].concat();
        data[64] = 0xaa;
        assert_eq!(decode("bytes", &data), Ok(Value::Bytes(vec![0xaa])));
        data[65] = 0x01;
        assert_eq!(
            decode("bytes", &data),
            Err(AbiError::PaddingViolation { position: 65 })
        );
        // padding must be present
        assert!(matches!(
            decode("bytes", &data[..65]),
            Err(AbiError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn offsets_are_bounded() {
        let data = [word("20"), word("00")].concat();
        assert_eq!(decode("bytes", &data), Ok(Value::Bytes(vec![])));

        let past_end = [word("60"), word("00")].concat();
        assert_eq!(
            decode("bytes", &past_end),
            Err(AbiError::OffsetOutOfBounds {
                position: 0,
                offset: "96".to_string(),
                min: 32,
                max: 64,
            })
        );

        // pointing back into the head
        let backwards = [word("00"), word("00")].concat();
        assert!(matches!(
            decode("bytes", &backwards),
            Err(AbiError::OffsetOutOfBounds { min: 32, .. })
        ));

        let huge = [vec![0xff; 32], word("00")].concat();
        assert!(matches!(
            decode("string", &huge),
            Err(AbiError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn offsets_are_relative_to_enclosing_block() {
        // (uint8,string[]) (7, ["a"])
        let data = [
            word("07"),
            word("40"),
            word("01"),
            word("20"),
            word("01"),
            hex::decode(format!("61{}", "00".repeat(31))).unwrap(),
        ]
        .concat();
        assert_eq!(
            decode("(uint8,string[])", &data),
            Ok(Value::Tuple(vec![
                Value::uint(7),
                Value::Array(vec!["a".into()])
            ]))
        );
    }

    fn padded(data: &[u8]) -> Vec<u8> {
        let mut word = vec![0u8; WORD];
        word[..data.len()].copy_from_slice(data);
        word
    }

    #[test]
    fn offsets_cannot_jump_back_into_consumed_tails() {
        // second member points before the first member's tail
        let data = [
            word("80"),
            word("40"),
            word("01"),
            padded(b"b"),
            word("01"),
            padded(b"a"),
        ]
        .concat();
        assert_eq!(
            decode("(bytes,bytes)", &data),
            Err(AbiError::OffsetOutOfBounds {
                position: 32,
                offset: "64".to_string(),
                min: 192,
                max: 192,
            })
        );

        // second member lands inside the first member's data
        let data = [word("40"), word("60"), word("20"), word("01"), padded(b"x")].concat();
        assert_eq!(
            decode("(bytes,bytes)", &data),
            Err(AbiError::OffsetOutOfBounds {
                position: 32,
                offset: "96".to_string(),
                min: 128,
                max: 160,
            })
        );
    }

    #[test]
    fn array_elements_cannot_jump_back() {
        let data = [
            word("20"),
            word("02"),
            word("80"),
            word("40"),
            word("01"),
            padded(b"b"),
            word("01"),
            padded(b"a"),
        ]
        .concat();
        assert_eq!(
            decode("bytes[]", &data),
            Err(AbiError::OffsetOutOfBounds {
                position: 96,
                offset: "64".to_string(),
                min: 192,
                max: 192,
            })
        );
    }

    #[test]
    fn nested_tails_count_as_consumed() {
        // (bytes[],bytes) with the second offset pointing at the array's element data
        let data = [
            word("40"),
            word("80"),
            word("01"),
            word("20"),
            word("01"),
            padded(b"a"),
        ]
        .concat();
        assert_eq!(
            decode("(bytes[],bytes)", &data),
            Err(AbiError::OffsetOutOfBounds {
                position: 32,
                offset: "128".to_string(),
                min: 192,
                max: 192,
            })
        );
    }

    #[test]
    fn shared_offsets_are_allowed() {
        let data = [word("40"), word("40"), word("01"), padded(b"a")].concat();
        assert_eq!(
            decode("(bytes,bytes)", &data),
            Ok(Value::Tuple(vec![
                Value::Bytes(b"a".to_vec()),
                Value::Bytes(b"a".to_vec())
            ]))
        );
        // forward gaps between tails are tolerated
        let data = [word("40"), word("a0"), word("01"), padded(b"a"), word(""), word("00")].concat();
        assert_eq!(
            decode("(bytes,bytes)", &data),
            Ok(Value::Tuple(vec![Value::Bytes(b"a".to_vec()), Value::Bytes(vec![])]))
        );
    }

    #[test]
    fn declared_lengths_are_not_trusted() {
        let data = [word("20"), word("ffffffff")].concat();
        assert!(matches!(
            decode("uint256[]", &data),
            Err(AbiError::BufferUnderrun { .. })
        ));
        let data = [word("20"), vec![0x7f; 32]].concat();
        assert!(matches!(
            decode("bytes", &data),
            Err(AbiError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn budget_bounds_zero_sized_elements() {
        let data = [word("20"), word("ffffffffff")].concat();
        assert_eq!(
            decode("()[]", &data),
            Err(AbiError::LimitExceeded {
                limit: "max_decoded_values",
                max: 1 << 20,
            })
        );

        let limits = Limits {
            max_decoded_values: 3,
            ..Default::default()
        };
        let desc = TypeDescriptor::parse("uint8[3]").unwrap();
        assert!(decode_root(&[0u8; 96], &desc, &limits).is_err());
        let desc = TypeDescriptor::parse("uint8[2]").unwrap();
        assert!(decode_root(&[0u8; 64], &desc, &limits).is_ok());
    }

    #[test]
    fn invalid_utf8() {
        let data = [word("20"), word("01"), word("")]
            .concat()
            .into_iter()
            .enumerate()
            .map(|(i, b)| if i == 64 { 0xff } else { b })
            .collect::<Vec<_>>();
        assert_eq!(
            decode("string", &data),
            Err(AbiError::InvalidUtf8 { position: 64 })
        );
    }

    #[test]
    fn trailing_bytes_tolerated() {
        let data = [word("01"), word("ff")].concat();
        assert_eq!(decode("uint8", &data), Ok(Value::uint(1)));
    }
}
