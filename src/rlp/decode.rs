use std::convert::TryFrom;

use log::{debug, trace};

use super::{encode::Item, LIST_OFFSET, SHORT_LIMIT, STRING_OFFSET};
use crate::{config::Limits, errors::RlpError, types::U256};

/// The five encodings an RLP item can take, distinguished by its prefix byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    /// A byte below `0x80` encoding itself.
    SingleByte,
    /// A string of up to 55 bytes.
    StringShort,
    /// A string whose length follows the prefix.
    StringLong,
    /// A list whose payload is up to 55 bytes.
    ListShort,
    /// A list whose payload length follows the prefix.
    ListLong,
}

impl DataType {
    fn of(prefix: u8) -> Self {
        match prefix {
            0x00..=0x7f => DataType::SingleByte,
            0x80..=0xb7 => DataType::StringShort,
            0xb8..=0xbf => DataType::StringLong,
            0xc0..=0xf7 => DataType::ListShort,
            0xf8..=0xff => DataType::ListLong,
        }
    }

    /// Whether this is one of the list encodings.
    pub fn is_list(self) -> bool {
        match self {
            DataType::ListShort | DataType::ListLong => true,
            _ => false,
        }
    }

    fn name(self) -> &'static str {
        if self.is_list() {
            "list"
        } else {
            "string"
        }
    }
}

/// Zero-copy view onto one RLP item of a buffer.
#[derive(Clone, Copy, Debug)]
pub struct Rlp<'a> {
    buf: &'a [u8],
    index: usize,
    data_index: usize,
    end: usize,
    data_type: DataType,
}

impl<'a> Rlp<'a> {
    /// Views `buf`, which must hold exactly one item.
    pub fn new(buf: &'a [u8]) -> Result<Self, RlpError> {
        let item = Rlp::parse_at(buf, 0, buf.len())?;
        if item.end != buf.len() {
            return Err(RlpError::malformed(item.end, "trailing bytes after item"));
        }
        Ok(item)
    }

    fn parse_at(buf: &'a [u8], index: usize, container_end: usize) -> Result<Self, RlpError> {
        let prefix = match buf.get(index) {
            Some(prefix) if index < container_end => *prefix,
            _ => return Err(RlpError::malformed(index, "unexpected end of input")),
        };
        let data_type = DataType::of(prefix);
        let offset = if data_type.is_list() {
            LIST_OFFSET
        } else {
            STRING_OFFSET
        };

        let (data_index, len) = match data_type {
            DataType::SingleByte => (index, 1),
            DataType::StringShort | DataType::ListShort => (index + 1, (prefix - offset) as usize),
            DataType::StringLong | DataType::ListLong => {
                let len_of_len = (prefix - offset) as usize - (SHORT_LIMIT - 1);
                let start = index + 1;
                let data_index = start + len_of_len;
                if data_index > container_end {
                    return Err(RlpError::malformed(index, "length exceeds container"));
                }
                let len_bytes = &buf[start..data_index];
                if len_bytes[0] == 0 {
                    return Err(RlpError::malformed(start, "leading zero in length"));
                }
                let len = len_bytes
                    .iter()
                    .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
                let len = match usize::try_from(len) {
                    Ok(len) if len >= SHORT_LIMIT => len,
                    Ok(_) => {
                        return Err(RlpError::malformed(index, "long form used for short length"))
                    }
                    Err(_) => return Err(RlpError::malformed(index, "length exceeds container")),
                };
                (data_index, len)
            }
        };

        let end = match data_index.checked_add(len) {
            Some(end) if end <= container_end => end,
            _ => return Err(RlpError::malformed(index, "item exceeds its container")),
        };
        if data_type == DataType::StringShort && len == 1 && buf[data_index] < STRING_OFFSET {
            return Err(RlpError::malformed(
                index,
                "single byte below 0x80 must not carry a prefix",
            ));
        }

        Ok(Rlp {
            buf,
            index,
            data_index,
            end,
            data_type,
        })
    }

    /// The encoding of this item, from its prefix byte.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_list(&self) -> bool {
        self.data_type.is_list()
    }

    /// Offset of this item within the buffer it was parsed from.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The payload: string contents, or the concatenated encodings of list items.
    pub fn data(&self) -> &'a [u8] {
        &self.buf[self.data_index..self.end]
    }

    /// The full encoding of this item, prefix included.
    pub fn encoding(&self) -> &'a [u8] {
        &self.buf[self.index..self.end]
    }

    /// Lazily iterates the items of a list.
    pub fn iter(&self) -> Result<RlpIter<'a>, RlpError> {
        if !self.is_list() {
            return Err(self.unexpected("list"));
        }
        Ok(RlpIter {
            buf: self.buf,
            next: self.data_index,
            end: self.end,
            failed: false,
        })
    }

    /// Collects the items of a list.
    pub fn list(&self) -> Result<Vec<Rlp<'a>>, RlpError> {
        self.iter()?.collect()
    }

    /// Reads a string item as a big-endian integer without leading zeros.
    pub fn as_u64(&self) -> Result<u64, RlpError> {
        let data = self.integer_bytes(8)?;
        Ok(data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    pub fn as_u256(&self) -> Result<U256, RlpError> {
        Ok(U256::from_big_endian(self.integer_bytes(32)?))
    }

    /// Reads a string item as UTF-8.
    pub fn as_str(&self) -> Result<&'a str, RlpError> {
        let data = self.string_data()?;
        std::str::from_utf8(data).map_err(|_| RlpError::InvalidUtf8)
    }

    /// Copies this item into an owned tree, bounding nesting by the default
    /// [`Limits::max_depth`].
    pub fn to_item(&self) -> Result<Item, RlpError> {
        self.to_item_with_limits(&Limits::default())
    }

    /// Like [`to_item`](Self::to_item), with nesting bounded by `limits.max_depth`.
    pub fn to_item_with_limits(&self, limits: &Limits) -> Result<Item, RlpError> {
        self.item_at(0, limits.max_depth)
    }

    fn item_at(&self, depth: usize, max_depth: usize) -> Result<Item, RlpError> {
        if !self.is_list() {
            return Ok(Item::String(self.data().to_vec()));
        }
        if depth >= max_depth {
            return Err(RlpError::DepthExceeded(max_depth));
        }
        let mut items = Vec::new();
        for item in self.iter()? {
            items.push(item?.item_at(depth + 1, max_depth)?);
        }
        Ok(Item::List(items))
    }

    fn string_data(&self) -> Result<&'a [u8], RlpError> {
        if self.is_list() {
            return Err(self.unexpected("string"));
        }
        Ok(self.data())
    }

    /// Minimal big-endian integer payload of at most `max` bytes.
    fn integer_bytes(&self, max: usize) -> Result<&'a [u8], RlpError> {
        let data = self.string_data()?;
        if data.len() > max {
            return Err(RlpError::IntegerOverflow {
                len: data.len(),
                max,
            });
        }
        if data.first() == Some(&0) {
            return Err(RlpError::malformed(self.data_index, "leading zero in integer"));
        }
        Ok(data)
    }

    fn unexpected(&self, expected: &'static str) -> RlpError {
        RlpError::UnexpectedType {
            expected,
            found: self.data_type.name(),
        }
    }
}

/// Lazy iterator over consecutive items: the members of a list, or the top-level
/// items of a [`sequence`]. Iteration stops after the first error.
pub struct RlpIter<'a> {
    buf: &'a [u8],
    next: usize,
    end: usize,
    failed: bool,
}

impl<'a> Iterator for RlpIter<'a> {
    type Item = Result<Rlp<'a>, RlpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.end {
            return None;
        }
        match Rlp::parse_at(self.buf, self.next, self.end) {
            Ok(item) => {
                self.next = item.end;
                Some(Ok(item))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Iterator over the concatenated top-level items of a buffer.
pub type Sequence<'a> = RlpIter<'a>;

/// Lazily splits `buf` into its concatenated top-level items.
pub fn sequence(buf: &[u8]) -> Sequence<'_> {
    RlpIter {
        buf,
        next: 0,
        end: buf.len(),
        failed: false,
    }
}

/// Decodes `buf`, which must hold exactly one item, into an owned tree.
pub fn decode(buf: &[u8]) -> Result<Item, RlpError> {
    trace!("decoding {} bytes of rlp", buf.len());

    Rlp::new(buf).and_then(|rlp| rlp.to_item()).map_err(|err| {
        debug!("failed to decode rlp: {}", err);
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed(buf: &[u8]) -> usize {
        match decode(buf) {
            Err(RlpError::MalformedRlp { index, .. }) => index,
            other => panic!("{} decoded unexpectedly: {:?}", hex::encode(buf), other),
        }
    }

    #[test]
    fn canonical_items() {
        assert_eq!(decode(&[0x80]), Ok(Item::String(vec![])));
        assert_eq!(decode(&[0x00]), Ok(Item::String(vec![0x00])));
        assert_eq!(decode(&[0xc0]), Ok(Item::List(vec![])));
        assert_eq!(
            decode(&[0xc2, 0x80, 0x80]),
            Ok(Item::List(vec![Item::String(vec![]), Item::String(vec![])]))
        );
        assert_eq!(decode(&[0x81, 0x80]), Ok(Item::String(vec![0x80])));

        let mut long = vec![0xb8, 56];
        long.extend_from_slice(&[7u8; 56]);
        assert_eq!(decode(&long), Ok(Item::String(vec![7u8; 56])));
    }

    #[test]
    fn data_types() {
        let types = |buf: &[u8]| Rlp::new(buf).unwrap().data_type();
        assert_eq!(types(&[0x7f]), DataType::SingleByte);
        assert_eq!(types(&[0x82, 0x04, 0x00]), DataType::StringShort);
        assert_eq!(types(&[0xc0]), DataType::ListShort);

        let mut long_list = vec![0xf8, 60];
        long_list.extend(std::iter::repeat(0x01).take(60));
        let rlp = Rlp::new(&long_list).unwrap();
        assert_eq!(rlp.data_type(), DataType::ListLong);
        assert_eq!(rlp.data().len(), 60);
        assert_eq!(rlp.encoding(), &long_list[..]);
        assert_eq!(rlp.iter().unwrap().count(), 60);
    }

    #[test]
    fn strict_rejections() {
        // single byte wrapped in a prefix
        assert_eq!(malformed(&[0x81, 0x00]), 0);
        assert_eq!(malformed(&[0x81, 0x7f]), 0);
        // long form for a short length
        assert_eq!(malformed(&[0xb8, 0x05, 1, 2, 3, 4, 5]), 0);
        // leading zero in length-of-length
        let mut buf = vec![0xb9, 0x00, 0x40];
        buf.extend_from_slice(&[0u8; 64]);
        assert_eq!(malformed(&buf), 1);
        // truncated payload
        assert_eq!(malformed(&[0x83, b'a', b'b']), 0);
        // child exceeds its list
        assert_eq!(malformed(&[0xc2, 0x83, b'a']), 1);
        // trailing bytes
        assert_eq!(malformed(&[0x80, 0x80]), 1);
        assert_eq!(malformed(&[]), 0);
        // length of length runs past the buffer
        assert_eq!(malformed(&[0xbb, 0x01]), 0);
    }

    #[test]
    fn integers() {
        assert_eq!(Rlp::new(&[0x80]).unwrap().as_u64(), Ok(0));
        assert_eq!(Rlp::new(&[0x0f]).unwrap().as_u64(), Ok(15));
        assert_eq!(Rlp::new(&[0x82, 0x04, 0x00]).unwrap().as_u64(), Ok(1024));
        assert_eq!(
            Rlp::new(&[0x82, 0x00, 0x01]).unwrap().as_u64(),
            Err(RlpError::malformed(1, "leading zero in integer"))
        );
        assert_eq!(
            Rlp::new(&[0x00]).unwrap().as_u64(),
            Err(RlpError::malformed(0, "leading zero in integer"))
        );
        let nine = [0x89, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        assert_eq!(
            Rlp::new(&nine).unwrap().as_u64(),
            Err(RlpError::IntegerOverflow { len: 9, max: 8 })
        );
        assert_eq!(
            Rlp::new(&nine).unwrap().as_u256(),
            Ok(U256::from_big_endian(&nine[1..]))
        );
        assert_eq!(
            Rlp::new(&[0xc0]).unwrap().as_u64(),
            Err(RlpError::UnexpectedType {
                expected: "string",
                found: "list"
            })
        );
    }

    #[test]
    fn strings_and_lists() {
        let buf = [0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let rlp = Rlp::new(&buf).unwrap();
        let words: Vec<_> = rlp
            .iter()
            .unwrap()
            .map(|item| item.and_then(|item| item.as_str()))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(words, vec!["cat", "dog"]);
        assert_eq!(rlp.list().unwrap()[1].index(), 5);
        assert!(matches!(rlp.as_str(), Err(RlpError::UnexpectedType { .. })));
        assert!(Rlp::new(&[0x80]).unwrap().iter().is_err());
        assert_eq!(Rlp::new(&[0x81, 0xff]).unwrap().as_str(), Err(RlpError::InvalidUtf8));
    }

    #[test]
    fn sequences() {
        let buf = [0x01, 0x82, 0x04, 0x00, 0xc0];
        let items: Vec<_> = sequence(&buf).collect::<Result<_, _>>().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_u64(), Ok(1024));
        assert!(items[2].is_list());

        let broken = [0x01, 0x83, 0x00];
        let results: Vec<_> = sequence(&broken).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1].as_ref().err(),
            Some(&RlpError::malformed(1, "item exceeds its container"))
        );
        assert_eq!(sequence(&[]).count(), 0);
    }

    #[test]
    fn nesting_depth() {
        let nested = |depth: usize| {
            let mut item = Item::List(vec![]);
            for _ in 1..depth {
                item = Item::List(vec![item]);
            }
            item.encode()
        };
        assert!(decode(&nested(64)).is_ok());
        assert_eq!(decode(&nested(65)), Err(RlpError::DepthExceeded(64)));

        let limits = Limits {
            max_depth: 2,
            ..Default::default()
        };
        let rlp_buf = nested(3);
        let rlp = Rlp::new(&rlp_buf).unwrap();
        assert_eq!(rlp.to_item_with_limits(&limits), Err(RlpError::DepthExceeded(2)));
    }

    #[test]
    fn round_trip() {
        let item = Item::List(vec![
            Item::from("cat"),
            Item::from(vec![0u8; 70]),
            Item::List(vec![Item::from(1u64), Item::from(0u64)]),
            Item::from(U256::max_value()),
        ]);
        assert_eq!(decode(&item.encode()), Ok(item));
    }
}
