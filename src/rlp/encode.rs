use super::{LIST_OFFSET, SHORT_LIMIT, STRING_OFFSET};
use crate::types::U256;

/// An owned RLP tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Item {
    /// A byte string.
    String(Vec<u8>),
    /// A list of items.
    List(Vec<Item>),
}

impl Item {
    /// The contents of a string item.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Item::String(data) => Some(data),
            Item::List(_) => None,
        }
    }

    /// The items of a list item.
    pub fn as_list(&self) -> Option<&[Item]> {
        match self {
            Item::List(items) => Some(items),
            Item::String(_) => None,
        }
    }

    /// Length of the encoding of this item, prefix included.
    pub fn encoded_len(&self) -> usize {
        match self {
            Item::String(data) => string_len(data),
            Item::List(items) => {
                let payload = items.iter().map(Item::encoded_len).sum();
                header_len(payload) + payload
            }
        }
    }

    /// Encodes this item into a new buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut lengths = Vec::new();
        let mut out = Vec::with_capacity(self.list_lengths(&mut lengths));
        self.write(&lengths, &mut 0, &mut out);
        out
    }

    /// Appends the encoding of this item to `out`.
    pub fn encode_to(&self, out: &mut Vec<u8>) {
        let mut lengths = Vec::new();
        out.reserve(self.list_lengths(&mut lengths));
        self.write(&lengths, &mut 0, out);
    }

    /// Records the payload length of every list below and including `self`, in the
    /// order `write` visits them, and returns the encoded length of `self`.
    fn list_lengths(&self, lengths: &mut Vec<usize>) -> usize {
        match self {
            Item::String(data) => string_len(data),
            Item::List(items) => {
                let slot = lengths.len();
                lengths.push(0);
                let payload = items.iter().map(|item| item.list_lengths(lengths)).sum();
                lengths[slot] = payload;
                header_len(payload) + payload
            }
        }
    }

    fn write(&self, lengths: &[usize], next: &mut usize, out: &mut Vec<u8>) {
        match self {
            Item::String(data) => write_string(data, out),
            Item::List(items) => {
                write_header(LIST_OFFSET, lengths[*next], out);
                *next += 1;
                for item in items {
                    item.write(lengths, next, out);
                }
            }
        }
    }
}

/// Encodes `data` as an RLP string.
pub fn encode_string(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header_len(data.len()) + data.len());
    write_string(data, &mut out);
    out
}

/// Encodes `items` as an RLP list.
pub fn encode_list(items: &[Item]) -> Vec<u8> {
    let mut lengths = Vec::new();
    let payload: usize = items.iter().map(|item| item.list_lengths(&mut lengths)).sum();
    let mut out = Vec::with_capacity(header_len(payload) + payload);
    write_header(LIST_OFFSET, payload, &mut out);
    let mut next = 0;
    for item in items {
        item.write(&lengths, &mut next, &mut out);
    }
    out
}

fn string_len(data: &[u8]) -> usize {
    if data.len() == 1 && data[0] < STRING_OFFSET {
        1
    } else {
        header_len(data.len()) + data.len()
    }
}

fn write_string(data: &[u8], out: &mut Vec<u8>) {
    if data.len() == 1 && data[0] < STRING_OFFSET {
        out.push(data[0]);
    } else {
        write_header(STRING_OFFSET, data.len(), out);
        out.extend_from_slice(data);
    }
}

fn write_header(offset: u8, len: usize, out: &mut Vec<u8>) {
    if len < SHORT_LIMIT {
        out.push(offset + len as u8);
    } else {
        let (be, skip) = length_bytes(len);
        out.push(offset + (SHORT_LIMIT - 1) as u8 + (be.len() - skip) as u8);
        out.extend_from_slice(&be[skip..]);
    }
}

fn header_len(len: usize) -> usize {
    if len < SHORT_LIMIT {
        1
    } else {
        let (be, skip) = length_bytes(len);
        1 + be.len() - skip
    }
}

/// Big-endian bytes of `len` and the number of leading zero bytes to skip.
fn length_bytes(len: usize) -> ([u8; 8], usize) {
    let be = (len as u64).to_be_bytes();
    let skip = be.iter().take_while(|b| **b == 0).count();
    (be, skip)
}

impl From<u64> for Item {
    fn from(value: u64) -> Self {
        let be = value.to_be_bytes();
        let skip = be.iter().take_while(|b| **b == 0).count();
        Item::String(be[skip..].to_vec())
    }
}

impl From<U256> for Item {
    fn from(value: U256) -> Self {
        let mut be = [0u8; 32];
        value.to_big_endian(&mut be);
        let skip = be.iter().take_while(|b| **b == 0).count();
        Item::String(be[skip..].to_vec())
    }
}

impl From<Vec<u8>> for Item {
    fn from(data: Vec<u8>) -> Self {
        Item::String(data)
    }
}

impl<'a> From<&'a [u8]> for Item {
    fn from(data: &'a [u8]) -> Self {
        Item::String(data.to_vec())
    }
}

impl<'a> From<&'a str> for Item {
    fn from(s: &'a str) -> Self {
        Item::String(s.as_bytes().to_vec())
    }
}

impl From<Vec<Item>> for Item {
    fn from(items: Vec<Item>) -> Self {
        Item::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings() {
        assert_eq!(encode_string(b""), vec![0x80]);
        assert_eq!(encode_string(&[0x00]), vec![0x00]);
        assert_eq!(encode_string(&[0x7f]), vec![0x7f]);
        assert_eq!(encode_string(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(encode_string(b"dog"), vec![0x83, b'd', b'o', b'g']);

        let long = vec![b'a'; 56];
        let encoded = encode_string(&long);
        assert_eq!(&encoded[..2], &[0xb8, 56]);
        assert_eq!(encoded.len(), 58);

        let longer = vec![0u8; 1024];
        assert_eq!(&encode_string(&longer)[..3], &[0xb9, 0x04, 0x00]);
    }

    #[test]
    fn lists() {
        assert_eq!(encode_list(&[]), vec![0xc0]);
        assert_eq!(
            encode_list(&["cat".into(), "dog".into()]),
            vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']
        );
        // set theoretical representation of three
        let zero = Item::List(vec![]);
        let one = Item::List(vec![zero.clone()]);
        let two = Item::List(vec![zero.clone(), one.clone()]);
        let three = Item::List(vec![zero, one, two]);
        assert_eq!(
            three.encode(),
            vec![0xc7, 0xc0, 0xc1, 0xc0, 0xc3, 0xc0, 0xc1, 0xc0]
        );

        let long = Item::List(vec![Item::from(vec![0u8; 60])]);
        assert_eq!(&long.encode()[..2], &[0xf8, 62]);

        assert_eq!(
            encode_list(&[Item::String(vec![]), Item::String(vec![])]),
            vec![0xc2, 0x80, 0x80]
        );
    }

    #[test]
    fn deep_nesting() {
        let mut item = Item::List(vec![]);
        for i in 0..100u64 {
            item = Item::List(vec![Item::from(i), item]);
        }
        let out = item.encode();
        assert_eq!(out.len(), item.encoded_len());
        assert_eq!(out[0], 0xf9);
        assert_eq!(((out[1] as usize) << 8) + out[2] as usize, out.len() - 3);

        let mut appended = vec![0xaa];
        item.encode_to(&mut appended);
        assert_eq!(&appended[1..], &out[..]);
        let payload = 2 * out.len();
        let pair = encode_list(&[item.clone(), item]);
        assert_eq!(&pair[..3], &[0xf9, (payload >> 8) as u8, payload as u8]);
        assert_eq!(&pair[3..], &[&out[..], &out[..]].concat()[..]);
    }

    #[test]
    fn encoded_len_matches() {
        let items = vec![
            Item::from(0u64),
            Item::from(vec![0x42]),
            Item::from(vec![0x99; 100]),
            Item::List(vec![Item::from(1024u64), Item::List(vec![])]),
            Item::List((0..40u64).map(Item::from).collect()),
        ];
        for item in &items {
            assert_eq!(item.encode().len(), item.encoded_len());
        }
        let mut out = vec![0xaa];
        items[1].encode_to(&mut out);
        assert_eq!(out, vec![0xaa, 0x42]);
    }

    #[test]
    fn integers() {
        assert_eq!(Item::from(0u64).encode(), vec![0x80]);
        assert_eq!(Item::from(15u64).encode(), vec![0x0f]);
        assert_eq!(Item::from(1024u64).encode(), vec![0x82, 0x04, 0x00]);
        assert_eq!(Item::from(U256::zero()), Item::String(vec![]));
        assert_eq!(
            Item::from(U256::one() << 255).encode().len(),
            33
        );
    }
}
