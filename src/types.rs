//! Fixed-size integer and hash types shared by the ABI and RLP codecs.

construct_uint! {
    /// 256-bit unsigned integer. `intN` values are held in it as two's complement.
    pub struct U256(4);
}

construct_fixed_hash! {
    /// 20 bytes, the width of an account address.
    pub struct H160(20);
}

construct_fixed_hash! {
    /// 32 bytes, one ABI word.
    pub struct H256(32);
}

/// An account address.
pub type Address = H160;

/// Big-endian word of a 256-bit integer.
impl<'a> From<&'a U256> for H256 {
    fn from(value: &'a U256) -> H256 {
        let mut word = H256::zero();
        value.to_big_endian(word.as_bytes_mut());
        word
    }
}

impl From<H256> for U256 {
    fn from(word: H256) -> U256 {
        U256::from_big_endian(word.as_bytes())
    }
}
