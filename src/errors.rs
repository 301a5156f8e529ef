//! Error types for the ABI and RLP codecs.

/// Errors raised while parsing signatures or encoding/decoding ABI values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("malformed signature `{signature}` @ {position}: {reason}")]
    MalformedSignature {
        signature: String,
        position: usize,
        reason: String,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("value out of range for `{ty}`: {reason}")]
    ValueOutOfRange { ty: String, reason: &'static str },

    #[error("length {len} of `{ty}` is not representable")]
    LengthOverflow { ty: String, len: usize },

    #[error("buffer underrun @ {position}: needed {needed} bytes but only {available} remain")]
    BufferUnderrun {
        position: usize,
        needed: usize,
        available: usize,
    },

    #[error("offset @ {position} points outside of its enclosing block ({offset} not in {min}..={max})")]
    OffsetOutOfBounds {
        position: usize,
        offset: String,
        min: usize,
        max: usize,
    },

    #[error("illegal padding in word @ {position}")]
    PaddingViolation { position: usize },

    #[error("illegal boolean value in word @ {position}")]
    InvalidBool { position: usize },

    #[error("string data @ {position} is not valid utf-8")]
    InvalidUtf8 { position: usize },

    #[error("selector mismatch: expected {expected}, found {found}")]
    SelectorMismatch { expected: String, found: String },

    #[error("limit `{limit}` of {max} exceeded")]
    LimitExceeded { limit: &'static str, max: usize },

    #[error("{found} bytes past the end of the packed value @ {position}")]
    TrailingBytes { position: usize, found: usize },

    #[error("cannot unpack `{ty}`: {reason}")]
    PackedUnsupported { ty: String, reason: &'static str },

    #[error("event has {expected} inputs but {found} indexed flags were given")]
    IndexedMismatch { expected: usize, found: usize },

    #[error("expected {expected} topics, found {found}")]
    TopicCountMismatch { expected: usize, found: usize },

    #[error("event signature hash mismatch: expected {expected}, found {found}")]
    EventSignatureMismatch { expected: String, found: String },
}

/// Errors raised while decoding RLP.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RlpError {
    #[error("malformed rlp @ {index}: {reason}")]
    MalformedRlp { index: usize, reason: &'static str },

    #[error("expected rlp {expected} but found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("rlp integer of {len} bytes does not fit in {max} bytes")]
    IntegerOverflow { len: usize, max: usize },

    #[error("rlp string is not valid utf-8")]
    InvalidUtf8,

    #[error("rlp nesting exceeds depth limit {0}")]
    DepthExceeded(usize),
}

impl RlpError {
    pub(crate) fn malformed(index: usize, reason: &'static str) -> Self {
        RlpError::MalformedRlp { index, reason }
    }
}
