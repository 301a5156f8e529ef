//! Event logs.
//!
//! An emitted event carries its indexed arguments as 32-byte topics and its
//! remaining arguments as standard encoded data. Unless the event is anonymous, the
//! first topic is the hash of the canonical signature.

use log::trace;

use super::{
    function::{self, SignatureHasher},
    packed, sink, stream,
    ty::{Kind, TypeDescriptor, TypeRef},
    util::WORD,
    value::{self, Value},
};
use crate::{config::Limits, errors::AbiError, types::H256};

/// An event with its inputs and which of them are indexed, e.g.
/// `Transfer(address,address,uint256)` with the first two indexed.
#[derive(Clone, Debug)]
pub struct Event {
    name: String,
    inputs: TypeDescriptor,
    indexed: Vec<bool>,
    indexed_params: TypeDescriptor,
    data_params: TypeDescriptor,
    anonymous: bool,
    canonical: String,
    signature_hash: H256,
    limits: Limits,
}

impl Event {
    /// Parses `name(inputs)`. `indexed` holds one flag per input.
    pub fn parse<H: SignatureHasher + ?Sized>(
        signature: &str,
        indexed: &[bool],
        hasher: &H,
    ) -> Result<Self, AbiError> {
        trace!("parsing event signature `{}`", signature);

        let (name, inputs) = function::parse_signature(signature)?;
        if indexed.len() != inputs.root().member_count() {
            return Err(AbiError::IndexedMismatch {
                expected: inputs.root().member_count(),
                found: indexed.len(),
            });
        }
        let indexed_params = select(&inputs, indexed, true)?;
        let data_params = select(&inputs, indexed, false)?;
        let canonical = format!("{}{}", name, inputs);
        let signature_hash = hasher.hash(canonical.as_bytes());

        Ok(Event {
            name: name.to_string(),
            inputs,
            indexed: indexed.to_vec(),
            indexed_params,
            data_params,
            anonymous: false,
            canonical,
            signature_hash,
            limits: Limits::default(),
        })
    }

    /// Marks the event anonymous: its signature hash is not emitted as a topic.
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Bounds applied when decoding the data part of a log.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The event name, without the argument list.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All inputs, indexed or not, as one tuple.
    pub fn inputs(&self) -> &TypeDescriptor {
        &self.inputs
    }

    /// One flag per input, `true` for inputs carried in topics.
    pub fn indexed(&self) -> &[bool] {
        &self.indexed
    }

    /// The indexed inputs, in order.
    pub fn indexed_params(&self) -> &TypeDescriptor {
        &self.indexed_params
    }

    /// The inputs carried in the log data, in order.
    pub fn data_params(&self) -> &TypeDescriptor {
        &self.data_params
    }

    /// Whether the signature hash is left out of the topics.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    /// `name(canonical inputs)`, the string the signature hash is derived from.
    pub fn canonical_signature(&self) -> &str {
        &self.canonical
    }

    /// The hash of the canonical signature, the first topic of non-anonymous logs.
    pub fn signature_hash(&self) -> H256 {
        self.signature_hash
    }

    /// Number of topics a log of this event carries.
    pub fn topic_count(&self) -> usize {
        let indexed = self.indexed.iter().filter(|indexed| **indexed).count();
        if self.anonymous {
            indexed
        } else {
            indexed + 1
        }
    }

    /// Topics for `args`: the signature hash unless anonymous, then one word per
    /// indexed argument. Single-word values are stored as their encoded word, any
    /// other value as the hash of its in-place encoding.
    pub fn encode_topics<H: SignatureHasher + ?Sized>(
        &self,
        args: &[Value],
        hasher: &H,
    ) -> Result<Vec<H256>, AbiError> {
        self.validate(args)?;

        let mut topics = Vec::with_capacity(self.topic_count());
        if !self.anonymous {
            topics.push(self.signature_hash);
        }
        for ((ty, arg), _) in self
            .inputs
            .root()
            .members()
            .zip(args)
            .zip(&self.indexed)
            .filter(|(_, indexed)| **indexed)
        {
            let mut encoded = Vec::new();
            if is_word(ty) {
                packed::pack(ty, arg, true, &mut encoded);
                topics.push(H256::from_slice(&encoded));
            } else {
                let in_array = !matches!(ty.kind(), Kind::Bytes | Kind::String);
                packed::pack(ty, arg, in_array, &mut encoded);
                topics.push(hasher.hash(&encoded));
            }
        }
        Ok(topics)
    }

    /// Standard encoding of the non-indexed arguments.
    pub fn encode_data(&self, args: &[Value]) -> Result<Vec<u8>, AbiError> {
        self.validate(args)?;

        let data_args = args
            .iter()
            .zip(&self.indexed)
            .filter(|(_, indexed)| !**indexed)
            .map(|(arg, _)| arg.clone())
            .collect::<Vec<_>>();
        let mut encoded = Vec::new();
        sink::encode_members(self.data_params.root(), &data_args, &mut encoded)?;
        Ok(encoded)
    }

    /// Recovers all arguments, in declaration order, from a log's topics and data.
    ///
    /// Indexed arguments that were hashed cannot be recovered; they decode as the
    /// 32-byte hash in a `FixedBytes` value.
    pub fn decode_args(&self, topics: &[H256], data: &[u8]) -> Result<Vec<Value>, AbiError> {
        if topics.len() != self.topic_count() {
            return Err(AbiError::TopicCountMismatch {
                expected: self.topic_count(),
                found: topics.len(),
            });
        }
        let topics = if self.anonymous {
            topics
        } else {
            if topics[0] != self.signature_hash {
                return Err(AbiError::EventSignatureMismatch {
                    expected: hex::encode(self.signature_hash),
                    found: hex::encode(topics[0]),
                });
            }
            &topics[1..]
        };

        let mut indexed_values = Vec::with_capacity(topics.len());
        for (i, (ty, topic)) in self.indexed_params.root().members().zip(topics).enumerate() {
            let value = if is_word(ty) {
                stream::decode_word(ty.kind(), topic.as_bytes(), i * WORD)?
            } else {
                Value::FixedBytes(topic.as_bytes().to_vec())
            };
            indexed_values.push(value);
        }
        let data_values = stream::decode_members(data, self.data_params.root(), &self.limits)?;

        let mut indexed_values = indexed_values.into_iter();
        let mut data_values = data_values.into_iter();
        Ok(self
            .indexed
            .iter()
            .filter_map(|indexed| {
                if *indexed {
                    indexed_values.next()
                } else {
                    data_values.next()
                }
            })
            .collect())
    }

    fn validate(&self, args: &[Value]) -> Result<(), AbiError> {
        let root = self.inputs.root();
        if args.len() != root.member_count() {
            return Err(AbiError::TypeMismatch {
                expected: root.to_string(),
                found: format!("{} arguments", args.len()),
            });
        }
        value::sequence_len(root, root.members().zip(args)).map(|_| ())
    }
}

fn is_word(ty: TypeRef<'_>) -> bool {
    match ty.kind() {
        Kind::Bool | Kind::Uint(_) | Kind::Int(_) | Kind::Address | Kind::FixedBytes(_) => true,
        Kind::Bytes | Kind::String | Kind::Array(_) | Kind::Tuple => false,
    }
}

/// The tuple of the inputs whose indexed flag equals `indexed`.
fn select(inputs: &TypeDescriptor, flags: &[bool], indexed: bool) -> Result<TypeDescriptor, AbiError> {
    let members = inputs
        .root()
        .members()
        .zip(flags)
        .filter(|(_, flag)| **flag == indexed)
        .map(|(member, _)| member.to_string())
        .collect::<Vec<_>>();
    TypeDescriptor::parse(&format!("({})", members.join(",")))
}
