//! Function signatures and call encoding.

use std::fmt;

use log::trace;

use super::{
    sink, stream,
    ty::{Kind, TypeDescriptor},
    value::Value,
};
use crate::{config::Limits, errors::AbiError, types::H256};

/// Hash function used to derive selectors from canonical signatures.
pub trait SignatureHasher {
    /// Hashes `data` to a 32-byte digest.
    fn hash(&self, data: &[u8]) -> H256;
}

impl<F: Fn(&[u8]) -> H256> SignatureHasher for F {
    fn hash(&self, data: &[u8]) -> H256 {
        self(data)
    }
}

/// The Keccak-256 hash used by Ethereum-compatible chains.
#[cfg(feature = "keccak")]
#[derive(Clone, Copy, Debug, Default)]
pub struct Keccak256;

#[cfg(feature = "keccak")]
impl SignatureHasher for Keccak256 {
    fn hash(&self, data: &[u8]) -> H256 {
        H256::from(tiny_keccak::keccak256(data))
    }
}

/// Prepends a function selector to encoded call arguments.
pub fn selector(prefix: [u8; 4], encoded_args: &[u8]) -> Vec<u8> {
    let mut call = Vec::with_capacity(prefix.len() + encoded_args.len());
    call.extend_from_slice(&prefix);
    call.extend_from_slice(encoded_args);
    call
}

/// A named function with typed inputs and outputs, e.g. `transfer(address,uint256)`.
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    inputs: TypeDescriptor,
    outputs: TypeDescriptor,
    canonical: String,
    selector: [u8; 4],
    limits: Limits,
}

impl Function {
    /// Parses `name(inputs)` and derives the selector by hashing the canonical signature.
    pub fn parse<H: SignatureHasher + ?Sized>(signature: &str, hasher: &H) -> Result<Self, AbiError> {
        trace!("parsing function signature `{}`", signature);

        let (name, inputs) = parse_signature(signature)?;
        let canonical = format!("{}{}", name, inputs);
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&hasher.hash(canonical.as_bytes())[..4]);

        Ok(Function {
            name: name.to_string(),
            outputs: TypeDescriptor::parse("()")?,
            inputs,
            canonical,
            selector,
            limits: Limits::default(),
        })
    }

    /// Attaches the return tuple, e.g. `(bool)`.
    pub fn with_outputs(mut self, outputs: &str) -> Result<Self, AbiError> {
        let outputs = TypeDescriptor::parse(outputs)?;
        if outputs.kind() != Kind::Tuple {
            return Err(AbiError::MalformedSignature {
                signature: outputs.to_string(),
                position: 0,
                reason: "function outputs must be a tuple".to_string(),
            });
        }
        self.outputs = outputs;
        Ok(self)
    }

    /// Bounds applied by [`decode_call`](Self::decode_call) and
    /// [`decode_output`](Self::decode_output) instead of the default [`Limits`].
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The function name, without the argument list.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argument tuple.
    pub fn inputs(&self) -> &TypeDescriptor {
        &self.inputs
    }

    /// The return tuple, `()` unless set with [`with_outputs`](Self::with_outputs).
    pub fn outputs(&self) -> &TypeDescriptor {
        &self.outputs
    }

    /// `name(canonical inputs)`, the string the selector is derived from.
    pub fn canonical_signature(&self) -> &str {
        &self.canonical
    }

    /// The first four bytes of the canonical signature's hash.
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// The selector as lowercase hex without a `0x` prefix.
    pub fn selector_hex(&self) -> String {
        hex::encode(self.selector)
    }

    /// Encodes a call: the selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[Value]) -> Result<Vec<u8>, AbiError> {
        let mut encoded = Vec::new();
        sink::encode_members(self.inputs.root(), args, &mut encoded)?;
        Ok(selector(self.selector, &encoded))
    }

    /// Checks the selector of `call` and decodes its arguments.
    pub fn decode_call(&self, call: &[u8]) -> Result<Vec<Value>, AbiError> {
        if call.len() < 4 {
            return Err(AbiError::BufferUnderrun {
                position: 0,
                needed: 4,
                available: call.len(),
            });
        }
        let (prefix, args) = call.split_at(4);
        if prefix != &self.selector[..] {
            return Err(AbiError::SelectorMismatch {
                expected: self.selector_hex(),
                found: hex::encode(prefix),
            });
        }
        stream::decode_members(args, self.inputs.root(), &self.limits)
    }

    /// Encodes return values against the output tuple.
    pub fn encode_output(&self, values: &[Value]) -> Result<Vec<u8>, AbiError> {
        let mut encoded = Vec::new();
        sink::encode_members(self.outputs.root(), values, &mut encoded)?;
        Ok(encoded)
    }

    /// Decodes return data against the output tuple.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Value>, AbiError> {
        stream::decode_members(data, self.outputs.root(), &self.limits)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Splits `name(inputs)` into a validated name and the input tuple.
pub(super) fn parse_signature(signature: &str) -> Result<(&str, TypeDescriptor), AbiError> {
    let malformed = |position: usize, reason: &str| AbiError::MalformedSignature {
        signature: signature.to_string(),
        position,
        reason: reason.to_string(),
    };

    let open = signature
        .find('(')
        .ok_or_else(|| malformed(signature.len(), "expected `(`"))?;
    let name = &signature[..open];
    if !is_function_name(name) {
        return Err(malformed(0, "illegal function name"));
    }

    let inputs = TypeDescriptor::parse(&signature[open..]).map_err(|err| match err {
        AbiError::MalformedSignature {
            position, reason, ..
        } => AbiError::MalformedSignature {
            signature: signature.to_string(),
            position: position + open,
            reason,
        },
        other => other,
    })?;
    if inputs.kind() != Kind::Tuple {
        return Err(malformed(open, "inputs must be a tuple"));
    }
    Ok((name, inputs))
}

fn is_function_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
