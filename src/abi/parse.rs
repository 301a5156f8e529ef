//! Recursive-descent parser for type signatures.
//!
//! ```text
//! type   := base suffix*
//! base   := keyword | '(' [member (',' member)*] ')'
//! member := type [identifier]
//! suffix := '[' [digits] ']'
//! ```
//!
//! ASCII whitespace is accepted between tokens. Member names are kept as metadata
//! and never reach the canonical form.

use log::trace;

use super::ty::{Builder, Kind, TypeDescriptor};
use crate::{config::Limits, errors::AbiError};

pub(crate) fn parse(signature: &str, limits: &Limits) -> Result<TypeDescriptor, AbiError> {
    trace!("parsing type signature `{}`", signature);

    let mut parser = Parser {
        signature,
        bytes: signature.as_bytes(),
        pos: 0,
        depth: 0,
        max_depth: limits.max_depth,
        builder: Builder::default(),
    };
    if signature.len() > limits.max_signature_len {
        return Err(parser.error(format!(
            "signature length {} exceeds maximum {}",
            signature.len(),
            limits.max_signature_len
        )));
    }

    parser.skip_ws();
    parser.parse_type()?;
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(parser.builder.finish())
}

struct Parser<'s> {
    signature: &'s str,
    bytes: &'s [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
    builder: Builder,
}

impl Parser<'_> {
    fn parse_type(&mut self) -> Result<u32, AbiError> {
        let depth = self.depth;
        self.descend()?;

        let mut id = match self.peek() {
            Some(b'(') => self.parse_tuple()?,
            _ => self.parse_base()?,
        };

        loop {
            let mark = self.pos;
            self.skip_ws();
            if self.peek() != Some(b'[') {
                self.pos = mark;
                break;
            }
            self.pos += 1;
            self.skip_ws();
            let len = match self.peek() {
                Some(b']') => None,
                _ => Some(self.parse_len()?),
            };
            self.skip_ws();
            self.expect(b']')?;
            self.descend()?;
            id = match self.builder.push_array(id, len) {
                Some(id) => id,
                None => return Err(self.error("array is too large")),
            };
        }

        self.depth = depth;
        Ok(id)
    }

    fn parse_tuple(&mut self) -> Result<u32, AbiError> {
        self.expect(b'(')?;
        self.skip_ws();

        let mut members = Vec::new();
        if self.peek() == Some(b')') {
            self.pos += 1;
        } else {
            loop {
                self.skip_ws();
                let member = self.parse_type()?;

                let mark = self.pos;
                self.skip_ws();
                if self.pos > mark && self.peek().map_or(false, is_ident_start) {
                    let name = self.parse_ident();
                    self.builder.set_name(member, name);
                    self.skip_ws();
                }
                members.push(member);

                match self.peek() {
                    Some(b',') => self.pos += 1,
                    Some(b')') => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => return Err(self.error("expected `,` or `)`")),
                    None => return Err(self.error("unterminated tuple")),
                }
            }
        }

        match self.builder.push_tuple(&members) {
            Some(id) => Ok(id),
            None => Err(self.error("tuple is too large")),
        }
    }

    fn parse_base(&mut self) -> Result<u32, AbiError> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a type"));
        }
        let keyword = &self.signature[start..self.pos];
        match base_kind(keyword) {
            Some(kind) => Ok(self.builder.push_scalar(kind)),
            None => {
                self.pos = start;
                Err(self.error(format!("unknown type `{}`", keyword)))
            }
        }
    }

    fn parse_len(&mut self) -> Result<u32, AbiError> {
        let start = self.pos;
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits = &self.signature[start..self.pos];
        match parse_decimal(digits).and_then(|len| len.parse::<u32>().ok()) {
            Some(len) => Ok(len),
            None => {
                self.pos = start;
                Err(self.error("bad array length"))
            }
        }
    }

    fn parse_ident(&mut self) -> String {
        let start = self.pos;
        while self.peek().map_or(false, is_ident_char) {
            self.pos += 1;
        }
        self.signature[start..self.pos].to_string()
    }

    fn descend(&mut self) -> Result<(), AbiError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.error(format!("nesting exceeds depth limit {}", self.max_depth)));
        }
        Ok(())
    }

    fn expect(&mut self, c: u8) -> Result<(), AbiError> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", c as char)))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, reason: impl Into<String>) -> AbiError {
        AbiError::MalformedSignature {
            signature: self.signature.to_string(),
            position: self.pos,
            reason: reason.into(),
        }
    }
}

fn base_kind(keyword: &str) -> Option<Kind> {
    let kind = match keyword {
        "bool" => Kind::Bool,
        "address" => Kind::Address,
        "string" => Kind::String,
        "bytes" => Kind::Bytes,
        "uint" => Kind::Uint(256),
        "int" => Kind::Int(256),
        _ => {
            if let Some(width) = keyword.strip_prefix("uint") {
                Kind::Uint(bit_width(width)?)
            } else if let Some(width) = keyword.strip_prefix("int") {
                Kind::Int(bit_width(width)?)
            } else if let Some(len) = keyword.strip_prefix("bytes") {
                let len = parse_decimal(len)?.parse::<u8>().ok()?;
                if len == 0 || len > 32 {
                    return None;
                }
                Kind::FixedBytes(len)
            } else {
                return None;
            }
        }
    };
    Some(kind)
}

fn bit_width(digits: &str) -> Option<u16> {
    let bits = parse_decimal(digits)?.parse::<u16>().ok()?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return None;
    }
    Some(bits)
}

/// Accepts a non-empty run of digits without leading zeros (`0` itself is allowed).
fn parse_decimal(digits: &str) -> Option<&str> {
    let valid = !digits.is_empty()
        && digits.bytes().all(|c| c.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if valid {
        Some(digits)
    } else {
        None
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(sig: &str) -> String {
        TypeDescriptor::parse(sig).unwrap().canonical().to_string()
    }

    fn reject(sig: &str) -> usize {
        match TypeDescriptor::parse(sig) {
            Err(AbiError::MalformedSignature { position, .. }) => position,
            other => panic!("`{}` parsed unexpectedly: {:?}", sig, other),
        }
    }

    #[test]
    fn base_types() {
        for sig in &[
            "bool", "address", "string", "bytes", "bytes1", "bytes32", "uint8", "uint256",
            "int8", "int136", "int256",
        ] {
            assert_eq!(&canonical(sig), sig);
        }
        assert_eq!(canonical("uint"), "uint256");
        assert_eq!(canonical("int"), "int256");
    }

    #[test]
    fn suffixes_apply_left_to_right() {
        let desc = TypeDescriptor::parse("uint256[2][]").unwrap();
        let root = desc.root();
        assert_eq!(root.kind(), Kind::Array(None));
        assert_eq!(root.element().unwrap().kind(), Kind::Array(Some(2)));
        assert_eq!(canonical("(uint,bytes32[3][])[0]"), "(uint256,bytes32[3][])[0]");
    }

    #[test]
    fn insignificant_whitespace() {
        assert_eq!(
            canonical("  ( uint256 ,\tbytes32 [ 3 ] [] , ( bool ) [ ] )  "),
            "(uint256,bytes32[3][],(bool)[])"
        );
        assert_eq!(
            TypeDescriptor::parse("(uint256,bytes)").unwrap(),
            TypeDescriptor::parse(" ( uint256 , bytes ) ").unwrap()
        );
    }

    #[test]
    fn member_names() {
        let desc = TypeDescriptor::parse("(uint256 amount, (address to, bool) inner)").unwrap();
        assert_eq!(desc.canonical(), "(uint256,(address,bool))");
        let names: Vec<_> = desc.root().members().map(|m| m.name()).collect();
        assert_eq!(names, vec![Some("amount"), Some("inner")]);
        let inner = desc.root().members().nth(1).unwrap();
        let inner_names: Vec<_> = inner.members().map(|m| m.name()).collect();
        assert_eq!(inner_names, vec![Some("to"), None]);
    }

    #[test]
    fn empty_tuple() {
        assert_eq!(canonical("()"), "()");
        assert_eq!(canonical("( )[2]"), "()[2]");
    }

    #[test]
    fn malformed() {
        assert_eq!(reject("uint7"), 0);
        assert_eq!(reject("uint264"), 0);
        assert_eq!(reject("uint08"), 0);
        assert_eq!(reject("int0"), 0);
        assert_eq!(reject("bytes0"), 0);
        assert_eq!(reject("bytes33"), 0);
        assert_eq!(reject("bytes01"), 0);
        assert_eq!(reject("float"), 0);
        assert_eq!(reject(""), 0);
        assert_eq!(reject("uint 256"), 5);
        assert_eq!(reject("uint256[-1]"), 8);
        assert_eq!(reject("uint256[01]"), 8);
        assert_eq!(reject("uint256[x]"), 8);
        assert_eq!(reject("uint256[4294967296]"), 8);
        assert_eq!(reject("uint256[2"), 9);
        assert_eq!(reject("(uint256"), 8);
        assert_eq!(reject("(uint256,)"), 9);
        assert_eq!(reject("(,uint256)"), 1);
        assert_eq!(reject("(uint256))"), 9);
        assert_eq!(reject("uint256]"), 7);
        assert_eq!(reject("uint256 x"), 8);
        assert_eq!(reject("(uint256_x)"), 8);
        assert_eq!(reject("(uint256 a b)"), 11);
    }

    #[test]
    fn limits() {
        let limits = Limits {
            max_depth: 3,
            ..Default::default()
        };
        assert!(TypeDescriptor::parse_with_limits("((uint8))", &limits).is_ok());
        assert!(TypeDescriptor::parse_with_limits("((uint8[]))", &limits).is_err());
        assert!(TypeDescriptor::parse_with_limits("(((uint8)))", &limits).is_err());

        let long = format!("({})", vec!["uint256"; 300].join(","));
        assert!(TypeDescriptor::parse(&long).is_err());
        let limits = Limits {
            max_signature_len: long.len(),
            ..Default::default()
        };
        assert!(TypeDescriptor::parse_with_limits(&long, &limits).is_ok());
    }

    #[test]
    fn oversized_static_array() {
        assert!(TypeDescriptor::parse("uint256[4294967295][4294967295][4294967295]").is_err());
    }

    #[test]
    fn canonical_round_trip() {
        for sig in &[
            "(uint, int8[][3], (bytes, string)[2], address payee)",
            "((()))",
            "bool[0][1][]",
            "(bytes32[2][],(uint64,(string[],bool)[]))",
        ] {
            let first = TypeDescriptor::parse(sig).unwrap();
            let second = TypeDescriptor::parse(first.canonical()).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.canonical(), second.canonical());
        }
    }
}
