//! Canonical binary encoding for Merkle DAG nodes.
//!
//! A deliberately small CBOR profile in which every logical value has
//! exactly one byte representation, so object identity (SHA-256 of the
//! encoding) is stable across writers:
//!
//! - map keys sorted by their encoded form; node encoders emit them in
//!   precomputed canonical order
//! - definite-length containers only
//! - integers in shortest form; timestamps as plain integers, never
//!   tagged date forms
//! - DAG links as tag 42 wrapping a byte string of one `0x00` identity
//!   prefix byte plus the 32 raw hash bytes
//!
//! The decoder is strict: duplicate map keys, indefinite lengths, bignum
//! tags, nesting beyond [`MAX_NESTING`] and containers beyond
//! [`MAX_CONTAINER_LEN`] entries are all rejected as [`Error::Corrupt`].

use crate::error::Error;
use crate::hash::Hash;

/// CBOR tag number marking a DAG link.
pub const LINK_TAG: u64 = 42;

/// Maximum container nesting depth a decoder will follow.
pub const MAX_NESTING: usize = 100;

/// Maximum number of elements in a single array or map.
pub const MAX_CONTAINER_LEN: u64 = 10_000;

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SIMPLE: u8 = 7;

/// Canonical CBOR writer.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    fn header(&mut self, major: u8, value: u64) {
        let m = major << 5;
        if value < 24 {
            self.buf.push(m | value as u8);
        } else if value <= u8::MAX as u64 {
            self.buf.push(m | 24);
            self.buf.push(value as u8);
        } else if value <= u16::MAX as u64 {
            self.buf.push(m | 25);
            self.buf.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= u32::MAX as u64 {
            self.buf.push(m | 26);
            self.buf.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buf.push(m | 27);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    pub fn uint(&mut self, value: u64) {
        self.header(MAJOR_UINT, value);
    }

    pub fn int(&mut self, value: i64) {
        if value >= 0 {
            self.header(MAJOR_UINT, value as u64);
        } else {
            self.header(MAJOR_NINT, !(value as u64));
        }
    }

    pub fn text(&mut self, s: &str) {
        self.header(MAJOR_TEXT, s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn bytes(&mut self, b: &[u8]) {
        self.header(MAJOR_BYTES, b.len() as u64);
        self.buf.extend_from_slice(b);
    }

    pub fn array(&mut self, len: usize) {
        self.header(MAJOR_ARRAY, len as u64);
    }

    pub fn map(&mut self, len: usize) {
        self.header(MAJOR_MAP, len as u64);
    }

    /// Encode a DAG link: tag 42 around `0x00 || raw hash bytes`.
    pub fn link(&mut self, hash: &Hash) {
        self.header(MAJOR_TAG, LINK_TAG);
        self.header(MAJOR_BYTES, 33);
        self.buf.push(0x00);
        self.buf.extend_from_slice(hash.as_bytes());
    }
}

fn corrupt(msg: impl Into<String>) -> Error {
    Error::Corrupt(msg.into())
}

/// Strict CBOR reader over a byte slice.
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Fail unless every input byte was consumed.
    pub fn finish(self) -> crate::Result<()> {
        if self.pos != self.data.len() {
            return Err(corrupt(format!(
                "{} trailing bytes after value",
                self.data.len() - self.pos
            )));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> crate::Result<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(corrupt("truncated input"));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read an item header, rejecting indefinite lengths and reserved
    /// additional-info values.
    fn item_header(&mut self) -> crate::Result<(u8, u64)> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        let value = match info {
            0..=23 => info as u64,
            24 => self.take(1)?[0] as u64,
            25 => u16::from_be_bytes(self.take(2)?.try_into().unwrap()) as u64,
            26 => u32::from_be_bytes(self.take(4)?.try_into().unwrap()) as u64,
            27 => u64::from_be_bytes(self.take(8)?.try_into().unwrap()),
            31 => return Err(corrupt("indefinite-length item forbidden")),
            _ => return Err(corrupt(format!("reserved additional info {info}"))),
        };
        Ok((major, value))
    }

    fn container_header(&mut self, want: u8, what: &str) -> crate::Result<usize> {
        let (major, len) = self.item_header()?;
        if major != want {
            return Err(corrupt(format!("expected {what}, got major type {major}")));
        }
        if len > MAX_CONTAINER_LEN {
            return Err(corrupt(format!("{what} with {len} elements exceeds limit")));
        }
        Ok(len as usize)
    }

    pub fn uint(&mut self) -> crate::Result<u64> {
        let (major, value) = self.item_header()?;
        if major != MAJOR_UINT {
            return Err(corrupt(format!(
                "expected unsigned integer, got major type {major}"
            )));
        }
        Ok(value)
    }

    pub fn int(&mut self) -> crate::Result<i64> {
        let (major, value) = self.item_header()?;
        match major {
            MAJOR_UINT => i64::try_from(value).map_err(|_| corrupt("integer out of i64 range")),
            MAJOR_NINT => {
                if value > i64::MAX as u64 {
                    return Err(corrupt("integer out of i64 range"));
                }
                Ok(!(value as i64))
            }
            _ => Err(corrupt(format!("expected integer, got major type {major}"))),
        }
    }

    pub fn text(&mut self) -> crate::Result<&'a str> {
        let (major, len) = self.item_header()?;
        if major != MAJOR_TEXT {
            return Err(corrupt(format!(
                "expected text string, got major type {major}"
            )));
        }
        let raw = self.take(len as usize)?;
        std::str::from_utf8(raw).map_err(|_| corrupt("text string is not valid UTF-8"))
    }

    pub fn bytes(&mut self) -> crate::Result<&'a [u8]> {
        let (major, len) = self.item_header()?;
        if major != MAJOR_BYTES {
            return Err(corrupt(format!(
                "expected byte string, got major type {major}"
            )));
        }
        self.take(len as usize)
    }

    pub fn array(&mut self) -> crate::Result<usize> {
        self.container_header(MAJOR_ARRAY, "array")
    }

    pub fn map(&mut self) -> crate::Result<usize> {
        self.container_header(MAJOR_MAP, "map")
    }

    /// Decode a DAG link, enforcing the tag number and the identity prefix.
    pub fn link(&mut self) -> crate::Result<Hash> {
        let (major, tag) = self.item_header()?;
        if major != MAJOR_TAG {
            return Err(corrupt(format!("expected link tag, got major type {major}")));
        }
        if tag != LINK_TAG {
            return Err(corrupt(format!("expected tag {LINK_TAG} for link, got {tag}")));
        }
        let content = self.bytes()?;
        if content.is_empty() {
            return Err(corrupt("empty link content"));
        }
        if content[0] != 0x00 {
            return Err(corrupt("link missing 0x00 identity prefix"));
        }
        let raw: [u8; 32] = content[1..]
            .try_into()
            .map_err(|_| corrupt(format!("link hash must be 32 bytes, got {}", content.len() - 1)))?;
        Ok(Hash::from_bytes(raw))
    }

    /// Skip one value of any shape, enforcing the nesting and size limits
    /// and the tag restrictions. Used when probing for a single field.
    pub fn skip_value(&mut self) -> crate::Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(corrupt(format!("nesting deeper than {MAX_NESTING}")));
        }
        let (major, value) = self.item_header()?;
        match major {
            MAJOR_UINT | MAJOR_NINT => {}
            MAJOR_BYTES | MAJOR_TEXT => {
                self.take(value as usize)?;
            }
            MAJOR_ARRAY => {
                if value > MAX_CONTAINER_LEN {
                    return Err(corrupt(format!("array with {value} elements exceeds limit")));
                }
                for _ in 0..value {
                    self.skip_value()?;
                }
            }
            MAJOR_MAP => {
                if value > MAX_CONTAINER_LEN {
                    return Err(corrupt(format!("map with {value} pairs exceeds limit")));
                }
                for _ in 0..value {
                    self.skip_value()?;
                    self.skip_value()?;
                }
            }
            MAJOR_TAG => {
                if value == 2 || value == 3 {
                    return Err(corrupt("bignum tags forbidden"));
                }
                self.skip_value()?;
            }
            MAJOR_SIMPLE => {
                // false/true/null/undefined fit in the header; floats carry
                // a payload selected by the additional info already read.
                match value {
                    20..=23 => {}
                    _ => return Err(corrupt("unsupported simple/float value")),
                }
            }
            _ => unreachable!(),
        }
        self.depth -= 1;
        Ok(())
    }
}

/// Decode the keys of a definite-length map in order, rejecting duplicates.
///
/// The callback decodes (or skips) the value for each key. Used by every
/// node decoder; keys may arrive in any order but each at most once.
pub fn decode_map_fields<'a>(
    dec: &mut Decoder<'a>,
    mut field: impl FnMut(&mut Decoder<'a>, &'a str) -> crate::Result<()>,
) -> crate::Result<()> {
    let len = dec.map()?;
    let mut seen: Vec<&str> = Vec::with_capacity(len);
    for _ in 0..len {
        let key = dec.text()?;
        if seen.contains(&key) {
            return Err(corrupt(format!("duplicate map key {key:?}")));
        }
        seen.push(key);
        field(dec, key)?;
    }
    Ok(())
}

/// Hash of an already-encoded node.
pub fn hash_of(encoded: &[u8]) -> Hash {
    Hash::compute(encoded)
}

/// Identity of a raw chunk payload: the hash of the bytes themselves,
/// with no envelope.
pub fn blob_hash(data: &[u8]) -> Hash {
    Hash::compute(data)
}

/// Probe an encoded value for its `t` type field without decoding the rest.
///
/// Returns `None` when the value is a map without a textual `t` entry.
/// Errors surface encoding violations; raw chunk payloads typically fail
/// here, which callers treat as "not a structured node".
pub fn probe_type(data: &[u8]) -> crate::Result<Option<String>> {
    let mut dec = Decoder::new(data);
    let len = dec.map()?;
    let mut found = None;
    let mut seen: Vec<&str> = Vec::with_capacity(len);
    for _ in 0..len {
        let key = dec.text()?;
        if seen.contains(&key) {
            return Err(corrupt(format!("duplicate map key {key:?}")));
        }
        seen.push(key);
        if key == "t" {
            found = Some(dec.text()?.to_string());
        } else {
            dec.skip_value()?;
        }
    }
    dec.finish()?;
    Ok(found)
}
