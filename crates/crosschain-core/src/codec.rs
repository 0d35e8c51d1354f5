//! Consensus serialization.
//!
//! Every byte that is hashed into a transaction id or committed in a
//! notarisation goes through this module, so the layout must be reproduced
//! exactly by every node:
//! - Fixed-width integers are little-endian
//! - Vector and byte-string lengths use Bitcoin CompactSize
//! - `VARINT` is Bitcoin's base-128 encoding with the "minus one" carry
//! - Symbols inside notarisation payloads are NUL-terminated

use crate::crypto::hash256;
use crate::error::{CoreError, Result};
use crate::types::Hash256;

/// Append-only consensus encoder.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_hash(&mut self, h: &Hash256) {
        self.buf.extend_from_slice(&h.0);
    }

    /// Raw bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bitcoin CompactSize.
    pub fn write_compact_size(&mut self, n: u64) {
        if n < 0xfd {
            self.buf.push(n as u8);
        } else if n <= 0xffff {
            self.buf.push(0xfd);
            self.buf.extend_from_slice(&(n as u16).to_le_bytes());
        } else if n <= 0xffff_ffff {
            self.buf.push(0xfe);
            self.buf.extend_from_slice(&(n as u32).to_le_bytes());
        } else {
            self.buf.push(0xff);
            self.buf.extend_from_slice(&n.to_le_bytes());
        }
    }

    /// Bitcoin `VARINT`: big-endian base-128, each continuation digit
    /// offset by one so every value has exactly one encoding.
    pub fn write_varint(&mut self, mut n: u64) {
        let mut tmp = [0u8; 10];
        let mut len = 0usize;
        loop {
            tmp[len] = (n & 0x7f) as u8 | if len > 0 { 0x80 } else { 0x00 };
            if n <= 0x7f {
                break;
            }
            n = (n >> 7) - 1;
            len += 1;
        }
        for i in (0..=len).rev() {
            self.buf.push(tmp[i]);
        }
    }

    /// CompactSize-prefixed byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    /// CompactSize-prefixed string.
    pub fn write_string(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// NUL-terminated string.
    pub fn write_cstring(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
    }

    /// Consume the encoder.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over consensus-encoded bytes.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Peek at the unconsumed bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fail unless every byte was consumed.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CoreError::TrailingBytes(n)),
        }
    }

    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(CoreError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.read_raw(N)?);
        Ok(arr)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_raw(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_hash(&mut self) -> Result<Hash256> {
        Ok(Hash256(self.read_array()?))
    }

    /// Read a CompactSize, rejecting non-minimal encodings.
    pub fn read_compact_size(&mut self) -> Result<u64> {
        let first = self.read_u8()?;
        let n = match first {
            0xfd => {
                let n = self.read_u16()? as u64;
                if n < 0xfd {
                    return Err(CoreError::NonCanonicalCompactSize);
                }
                n
            }
            0xfe => {
                let n = self.read_u32()? as u64;
                if n <= 0xffff {
                    return Err(CoreError::NonCanonicalCompactSize);
                }
                n
            }
            0xff => {
                let n = u64::from_le_bytes(self.read_array()?);
                if n <= 0xffff_ffff {
                    return Err(CoreError::NonCanonicalCompactSize);
                }
                n
            }
            small => small as u64,
        };
        Ok(n)
    }

    /// Read a length that must fit in the remaining input.
    fn read_length(&mut self) -> Result<usize> {
        let n = self.read_compact_size()?;
        if n > self.remaining() as u64 {
            return Err(CoreError::LengthTooLarge(n));
        }
        Ok(n as usize)
    }

    /// Read a Bitcoin `VARINT`.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut n: u64 = 0;
        loop {
            let byte = self.read_u8()?;
            if n > (u64::MAX >> 7) {
                return Err(CoreError::VarIntOverflow);
            }
            n = (n << 7) | (byte & 0x7f) as u64;
            if byte & 0x80 != 0 {
                n = n.checked_add(1).ok_or(CoreError::VarIntOverflow)?;
            } else {
                return Ok(n);
            }
        }
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_length()?;
        Ok(self.read_raw(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| CoreError::InvalidSymbol)
    }

    /// Read a NUL-terminated ASCII string of at most `max_len` bytes
    /// including the terminator.
    pub fn read_cstring(&mut self, max_len: usize) -> Result<String> {
        let window = &self.rest()[..max_len.min(self.remaining())];
        let nul = window
            .iter()
            .position(|&b| b == 0)
            .ok_or(CoreError::InvalidSymbol)?;
        let bytes = self.read_raw(nul + 1)?;
        let s = &bytes[..nul];
        if !s.is_ascii() {
            return Err(CoreError::InvalidSymbol);
        }
        Ok(String::from_utf8_lossy(s).into_owned())
    }

    /// Read a CompactSize element count, bounded by the remaining input.
    pub fn read_count(&mut self) -> Result<usize> {
        self.read_length()
    }
}

/// Types with a consensus encoding.
pub trait Encodable {
    fn encode(&self, enc: &mut Encoder);
}

/// Types decodable from their consensus encoding.
pub trait Decodable: Sized {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self>;
}

/// Encode a value to bytes.
pub fn serialize<T: Encodable + ?Sized>(value: &T) -> Vec<u8> {
    let mut enc = Encoder::new();
    value.encode(&mut enc);
    enc.into_bytes()
}

/// Decode a value, requiring that every byte is consumed.
pub fn deserialize<T: Decodable>(bytes: &[u8]) -> Result<T> {
    let mut dec = Decoder::new(bytes);
    let value = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

/// hash256 of the consensus encoding.
pub fn serialize_hash<T: Encodable + ?Sized>(value: &T) -> Hash256 {
    hash256(&serialize(value))
}

impl Encodable for Hash256 {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_hash(self);
    }
}

impl Decodable for Hash256 {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        dec.read_hash()
    }
}

impl<T: Encodable> Encodable for [T] {
    fn encode(&self, enc: &mut Encoder) {
        enc.write_compact_size(self.len() as u64);
        for item in self {
            item.encode(enc);
        }
    }
}

impl<T: Encodable> Encodable for Vec<T> {
    fn encode(&self, enc: &mut Encoder) {
        self.as_slice().encode(enc);
    }
}

impl<T: Decodable> Decodable for Vec<T> {
    fn decode(dec: &mut Decoder<'_>) -> Result<Self> {
        // Every element occupies at least one byte.
        let count = dec.read_count()?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(dec)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint_bytes(n: u64) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.write_varint(n);
        enc.into_bytes()
    }

    #[test]
    fn test_varint_known_encodings() {
        assert_eq!(varint_bytes(0), vec![0x00]);
        assert_eq!(varint_bytes(0x7f), vec![0x7f]);
        assert_eq!(varint_bytes(0x80), vec![0x80, 0x00]);
        assert_eq!(varint_bytes(0xff), vec![0x80, 0x7f]);
        assert_eq!(varint_bytes(0x1234), vec![0xa3, 0x34]);
        assert_eq!(varint_bytes(0x4080), vec![0x80, 0x80, 0x00]);
    }

    #[test]
    fn test_varint_decode_matches_encode() {
        for n in [0u64, 1, 127, 128, 255, 16511, 16512, 1 << 32, u32::MAX as u64] {
            let bytes = varint_bytes(n);
            let mut dec = Decoder::new(&bytes);
            assert_eq!(dec.read_varint().unwrap(), n);
            assert!(dec.is_empty());
        }
    }

    #[test]
    fn test_compact_size_encoding() {
        let mut enc = Encoder::new();
        enc.write_compact_size(252);
        enc.write_compact_size(253);
        enc.write_compact_size(0x10000);
        assert_eq!(
            enc.into_bytes(),
            vec![0xfc, 0xfd, 0xfd, 0x00, 0xfe, 0x00, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_compact_size_rejects_non_canonical() {
        let bytes = [0xfd, 0x10, 0x00];
        let mut dec = Decoder::new(&bytes);
        assert_eq!(
            dec.read_compact_size(),
            Err(CoreError::NonCanonicalCompactSize)
        );
    }

    #[test]
    fn test_cstring_requires_terminator_in_window() {
        let mut dec = Decoder::new(b"KMD\0rest");
        assert_eq!(dec.read_cstring(64).unwrap(), "KMD");
        assert_eq!(dec.rest(), b"rest");

        let mut dec = Decoder::new(b"LONGSYMBOL\0");
        assert_eq!(dec.read_cstring(4), Err(CoreError::InvalidSymbol));
    }

    #[test]
    fn test_bytes_length_bounded_by_input() {
        let bytes = [0x05, 0x01, 0x02];
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.read_bytes(), Err(CoreError::LengthTooLarge(5)));
    }

    #[test]
    fn test_deserialize_rejects_trailing_bytes() {
        let mut bytes = serialize(&Hash256::from_bytes([3; 32]));
        bytes.push(0);
        assert_eq!(
            deserialize::<Hash256>(&bytes),
            Err(CoreError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_vec_of_hashes() {
        let hashes = vec![Hash256::from_bytes([1; 32]), Hash256::from_bytes([2; 32])];
        let bytes = serialize(&hashes);
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes.len(), 65);
        assert_eq!(deserialize::<Vec<Hash256>>(&bytes).unwrap(), hashes);
    }
}
