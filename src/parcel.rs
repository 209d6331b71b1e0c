// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Parcel: the ordered byte sequence a one-way call carries.
//
// Layout rules (all little-endian, every item padded to a 4-byte boundary):
//   i32 / u32     one word
//   bool          one i32 word, 0 or 1
//   i64           two words
//   string        i32 UTF-16 unit count (-1 = null), UTF-16LE units,
//                 u16 NUL terminator, zero padding
//   byte array    i32 length (-1 = null), raw bytes, zero padding
//   record        i32 presence flag (0 / 1), then the record's protobuf
//                 encoding as a byte array

use crate::error::{Error, Result};

/// Largest parcel any transport in this crate will carry (1 MiB).
pub const MAX_PARCEL_SIZE: usize = 1 << 20;

const WORD: usize = 4;

#[inline]
const fn pad4(len: usize) -> usize {
    (len + (WORD - 1)) & !(WORD - 1)
}

// ---------------------------------------------------------------------------
// Parcel (writer side)
// ---------------------------------------------------------------------------

/// An owning, append-only parcel buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Parcel {
    data: Vec<u8>,
}

impl Parcel {
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { data: Vec::with_capacity(cap) }
    }

    /// Take ownership of already-encoded bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start reading this parcel from the beginning.
    pub fn reader(&self) -> ParcelReader<'_> {
        ParcelReader::new(&self.data)
    }

    fn pad(&mut self) {
        let padded = pad4(self.data.len());
        self.data.resize(padded, 0);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_i32(v as i32);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_nullable_string(Some(s));
    }

    pub fn write_nullable_string(&mut self, s: Option<&str>) {
        let Some(s) = s else {
            self.write_i32(-1);
            return;
        };
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_i32(units.len() as i32);
        self.data.reserve((units.len() + 1) * 2 + WORD);
        for u in units {
            self.data.extend_from_slice(&u.to_le_bytes());
        }
        self.data.extend_from_slice(&0u16.to_le_bytes());
        self.pad();
    }

    pub fn write_byte_array(&mut self, bytes: Option<&[u8]>) {
        let Some(bytes) = bytes else {
            self.write_i32(-1);
            return;
        };
        self.write_i32(bytes.len() as i32);
        self.data.extend_from_slice(bytes);
        self.pad();
    }

    /// Write the interface descriptor that every call carries first.
    pub fn write_interface_token(&mut self, descriptor: &str) {
        self.write_string(descriptor);
    }

    /// Write an optional structured record through its own protobuf codec.
    pub fn write_record<R: prost::Message>(&mut self, record: Option<&R>) {
        match record {
            None => self.write_i32(0),
            Some(r) => {
                self.write_i32(1);
                self.write_byte_array(Some(&r.encode_to_vec()));
            }
        }
    }
}

impl std::fmt::Debug for Parcel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parcel").field("len", &self.data.len()).finish()
    }
}

impl From<Vec<u8>> for Parcel {
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl From<&[u8]> for Parcel {
    fn from(s: &[u8]) -> Self {
        Self::from_vec(s.to_vec())
    }
}

// ---------------------------------------------------------------------------
// ParcelReader
// ---------------------------------------------------------------------------

/// A cursor over borrowed parcel bytes.
///
/// Every read either consumes exactly the bytes it needs (plus padding) or
/// fails with `MalformedPayload` and leaves the cursor unspecified.
pub struct ParcelReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ParcelReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error::malformed(format!(
                    "truncated {what}: need {n} bytes at offset {}, {} available",
                    self.pos,
                    self.remaining()
                ))
            })?;
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn word(&mut self, what: &str) -> Result<[u8; 4]> {
        let b = self.take(WORD, what)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.word("i32")?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.word("u32")?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8, "i64")?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_i32()? != 0)
    }

    /// Read a length word that may be `-1` (null).
    fn read_len(&mut self, what: &str) -> Result<Option<usize>> {
        match self.read_i32()? {
            -1 => Ok(None),
            n if n < 0 => Err(Error::malformed(format!("negative {what} length {n}"))),
            n => Ok(Some(n as usize)),
        }
    }

    pub fn read_nullable_string(&mut self) -> Result<Option<String>> {
        let Some(count) = self.read_len("string")? else {
            return Ok(None);
        };
        let byte_len = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| Error::malformed("string length overflow"))?;
        let raw = self.take(pad4(byte_len), "string")?;
        let units: Vec<u16> = raw[..byte_len]
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        if units[count] != 0 {
            return Err(Error::malformed("string missing NUL terminator"));
        }
        String::from_utf16(&units[..count])
            .map(Some)
            .map_err(|e| Error::malformed(format!("invalid UTF-16 string: {e}")))
    }

    /// Read a string, mapping null to the empty string.
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self.read_nullable_string()?.unwrap_or_default())
    }

    pub fn read_byte_array(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = self.read_len("byte array")? else {
            return Ok(None);
        };
        let raw = self.take(pad4(len), "byte array")?;
        Ok(Some(raw[..len].to_vec()))
    }

    pub fn read_interface_token(&mut self) -> Result<String> {
        self.read_nullable_string()?
            .ok_or_else(|| Error::malformed("null interface token"))
    }

    pub fn read_record<R: prost::Message + Default>(&mut self) -> Result<Option<R>> {
        match self.read_i32()? {
            0 => Ok(None),
            1 => {
                let bytes = self
                    .read_byte_array()?
                    .ok_or_else(|| Error::malformed("present record with null body"))?;
                R::decode(bytes.as_slice())
                    .map(Some)
                    .map_err(|e| Error::malformed(format!("record decode: {e}")))
            }
            flag => Err(Error::malformed(format!("bad record presence flag {flag}"))),
        }
    }
}
