//! Fixed-width primitives shared by every codec.
//!
//! Integers are written big-endian. Signed integers additionally have their
//! sign bit inverted, so the byte order of an encoded key matches the numeric
//! order of the value and cursors over integer-keyed tables come back sorted.

use crate::error::{DecodeError, EncodeError, Result};

const SIGN_16: u16 = 0x8000;
const SIGN_32: u32 = 0x8000_0000;
const SIGN_64: u64 = 0x8000_0000_0000_0000;

/// Append-only output buffer
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i16(&mut self, value: i16) {
        self.put_u16((value as u16) ^ SIGN_16);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.put_u32((value as u32) ^ SIGN_32);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.put_u64((value as u64) ^ SIGN_64);
    }

    /// Write a 2-byte element count, failing if it does not fit
    pub fn put_count16(
        &mut self,
        what: &'static str,
        count: usize,
    ) -> std::result::Result<(), EncodeError> {
        let count = u16::try_from(count).map_err(|_| EncodeError::Overflow {
            what,
            value: count as i64,
            max: i64::from(u16::MAX),
        })?;
        self.put_u16(count);
        Ok(())
    }

    /// Write a 4-byte element count, failing if it does not fit
    pub fn put_count32(
        &mut self,
        what: &'static str,
        count: usize,
    ) -> std::result::Result<(), EncodeError> {
        let count = i32::try_from(count).map_err(|_| EncodeError::Overflow {
            what,
            value: count as i64,
            max: i64::from(i32::MAX),
        })?;
        self.put_i32(count);
        Ok(())
    }

    /// Length-prefixed (2 bytes) UTF-8 string
    pub fn put_str(&mut self, value: &str) -> std::result::Result<(), EncodeError> {
        self.put_count16("string length", value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an encoded buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        if self.remaining() < needed {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::malformed(
                "boolean",
                format!("byte {other:#04x} is neither 0 nor 1"),
            )),
        }
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    pub fn get_i16(&mut self) -> Result<i16> {
        Ok((self.get_u16()? ^ SIGN_16) as i16)
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    pub fn get_i32(&mut self) -> Result<i32> {
        Ok((self.get_u32()? ^ SIGN_32) as i32)
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        Ok((self.get_u64()? ^ SIGN_64) as i64)
    }

    /// Read a 4-byte element count written by [`ByteWriter::put_count32`]
    pub fn get_count32(&mut self, what: &'static str) -> Result<usize> {
        let count = self.get_i32()?;
        usize::try_from(count)
            .map_err(|_| DecodeError::malformed(what, format!("negative count {count}")))
    }

    pub fn get_str(&mut self) -> Result<String> {
        let len = usize::from(self.get_u16()?);
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|err| DecodeError::malformed("string", err.to_string()))
    }

    /// Consume everything left in the buffer
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    /// Fail if anything is left unread
    pub fn finish(&self, what: &'static str) -> Result<()> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes {
                what,
                count: self.remaining(),
            })
        }
    }
}
