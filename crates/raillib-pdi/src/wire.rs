//! Payload field helpers shared by the request decoders.
//!
//! PDI payloads are flat byte records: little-endian counters, fixed-width
//! zero-padded ASCII text, and the odd big-endian word. [`Reader`] walks a
//! payload left to right and turns a short payload into
//! [`Error::Protocol`] instead of a panic.

use bytes::BufMut;
use raillib_core::{Error, Result};

/// Cursor over an unstuffed frame payload.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Current offset from the start of the payload.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `n` bytes.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Protocol(format!(
                "payload too short: need {n} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Take everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    /// Skip `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.bytes(n).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Next byte, or `None` if the payload ends here.
    pub fn opt_u8(&mut self) -> Option<u8> {
        self.u8().ok()
    }

    pub fn le16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn be16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn le24(&mut self) -> Result<u32> {
        let b = self.bytes(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    pub fn le32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Fixed-width text field, trimmed at the first NUL.
    pub fn text(&mut self, width: usize) -> Result<String> {
        Ok(decode_text(self.bytes(width)?))
    }
}

/// Decode a zero-padded ASCII field.
pub fn decode_text(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

/// Write `text` into a field of exactly `width` bytes, zero-padded.
///
/// Text longer than the field is truncated.
pub fn put_text(buf: &mut impl BufMut, text: &str, width: usize) {
    let raw = text.as_bytes();
    let n = raw.len().min(width);
    buf.put_slice(&raw[..n]);
    buf.put_bytes(0, width - n);
}

/// Write the low three bytes of `value`, little-endian.
pub fn put_le24(buf: &mut impl BufMut, value: u32) {
    buf.put_slice(&value.to_le_bytes()[..3]);
}
