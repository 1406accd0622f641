//! Canonical binary codec primitives
//!
//! Every transaction and block has exactly one byte encoding: fields in a
//! fixed order with fixed widths, variable-length sequences prefixed with a
//! little-endian u32 count. Decoding is strict: truncated input, oversized
//! counts, non-canonical flag bytes and trailing garbage are all rejected,
//! never repaired. The textual boundary form is lowercase hex of the binary.

use thiserror::Error;

/// Maximum number of transactions in one encoded block
pub const MAX_BLOCK_TXS: usize = 10_000;

/// Maximum number of inputs or outputs in one encoded transaction
pub const MAX_TX_PUTS: usize = 4_096;

/// Decoding failures (the `MalformedEncoding` error class)
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Truncated input: needed {needed} more byte(s)")]
    Truncated { needed: usize },
    #[error("Length prefix out of range: {0}")]
    LengthOutOfRange(u32),
    #[error("Transaction has zero outputs")]
    EmptyOutputs,
    #[error("Invalid marker byte: {0:#04x}")]
    InvalidMarker(u8),
    #[error("Trailing bytes after decode: {0}")]
    TrailingBytes(usize),
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// A strict forward-only reader over an encoded byte slice.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_hash(&mut self) -> Result<[u8; 32], CodecError> {
        let bytes = self.take(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_pubkey(&mut self) -> Result<[u8; 33], CodecError> {
        let bytes = self.take(33)?;
        let mut out = [0u8; 33];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_signature(&mut self) -> Result<[u8; 64], CodecError> {
        let bytes = self.take(64)?;
        let mut out = [0u8; 64];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a sequence count prefix, enforcing an upper bound.
    pub fn read_count(&mut self, max: usize) -> Result<usize, CodecError> {
        let count = self.read_u32()?;
        if count as usize > max {
            return Err(CodecError::LengthOutOfRange(count));
        }
        Ok(count as usize)
    }

    /// Read a presence flag; only 0 and 1 are canonical.
    pub fn read_flag(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidMarker(other)),
        }
    }

    /// Assert that the whole input was consumed.
    pub fn finish(self) -> Result<(), CodecError> {
        if self.remaining() != 0 {
            return Err(CodecError::TrailingBytes(self.remaining()));
        }
        Ok(())
    }
}
