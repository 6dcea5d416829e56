//! Binary data parsing utilities for in-memory payloads.
//!
//! This module provides common functions for reading big-endian binary data
//! and UTF-16BE strings from byte slices, plus a positioned [`SliceReader`]
//! used by the resource, descriptor and layer-info payload decoders.

use thiserror::Error;
use zerocopy::{BE, F32, F64, FromBytes, I16, I32, I64, U16, U32};

/// Binary parsing error type
#[derive(Error, Debug, Clone)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },

    /// Failed to parse the data
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

macro_rules! read_be {
    ($name:ident, $wire:ident, $target:ty, $size:expr) => {
        #[doc = concat!("Read a big-endian `", stringify!($target), "` from a byte slice at the given offset.")]
        #[inline]
        pub fn $name(data: &[u8], offset: usize) -> BinaryResult<$target> {
            if offset + $size > data.len() {
                return Err(BinaryError::InsufficientData {
                    expected: offset + $size,
                    available: data.len(),
                });
            }
            $wire::<BE>::read_from_bytes(&data[offset..offset + $size])
                .map(|v| v.get())
                .map_err(|_| {
                    BinaryError::ParseError(format!(
                        "Failed to read {}",
                        stringify!($target)
                    ))
                })
        }
    };
}

read_be!(read_u16_be, U16, u16, 2);
read_be!(read_i16_be, I16, i16, 2);
read_be!(read_u32_be, U32, u32, 4);
read_be!(read_i32_be, I32, i32, 4);
read_be!(read_i64_be, I64, i64, 8);
read_be!(read_f32_be, F32, f32, 4);
read_be!(read_f64_be, F64, f64, 8);

/// Read a single byte from a byte slice at the given offset.
#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> BinaryResult<u8> {
    data.get(offset).copied().ok_or(BinaryError::InsufficientData {
        expected: offset + 1,
        available: data.len(),
    })
}

/// Decode a UTF-16BE byte buffer into a `String`.
///
/// Every pair of bytes is one code unit; an odd trailing byte is ignored.
pub fn decode_utf16be(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Positioned big-endian reader over an in-memory byte slice.
///
/// Resource payloads, descriptors and additional-layer-info blocks are
/// length-delimited buffers already pulled off the stream; this reader walks
/// them without touching the document cursor.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset into the slice.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize) -> BinaryResult<()> {
        if self.pos + n > self.data.len() {
            return Err(BinaryError::InsufficientData {
                expected: self.pos + n,
                available: self.data.len(),
            });
        }
        self.pos += n;
        Ok(())
    }

    /// Read exactly `n` bytes, returning a sub-slice of the input.
    pub fn read_bytes(&mut self, n: usize) -> BinaryResult<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(BinaryError::InsufficientData {
                expected: self.pos + n,
                available: self.data.len(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Read all unread bytes.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn read_u8(&mut self) -> BinaryResult<u8> {
        let v = read_u8(self.data, self.pos)?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> BinaryResult<u16> {
        let v = read_u16_be(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> BinaryResult<i16> {
        let v = read_i16_be(self.data, self.pos)?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> BinaryResult<u32> {
        let v = read_u32_be(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> BinaryResult<i32> {
        let v = read_i32_be(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> BinaryResult<i64> {
        let v = read_i64_be(self.data, self.pos)?;
        self.pos += 8;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> BinaryResult<f32> {
        let v = read_f32_be(self.data, self.pos)?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f64(&mut self) -> BinaryResult<f64> {
        let v = read_f64_be(self.data, self.pos)?;
        self.pos += 8;
        Ok(v)
    }

    /// Read a 4-byte code (signature, type tag, blend key) as a `String`.
    pub fn read_code(&mut self) -> BinaryResult<String> {
        let bytes = self.read_bytes(4)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-prefixed UTF-16BE string.
    ///
    /// The 4-byte prefix counts code units, not bytes.
    pub fn read_unicode_string(&mut self) -> BinaryResult<String> {
        let len = self.read_u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = self.read_bytes(len * 2)?;
        Ok(decode_utf16be(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_be() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert!(read_u16_be(&data, 0).is_ok_and(|v| v == 0x1234));
        assert!(read_u16_be(&data, 2).is_ok_and(|v| v == 0x5678));
        assert!(read_u16_be(&data, 3).is_err());
    }

    #[test]
    fn test_read_i32_be() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        assert!(read_i32_be(&data, 0).is_ok_and(|v| v == -1));
        assert!(read_i32_be(&data, 1).is_err());
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = read_u16_be(&[0u8], 0).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient data: expected 2, got 1");
    }

    #[test]
    fn test_decode_utf16be() {
        let data = [0x00, 0x48, 0x00, 0x69]; // "Hi"
        assert_eq!(decode_utf16be(&data), "Hi");
        assert_eq!(decode_utf16be(&[]), "");
    }

    #[test]
    fn test_slice_reader_walk() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0xAB];
        let mut reader = SliceReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 1);
        assert_eq!(reader.read_u32().unwrap(), 2);
        assert_eq!(reader.read_u8().unwrap(), 0xAB);
        assert!(reader.is_empty());
        assert!(reader.read_u8().is_err());
    }

    #[test]
    fn test_slice_reader_unicode_string() {
        let data = [0x00, 0x00, 0x00, 0x02, 0x00, 0x4F, 0x00, 0x4B];
        let mut reader = SliceReader::new(&data);
        assert_eq!(reader.read_unicode_string().unwrap(), "OK");
    }
}
