//! Positioned big-endian reader over the document stream.
//!
//! Exactly one [`ByteCursor`] exists per document and it is passed by
//! exclusive borrow through every parser that needs it; no two parser
//! objects ever hold independent handles to the same stream.

use std::io::{Read, Seek, SeekFrom};

use crate::common::{Error, Result};

/// Big-endian binary reader over a single exclusively-owned stream.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
}

impl<R: Read + Seek> ByteCursor<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read exactly `buf.len()` bytes; fewer available is an IO error.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(Error::Io)
    }

    /// Read exactly `len` bytes into a fresh buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a fixed-length byte string.
    ///
    /// Signatures, blend keys and Pascal names are raw bytes on disk;
    /// non-UTF-8 sequences are replaced rather than rejected.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let buf = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_be_bytes(buf))
    }

    /// Current absolute offset.
    pub fn position(&mut self) -> Result<u64> {
        self.inner.stream_position().map_err(Error::Io)
    }

    /// Seek to an absolute offset.
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos)).map_err(Error::Io)?;
        Ok(())
    }

    /// Skip `n` bytes relative to the current offset.
    pub fn skip(&mut self, n: i64) -> Result<()> {
        self.inner.seek(SeekFrom::Current(n)).map_err(Error::Io)?;
        Ok(())
    }
}
