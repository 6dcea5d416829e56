//! Document header parsing.

use std::io::{Read, Seek};

use crate::common::{Error, Result};
use crate::consts::*;
use crate::cursor::ByteCursor;

/// The fixed-layout PSD file header.
///
/// Immutable once parsed; created once per document. The variable-length
/// color-mode data block that follows the fixed fields is opaque to this
/// crate and skipped entirely.
#[derive(Debug, Clone)]
pub struct Header {
    pub version: u16,
    pub channels: u16,
    /// Document height in pixels
    pub rows: u32,
    /// Document width in pixels
    pub cols: u32,
    pub depth: u16,
    /// Color mode code (see the `COLOR_MODE_*` constants)
    pub mode: u16,
}

impl Header {
    /// Parse the header section from the start of the document.
    pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Header> {
        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature)?;
        if &signature != FILE_SIGNATURE {
            return Err(Error::NotPsdFile);
        }

        let version = cursor.read_u16()?;
        if version != VERSION_PSD && version != VERSION_PSB {
            return Err(Error::InvalidFormat(format!(
                "unsupported PSD version: {}",
                version
            )));
        }

        // Reserved bytes
        cursor.skip(6)?;

        let channels = cursor.read_u16()?;
        let rows = cursor.read_u32()?;
        let cols = cursor.read_u32()?;
        let depth = cursor.read_u16()?;
        let mode = cursor.read_u16()?;

        // The color-mode data block is opaque to this core.
        let color_data_len = cursor.read_u32()?;
        if color_data_len > 0 {
            cursor.skip(color_data_len as i64)?;
        }

        Ok(Header {
            version,
            channels,
            rows,
            cols,
            depth,
            mode,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.cols
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rows
    }

    /// Human-readable color mode name.
    pub fn mode_name(&self) -> String {
        COLOR_MODE_NAMES
            .get(self.mode as usize)
            .map(|name| (*name).to_string())
            .unwrap_or_else(|| format!("Unknown({})", self.mode))
    }

    /// True for PSB (large document format) files.
    #[inline]
    pub fn is_big(&self) -> bool {
        self.version == VERSION_PSB
    }

    #[inline]
    pub fn is_rgb(&self) -> bool {
        self.mode == COLOR_MODE_RGB
    }

    #[inline]
    pub fn is_cmyk(&self) -> bool {
        self.mode == COLOR_MODE_CMYK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(signature: &[u8; 4], version: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(signature);
        data.extend_from_slice(&version.to_be_bytes());
        data.extend_from_slice(&[0u8; 6]); // reserved
        data.extend_from_slice(&3u16.to_be_bytes()); // channels
        data.extend_from_slice(&600u32.to_be_bytes()); // rows
        data.extend_from_slice(&900u32.to_be_bytes()); // cols
        data.extend_from_slice(&8u16.to_be_bytes()); // depth
        data.extend_from_slice(&COLOR_MODE_RGB.to_be_bytes()); // mode
        data.extend_from_slice(&2u32.to_be_bytes()); // color data length
        data.extend_from_slice(&[0xAA, 0xBB]); // color data, skipped
        data
    }

    #[test]
    fn test_parse_header() {
        let mut cursor = ByteCursor::new(Cursor::new(header_bytes(FILE_SIGNATURE, 1)));
        let header = Header::parse(&mut cursor).unwrap();
        assert_eq!(header.version, 1);
        assert_eq!(header.channels, 3);
        assert_eq!(header.width(), 900);
        assert_eq!(header.height(), 600);
        assert_eq!(header.depth, 8);
        assert_eq!(header.mode, COLOR_MODE_RGB);
        assert_eq!(header.mode_name(), "RGBColor");
        assert!(header.is_rgb());
        assert!(!header.is_cmyk());
        assert!(!header.is_big());
        // The color-mode data block must be fully consumed.
        assert_eq!(cursor.position().unwrap(), 32);
    }

    #[test]
    fn test_bad_signature() {
        let mut cursor = ByteCursor::new(Cursor::new(header_bytes(b"8BPX", 1)));
        assert!(matches!(Header::parse(&mut cursor), Err(Error::NotPsdFile)));
    }

    #[test]
    fn test_bad_version() {
        let mut cursor = ByteCursor::new(Cursor::new(header_bytes(FILE_SIGNATURE, 3)));
        assert!(matches!(
            Header::parse(&mut cursor),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_psb_version_accepted() {
        let mut cursor = ByteCursor::new(Cursor::new(header_bytes(FILE_SIGNATURE, 2)));
        let header = Header::parse(&mut cursor).unwrap();
        assert!(header.is_big());
    }
}
