//! Decoders for individual additional-info blocks.
//!
//! Each function takes the raw payload of one keyed block and is tolerant
//! of trailing bytes: block payloads are length-delimited by the caller,
//! so a decoder only reads the prefix it understands.

use bytes::Bytes;

use crate::common::Result;
use crate::common::binary::SliceReader;

/// Section divider role carried by `lsct`/`lsdk` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionDividerKind {
    /// Unrecognized type code; still opens a group
    Other,
    /// Start of an expanded group
    OpenFolder,
    /// Start of a collapsed group
    ClosedFolder,
    /// Hidden marker closing the nearest open group
    BoundingDivider,
}

impl SectionDividerKind {
    fn from_raw(raw: i32) -> SectionDividerKind {
        match raw {
            1 => SectionDividerKind::OpenFolder,
            2 => SectionDividerKind::ClosedFolder,
            3 => SectionDividerKind::BoundingDivider,
            _ => SectionDividerKind::Other,
        }
    }
}

/// Parsed section divider block.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDividerInfo {
    pub kind: SectionDividerKind,
    /// Blend mode key, present only in longer block revisions
    pub blend_mode: Option<String>,
    pub sub_type: Option<i32>,
}

impl SectionDividerInfo {
    pub fn parse(data: &[u8]) -> Result<SectionDividerInfo> {
        let mut reader = SliceReader::new(data);
        let kind = SectionDividerKind::from_raw(reader.read_i32()?);

        let mut blend_mode = None;
        if reader.remaining() >= 8 {
            reader.skip(4)?; // signature
            blend_mode = Some(reader.read_code()?);
        }

        let mut sub_type = None;
        if reader.remaining() >= 4 {
            sub_type = Some(reader.read_i32()?);
        }

        Ok(SectionDividerInfo {
            kind,
            blend_mode,
            sub_type,
        })
    }

    pub fn is_folder_start(&self) -> bool {
        matches!(
            self.kind,
            SectionDividerKind::OpenFolder | SectionDividerKind::ClosedFolder
        )
    }

    pub fn is_folder_end(&self) -> bool {
        self.kind == SectionDividerKind::BoundingDivider
    }
}

/// Parsed vector mask block (`vmsk` / `vsms`).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMaskInfo {
    pub version: u32,
    pub inverted: bool,
    /// Undecoded path records
    pub path_data: Bytes,
}

impl VectorMaskInfo {
    pub fn parse(data: &[u8]) -> Result<VectorMaskInfo> {
        let mut reader = SliceReader::new(data);
        let version = reader.read_u32()?;
        let flags = reader.read_u32()?;
        Ok(VectorMaskInfo {
            version,
            inverted: flags & 0x01 != 0,
            path_data: Bytes::copy_from_slice(reader.read_rest()),
        })
    }
}

/// Decode a `luni` block: UTF-16 layer name.
pub fn parse_unicode_name(data: &[u8]) -> Result<String> {
    let mut reader = SliceReader::new(data);
    Ok(reader.read_unicode_string()?)
}

/// Decode a `lyid` block: the session-unique layer id.
pub fn parse_layer_id(data: &[u8]) -> Result<i32> {
    let mut reader = SliceReader::new(data);
    Ok(reader.read_i32()?)
}

/// Decode an `iOpa` block: fill opacity byte.
pub fn parse_fill_opacity(data: &[u8]) -> Result<u8> {
    let mut reader = SliceReader::new(data);
    Ok(reader.read_u8()?)
}
