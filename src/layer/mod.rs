//! Layer records, additional-info blocks and channel planes.
//!
//! A layer record holds everything except pixel data: bounds, the channel
//! table, blend settings, the optional mask, and a sequence of keyed
//! additional-info blocks. Channel planes are stored after all records
//! and decoded by [`channel`].

pub mod channel;
pub mod info;
pub mod section;
pub mod type_tool;

use std::collections::HashMap;
use std::io::{Read, Seek};

use bitflags::bitflags;
use bytes::Bytes;
use serde::Serialize;
use smallvec::SmallVec;

pub use channel::{ChannelImage, ChannelInfo};
pub use info::{SectionDividerInfo, SectionDividerKind, VectorMaskInfo};
pub use type_tool::{TextTransform, TypeToolInfo};

use crate::common::{Error, Rect, Result};
use crate::consts::{
    BLOCK_SIGNATURE, BLOCK_SIGNATURE_64, KEY_FILL_OPACITY, KEY_LAYER_ID, KEY_SECTION_DIVIDER,
    KEY_SECTION_DIVIDER_LEGACY, KEY_TYPE_TOOL, KEY_UNICODE_NAME, KEY_VECTOR_MASK,
    KEY_VECTOR_MASK_V6,
};
use crate::cursor::ByteCursor;

bitflags! {
    /// Flag byte of the layer record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LayerFlags: u8 {
        const TRANSPARENCY_PROTECTED = 0x01;
        const HIDDEN = 0x02;
        const OBSOLETE = 0x04;
        const HAS_EXTRA_BIT = 0x08;
        const PIXEL_DATA_IRRELEVANT = 0x10;
    }
}

bitflags! {
    /// Flag byte of the layer mask sub-block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaskFlags: u8 {
        const POSITION_RELATIVE = 0x01;
        const DISABLED = 0x02;
        const INVERTED = 0x04;
    }
}

/// Raster mask attached to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMaskData {
    pub rect: Rect,
    pub default_color: u8,
    pub flags: MaskFlags,
}

impl LayerMaskData {
    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    /// A zero-area mask hides the whole layer.
    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }
}

/// Blend settings of a layer in reporting-friendly form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlendModeSummary {
    pub mode: String,
    pub opacity: u8,
    pub opacity_percentage: u8,
    pub visible: bool,
}

/// One parsed layer: the record fields plus decoded channel planes.
#[derive(Debug, Clone)]
pub struct Layer {
    pub rect: Rect,
    pub channel_info: SmallVec<[ChannelInfo; 8]>,
    pub blend_mode_key: String,
    pub opacity: u8,
    pub clipping: u8,
    pub flags: LayerFlags,
    pub name: String,
    pub mask: Option<LayerMaskData>,
    /// Raw additional-info block payloads keyed by their 4-byte code
    pub info: HashMap<[u8; 4], Bytes>,

    // Decoded from well-known additional-info blocks
    pub layer_id: Option<i32>,
    pub fill_opacity: Option<u8>,
    pub divider: Option<SectionDividerInfo>,
    pub vector_mask: Option<VectorMaskInfo>,
    pub type_tool: Option<TypeToolInfo>,

    /// Decoded channel planes keyed by channel id
    pub channels: HashMap<i16, ChannelImage>,
}

impl Layer {
    /// Parse one layer record. Channel planes are filled in later by the
    /// section parser, which reads them from a separate stream region.
    pub fn parse_record<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Layer> {
        let rect = read_rect(cursor)?;

        let channel_count = cursor.read_u16()?;
        let mut channel_info = SmallVec::with_capacity(channel_count as usize);
        for _ in 0..channel_count {
            let id = cursor.read_i16()?;
            let length = u64::from(cursor.read_u32()?);
            channel_info.push(ChannelInfo { id, length });
        }

        let mut signature = [0u8; 4];
        cursor.read_exact(&mut signature)?;
        if &signature != BLOCK_SIGNATURE {
            return Err(Error::InvalidFormat(format!(
                "invalid blend mode signature: {:?}",
                signature
            )));
        }

        let blend_mode_key = cursor.read_string(4)?;
        let opacity = cursor.read_u8()?;
        let clipping = cursor.read_u8()?;
        let flags = LayerFlags::from_bits_retain(cursor.read_u8()?);
        cursor.skip(1)?; // filler

        let mut layer = Layer {
            rect,
            channel_info,
            blend_mode_key,
            opacity,
            clipping,
            flags,
            name: String::new(),
            mask: None,
            info: HashMap::new(),
            layer_id: None,
            fill_opacity: None,
            divider: None,
            vector_mask: None,
            type_tool: None,
            channels: HashMap::new(),
        };

        let extra_length = u64::from(cursor.read_u32()?);
        if extra_length > 0 {
            let extra_start = cursor.position()?;

            layer.parse_mask(cursor)?;

            // Blending ranges carry no information this parser uses.
            let ranges_length = cursor.read_u32()?;
            if ranges_length > 0 {
                cursor.skip(i64::from(ranges_length))?;
            }

            layer.parse_name(cursor)?;

            let consumed = cursor.position()? - extra_start;
            if extra_length > consumed {
                layer.parse_additional_info(cursor, extra_length - consumed)?;
            }
        }

        layer.decode_known_info();
        Ok(layer)
    }

    fn parse_mask<R: Read + Seek>(&mut self, cursor: &mut ByteCursor<R>) -> Result<()> {
        let length = cursor.read_u32()?;
        if length == 0 {
            return Ok(());
        }

        let end = cursor.position()? + u64::from(length);

        let rect = read_rect(cursor)?;
        let default_color = cursor.read_u8()?;
        let flags = MaskFlags::from_bits_retain(cursor.read_u8()?);
        self.mask = Some(LayerMaskData {
            rect,
            default_color,
            flags,
        });

        // The sub-block may carry a real-user-mask variant after the
        // fields above; skip whatever remains of the declared length.
        cursor.seek_to(end)
    }

    fn parse_name<R: Read + Seek>(&mut self, cursor: &mut ByteCursor<R>) -> Result<()> {
        let name_length = cursor.read_u8()?;
        if name_length > 0 {
            self.name = cursor.read_string(name_length as usize)?;
        }

        // Pascal string padded so length byte + name lands on a 4 boundary
        let padding = (4 - ((u32::from(name_length) + 1) % 4)) % 4;
        if padding > 0 {
            cursor.skip(i64::from(padding))?;
        }
        Ok(())
    }

    /// Scan additional-info blocks until the extra-data region is
    /// exhausted. An unrecognized signature ends the scan; the caller
    /// realigns the stream from section-level lengths.
    fn parse_additional_info<R: Read + Seek>(
        &mut self,
        cursor: &mut ByteCursor<R>,
        length: u64,
    ) -> Result<()> {
        let end = cursor.position()? + length;

        while cursor.position()? < end {
            let mut signature = [0u8; 4];
            if cursor.read_exact(&mut signature).is_err() {
                break;
            }
            if &signature != BLOCK_SIGNATURE && &signature != BLOCK_SIGNATURE_64 {
                break;
            }

            let mut key = [0u8; 4];
            cursor.read_exact(&mut key)?;
            let data_length = cursor.read_u32()?;

            if data_length > 0 {
                let data = match cursor.read_bytes(data_length as usize) {
                    Ok(data) => data,
                    Err(_) => break,
                };
                self.info.insert(key, Bytes::from(data));

                if data_length % 4 != 0 {
                    cursor.skip(i64::from(4 - data_length % 4))?;
                }
            }
        }
        Ok(())
    }

    /// Decode the well-known additional-info blocks into typed fields.
    /// A block that fails to decode leaves its field at `None`.
    fn decode_known_info(&mut self) {
        if let Some(data) = self.info.get(KEY_UNICODE_NAME)
            && let Ok(name) = info::parse_unicode_name(data)
            && !name.is_empty()
        {
            self.name = name;
        }

        if let Some(data) = self.info.get(KEY_LAYER_ID) {
            self.layer_id = info::parse_layer_id(data).ok();
        }

        if let Some(data) = self.info.get(KEY_FILL_OPACITY) {
            self.fill_opacity = info::parse_fill_opacity(data).ok();
        }

        let divider_data = self
            .info
            .get(KEY_SECTION_DIVIDER)
            .or_else(|| self.info.get(KEY_SECTION_DIVIDER_LEGACY));
        if let Some(data) = divider_data {
            self.divider = SectionDividerInfo::parse(data).ok();
        }

        let vector_data = self
            .info
            .get(KEY_VECTOR_MASK)
            .or_else(|| self.info.get(KEY_VECTOR_MASK_V6));
        if let Some(data) = vector_data {
            self.vector_mask = VectorMaskInfo::parse(data).ok();
        }

        if let Some(data) = self.info.get(KEY_TYPE_TOOL) {
            self.type_tool = TypeToolInfo::parse(data).ok();
        }
    }

    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    pub fn visible(&self) -> bool {
        !self.flags.contains(LayerFlags::HIDDEN)
    }

    /// Fill opacity, defaulting to fully opaque when the block is absent.
    pub fn fill_opacity(&self) -> u8 {
        self.fill_opacity.unwrap_or(255)
    }

    pub fn is_text_layer(&self) -> bool {
        self.type_tool.is_some()
    }

    /// Presence of either section-divider key marks a folder, whatever
    /// the type code says.
    pub fn is_folder(&self) -> bool {
        self.divider.is_some()
    }

    pub fn is_folder_start(&self) -> bool {
        self.divider.as_ref().is_some_and(SectionDividerInfo::is_folder_start)
    }

    pub fn is_folder_end(&self) -> bool {
        self.divider.as_ref().is_some_and(SectionDividerInfo::is_folder_end)
    }

    /// Long-form blend mode name; unknown keys fall back to the
    /// whitespace-trimmed raw key.
    pub fn blend_mode_str(&self) -> &str {
        blend_mode_name(&self.blend_mode_key)
            .unwrap_or_else(|| self.blend_mode_key.trim())
    }

    pub fn blend_mode(&self) -> BlendModeSummary {
        BlendModeSummary {
            mode: self.blend_mode_str().to_string(),
            opacity: self.opacity,
            opacity_percentage: (f64::from(self.opacity) / 255.0 * 100.0) as u8,
            visible: self.visible(),
        }
    }

    pub fn channel(&self, id: i16) -> Option<&ChannelImage> {
        self.channels.get(&id)
    }
}

static BLEND_MODE_NAMES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "norm" => "normal",
    "dark" => "darken",
    "lite" => "lighten",
    "hue " => "hue",
    "sat " => "saturation",
    "colr" => "color",
    "lum " => "luminosity",
    "mul " => "multiply",
    "scrn" => "screen",
    "diss" => "dissolve",
    "over" => "overlay",
    "hLit" => "hard_light",
    "sLit" => "soft_light",
    "diff" => "difference",
    "smud" => "exclusion",
    "div " => "color_dodge",
    "idiv" => "color_burn",
    "lbrn" => "linear_burn",
    "lddg" => "linear_dodge",
    "vLit" => "vivid_light",
    "lLit" => "linear_light",
    "pLit" => "pin_light",
    "hMix" => "hard_mix",
    "lgCl" => "lighter_color",
    "dkCl" => "darker_color",
    "fsub" => "subtract",
    "fdiv" => "divide",
    "pass" => "passthrough",
};

/// Map a 4-byte blend mode key to its long-form name.
pub fn blend_mode_name(key: &str) -> Option<&'static str> {
    BLEND_MODE_NAMES.get(key).copied()
}

fn read_rect<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Rect> {
    let top = cursor.read_i32()?;
    let left = cursor.read_i32()?;
    let bottom = cursor.read_i32()?;
    let right = cursor.read_i32()?;
    Ok(Rect::new(top, left, bottom, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn push_record(
        buf: &mut Vec<u8>,
        rect: Rect,
        channels: &[(i16, u32)],
        blend_key: &[u8; 4],
        opacity: u8,
        flags: u8,
        name: &str,
        extra_blocks: &[(&[u8; 4], Vec<u8>)],
    ) {
        buf.extend_from_slice(&rect.top.to_be_bytes());
        buf.extend_from_slice(&rect.left.to_be_bytes());
        buf.extend_from_slice(&rect.bottom.to_be_bytes());
        buf.extend_from_slice(&rect.right.to_be_bytes());

        buf.extend_from_slice(&(channels.len() as u16).to_be_bytes());
        for (id, length) in channels {
            buf.extend_from_slice(&id.to_be_bytes());
            buf.extend_from_slice(&length.to_be_bytes());
        }

        buf.extend_from_slice(b"8BIM");
        buf.extend_from_slice(blend_key);
        buf.push(opacity);
        buf.push(0); // clipping
        buf.push(flags);
        buf.push(0); // filler

        let mut extra = Vec::new();
        extra.extend_from_slice(&0u32.to_be_bytes()); // no mask
        extra.extend_from_slice(&0u32.to_be_bytes()); // no blending ranges

        extra.push(name.len() as u8);
        extra.extend_from_slice(name.as_bytes());
        let padding = (4 - ((name.len() + 1) % 4)) % 4;
        extra.extend_from_slice(&vec![0u8; padding]);

        for (key, data) in extra_blocks {
            extra.extend_from_slice(b"8BIM");
            extra.extend_from_slice(*key);
            extra.extend_from_slice(&(data.len() as u32).to_be_bytes());
            extra.extend_from_slice(data);
            if data.len() % 4 != 0 {
                extra.extend_from_slice(&vec![0u8; 4 - data.len() % 4]);
            }
        }

        buf.extend_from_slice(&(extra.len() as u32).to_be_bytes());
        buf.extend_from_slice(&extra);
    }

    #[test]
    fn test_parse_basic_record() {
        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::new(0, 0, 10, 20),
            &[(0, 102), (-1, 102)],
            b"norm",
            255,
            0,
            "Background",
            &[],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();

        assert_eq!(layer.rect, Rect::new(0, 0, 10, 20));
        assert_eq!(layer.width(), 20);
        assert_eq!(layer.height(), 10);
        assert_eq!(layer.channel_info.len(), 2);
        assert_eq!(layer.channel_info[1].id, -1);
        assert_eq!(layer.blend_mode_key, "norm");
        assert_eq!(layer.blend_mode_str(), "normal");
        assert_eq!(layer.name, "Background");
        assert!(layer.visible());
        assert_eq!(layer.fill_opacity(), 255);
        assert!(!layer.is_folder());
    }

    #[test]
    fn test_hidden_flag_and_blend_summary() {
        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::new(0, 0, 1, 1),
            &[],
            b"mul ",
            128,
            0x02,
            "L",
            &[],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();

        assert!(!layer.visible());
        assert!(layer.flags.contains(LayerFlags::HIDDEN));
        let summary = layer.blend_mode();
        assert_eq!(summary.mode, "multiply");
        assert_eq!(summary.opacity, 128);
        assert_eq!(summary.opacity_percentage, 50);
        assert!(!summary.visible);
    }

    #[test]
    fn test_unicode_name_overrides_pascal_name() {
        let mut luni = Vec::new();
        luni.extend_from_slice(&4u32.to_be_bytes());
        for unit in "Réel".encode_utf16() {
            luni.extend_from_slice(&unit.to_be_bytes());
        }

        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::new(0, 0, 1, 1),
            &[],
            b"norm",
            255,
            0,
            "R_el",
            &[(b"luni", luni)],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();
        assert_eq!(layer.name, "Réel");
    }

    #[test]
    fn test_divider_and_layer_id_blocks() {
        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::ZERO,
            &[],
            b"pass",
            255,
            0,
            "Group 1",
            &[
                (b"lsct", 1i32.to_be_bytes().to_vec()),
                (b"lyid", 7i32.to_be_bytes().to_vec()),
            ],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();

        assert!(layer.is_folder());
        assert!(layer.is_folder_start());
        assert!(!layer.is_folder_end());
        assert_eq!(layer.layer_id, Some(7));
        assert_eq!(layer.blend_mode_str(), "passthrough");
    }

    #[test]
    fn test_type_zero_divider_still_classifies_as_folder() {
        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::ZERO,
            &[],
            b"norm",
            255,
            0,
            "Set",
            &[(b"lsct", 0i32.to_be_bytes().to_vec())],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();

        assert_eq!(
            layer.divider.as_ref().unwrap().kind,
            SectionDividerKind::Other
        );
        assert!(layer.is_folder());
        assert!(!layer.is_folder_end());
    }

    #[test]
    fn test_folder_end_marker() {
        let mut buf = Vec::new();
        push_record(
            &mut buf,
            Rect::ZERO,
            &[],
            b"norm",
            255,
            0,
            "</Layer group>",
            &[(b"lsct", 3i32.to_be_bytes().to_vec())],
        );

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();
        assert!(layer.is_folder_end());
    }

    #[test]
    fn test_mask_parsing_skips_to_declared_end() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0i32.to_be_bytes());
        buf.extend_from_slice(&0i32.to_be_bytes());
        buf.extend_from_slice(&4i32.to_be_bytes());
        buf.extend_from_slice(&4i32.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes()); // no channels
        buf.extend_from_slice(b"8BIM");
        buf.extend_from_slice(b"norm");
        buf.extend_from_slice(&[255, 0, 0, 0]);

        let mut extra = Vec::new();
        // Mask sub-block: declared 26 bytes; 18 core fields + 8 trailing
        extra.extend_from_slice(&26u32.to_be_bytes());
        extra.extend_from_slice(&1i32.to_be_bytes());
        extra.extend_from_slice(&2i32.to_be_bytes());
        extra.extend_from_slice(&3i32.to_be_bytes());
        extra.extend_from_slice(&4i32.to_be_bytes());
        extra.push(255); // default color
        extra.push(0x04); // flags
        extra.extend_from_slice(&[0xEE; 8]); // trailing data to skip
        extra.extend_from_slice(&0u32.to_be_bytes()); // blending ranges
        extra.push(1);
        extra.extend_from_slice(b"M");
        extra.extend_from_slice(&[0, 0]); // name padding

        buf.extend_from_slice(&(extra.len() as u32).to_be_bytes());
        buf.extend_from_slice(&extra);

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();

        let mask = layer.mask.unwrap();
        assert_eq!(mask.rect, Rect::new(1, 2, 3, 4));
        assert_eq!(mask.default_color, 255);
        assert!(mask.flags.contains(MaskFlags::INVERTED));
        assert_eq!(layer.name, "M");
    }

    #[test]
    fn test_blend_mode_reported_for_every_key() {
        // Layers named after their own blend key must report the
        // normalized long-form name for that key.
        for (key, name) in BLEND_MODE_NAMES.entries() {
            let code: &[u8; 4] = key.as_bytes().try_into().unwrap();
            let mut buf = Vec::new();
            push_record(&mut buf, Rect::ZERO, &[], code, 255, 0, key, &[]);

            let mut cursor = ByteCursor::new(Cursor::new(buf));
            let layer = Layer::parse_record(&mut cursor).unwrap();
            assert_eq!(layer.name, *key);
            assert_eq!(layer.blend_mode().mode, *name);
        }
    }

    #[test]
    fn test_unknown_blend_key_falls_back_to_trimmed() {
        let mut buf = Vec::new();
        push_record(&mut buf, Rect::ZERO, &[], b"xyz ", 255, 0, "L", &[]);

        let mut cursor = ByteCursor::new(Cursor::new(buf));
        let layer = Layer::parse_record(&mut cursor).unwrap();
        assert_eq!(layer.blend_mode_str(), "xyz");
    }
}
