//! The layer and mask information section.
//!
//! Layout: a u32 section length, then a u32 layer-info length, an i16
//! layer count, every layer record back to back, and finally the channel
//! planes of every layer in record order. Global mask data and trailing
//! section blocks are skipped by seeking to the declared section end.

use std::io::{Read, Seek};

use crate::common::Result;
use crate::cursor::ByteCursor;
use crate::layer::Layer;
use crate::layer::channel;

/// Parse the full section, returning layers ordered top to bottom.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Vec<Layer>> {
    let section_length = cursor.read_u32()?;
    if section_length == 0 {
        return Ok(Vec::new());
    }

    let section_end = cursor.position()? + u64::from(section_length);
    let layers = parse_layer_info(cursor)?;

    // Skip global mask info and any trailing tagged blocks.
    if cursor.position()? < section_end {
        cursor.seek_to(section_end)?;
    }

    Ok(layers)
}

fn parse_layer_info<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Vec<Layer>> {
    let info_length = cursor.read_u32()?;
    if info_length == 0 {
        return Ok(Vec::new());
    }

    // A negative count flags the first alpha channel as transparency.
    let layer_count = cursor.read_i16()?.unsigned_abs();

    let mut layers = Vec::with_capacity(layer_count as usize);
    for _ in 0..layer_count {
        layers.push(Layer::parse_record(cursor)?);
    }

    // Channel planes follow in the same order as the records.
    for layer in &mut layers {
        let width = layer.width().max(0) as usize;
        let height = layer.height().max(0) as usize;
        layer.channels =
            channel::read_layer_channels(cursor, &layer.channel_info, width, height)?;
    }

    // The file stores layers bottom to top; callers expect top first.
    layers.reverse();
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Rect;
    use crate::layer::tests::push_record;
    use std::io::Cursor;

    fn wrap_section(records: Vec<u8>, channel_data: Vec<u8>, count: i16) -> Vec<u8> {
        let mut info = Vec::new();
        info.extend_from_slice(&count.to_be_bytes());
        info.extend_from_slice(&records);
        info.extend_from_slice(&channel_data);

        let mut section = Vec::new();
        section.extend_from_slice(&(info.len() as u32 + 4).to_be_bytes());
        section.extend_from_slice(&(info.len() as u32).to_be_bytes());
        section.extend_from_slice(&info);
        section
    }

    #[test]
    fn test_empty_section() {
        let mut cursor = ByteCursor::new(Cursor::new(0u32.to_be_bytes().to_vec()));
        assert!(parse(&mut cursor).unwrap().is_empty());
    }

    #[test]
    fn test_layers_reversed_to_top_first() {
        let mut records = Vec::new();
        push_record(
            &mut records,
            Rect::new(0, 0, 1, 1),
            &[],
            b"norm",
            255,
            0,
            "bottom",
            &[],
        );
        push_record(
            &mut records,
            Rect::new(0, 0, 1, 1),
            &[],
            b"norm",
            255,
            0,
            "top",
            &[],
        );

        let section = wrap_section(records, Vec::new(), 2);
        let mut cursor = ByteCursor::new(Cursor::new(section));
        let layers = parse(&mut cursor).unwrap();

        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].name, "top");
        assert_eq!(layers[1].name, "bottom");
    }

    #[test]
    fn test_negative_count_and_channel_data() {
        let mut records = Vec::new();
        push_record(
            &mut records,
            Rect::new(0, 0, 1, 2),
            &[(0, 4), (-1, 4)],
            b"norm",
            255,
            0,
            "px",
            &[],
        );

        let mut channel_data = Vec::new();
        channel_data.extend_from_slice(&0u16.to_be_bytes());
        channel_data.extend_from_slice(&[10, 20]);
        channel_data.extend_from_slice(&0u16.to_be_bytes());
        channel_data.extend_from_slice(&[255, 255]);

        let section = wrap_section(records, channel_data, -1);
        let mut cursor = ByteCursor::new(Cursor::new(section));
        let layers = parse(&mut cursor).unwrap();

        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].channel(0).unwrap().data, vec![10, 20]);
        assert_eq!(layers[0].channel(-1).unwrap().data, vec![255, 255]);
    }

    #[test]
    fn test_cursor_lands_on_section_end() {
        let mut records = Vec::new();
        push_record(&mut records, Rect::ZERO, &[], b"norm", 255, 0, "a", &[]);

        let mut section = wrap_section(records, Vec::new(), 1);
        // Pad the declared section length past the layer info to mimic
        // global mask data this parser skips.
        let info_plus_padding = section.len() as u32 - 4 + 6;
        section.splice(0..4, info_plus_padding.to_be_bytes());
        section.extend_from_slice(&[0xAB; 6]);
        section.extend_from_slice(&[1, 2, 3, 4]); // next section

        let mut cursor = ByteCursor::new(Cursor::new(section));
        parse(&mut cursor).unwrap();
        assert_eq!(cursor.read_u32().unwrap(), 0x01020304);
    }
}
