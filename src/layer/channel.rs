//! Per-layer channel plane decoding.
//!
//! Channel payloads are stored contiguously after the layer records, one
//! per entry in the layer's channel table. Each payload begins with a
//! 2-byte compression method. Regardless of how much of a payload a
//! decoder consumes, the stream is repositioned to the declared end of
//! the channel before the next one is read, so a short or overlong decode
//! never desynchronizes the section.

use std::collections::HashMap;
use std::io::{Read, Seek};

use crate::common::Result;
use crate::consts::{COMPRESSION_RAW, COMPRESSION_RLE};
use crate::cursor::ByteCursor;

/// One entry of a layer's channel table: id plus payload byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i16,
    pub length: u64,
}

/// A decoded channel plane, `width * height` bytes row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelImage {
    pub id: i16,
    pub data: Vec<u8>,
    pub compression: u16,
}

/// Read and decode every channel of one layer, in table order.
///
/// Channels with unknown compression methods are skipped rather than
/// rejected, since the corrective seek keeps the section parseable.
pub fn read_layer_channels<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    channel_info: &[ChannelInfo],
    width: usize,
    height: usize,
) -> Result<HashMap<i16, ChannelImage>> {
    let mut channels = HashMap::new();

    for info in channel_info {
        let start = cursor.position()?;

        // Nothing beyond the compression header; keep the stream aligned.
        if info.length <= 2 {
            if info.length > 0 {
                cursor.skip(info.length as i64)?;
            }
            continue;
        }

        let compression = cursor.read_u16()?;
        let data_length = (info.length - 2) as usize;

        match compression {
            COMPRESSION_RAW => {
                let data = cursor.read_bytes(data_length)?;
                channels.insert(
                    info.id,
                    ChannelImage {
                        id: info.id,
                        data,
                        compression,
                    },
                );
            },
            COMPRESSION_RLE => {
                let compressed = cursor.read_bytes(data_length)?;
                let data = unpack_rle(&compressed, width, height);
                channels.insert(
                    info.id,
                    ChannelImage {
                        id: info.id,
                        data,
                        compression,
                    },
                );
            },
            _ => {
                cursor.skip(data_length as i64)?;
            },
        }

        let expected = start + info.length;
        if cursor.position()? != expected {
            cursor.seek_to(expected)?;
        }
    }

    Ok(channels)
}

/// Decode a PackBits-compressed channel plane.
///
/// The payload opens with one big-endian u16 byte count per scanline,
/// followed by the scanlines themselves. Control byte `n < 128` copies
/// `n + 1` literal bytes, `n > 128` repeats the next byte `257 - n`
/// times, `n == 128` is a no-op. Decoding is bounded by both the
/// scanline's declared byte count and the row width; rows a truncated
/// stream cannot fill stay zero.
pub fn unpack_rle(compressed: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut byte_counts = vec![0u16; height];
    let mut offset = 0usize;
    for count in byte_counts.iter_mut() {
        if offset + 1 >= compressed.len() {
            break;
        }
        *count = u16::from_be_bytes([compressed[offset], compressed[offset + 1]]);
        offset += 2;
    }

    let mut result = vec![0u8; width * height];
    let mut pos = 0usize;

    for row in 0..height {
        let byte_count = byte_counts[row] as usize;
        if byte_count == 0 {
            pos += width;
            continue;
        }

        let end_pos = pos + width;
        let scanline_end = (offset + byte_count).min(compressed.len());

        while offset < scanline_end && pos < end_pos {
            let control = compressed[offset] as usize;
            offset += 1;

            if control < 128 {
                let run = control + 1;
                for _ in 0..run {
                    if pos >= end_pos || offset >= compressed.len() {
                        break;
                    }
                    result[pos] = compressed[offset];
                    pos += 1;
                    offset += 1;
                }
            } else if control > 128 {
                let run = 257 - control;
                if offset < compressed.len() {
                    let value = compressed[offset];
                    offset += 1;
                    for _ in 0..run {
                        if pos >= end_pos {
                            break;
                        }
                        result[pos] = value;
                        pos += 1;
                    }
                }
            }
            // control == 128 is a no-op
        }

        // Resync to the next scanline even if this one under-filled.
        offset = scanline_end;
        pos = end_pos;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn test_unpack_literal_run() {
        // One 4-wide scanline: control 3 copies four literal bytes.
        let mut data = Vec::new();
        data.extend_from_slice(&5u16.to_be_bytes());
        data.extend_from_slice(&[3, 10, 20, 30, 40]);

        assert_eq!(unpack_rle(&data, 4, 1), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_unpack_repeat_run() {
        // Control 0xFB = 251 repeats the next byte 257 - 251 = 6 times.
        let mut data = Vec::new();
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&[0xFB, 7]);

        assert_eq!(unpack_rle(&data, 6, 1), vec![7; 6]);
    }

    #[test]
    fn test_unpack_noop_control_is_skipped() {
        // Control 0x80 encodes nothing; the bytes around it still decode.
        let mut data = Vec::new();
        data.extend_from_slice(&7u16.to_be_bytes());
        data.extend_from_slice(&[0x80, 0, 10, 0x80, 0x80, 0, 20]);

        assert_eq!(unpack_rle(&data, 2, 1), vec![10, 20]);
    }

    #[test]
    fn test_unpack_empty_scanline_stays_zero() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&[0xFF, 9]); // repeat 9 twice

        assert_eq!(unpack_rle(&data, 2, 2), vec![0, 0, 9, 9]);
    }

    #[test]
    fn test_unpack_truncated_input() {
        // Declared count larger than what remains; missing bytes stay zero.
        let mut data = Vec::new();
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(&[0, 42]);

        assert_eq!(unpack_rle(&data, 3, 1), vec![42, 0, 0]);
    }

    #[test]
    fn test_read_channels_corrective_seek() {
        // Channel 0 declares 8 bytes but its raw payload is shorter than
        // the declaration would imply is consumed; channel 1 must still
        // start at the right offset.
        let mut stream = Vec::new();
        stream.extend_from_slice(&0u16.to_be_bytes()); // raw
        stream.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        stream.extend_from_slice(&0u16.to_be_bytes()); // raw
        stream.extend_from_slice(&[9, 9]);

        let info = [
            ChannelInfo { id: 0, length: 8 },
            ChannelInfo { id: -1, length: 4 },
        ];
        let mut cursor = ByteCursor::new(Cursor::new(stream));
        let channels = read_layer_channels(&mut cursor, &info, 2, 3).unwrap();

        assert_eq!(channels[&0].data, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(channels[&-1].data, vec![9, 9]);
    }

    #[test]
    fn test_read_channels_skips_headless_entry() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&[0, 0]); // channel with only a header
        stream.extend_from_slice(&0u16.to_be_bytes());
        stream.push(77);

        let info = [
            ChannelInfo { id: 0, length: 2 },
            ChannelInfo { id: 1, length: 3 },
        ];
        let mut cursor = ByteCursor::new(Cursor::new(stream));
        let channels = read_layer_channels(&mut cursor, &info, 1, 1).unwrap();

        assert!(!channels.contains_key(&0));
        assert_eq!(channels[&1].data, vec![77]);
    }

    proptest! {
        #[test]
        fn test_unpack_output_length_invariant(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            width in 0usize..16,
            height in 0usize..16,
        ) {
            let out = unpack_rle(&data, width, height);
            if width == 0 || height == 0 {
                prop_assert!(out.is_empty());
            } else {
                prop_assert_eq!(out.len(), width * height);
            }
        }
    }
}
