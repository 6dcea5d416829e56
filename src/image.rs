//! Flattened composite preview stored at the end of the document.
//!
//! The preview covers the full canvas, with channel planes stored one
//! after another (planar, not interleaved). RGB documents map the first
//! three planes to red, green and blue; single-channel documents are
//! expanded to gray. Alpha is always opaque here since the preview is
//! pre-flattened.

use std::io::{Read, Seek};

use crate::common::{Error, Result};
use crate::consts::{COMPRESSION_RAW, COMPRESSION_RLE};
use crate::cursor::ByteCursor;
use crate::header::Header;
use crate::render::{Raster, Rgba};

/// Parse the merged image section into an RGBA raster.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>, header: &Header) -> Result<Raster> {
    let width = header.width() as usize;
    let height = header.height() as usize;
    let channels = header.channels as usize;

    let compression = cursor.read_u16()?;
    let planes = match compression {
        COMPRESSION_RAW => read_raw_planes(cursor, channels, width * height)?,
        COMPRESSION_RLE => read_rle_planes(cursor, channels, width, height)?,
        other => {
            return Err(Error::Unsupported(format!(
                "merged image compression method {}",
                other
            )));
        },
    };

    Ok(assemble(header, &planes, width, height))
}

fn read_raw_planes<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    channels: usize,
    plane_size: usize,
) -> Result<Vec<Vec<u8>>> {
    let mut planes = Vec::with_capacity(channels);
    for _ in 0..channels {
        planes.push(cursor.read_bytes(plane_size)?);
    }
    Ok(planes)
}

fn read_rle_planes<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    channels: usize,
    width: usize,
    height: usize,
) -> Result<Vec<Vec<u8>>> {
    // All scanline byte counts come first, for every channel in a row.
    let mut byte_counts = Vec::with_capacity(channels * height);
    for _ in 0..channels * height {
        byte_counts.push(cursor.read_u16()?);
    }

    let mut planes = Vec::with_capacity(channels);
    for ch in 0..channels {
        let mut plane = vec![0u8; width * height];
        let mut pos = 0usize;

        for row in 0..height {
            let byte_count = byte_counts[ch * height + row] as usize;
            if byte_count == 0 {
                pos += width;
                continue;
            }

            let scanline = cursor.read_bytes(byte_count)?;
            let end_pos = pos + width;
            let mut data_idx = 0usize;

            while pos < end_pos && data_idx < scanline.len() {
                let control = scanline[data_idx] as usize;
                data_idx += 1;

                if control < 128 {
                    let run = control + 1;
                    for _ in 0..run {
                        if pos >= end_pos || data_idx >= scanline.len() {
                            break;
                        }
                        plane[pos] = scanline[data_idx];
                        pos += 1;
                        data_idx += 1;
                    }
                } else if control > 128 {
                    let run = 257 - control;
                    if data_idx < scanline.len() {
                        let value = scanline[data_idx];
                        data_idx += 1;
                        for _ in 0..run {
                            if pos >= end_pos {
                                break;
                            }
                            plane[pos] = value;
                            pos += 1;
                        }
                    }
                }
                // control == 128 is a no-op
            }
            pos = end_pos;
        }
        planes.push(plane);
    }
    Ok(planes)
}

fn assemble(header: &Header, planes: &[Vec<u8>], width: usize, height: usize) -> Raster {
    let mut raster = Raster::new(width as u32, height as u32);
    let total = width * height;

    for i in 0..total {
        let pixel = if header.is_rgb() && planes.len() >= 3 {
            Rgba {
                r: planes[0][i],
                g: planes[1][i],
                b: planes[2][i],
                a: 255,
            }
        } else if planes.len() == 1 {
            let gray = planes[0][i];
            Rgba {
                r: gray,
                g: gray,
                b: gray,
                a: 255,
            }
        } else {
            continue;
        };
        raster.set_index(i, pixel);
    }
    raster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::COLOR_MODE_RGB;
    use std::io::Cursor;

    fn rgb_header(width: u32, height: u32, channels: u16) -> Header {
        Header {
            version: 1,
            channels,
            rows: height,
            cols: width,
            depth: 8,
            mode: COLOR_MODE_RGB,
        }
    }

    #[test]
    fn test_raw_rgb() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&0u16.to_be_bytes());
        stream.push(0); // red plane
        stream.push(100); // green plane
        stream.push(200); // blue plane

        let mut cursor = ByteCursor::new(Cursor::new(stream));
        let raster = parse(&mut cursor, &rgb_header(1, 1, 3)).unwrap();

        assert_eq!(raster.width(), 1);
        assert_eq!(raster.height(), 1);
        assert_eq!(
            raster.get(0, 0),
            Some(Rgba { r: 0, g: 100, b: 200, a: 255 })
        );
    }

    #[test]
    fn test_raw_grayscale_expansion() {
        let mut header = rgb_header(2, 1, 1);
        header.mode = crate::consts::COLOR_MODE_GRAYSCALE;

        let mut stream = Vec::new();
        stream.extend_from_slice(&0u16.to_be_bytes());
        stream.extend_from_slice(&[7, 250]);

        let mut cursor = ByteCursor::new(Cursor::new(stream));
        let raster = parse(&mut cursor, &header).unwrap();

        assert_eq!(raster.get(0, 0), Some(Rgba { r: 7, g: 7, b: 7, a: 255 }));
        assert_eq!(
            raster.get(1, 0),
            Some(Rgba { r: 250, g: 250, b: 250, a: 255 })
        );
    }

    #[test]
    fn test_rle_rgb() {
        // 2x2, 3 channels; each scanline encoded as a repeat run of 2.
        let mut stream = Vec::new();
        stream.extend_from_slice(&1u16.to_be_bytes());
        for _ in 0..6 {
            stream.extend_from_slice(&2u16.to_be_bytes());
        }
        for value in [10, 11, 20, 21, 30, 31] {
            stream.push(0xFF); // repeat twice
            stream.push(value);
        }

        let mut cursor = ByteCursor::new(Cursor::new(stream));
        let raster = parse(&mut cursor, &rgb_header(2, 2, 3)).unwrap();

        assert_eq!(
            raster.get(0, 0),
            Some(Rgba { r: 10, g: 20, b: 30, a: 255 })
        );
        assert_eq!(
            raster.get(1, 1),
            Some(Rgba { r: 11, g: 21, b: 31, a: 255 })
        );
    }

    #[test]
    fn test_unsupported_compression() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&2u16.to_be_bytes()); // zip

        let mut cursor = ByteCursor::new(Cursor::new(stream));
        assert!(matches!(
            parse(&mut cursor, &rgb_header(1, 1, 3)),
            Err(Error::Unsupported(_))
        ));
    }
}
