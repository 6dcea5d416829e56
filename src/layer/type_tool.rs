//! Text layer (`TySh`) block decoding.

use bytes::Bytes;

use crate::common::Result;
use crate::common::binary::SliceReader;
use crate::descriptor::{Descriptor, Value};

/// 2x3 affine transform placing the text box on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextTransform {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
    pub tx: f64,
    pub ty: f64,
}

/// Parsed text layer information.
///
/// The descriptor carries the text content and styling; the raw engine
/// data inside it is kept undecoded.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeToolInfo {
    pub version: u16,
    pub transform: TextTransform,
    pub text_data: Option<Descriptor>,
    pub engine_data: Option<Bytes>,
}

impl TypeToolInfo {
    pub fn parse(data: &[u8]) -> Result<TypeToolInfo> {
        let mut reader = SliceReader::new(data);

        let version = reader.read_u16()?;
        let transform = TextTransform {
            xx: reader.read_f64()?,
            xy: reader.read_f64()?,
            yx: reader.read_f64()?,
            yy: reader.read_f64()?,
            tx: reader.read_f64()?,
            ty: reader.read_f64()?,
        };

        reader.read_u16()?; // text version
        reader.read_u32()?; // descriptor version

        // A descriptor we cannot decode still leaves the transform usable.
        let text_data = Descriptor::parse(&mut reader).ok();
        let engine_data = text_data.as_ref().and_then(|d| {
            d.get("EngineData")
                .and_then(Value::as_bytes)
                .cloned()
        });

        Ok(TypeToolInfo {
            version,
            transform,
            text_data,
            engine_data,
        })
    }

    /// The text content, when the descriptor carried a `Txt ` entry.
    pub fn text(&self) -> Option<&str> {
        self.text_data.as_ref()?.get_text("Txt ")
    }

    pub fn has_text_content(&self) -> bool {
        self.text().is_some_and(|t| !t.is_empty())
    }
}
