//! Image resource section and well-known resource decoders.
//!
//! Resources are signature-prefixed blocks keyed by a u16 id, each with
//! an even-padded Pascal name and even-padded payload. The section is
//! scanned eagerly into a map; individual resources are decoded on
//! demand.

use std::collections::HashMap;
use std::io::{Read, Seek};

use bytes::Bytes;
use serde::Serialize;

use crate::common::binary::SliceReader;
use crate::common::{Rect, Result};
use crate::consts::{RESOURCE_GUIDES, RESOURCE_SLICES};
use crate::cursor::ByteCursor;
use crate::descriptor::{Descriptor, Value};

/// One raw resource block.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Block signature, normally `8BIM`
    pub kind: String,
    pub id: u16,
    pub name: String,
    pub data: Bytes,
}

/// The parsed image resources section.
#[derive(Debug, Clone, Default)]
pub struct ResourceSection {
    resources: HashMap<u16, Resource>,
}

/// One user slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Slice {
    pub id: i32,
    pub group_id: i32,
    pub origin: i32,
    pub associated_layer_id: i32,
    pub name: String,
    pub kind: i32,
    pub bounds: Rect,
    pub url: String,
    pub target: String,
    pub message: String,
    pub alt: String,
    pub cell_text_is_html: bool,
    pub cell_text: String,
    pub horizontal_align: i32,
    pub vertical_align: i32,
}

/// The slices resource (id 1050), any stored version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlicesResource {
    pub version: i32,
    pub bounds: Rect,
    pub name: String,
    pub slices: Vec<Slice>,
}

/// One guide line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Guide {
    pub position: i32,
    pub is_horizontal: bool,
}

/// A recorded layer comp. Descriptor decoding of comp entries is
/// intentionally not implemented; see [`ResourceSection::layer_comps`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerComp {
    pub id: i32,
    pub name: String,
}

impl ResourceSection {
    /// Parse the resource section from the stream's current position.
    pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<ResourceSection> {
        let length = cursor.read_u32()?;
        let mut resources = HashMap::new();

        if length > 0 {
            let end = cursor.position()? + u64::from(length);
            while cursor.position()? < end {
                // Later duplicates overwrite earlier ones.
                let resource = parse_resource(cursor)?;
                resources.insert(resource.id, resource);
            }
        }

        Ok(ResourceSection { resources })
    }

    pub fn get(&self, id: u16) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.resources.keys().copied()
    }

    /// Decode the slices resource. A document without one gets a default
    /// resource holding a single zeroed slice.
    pub fn slices(&self) -> Result<SlicesResource> {
        let Some(resource) = self.get(RESOURCE_SLICES).filter(|r| !r.data.is_empty()) else {
            return Ok(SlicesResource {
                version: 6,
                bounds: Rect::ZERO,
                name: String::new(),
                slices: vec![Slice::default()],
            });
        };

        let mut reader = SliceReader::new(&resource.data);
        let version = reader.read_i32()?;

        if version == 6 {
            parse_slices_v6(&mut reader, version)
        } else {
            parse_slices_descriptor(&mut reader, version)
        }
    }

    /// Decode the guides resource. A document without one has no guides.
    pub fn guides(&self) -> Result<Vec<Guide>> {
        let Some(resource) = self.get(RESOURCE_GUIDES).filter(|r| !r.data.is_empty()) else {
            return Ok(Vec::new());
        };

        let mut reader = SliceReader::new(&resource.data);
        // Version plus grid spacing, neither of which guides depend on.
        reader.skip(12)?;

        let count = reader.read_u32()?;
        let mut guides = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let position = reader.read_i32()?;
            let direction = reader.read_u8()?;
            guides.push(Guide {
                position,
                is_horizontal: direction == 0,
            });
        }
        Ok(guides)
    }

    /// Layer comps (id 1065). Comp entries are stored as descriptors
    /// whose decoding this crate does not attempt; the list is always
    /// empty for now.
    pub fn layer_comps(&self) -> Vec<LayerComp> {
        Vec::new()
    }
}

fn parse_resource<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Resource> {
    let kind = cursor.read_string(4)?;
    let id = cursor.read_u16()?;

    let name_length = cursor.read_u8()?;
    let name = if name_length > 0 {
        cursor.read_string(name_length as usize)?
    } else {
        String::new()
    };
    // Pascal name is padded so length byte + name is even.
    if (u16::from(name_length) + 1) % 2 != 0 {
        cursor.skip(1)?;
    }

    let data_size = cursor.read_u32()?;
    let mut data = Bytes::new();
    if data_size > 0 {
        data = Bytes::from(cursor.read_bytes(data_size as usize)?);
        if data_size % 2 != 0 {
            cursor.skip(1)?;
        }
    }

    Ok(Resource {
        kind,
        id,
        name,
        data,
    })
}

fn read_rect(reader: &mut SliceReader<'_>) -> Result<Rect> {
    let top = reader.read_i32()?;
    let left = reader.read_i32()?;
    let bottom = reader.read_i32()?;
    let right = reader.read_i32()?;
    Ok(Rect::new(top, left, bottom, right))
}

fn parse_slices_v6(reader: &mut SliceReader<'_>, version: i32) -> Result<SlicesResource> {
    let bounds = read_rect(reader)?;
    let name = reader.read_unicode_string()?;
    let count = reader.read_i32()?;

    let mut slices = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count.max(0) {
        let mut slice = Slice {
            id: reader.read_i32()?,
            group_id: reader.read_i32()?,
            origin: reader.read_i32()?,
            ..Slice::default()
        };
        // An origin of 1 means the slice is bound to a layer.
        if slice.origin == 1 {
            slice.associated_layer_id = reader.read_i32()?;
        }
        slice.name = reader.read_unicode_string()?;
        slice.kind = reader.read_i32()?;
        slice.bounds = read_rect(reader)?;
        slice.url = reader.read_unicode_string()?;
        slice.target = reader.read_unicode_string()?;
        slice.message = reader.read_unicode_string()?;
        slice.alt = reader.read_unicode_string()?;
        slice.cell_text_is_html = reader.read_u8()? != 0;
        slice.cell_text = reader.read_unicode_string()?;
        slice.horizontal_align = reader.read_i32()?;
        slice.vertical_align = reader.read_i32()?;
        reader.skip(4)?; // ARGB color
        slices.push(slice);
    }

    Ok(SlicesResource {
        version,
        bounds,
        name,
        slices,
    })
}

/// Versions 7 and 8 store everything as one descriptor.
fn parse_slices_descriptor(
    reader: &mut SliceReader<'_>,
    version: i32,
) -> Result<SlicesResource> {
    reader.read_u32()?; // descriptor version
    let desc = Descriptor::parse(reader)?;

    let bounds = descriptor_bounds(&desc, "bounds");
    let name = desc.get_text("baseName").unwrap_or_default().to_string();

    let slices = desc
        .get_list("slices")
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_descriptor)
        .map(slice_from_descriptor)
        .collect();

    Ok(SlicesResource {
        version,
        bounds,
        name,
        slices,
    })
}

fn descriptor_bounds(desc: &Descriptor, key: &str) -> Rect {
    let Some(bounds) = desc.get_descriptor(key) else {
        return Rect::ZERO;
    };
    Rect::new(
        bounds.get_i32("Top ").unwrap_or(0),
        bounds.get_i32("Left").unwrap_or(0),
        bounds.get_i32("Btom").unwrap_or(0),
        bounds.get_i32("Rght").unwrap_or(0),
    )
}

fn slice_from_descriptor(desc: &Descriptor) -> Slice {
    Slice {
        id: desc.get_i32("sliceID").unwrap_or(0),
        group_id: desc.get_i32("groupID").unwrap_or(0),
        origin: desc.get_i32("origin").unwrap_or(0),
        associated_layer_id: 0,
        name: String::new(),
        kind: desc.get_i32("Type").unwrap_or(0),
        bounds: descriptor_bounds(desc, "bounds"),
        url: desc.get_text("url").unwrap_or_default().to_string(),
        target: String::new(),
        message: desc.get_text("Msge").unwrap_or_default().to_string(),
        alt: desc.get_text("altTag").unwrap_or_default().to_string(),
        cell_text_is_html: desc.get_bool("cellTextIsHTML").unwrap_or(false),
        cell_text: desc.get_text("cellText").unwrap_or_default().to_string(),
        horizontal_align: desc.get_i32("horzAlign").unwrap_or(0),
        vertical_align: desc.get_i32("vertAlign").unwrap_or(0),
    }
}
