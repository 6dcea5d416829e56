//! Recursive decoder for the descriptor value format.
//!
//! Descriptors are the self-describing, recursively-typed key/value
//! structures used by modern resource and layer-info payloads. The value
//! space is modeled as a closed sum type ([`Value`]) so every consumption
//! site matches exhaustively instead of downcasting.
//!
//! Every branch consumes precisely the number of bytes its own encoding
//! specifies; there is no resynchronization at this layer, so a malformed
//! or unimplemented construct is fatal to the remainder of that payload.

use std::collections::HashMap;

use bytes::Bytes;
use phf::phf_map;

use crate::common::binary::SliceReader;
use crate::common::{Error, Result};

/// A descriptor class: UTF-16 name plus a 4-byte-code-or-string id.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorClass {
    pub name: String,
    pub id: String,
}

/// A parsed descriptor: a class plus a mapping of key to tagged value.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub class: DescriptorClass,
    items: HashMap<String, Value>,
}

/// An enumerated descriptor value (type id + value id pair).
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub type_id: String,
    pub value: String,
}

/// Measurement units attached to `UntF`/`UnFl` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Angle,
    Density,
    Distance,
    None,
    Percent,
    Pixels,
    Millimeters,
    Points,
    /// Unit code not present in the fixed lookup table
    Unknown,
}

static UNIT_TYPES: phf::Map<&'static str, Unit> = phf_map! {
    "#Ang" => Unit::Angle,
    "#Rsl" => Unit::Density,
    "#Rlt" => Unit::Distance,
    "#Nne" => Unit::None,
    "#Prc" => Unit::Percent,
    "#Pxl" => Unit::Pixels,
    "#Mlm" => Unit::Millimeters,
    "#Pnt" => Unit::Points,
};

impl Unit {
    fn from_code(code: &str) -> Unit {
        UNIT_TYPES.get(code).copied().unwrap_or(Unit::Unknown)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Unit::Angle => "Angle",
            Unit::Density => "Density",
            Unit::Distance => "Distance",
            Unit::None => "None",
            Unit::Percent => "Percent",
            Unit::Pixels => "Pixels",
            Unit::Millimeters => "Millimeters",
            Unit::Points => "Points",
            Unit::Unknown => "Unknown",
        }
    }
}

/// A numeric value with an attached unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitValue {
    /// Raw 4-byte unit code from the stream
    pub code: String,
    pub unit: Unit,
    pub value: f64,
}

/// One typed sub-item of a reference value.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceItem {
    Property { class: DescriptorClass, id: String },
    Class(DescriptorClass),
    EnumReference {
        class: DescriptorClass,
        type_id: String,
        value: String,
    },
    Identifier(i32),
    Index(i32),
    Name(String),
    Offset(i32),
}

/// A descriptor value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i32),
    LargeInteger(i64),
    Double(f64),
    Text(String),
    Alias(Bytes),
    Data(Bytes),
    Enum(EnumValue),
    Unit(UnitValue),
    Reference(Vec<ReferenceItem>),
    List(Vec<Value>),
    Descriptor(Descriptor),
    Class(DescriptorClass),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::LargeInteger(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Unit(u) => Some(u.value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Alias(v) | Value::Data(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            Value::Descriptor(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Value::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unit(&self) -> Option<&UnitValue> {
        match self {
            Value::Unit(v) => Some(v),
            _ => None,
        }
    }
}

impl Descriptor {
    /// Parse one descriptor from the reader's current position.
    pub fn parse(reader: &mut SliceReader<'_>) -> Result<Descriptor> {
        let class = parse_class(reader)?;
        let count = reader.read_u32()?;

        let mut items = HashMap::with_capacity(count as usize);
        for i in 0..count {
            let key = parse_id(reader)?;
            let value = parse_value(reader)
                .map_err(|e| Error::ParseError(format!("descriptor item {} ({}): {}", i, key, e)))?;
            items.insert(key, value);
        }

        Ok(Descriptor { class, items })
    }

    /// Parse a descriptor from a standalone payload buffer.
    pub fn parse_bytes(data: &[u8]) -> Result<Descriptor> {
        let mut reader = SliceReader::new(data);
        Self::parse(&mut reader)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.items.get(key)
    }

    pub fn items(&self) -> &HashMap<String, Value> {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Value::as_i32)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_text)
    }

    pub fn get_list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn get_descriptor(&self, key: &str) -> Option<&Descriptor> {
        self.get(key).and_then(Value::as_descriptor)
    }
}

/// Read an id: a 4-byte code when the length prefix is zero, otherwise a
/// length-prefixed string. Keys, class ids and enum ids all share this rule.
fn parse_id(reader: &mut SliceReader<'_>) -> Result<String> {
    let length = reader.read_u32()? as usize;
    if length == 0 {
        Ok(reader.read_code()?)
    } else {
        let bytes = reader.read_bytes(length)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn parse_class(reader: &mut SliceReader<'_>) -> Result<DescriptorClass> {
    let name = reader.read_unicode_string()?;
    let id = parse_id(reader)?;
    Ok(DescriptorClass { name, id })
}

fn parse_value(reader: &mut SliceReader<'_>) -> Result<Value> {
    let tag = reader.read_code()?;
    match tag.as_str() {
        "bool" => Ok(Value::Bool(reader.read_u8()? != 0)),
        "doub" => Ok(Value::Double(reader.read_f64()?)),
        "long" => Ok(Value::Integer(reader.read_i32()?)),
        "comp" => Ok(Value::LargeInteger(reader.read_i64()?)),
        "TEXT" => Ok(Value::Text(reader.read_unicode_string()?)),
        "enum" => Ok(Value::Enum(EnumValue {
            type_id: parse_id(reader)?,
            value: parse_id(reader)?,
        })),
        "alis" => {
            let length = reader.read_u32()? as usize;
            let data = reader.read_bytes(length)?;
            Ok(Value::Alias(Bytes::copy_from_slice(data)))
        },
        "tdta" => {
            let length = reader.read_u32()? as usize;
            let data = reader.read_bytes(length)?;
            Ok(Value::Data(Bytes::copy_from_slice(data)))
        },
        "VlLs" => {
            let count = reader.read_u32()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                items.push(parse_value(reader)?);
            }
            Ok(Value::List(items))
        },
        "obj " => Ok(Value::Reference(parse_reference(reader)?)),
        "UntF" => {
            let code = reader.read_code()?;
            let value = reader.read_f64()?;
            Ok(Value::Unit(UnitValue {
                unit: Unit::from_code(&code),
                code,
                value,
            }))
        },
        "UnFl" => {
            let code = reader.read_code()?;
            let value = f64::from(reader.read_f32()?);
            Ok(Value::Unit(UnitValue {
                unit: Unit::from_code(&code),
                code,
                value,
            }))
        },
        "Objc" | "GlbO" => Ok(Value::Descriptor(Descriptor::parse(reader)?)),
        "type" | "GlbC" => Ok(Value::Class(parse_class(reader)?)),
        // Object arrays are an intentional gap, not an oversight.
        "ObAr" => Err(Error::Unsupported(
            "object array descriptors".to_string(),
        )),
        other => Err(Error::InvalidFormat(format!(
            "unknown descriptor type tag: {:?}",
            other
        ))),
    }
}

fn parse_reference(reader: &mut SliceReader<'_>) -> Result<Vec<ReferenceItem>> {
    let count = reader.read_u32()?;
    let mut items = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let sub_type = reader.read_code()?;
        let item = match sub_type.as_str() {
            "prop" => ReferenceItem::Property {
                class: parse_class(reader)?,
                id: parse_id(reader)?,
            },
            "Clss" => ReferenceItem::Class(parse_class(reader)?),
            "Enmr" => ReferenceItem::EnumReference {
                class: parse_class(reader)?,
                type_id: parse_id(reader)?,
                value: parse_id(reader)?,
            },
            "Idnt" => ReferenceItem::Identifier(reader.read_i32()?),
            "indx" => ReferenceItem::Index(reader.read_i32()?),
            "name" => ReferenceItem::Name(reader.read_unicode_string()?),
            "rele" => ReferenceItem::Offset(reader.read_i32()?),
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unknown reference type: {:?}",
                    other
                )));
            },
        };
        items.push(item);
    }
    Ok(items)
}
