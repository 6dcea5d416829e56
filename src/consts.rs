//! Constants for the PSD file format.

/// Magic bytes at the beginning of every PSD/PSB file
pub const FILE_SIGNATURE: &[u8; 4] = b"8BPS";

/// Signature of resource blocks, blend modes and most additional-info blocks
pub const BLOCK_SIGNATURE: &[u8; 4] = b"8BIM";

/// Alternate signature used by some additional-info blocks in large documents
pub const BLOCK_SIGNATURE_64: &[u8; 4] = b"8B64";

/// PSD version number
pub const VERSION_PSD: u16 = 1;

/// PSB (large document) version number
pub const VERSION_PSB: u16 = 2;

// Image resource ids
/// Grid and guides resource
pub const RESOURCE_GUIDES: u16 = 1032;
/// Slices resource
pub const RESOURCE_SLICES: u16 = 1050;
/// Layer comps resource (decoding intentionally stubbed)
pub const RESOURCE_LAYER_COMPS: u16 = 1065;

// Channel ids in the layer channel table
/// User-supplied layer mask plane
pub const CHANNEL_USER_MASK: i16 = -2;
/// Transparency (alpha) plane
pub const CHANNEL_TRANSPARENCY: i16 = -1;
pub const CHANNEL_RED: i16 = 0;
pub const CHANNEL_GREEN: i16 = 1;
pub const CHANNEL_BLUE: i16 = 2;

// Channel compression methods
pub const COMPRESSION_RAW: u16 = 0;
pub const COMPRESSION_RLE: u16 = 1;

// Additional layer information keys
/// Unicode layer name
pub const KEY_UNICODE_NAME: &[u8; 4] = b"luni";
/// Numeric layer id
pub const KEY_LAYER_ID: &[u8; 4] = b"lyid";
/// Fill opacity
pub const KEY_FILL_OPACITY: &[u8; 4] = b"iOpa";
/// Layer section divider
pub const KEY_SECTION_DIVIDER: &[u8; 4] = b"lsct";
/// Layer section divider (older documents)
pub const KEY_SECTION_DIVIDER_LEGACY: &[u8; 4] = b"lsdk";
/// Vector mask
pub const KEY_VECTOR_MASK: &[u8; 4] = b"vmsk";
/// Vector mask (Photoshop 6.0)
pub const KEY_VECTOR_MASK_V6: &[u8; 4] = b"vsms";
/// Type tool (text layer) data
pub const KEY_TYPE_TOOL: &[u8; 4] = b"TySh";

// Color modes
pub const COLOR_MODE_BITMAP: u16 = 0;
pub const COLOR_MODE_GRAYSCALE: u16 = 1;
pub const COLOR_MODE_INDEXED: u16 = 2;
pub const COLOR_MODE_RGB: u16 = 3;
pub const COLOR_MODE_CMYK: u16 = 4;
pub const COLOR_MODE_HSL: u16 = 5;
pub const COLOR_MODE_HSB: u16 = 6;
pub const COLOR_MODE_MULTICHANNEL: u16 = 7;
pub const COLOR_MODE_DUOTONE: u16 = 8;
pub const COLOR_MODE_LAB: u16 = 9;
pub const COLOR_MODE_GRAY16: u16 = 10;
pub const COLOR_MODE_RGB48: u16 = 11;
pub const COLOR_MODE_LAB48: u16 = 12;
pub const COLOR_MODE_CMYK64: u16 = 13;
pub const COLOR_MODE_DEEP_MULTICHANNEL: u16 = 14;
pub const COLOR_MODE_DUOTONE16: u16 = 15;

/// Human-readable color mode names, indexed by mode code
pub const COLOR_MODE_NAMES: [&str; 16] = [
    "Bitmap",
    "GrayScale",
    "IndexedColor",
    "RGBColor",
    "CMYKColor",
    "HSLColor",
    "HSBColor",
    "Multichannel",
    "Duotone",
    "LabColor",
    "Gray16",
    "RGB48",
    "Lab48",
    "CMYK64",
    "DeepMultichannel",
    "Duotone16",
];
