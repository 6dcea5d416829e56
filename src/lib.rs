//! Persimmon - A Rust library for parsing layered PSD image documents
//!
//! This library parses the Adobe Photoshop document format: the file
//! header, image resources, the layer and mask section, and the merged
//! composite preview. Layers are organized into a folder tree, and any
//! subtree can be composited into an RGBA raster with the document's
//! blend modes, opacity, and layer masks applied.
//!
//! # Features
//!
//! - **Header and resources**: Dimensions, color mode, slices, guides
//! - **Layer records**: Names, masks, folders, text layers, per-layer channels
//! - **Layer tree**: Folder hierarchy with path lookup and traversal
//! - **Compositing**: Per-layer blend modes, opacity, fill opacity, user masks
//! - **Merged preview**: The flattened image Photoshop stores in the file
//!
//! # Example - Walking the layer tree
//!
//! ```no_run
//! use persimmon::Psd;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut psd = Psd::open("design.psd")?;
//!
//! let header = psd.header()?;
//! println!("{}x{} {}", header.width(), header.height(), header.mode_name());
//!
//! let tree = psd.tree()?;
//! for id in tree.descendants(tree.root()) {
//!     let node = tree.node(id);
//!     println!("{:?} {}", node.kind, node.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Compositing a subtree
//!
//! ```no_run
//! use persimmon::Psd;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut psd = Psd::open("design.psd")?;
//!
//! let root = psd.tree()?.root();
//! let canvas = psd.render(root)?;
//! println!("composited {}x{} pixels", canvas.width(), canvas.height());
//! # Ok(())
//! # }
//! ```

/// Shared error type, binary readers, and geometry primitives
pub mod common;

/// File-format constants: signatures, channel ids, compression codes
pub mod consts;

/// Seekable big-endian reader over the document stream
pub mod cursor;

/// Action descriptor structures embedded in resources and layer info
pub mod descriptor;

/// Top-level document type with staged section parsing
pub mod document;

/// File header section
pub mod header;

/// Merged composite image section
pub mod image;

/// Layer and mask section: records, channels, additional info blocks
pub mod layer;

/// Compositing: blend modes and the subtree renderer
pub mod render;

/// Image resources section: slices, guides, layer comps
pub mod resource;

/// Layer hierarchy built from folder divider markers
pub mod tree;

// Re-export commonly used types for convenience
pub use common::{Error, Rect, Result};
pub use descriptor::{Descriptor, Value};
pub use document::Psd;
pub use header::Header;
pub use layer::{BlendModeSummary, Layer, LayerFlags, LayerMaskData, MaskFlags};
pub use render::{Raster, RenderOptions, Renderer, Rgba};
pub use resource::{Guide, LayerComp, Resource, ResourceSection, Slice, SlicesResource};
pub use tree::{LayerTree, Node, NodeId, NodeKind, NodeSummary};
