//! Top-level document type tying the sections together.
//!
//! Sections are parsed in file order (header, resources, layers, merged
//! image) and cached; each stage runs at most once. A failure in a later
//! stage leaves the earlier stages' results available, so a document
//! with a corrupt layer section still exposes its header and resources.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::common::{Error, Result};
use crate::cursor::ByteCursor;
use crate::header::Header;
use crate::image;
use crate::layer::{Layer, section};
use crate::render::{Raster, RenderOptions, Renderer};
use crate::resource::{Guide, LayerComp, ResourceSection, SlicesResource};
use crate::tree::{LayerTree, NodeId};

/// A layered document being parsed from a seekable stream.
pub struct Psd<R: Read + Seek> {
    cursor: ByteCursor<R>,
    header: Option<Header>,
    resources: Option<ResourceSection>,
    layers: Option<Vec<Layer>>,
    tree: Option<LayerTree>,
    image: Option<Raster>,
}

impl Psd<BufReader<File>> {
    /// Open a document from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Psd<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(Psd::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> Psd<R> {
    pub fn new(reader: R) -> Psd<R> {
        Psd {
            cursor: ByteCursor::new(reader),
            header: None,
            resources: None,
            layers: None,
            tree: None,
            image: None,
        }
    }

    /// Parse every section up front.
    pub fn parse(&mut self) -> Result<()> {
        self.parse_header()?;
        self.parse_resources()?;
        self.parse_layers()?;
        self.parse_image()?;
        Ok(())
    }

    /// Whether all sections have been parsed.
    pub fn parsed(&self) -> bool {
        self.header.is_some()
            && self.resources.is_some()
            && self.layers.is_some()
            && self.image.is_some()
    }

    fn parse_header(&mut self) -> Result<()> {
        if self.header.is_none() {
            self.header = Some(Header::parse(&mut self.cursor)?);
        }
        Ok(())
    }

    fn parse_resources(&mut self) -> Result<()> {
        self.parse_header()?;
        if self.resources.is_none() {
            self.resources = Some(ResourceSection::parse(&mut self.cursor)?);
        }
        Ok(())
    }

    fn parse_layers(&mut self) -> Result<()> {
        self.parse_resources()?;
        if self.layers.is_none() {
            let layers = section::parse(&mut self.cursor)?;
            let header = self.header.as_ref().ok_or_else(|| {
                Error::ParseError("header missing after parse".to_string())
            })?;
            self.tree = Some(LayerTree::build(&layers, header.width(), header.height()));
            self.layers = Some(layers);
        }
        Ok(())
    }

    fn parse_image(&mut self) -> Result<()> {
        self.parse_layers()?;
        if self.image.is_none() {
            let header = self.header.as_ref().ok_or_else(|| {
                Error::ParseError("header missing after parse".to_string())
            })?;
            self.image = Some(image::parse(&mut self.cursor, header)?);
        }
        Ok(())
    }

    /// The file header, parsing it on first access.
    pub fn header(&mut self) -> Result<&Header> {
        self.parse_header()?;
        self.header
            .as_ref()
            .ok_or_else(|| Error::ParseError("header unavailable".to_string()))
    }

    /// The image resources section.
    pub fn resources(&mut self) -> Result<&ResourceSection> {
        self.parse_resources()?;
        self.resources
            .as_ref()
            .ok_or_else(|| Error::ParseError("resources unavailable".to_string()))
    }

    /// All layers, ordered top to bottom.
    pub fn layers(&mut self) -> Result<&[Layer]> {
        self.parse_layers()?;
        self.layers
            .as_deref()
            .ok_or_else(|| Error::ParseError("layers unavailable".to_string()))
    }

    /// The layer hierarchy.
    pub fn tree(&mut self) -> Result<&LayerTree> {
        self.parse_layers()?;
        self.tree
            .as_ref()
            .ok_or_else(|| Error::ParseError("tree unavailable".to_string()))
    }

    /// The flattened composite preview.
    pub fn merged_image(&mut self) -> Result<&Raster> {
        self.parse_image()?;
        self.image
            .as_ref()
            .ok_or_else(|| Error::ParseError("merged image unavailable".to_string()))
    }

    pub fn slices(&mut self) -> Result<SlicesResource> {
        self.resources()?.slices()
    }

    pub fn guides(&mut self) -> Result<Vec<Guide>> {
        self.resources()?.guides()
    }

    pub fn layer_comps(&mut self) -> Result<Vec<LayerComp>> {
        Ok(self.resources()?.layer_comps())
    }

    /// Composite `node` and its subtree into a raster.
    pub fn render(&mut self, node: NodeId) -> Result<Raster> {
        self.render_with(node, RenderOptions::default())
    }

    /// Composite with exclusion filters.
    pub fn render_with(&mut self, node: NodeId, options: RenderOptions) -> Result<Raster> {
        self.parse_layers()?;
        let (Some(tree), Some(layers)) = (self.tree.as_ref(), self.layers.as_deref()) else {
            return Err(Error::ParseError("layers unavailable".to_string()));
        };
        Ok(Renderer::with_options(tree, layers, options).render(node))
    }
}
