//! Flattening a tree node and its descendants into an RGBA raster.
//!
//! Rendering walks the hierarchy depth-first, compositing bottom-most
//! layers first so later siblings land on top. The canvas covers the
//! target node's bounding box; every layer is placed relative to that
//! origin. Each layer is composited with its own blend mode at an
//! effective opacity of `opacity * fill_opacity / 255`, with the user
//! mask plane (channel -2) modulating alpha where one is present.

pub mod blend;

pub use blend::{BlendFn, blend_fn};

use crate::consts::{
    CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, CHANNEL_TRANSPARENCY, CHANNEL_USER_MASK,
};
use crate::layer::Layer;
use crate::tree::{LayerTree, NodeId, NodeKind};

/// One straight-alpha pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };
}

/// A width x height pixel buffer, row-major, zero-initialized to
/// fully transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Raster {
        Raster {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn set(&mut self, x: u32, y: u32, pixel: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = pixel;
        }
    }

    pub(crate) fn set_index(&mut self, index: usize, pixel: Rgba) {
        if index < self.pixels.len() {
            self.pixels[index] = pixel;
        }
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }
}

/// Filters applied while walking the tree.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Node kinds skipped entirely, subtrees included
    pub exclude_kinds: Vec<NodeKind>,
    /// Skip text layers
    pub exclude_text: bool,
}

/// Composites subtrees of a [`LayerTree`] against its layer storage.
pub struct Renderer<'a> {
    tree: &'a LayerTree,
    layers: &'a [Layer],
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(tree: &'a LayerTree, layers: &'a [Layer]) -> Renderer<'a> {
        Renderer {
            tree,
            layers,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(
        tree: &'a LayerTree,
        layers: &'a [Layer],
        options: RenderOptions,
    ) -> Renderer<'a> {
        Renderer {
            tree,
            layers,
            options,
        }
    }

    /// Render `node` and its subtree onto a canvas the size of the
    /// node's bounding box.
    pub fn render(&self, node: NodeId) -> Raster {
        let target = self.tree.node(node);
        let width = target.width().max(0) as u32;
        let height = target.height().max(0) as u32;

        let mut canvas = Raster::new(width, height);
        let origin = (target.rect.left, target.rect.top);
        self.render_node(&mut canvas, node, origin);
        canvas
    }

    fn render_node(&self, canvas: &mut Raster, id: NodeId, origin: (i32, i32)) {
        let node = self.tree.node(id);
        if !node.visible || self.options.exclude_kinds.contains(&node.kind) {
            return;
        }

        match node.kind {
            NodeKind::Layer => {
                if let Some(index) = node.layer {
                    let layer = &self.layers[index];
                    if self.options.exclude_text && layer.is_text_layer() {
                        return;
                    }
                    self.render_layer(canvas, layer, origin);
                }
            },
            NodeKind::Group | NodeKind::Root => {
                // Children are stored topmost first; composite
                // bottom-up so upper siblings overwrite.
                for child in self.tree.children(id).iter().rev() {
                    self.render_node(canvas, *child, origin);
                }
            },
        }
    }

    fn render_layer(&self, canvas: &mut Raster, layer: &Layer, origin: (i32, i32)) {
        let width = layer.width();
        let height = layer.height();
        if width <= 0 || height <= 0 || layer.channels.is_empty() {
            return;
        }

        // A zero-area mask hides every pixel of the layer.
        if layer.mask.is_some_and(|m| m.is_empty()) {
            return;
        }

        let red = layer.channel(CHANNEL_RED).map(|c| c.data.as_slice());
        let green = layer.channel(CHANNEL_GREEN).map(|c| c.data.as_slice());
        let blue = layer.channel(CHANNEL_BLUE).map(|c| c.data.as_slice());
        let alpha = layer
            .channel(CHANNEL_TRANSPARENCY)
            .map(|c| c.data.as_slice());
        let mask_plane = layer.channel(CHANNEL_USER_MASK).map(|c| c.data.as_slice());
        let mask = layer.mask.filter(|m| !m.is_empty());

        let effective_opacity =
            (u32::from(layer.opacity) * u32::from(layer.fill_opacity()) / 255) as u8;
        let blend = blend_fn(layer.blend_mode_str());

        let plane_at = |plane: Option<&[u8]>, idx: usize, default: u8| -> u8 {
            match plane {
                Some(data) if idx < data.len() => data[idx],
                _ => default,
            }
        };

        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                let mut src = Rgba {
                    r: plane_at(red, idx, 0),
                    g: plane_at(green, idx, 0),
                    b: plane_at(blue, idx, 0),
                    a: plane_at(alpha, idx, 255),
                };

                // The mask plane lives in its own rectangle in document
                // coordinates; pixels outside it are fully masked.
                if let (Some(mask), Some(plane)) = (mask, mask_plane) {
                    let doc_x = layer.rect.left + x;
                    let doc_y = layer.rect.top + y;
                    let mask_x = doc_x - mask.rect.left;
                    let mask_y = doc_y - mask.rect.top;

                    src.a = if mask_x < 0
                        || mask_y < 0
                        || mask_x >= mask.width()
                        || mask_y >= mask.height()
                    {
                        0
                    } else {
                        let mask_idx = (mask_y * mask.width() + mask_x) as usize;
                        let coverage = plane_at(Some(plane), mask_idx, mask.default_color);
                        (u32::from(src.a) * u32::from(coverage) / 255) as u8
                    };
                }

                let dst_x = layer.rect.left - origin.0 + x;
                let dst_y = layer.rect.top - origin.1 + y;
                if dst_x < 0 || dst_y < 0 {
                    continue;
                }
                let (dst_x, dst_y) = (dst_x as u32, dst_y as u32);

                if let Some(dst) = canvas.get(dst_x, dst_y) {
                    canvas.set(dst_x, dst_y, blend(src, dst, effective_opacity));
                }
            }
        }
    }
}
