//! Layer hierarchy built from the flat layer list.
//!
//! The tree is an index arena: nodes live in one `Vec` and refer to each
//! other by [`NodeId`], which sidesteps parent/child ownership cycles and
//! keeps traversal allocation-free. The root spans the whole canvas;
//! group bounds are recomputed bottom-up from their non-empty children.

use serde::Serialize;

use crate::common::Rect;
use crate::layer::Layer;

/// Index of a node inside its [`LayerTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Group,
    Layer,
}

/// One node of the hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub name: String,
    /// Index into the document's layer list; `None` for the root
    pub layer: Option<usize>,
    pub parent: Option<NodeId>,
    /// Children in document order, topmost first
    pub children: Vec<NodeId>,
    pub visible: bool,
    pub opacity: u8,
    pub blend_mode: String,
    pub rect: Rect,
}

impl Node {
    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_empty()
    }
}

/// Serializable snapshot of a node and its subtree.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    pub visible: bool,
    /// Normalized to `0.0..=1.0`
    pub opacity: f64,
    pub blending_mode: String,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub width: i32,
    pub height: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSummary>,
}

/// The document's layer hierarchy.
#[derive(Debug, Clone)]
pub struct LayerTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl LayerTree {
    /// Build the tree from a top-first layer list.
    ///
    /// Folder markers drive a stack walk: a start marker opens a group
    /// that collects subsequent nodes, its matching end marker closes it.
    /// An end marker without an open group is ignored, and groups left
    /// open at the end of the list stay attached to their parent, so a
    /// malformed marker sequence still yields a usable tree.
    pub fn build(layers: &[Layer], doc_width: u32, doc_height: u32) -> LayerTree {
        let mut nodes = vec![Node {
            kind: NodeKind::Root,
            name: "Root".to_string(),
            layer: None,
            parent: None,
            children: Vec::new(),
            visible: true,
            opacity: 255,
            blend_mode: "normal".to_string(),
            rect: Rect::new(0, 0, doc_height as i32, doc_width as i32),
        }];
        let root = NodeId(0);

        let mut stack = vec![root];

        for (index, layer) in layers.iter().enumerate() {
            if layer.is_folder() {
                if layer.is_folder_end() {
                    if stack.len() > 1 {
                        let group = stack.pop().unwrap_or(root);
                        let parent = *stack.last().unwrap_or(&root);
                        nodes[group.0].parent = Some(parent);
                        nodes[parent.0].children.push(group);
                    }
                } else {
                    let id = NodeId(nodes.len());
                    nodes.push(Node {
                        kind: NodeKind::Group,
                        name: layer.name.clone(),
                        layer: Some(index),
                        parent: None,
                        children: Vec::new(),
                        visible: layer.visible(),
                        opacity: layer.opacity,
                        blend_mode: layer.blend_mode_str().to_string(),
                        rect: layer.rect,
                    });
                    stack.push(id);
                }
            } else {
                let parent = *stack.last().unwrap_or(&root);
                let id = NodeId(nodes.len());
                nodes.push(Node {
                    kind: NodeKind::Layer,
                    name: layer.name.clone(),
                    layer: Some(index),
                    parent: Some(parent),
                    children: Vec::new(),
                    visible: layer.visible(),
                    opacity: layer.opacity,
                    blend_mode: layer.blend_mode_str().to_string(),
                    rect: layer.rect,
                });
                nodes[parent.0].children.push(id);
            }
        }

        // Attach any groups whose end marker never arrived.
        while stack.len() > 1 {
            let group = stack.pop().unwrap_or(root);
            let parent = *stack.last().unwrap_or(&root);
            nodes[group.0].parent = Some(parent);
            nodes[parent.0].children.push(group);
        }

        let mut tree = LayerTree { nodes, root };
        tree.update_dimensions(root);
        tree
    }

    /// Recompute group bounds bottom-up. The root keeps the canvas rect,
    /// a group becomes the envelope of its non-empty children, and a
    /// group with only empty children collapses to zero.
    fn update_dimensions(&mut self, id: NodeId) {
        if self.nodes[id.0].kind == NodeKind::Layer {
            return;
        }

        let children = self.nodes[id.0].children.clone();
        for child in &children {
            self.update_dimensions(*child);
        }

        if self.nodes[id.0].kind == NodeKind::Root {
            return;
        }

        let mut envelope: Option<Rect> = None;
        for child in &children {
            let rect = self.nodes[child.0].rect;
            if rect.is_empty() {
                continue;
            }
            envelope = Some(match envelope {
                None => rect,
                Some(e) => Rect::new(
                    e.top.min(rect.top),
                    e.left.min(rect.left),
                    e.bottom.max(rect.bottom),
                    e.right.max(rect.right),
                ),
            });
        }

        self.nodes[id.0].rect = envelope.unwrap_or(Rect::ZERO);
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// All nodes below `id` in depth-first document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result);
        result
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[id.0].children {
            out.push(*child);
            self.collect_descendants(*child, out);
        }
    }

    pub fn descendant_layers(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.nodes[n.0].kind == NodeKind::Layer)
            .collect()
    }

    pub fn descendant_groups(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.nodes[n.0].kind == NodeKind::Group)
            .collect()
    }

    /// The node itself plus its descendants.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = vec![id];
        self.collect_descendants(id, &mut result);
        result
    }

    /// The node's siblings, itself included.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes[id.0].parent {
            Some(parent) => self.nodes[parent.0].children.clone(),
            None => vec![id],
        }
    }

    /// Distance from the root; the root itself is 0.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Slash-joined names from the root (exclusive) down to this node.
    pub fn path(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.0].parent {
            parts.push(self.nodes[current.0].name.as_str());
            current = parent;
        }
        parts.reverse();
        parts.join("/")
    }

    /// Resolve a slash-separated path of exact names below `id`.
    /// Duplicate names yield multiple results.
    pub fn children_at_path(&self, id: NodeId, path: &str) -> Vec<NodeId> {
        let path = path.strip_prefix('/').unwrap_or(path);
        if path.is_empty() {
            return Vec::new();
        }
        let parts: Vec<&str> = path.split('/').collect();
        let mut matches = Vec::new();
        self.find_at_path(id, &parts, &mut matches);
        matches
    }

    fn find_at_path(&self, id: NodeId, parts: &[&str], out: &mut Vec<NodeId>) {
        let Some((target, remaining)) = parts.split_first() else {
            out.push(id);
            return;
        };
        for child in &self.nodes[id.0].children {
            if self.nodes[child.0].name == *target {
                if remaining.is_empty() {
                    out.push(*child);
                } else {
                    self.find_at_path(*child, remaining, out);
                }
            }
        }
    }

    /// Export the subtree rooted at `id` as a serializable snapshot.
    pub fn summarize(&self, id: NodeId) -> NodeSummary {
        let node = &self.nodes[id.0];
        NodeSummary {
            kind: node.kind,
            name: node.name.clone(),
            visible: node.visible,
            opacity: f64::from(node.opacity) / 255.0,
            blending_mode: node.blend_mode.clone(),
            left: node.rect.left,
            top: node.rect.top,
            right: node.rect.right,
            bottom: node.rect.bottom,
            width: node.width(),
            height: node.height(),
            children: node
                .children
                .iter()
                .map(|child| self.summarize(*child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::info::{SectionDividerInfo, SectionDividerKind};
    use smallvec::SmallVec;
    use std::collections::HashMap;

    fn plain_layer(name: &str, rect: Rect) -> Layer {
        Layer {
            rect,
            channel_info: SmallVec::new(),
            blend_mode_key: "norm".to_string(),
            opacity: 255,
            clipping: 0,
            flags: crate::layer::LayerFlags::empty(),
            name: name.to_string(),
            mask: None,
            info: HashMap::new(),
            layer_id: None,
            fill_opacity: None,
            divider: None,
            vector_mask: None,
            type_tool: None,
            channels: HashMap::new(),
        }
    }

    fn divider_layer(name: &str, kind: SectionDividerKind) -> Layer {
        let mut layer = plain_layer(name, Rect::ZERO);
        layer.divider = Some(SectionDividerInfo {
            kind,
            blend_mode: None,
            sub_type: None,
        });
        layer
    }

    // Top-first list: group start comes before its members, the end
    // marker after them.
    fn sample_layers() -> Vec<Layer> {
        vec![
            divider_layer("Group 1", SectionDividerKind::OpenFolder),
            plain_layer("inner", Rect::new(450, 450, 550, 550)),
            divider_layer("</group>", SectionDividerKind::BoundingDivider),
            plain_layer("bg", Rect::new(0, 0, 1000, 1000)),
        ]
    }

    #[test]
    fn test_build_structure() {
        let tree = LayerTree::build(&sample_layers(), 1000, 1000);
        let root = tree.root();

        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.descendant_layers(root).len(), 2);
        assert_eq!(tree.descendant_groups(root).len(), 1);

        let group = tree.children(root)[0];
        assert_eq!(tree.node(group).kind, NodeKind::Group);
        assert_eq!(tree.node(group).name, "Group 1");
        assert_eq!(tree.children(group).len(), 1);

        let inner = tree.children(group)[0];
        assert_eq!(tree.node(inner).name, "inner");
        assert_eq!(tree.depth(inner), 2);
        assert_eq!(tree.path(inner), "Group 1/inner");
    }

    #[test]
    fn test_group_bounds_from_children() {
        let tree = LayerTree::build(&sample_layers(), 1000, 1000);
        let group = tree.children(tree.root())[0];

        let rect = tree.node(group).rect;
        assert_eq!(rect, Rect::new(450, 450, 550, 550));
        assert_eq!(tree.node(group).width(), 100);
        assert_eq!(tree.node(group).height(), 100);
    }

    #[test]
    fn test_childless_group_collapses_to_zero() {
        let layers = vec![
            divider_layer("G", SectionDividerKind::OpenFolder),
            divider_layer("</g>", SectionDividerKind::BoundingDivider),
        ];
        let tree = LayerTree::build(&layers, 100, 100);
        let group = tree.children(tree.root())[0];

        assert!(tree.children(group).is_empty());
        assert_eq!(tree.node(group).rect, Rect::ZERO);
    }

    #[test]
    fn test_empty_group_collapses_to_zero() {
        let layers = vec![
            divider_layer("G", SectionDividerKind::OpenFolder),
            plain_layer("empty", Rect::ZERO),
            divider_layer("</g>", SectionDividerKind::BoundingDivider),
        ];
        let tree = LayerTree::build(&layers, 100, 100);
        let group = tree.children(tree.root())[0];

        assert_eq!(tree.node(group).rect, Rect::ZERO);
        assert!(tree.node(group).is_empty());
    }

    #[test]
    fn test_root_keeps_canvas_rect() {
        let tree = LayerTree::build(&sample_layers(), 640, 480);
        let root = tree.node(tree.root());
        assert_eq!(root.rect, Rect::new(0, 0, 480, 640));
        assert_eq!(root.width(), 640);
        assert_eq!(root.height(), 480);
    }

    #[test]
    fn test_type_zero_divider_opens_group() {
        // A divider with an unrecognized type code still starts a group;
        // only the bounding divider closes one.
        let layers = vec![
            divider_layer("Set", SectionDividerKind::Other),
            plain_layer("inner", Rect::new(0, 0, 10, 10)),
            divider_layer("</set>", SectionDividerKind::BoundingDivider),
        ];
        let tree = LayerTree::build(&layers, 10, 10);

        assert_eq!(tree.children(tree.root()).len(), 1);
        let group = tree.children(tree.root())[0];
        assert_eq!(tree.node(group).kind, NodeKind::Group);
        assert_eq!(tree.node(group).name, "Set");
        assert_eq!(tree.children(group).len(), 1);
        assert_eq!(tree.node(tree.children(group)[0]).name, "inner");
    }

    #[test]
    fn test_unterminated_group_still_attached() {
        let layers = vec![
            divider_layer("open", SectionDividerKind::OpenFolder),
            plain_layer("child", Rect::new(0, 0, 10, 10)),
        ];
        let tree = LayerTree::build(&layers, 10, 10);

        assert_eq!(tree.children(tree.root()).len(), 1);
        let group = tree.children(tree.root())[0];
        assert_eq!(tree.node(group).kind, NodeKind::Group);
        assert_eq!(tree.children(group).len(), 1);
    }

    #[test]
    fn test_children_at_path() {
        let tree = LayerTree::build(&sample_layers(), 1000, 1000);
        let root = tree.root();

        let found = tree.children_at_path(root, "/Group 1/inner");
        assert_eq!(found.len(), 1);
        assert_eq!(tree.node(found[0]).name, "inner");

        assert!(tree.children_at_path(root, "missing").is_empty());
        assert!(tree.children_at_path(root, "").is_empty());
    }

    #[test]
    fn test_siblings_and_subtree() {
        let tree = LayerTree::build(&sample_layers(), 1000, 1000);
        let root = tree.root();
        let group = tree.children(root)[0];
        let bg = tree.children(root)[1];

        assert_eq!(tree.siblings(group), vec![group, bg]);
        assert_eq!(tree.subtree(root).len(), tree.len());
        assert_eq!(tree.subtree(group).len(), 2);
    }

    #[test]
    fn test_summary_normalizes_opacity() {
        let mut layers = sample_layers();
        layers[3].opacity = 128;

        let tree = LayerTree::build(&layers, 1000, 1000);
        let summary = tree.summarize(tree.root());

        assert_eq!(summary.children.len(), 2);
        let bg = &summary.children[1];
        assert_eq!(bg.name, "bg");
        assert!((bg.opacity - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(summary.opacity, 1.0);
    }
}
