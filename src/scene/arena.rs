//! Owned in-memory scene tree
//!
//! Nodes live in a flat arena and are addressed by their index, which never
//! changes once assigned. Used by the headless driver and by tests.

use super::{ElementType, NodeId, NodeKind, SceneApi};
use crate::catalog::ScalarRange;
use crate::error::{MikrError, Result};
use std::collections::BTreeMap;

/// A buffer attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct BufferRecord {
    pub shape: [usize; 2],
    pub element: ElementType,
    pub bytes: Vec<u8>,
}

/// One node of the arena
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub buffers: BTreeMap<String, BufferRecord>,
    pub scalar_range: Option<ScalarRange>,
    pub visible: bool,
    pub commits: u32,
}

impl SceneNode {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            parent: None,
            children: Vec::new(),
            buffers: BTreeMap::new(),
            scalar_range: None,
            visible: true,
            commits: 0,
        }
    }
}

/// Arena-backed [`SceneApi`] implementation
#[derive(Debug, Clone)]
pub struct SceneArena {
    nodes: Vec<SceneNode>,
    refreshes: Vec<bool>,
    frame_ready: bool,
}

impl Default for SceneArena {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneArena {
    /// Arena holding only the root node
    pub fn new() -> Self {
        Self {
            nodes: vec![SceneNode::new("frame", NodeKind::Group)],
            refreshes: Vec::new(),
            frame_ready: true,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    /// First node with the given name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    /// All nodes of a kind, in creation order
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == kind)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Visible nodes of a kind
    pub fn visible_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes_of_kind(kind)
            .into_iter()
            .filter(|id| self.nodes[id.0].visible)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// `reset_accumulation` flag of every refresh, oldest first
    pub fn refreshes(&self) -> &[bool] {
        &self.refreshes
    }

    /// Simulate the renderer finishing (or not) its current frame
    pub fn set_frame_ready(&mut self, ready: bool) {
        self.frame_ready = ready;
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| MikrError::Scene(format!("unknown node {}", id)))
    }
}

impl SceneApi for SceneArena {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn create_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId> {
        self.nodes.push(SceneNode::new(name, kind));
        Ok(NodeId(self.nodes.len() - 1))
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if parent == child {
            return Err(MikrError::Scene(format!("cannot attach {} to itself", child)));
        }
        if let Some(existing) = self.node_mut(child)?.parent {
            return Err(MikrError::Scene(format!(
                "{} already attached to {}",
                child, existing
            )));
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn set_buffer_data(
        &mut self,
        node: NodeId,
        field: &str,
        shape: [usize; 2],
        element: ElementType,
        bytes: &[u8],
    ) -> Result<()> {
        let expected = shape[0] * shape[1] * element.size();
        if bytes.len() != expected {
            return Err(MikrError::Scene(format!(
                "{}: {} bytes for shape {:?} of {:?}",
                field,
                bytes.len(),
                shape,
                element
            )));
        }
        self.node_mut(node)?.buffers.insert(
            field.to_string(),
            BufferRecord {
                shape,
                element,
                bytes: bytes.to_vec(),
            },
        );
        Ok(())
    }

    fn set_scalar_range(&mut self, node: NodeId, range: ScalarRange) -> Result<()> {
        self.node_mut(node)?.scalar_range = Some(range);
        Ok(())
    }

    fn commit(&mut self, node: NodeId) -> Result<()> {
        self.node_mut(node)?.commits += 1;
        Ok(())
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<()> {
        self.node_mut(node)?.visible = visible;
        Ok(())
    }

    fn refresh_scene(&mut self, reset_accumulation: bool) {
        self.refreshes.push(reset_accumulation);
    }

    fn frame_is_ready(&self) -> bool {
        self.frame_ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_building() {
        let mut arena = SceneArena::new();
        let world = arena.create_node("world", NodeKind::World).unwrap();
        let xfm = arena.create_node("xfm", NodeKind::Transform).unwrap();
        let root = arena.root();
        arena.attach_child(root, world).unwrap();
        arena.attach_child(world, xfm).unwrap();

        assert_eq!(arena.node(world).unwrap().children, vec![xfm]);
        assert_eq!(arena.node(xfm).unwrap().parent, Some(world));
        assert_eq!(arena.find("xfm"), Some(xfm));
    }

    #[test]
    fn test_double_attach_rejected() {
        let mut arena = SceneArena::new();
        let a = arena.create_node("a", NodeKind::World).unwrap();
        let b = arena.create_node("b", NodeKind::Transform).unwrap();
        arena.attach_child(a, b).unwrap();
        let root = arena.root();
        assert!(arena.attach_child(root, b).is_err());
        assert!(arena.attach_child(a, a).is_err());
    }

    #[test]
    fn test_buffer_shape_checked() {
        let mut arena = SceneArena::new();
        let vol = arena.create_node("vol", NodeKind::Volume).unwrap();
        assert!(arena
            .set_buffer_data(vol, "cell.data", [2, 1], ElementType::F32, &[0u8; 8])
            .is_ok());
        assert!(arena
            .set_buffer_data(vol, "cell.data", [3, 1], ElementType::F32, &[0u8; 8])
            .is_err());
    }

    #[test]
    fn test_unknown_node() {
        let mut arena = SceneArena::new();
        assert!(matches!(
            arena.commit(NodeId(99)),
            Err(MikrError::Scene(_))
        ));
    }
}
