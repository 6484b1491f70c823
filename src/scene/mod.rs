//! Scene API consumed by the ingestion core
//!
//! The host application's scene graph is external. The core only issues the
//! calls of [`SceneApi`] and keeps the returned [`NodeId`]s as opaque handles;
//! it never holds references into the host's object model.
//!
//! # Components
//!
//! - [`SceneApi`] - The calls the core makes, all on the mutation thread
//! - [`SceneArena`] - Owned in-memory tree keyed by stable arena indices
//! - [`VolumeBuilder`] - Per-timestep build step and visibility helpers

pub mod arena;
pub mod builder;

pub use arena::{BufferRecord, SceneArena, SceneNode};
pub use builder::VolumeBuilder;

use crate::catalog::ScalarRange;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a node created through [`SceneApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of scene node the core creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Host-owned root
    Group,
    World,
    TransferFunction,
    Transform,
    /// Unstructured volume holding the mesh and cell scalars
    Volume,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Group => "group",
            NodeKind::World => "world",
            NodeKind::TransferFunction => "transfer_function",
            NodeKind::Transform => "transform",
            NodeKind::Volume => "volume_unstructured",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element type of a buffer handed to [`SceneApi::set_buffer_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Vec3f,
    U32,
    U8,
    F32,
}

impl ElementType {
    pub fn size(&self) -> usize {
        match self {
            ElementType::Vec3f => 12,
            ElementType::U32 | ElementType::F32 => 4,
            ElementType::U8 => 1,
        }
    }
}

/// How timesteps are laid out in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldMode {
    /// All volumes under one world; playback toggles volumes
    #[default]
    SameWorld,
    /// One world per timestep; playback swaps the active world
    SeparateWorlds,
}

/// Scene objects created for one timestep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneHandles {
    pub world: NodeId,
    pub transfer_function: NodeId,
    pub transform: NodeId,
    pub volume: NodeId,
}

impl SceneHandles {
    /// The node whose visibility represents this timestep
    pub fn toggle_node(&self, mode: WorldMode) -> NodeId {
        match mode {
            WorldMode::SameWorld => self.volume,
            WorldMode::SeparateWorlds => self.world,
        }
    }
}

/// Calls the core makes against the host scene and frame scheduler.
///
/// Every method must be called from the mutation thread.
#[cfg_attr(test, mockall::automock)]
pub trait SceneApi {
    /// Node that created worlds are attached to
    fn root(&self) -> NodeId;

    fn create_node(&mut self, name: &str, kind: NodeKind) -> Result<NodeId>;

    fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Attach a typed buffer of `shape = [count, width]` elements
    fn set_buffer_data(
        &mut self,
        node: NodeId,
        field: &str,
        shape: [usize; 2],
        element: ElementType,
        bytes: &[u8],
    ) -> Result<()>;

    fn set_scalar_range(&mut self, node: NodeId, range: ScalarRange) -> Result<()>;

    fn commit(&mut self, node: NodeId) -> Result<()>;

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<()>;

    /// Request a redraw; `reset_accumulation` restarts progressive refinement
    fn refresh_scene(&mut self, reset_accumulation: bool);

    /// Whether the last requested frame has finished rendering
    fn frame_is_ready(&self) -> bool;

    /// Abort the frame in flight before mutating the scene
    fn cancel_frame(&mut self) {}

    /// Block until no frame is in flight
    fn wait_on_frame(&mut self) {}
}
