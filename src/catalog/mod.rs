//! Timestep catalog: the in-memory data model of an ingested dataset
//!
//! The catalog holds the ordered timesteps plus dataset-wide ranges folded
//! from every transferred timestep. It is created empty, populated once by the
//! load and transfer phases, and only replaced wholesale afterwards.
//!
//! # Ownership
//!
//! - Names and buffers are produced on the background worker and installed
//!   into the session's catalog when the phase completes.
//! - [`SceneHandles`] are written only by the mutation thread during create.

pub mod timestep;

pub use timestep::{
    Bounds3, ScalarRange, Timestep, VolumeBuffers, HEXAHEDRON_CELL_TYPE, NODES_PER_CELL,
    RANGE_MARGIN,
};

use crate::scene::SceneHandles;

/// Ordered timesteps plus dataset-wide statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    timesteps: Vec<Timestep>,
    scalar_range: Option<ScalarRange>,
    spatial_bounds: Option<Bounds3>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of name-only records
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timesteps: names.into_iter().map(Timestep::named).collect(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Timestep> {
        self.timesteps.get(index)
    }

    pub fn timesteps(&self) -> &[Timestep] {
        &self.timesteps
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.timesteps.iter().map(|t| t.name.as_str())
    }

    /// Dataset-wide scalar range over every folded timestep
    pub fn scalar_range(&self) -> Option<ScalarRange> {
        self.scalar_range
    }

    /// Dataset-wide spatial bounds over every folded timestep
    pub fn spatial_bounds(&self) -> Option<Bounds3> {
        self.spatial_bounds
    }

    /// Store the buffers of timestep `index` and fold its ranges into the
    /// dataset-wide ones. Returns `false` when `index` is out of range.
    pub fn install(&mut self, index: usize, buffers: VolumeBuffers) -> bool {
        let Some(timestep) = self.timesteps.get_mut(index) else {
            return false;
        };

        if let Some(range) = buffers.scalar_range {
            self.scalar_range = Some(match self.scalar_range {
                Some(current) => current.union(range),
                None => range,
            });
        }
        if let Some(bounds) = buffers.spatial_bounds {
            self.spatial_bounds = Some(match self.spatial_bounds {
                Some(current) => current.union(bounds),
                None => bounds,
            });
        }

        timestep.buffers = Some(buffers);
        true
    }

    /// Whether every timestep has buffers
    pub fn is_fully_transferred(&self) -> bool {
        self.timesteps.iter().all(Timestep::is_transferred)
    }

    pub fn scene_handles(&self, index: usize) -> Option<SceneHandles> {
        self.timesteps.get(index).and_then(|t| t.scene)
    }

    /// Record the scene objects built for timestep `index`
    pub fn set_scene_handles(&mut self, index: usize, handles: SceneHandles) -> bool {
        match self.timesteps.get_mut(index) {
            Some(timestep) => {
                timestep.scene = Some(handles);
                true
            }
            None => false,
        }
    }

    /// Forget every scene handle (after an aborted create)
    pub fn clear_scene_handles(&mut self) {
        for timestep in &mut self.timesteps {
            timestep.scene = None;
        }
    }

    /// Number of timesteps with scene objects
    pub fn built_count(&self) -> usize {
        self.timesteps.iter().filter(|t| t.scene.is_some()).count()
    }
}
