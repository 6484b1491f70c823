//! Per-timestep scene construction.
//!
//! One build step turns a transferred timestep into a world, a transfer
//! function, a transform and an unstructured volume, then commits them.
//! All calls happen on the mutation thread.

use super::{ElementType, NodeId, NodeKind, SceneApi, SceneHandles, WorldMode};
use crate::catalog::{Catalog, ScalarRange, NODES_PER_CELL};
use crate::error::{MikrError, Result};

/// Builds scene objects for catalog timesteps
#[derive(Debug, Clone)]
pub struct VolumeBuilder {
    mode: WorldMode,
    /// World shared by every timestep in [`WorldMode::SameWorld`]
    shared_world: Option<NodeId>,
    /// Worlds and volumes created by this builder
    created: Vec<NodeId>,
}

impl VolumeBuilder {
    pub fn new(mode: WorldMode) -> Self {
        Self {
            mode,
            shared_world: None,
            created: Vec::new(),
        }
    }

    pub fn mode(&self) -> WorldMode {
        self.mode
    }

    fn world_for(&mut self, scene: &mut dyn SceneApi, index: usize) -> Result<NodeId> {
        match (self.mode, self.shared_world) {
            (WorldMode::SameWorld, Some(world)) => Ok(world),
            (WorldMode::SameWorld, None) => {
                let root = scene.root();
                let world = scene.create_node("world", NodeKind::World)?;
                self.created.push(world);
                scene.attach_child(root, world)?;
                self.shared_world = Some(world);
                Ok(world)
            }
            (WorldMode::SeparateWorlds, _) => {
                let root = scene.root();
                let world = scene.create_node(&format!("world_{}", index), NodeKind::World)?;
                self.created.push(world);
                scene.attach_child(root, world)?;
                Ok(world)
            }
        }
    }

    /// Create and commit the scene objects of timestep `index`.
    ///
    /// The transfer function spans the dataset-wide scalar range so colours
    /// stay comparable across timesteps.
    pub fn build_step(
        &mut self,
        scene: &mut dyn SceneApi,
        catalog: &Catalog,
        index: usize,
    ) -> Result<SceneHandles> {
        let timestep = catalog
            .get(index)
            .ok_or_else(|| MikrError::Scene(format!("no timestep #{}", index)))?;
        let buffers = timestep.buffers.as_ref().ok_or_else(|| {
            MikrError::Scene(format!("timestep '{}' has not been transferred", timestep.name))
        })?;

        scene.cancel_frame();
        scene.wait_on_frame();

        let world = self.world_for(scene, index)?;

        let transfer_function =
            scene.create_node(&format!("transfer_function_{}", index), NodeKind::TransferFunction)?;
        let range = catalog
            .scalar_range()
            .or(buffers.scalar_range)
            .unwrap_or(ScalarRange { min: 0.0, max: 1.0 });
        scene.set_scalar_range(transfer_function, range)?;
        scene.commit(transfer_function)?;

        let transform = scene.create_node(&format!("xfm_{}", index), NodeKind::Transform)?;
        scene.attach_child(world, transform)?;

        let volume = scene.create_node(&format!("volume_{}", index), NodeKind::Volume)?;
        self.created.push(volume);
        scene.attach_child(transform, volume)?;
        scene.attach_child(volume, transfer_function)?;

        let cells = buffers.cell_count();
        scene.set_buffer_data(
            volume,
            "vertex.position",
            [buffers.vertex_count(), 1],
            ElementType::Vec3f,
            bytemuck::cast_slice(&buffers.vertex_positions),
        )?;
        scene.set_buffer_data(
            volume,
            "index",
            [cells * NODES_PER_CELL, 1],
            ElementType::U32,
            bytemuck::cast_slice(&buffers.connectivity),
        )?;
        scene.set_buffer_data(
            volume,
            "cell.index",
            [cells, 1],
            ElementType::U32,
            bytemuck::cast_slice(&buffers.cell_offsets),
        )?;
        scene.set_buffer_data(volume, "cell.type", [cells, 1], ElementType::U8, &buffers.cell_types)?;
        scene.set_buffer_data(
            volume,
            "cell.data",
            [cells, 1],
            ElementType::F32,
            bytemuck::cast_slice(&buffers.cell_scalars),
        )?;

        scene.commit(volume)?;
        scene.commit(transform)?;
        scene.commit(world)?;

        tracing::debug!(index, name = %timestep.name, cells, "built timestep");

        Ok(SceneHandles {
            world,
            transfer_function,
            transform,
            volume,
        })
    }

    /// Show exactly timestep `shown` and request a resetting refresh
    pub fn finalize(&self, scene: &mut dyn SceneApi, catalog: &Catalog, shown: usize) -> Result<()> {
        for (index, timestep) in catalog.timesteps().iter().enumerate() {
            if let Some(handles) = timestep.scene {
                scene.set_visible(handles.toggle_node(self.mode), index == shown)?;
            }
        }
        scene.refresh_scene(true);
        Ok(())
    }

    /// Hide every world and volume this builder created, including those of
    /// a step that failed halfway.
    pub fn hide_built(&self, scene: &mut dyn SceneApi) -> Result<()> {
        for &node in &self.created {
            scene.set_visible(node, false)?;
        }
        if !self.created.is_empty() {
            scene.refresh_scene(false);
        }
        Ok(())
    }
}

/// Hide `previous`, show `current`, request a non-resetting refresh
pub fn swap_visible(
    scene: &mut dyn SceneApi,
    catalog: &Catalog,
    mode: WorldMode,
    previous: usize,
    current: usize,
) -> Result<()> {
    if let Some(handles) = catalog.scene_handles(previous) {
        scene.set_visible(handles.toggle_node(mode), false)?;
    }
    if let Some(handles) = catalog.scene_handles(current) {
        scene.set_visible(handles.toggle_node(mode), true)?;
    }
    scene.refresh_scene(false);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VolumeBuffers;
    use crate::protocol::RawPayload;
    use crate::scene::SceneArena;

    fn transferred_catalog(count: usize) -> Catalog {
        let names: Vec<String> = (0..count).map(|i| format!("t{}", i)).collect();
        let mut catalog = Catalog::from_names(names);
        for i in 0..count {
            let raw = RawPayload::hexahedral(
                &[[0.0; 3], [1.0; 3], [0.0, 1.0, 0.0], [1.0, 0.0, 1.0]],
                &[0, 1, 2, 3, 0, 1, 2, 3],
                &[i as f32],
            );
            catalog.install(i, VolumeBuffers::decode(raw).unwrap());
        }
        catalog
    }

    #[test]
    fn test_build_step_same_world() {
        let mut catalog = transferred_catalog(2);
        let mut scene = SceneArena::new();
        let mut builder = VolumeBuilder::new(WorldMode::SameWorld);

        let first = builder.build_step(&mut scene, &catalog, 0).unwrap();
        catalog.set_scene_handles(0, first);
        let second = builder.build_step(&mut scene, &catalog, 1).unwrap();
        catalog.set_scene_handles(1, second);

        assert_eq!(first.world, second.world);
        assert_eq!(scene.nodes_of_kind(NodeKind::World).len(), 1);
        assert_eq!(scene.nodes_of_kind(NodeKind::Volume).len(), 2);

        let volume = scene.node(first.volume).unwrap();
        assert_eq!(volume.buffers.len(), 5);
        assert_eq!(volume.buffers["index"].shape, [8, 1]);
        assert_eq!(volume.commits, 1);
        assert_eq!(
            scene.node(first.transfer_function).unwrap().scalar_range,
            catalog.scalar_range()
        );
    }

    #[test]
    fn test_build_step_separate_worlds() {
        let catalog = transferred_catalog(2);
        let mut scene = SceneArena::new();
        let mut builder = VolumeBuilder::new(WorldMode::SeparateWorlds);

        let first = builder.build_step(&mut scene, &catalog, 0).unwrap();
        let second = builder.build_step(&mut scene, &catalog, 1).unwrap();
        assert_ne!(first.world, second.world);
        assert_eq!(scene.node(second.world).unwrap().parent, Some(scene.root()));
    }

    #[test]
    fn test_build_step_requires_buffers() {
        let catalog = Catalog::from_names(["t0"]);
        let mut scene = SceneArena::new();
        let mut builder = VolumeBuilder::new(WorldMode::SameWorld);
        assert!(matches!(
            builder.build_step(&mut scene, &catalog, 0),
            Err(MikrError::Scene(_))
        ));
    }

    #[test]
    fn test_finalize_shows_first_only() {
        let mut catalog = transferred_catalog(3);
        let mut scene = SceneArena::new();
        let mut builder = VolumeBuilder::new(WorldMode::SameWorld);
        for i in 0..3 {
            let handles = builder.build_step(&mut scene, &catalog, i).unwrap();
            catalog.set_scene_handles(i, handles);
        }

        builder.finalize(&mut scene, &catalog, 0).unwrap();

        let visible = scene.visible_of_kind(NodeKind::Volume);
        assert_eq!(visible, vec![catalog.scene_handles(0).unwrap().volume]);
        assert_eq!(scene.refreshes(), &[true]);
    }

    #[test]
    fn test_hide_built_covers_every_mode() {
        let catalog = transferred_catalog(2);
        for mode in [WorldMode::SameWorld, WorldMode::SeparateWorlds] {
            let mut scene = SceneArena::new();
            let mut builder = VolumeBuilder::new(mode);
            builder.build_step(&mut scene, &catalog, 0).unwrap();
            builder.build_step(&mut scene, &catalog, 1).unwrap();

            builder.hide_built(&mut scene).unwrap();

            assert!(scene.visible_of_kind(NodeKind::Volume).is_empty());
            assert!(scene.visible_of_kind(NodeKind::World).is_empty());
            assert_eq!(scene.refreshes(), &[false]);
        }
    }

    #[test]
    fn test_hide_built_without_nodes_is_quiet() {
        let mut scene = SceneArena::new();
        VolumeBuilder::new(WorldMode::SameWorld)
            .hide_built(&mut scene)
            .unwrap();
        assert!(scene.refreshes().is_empty());
    }
}
