//! A single ingested timestep and its derived statistics

use crate::error::{MikrError, Result};
use crate::protocol::RawPayload;
use crate::scene::SceneHandles;

/// Margin added on each side of derived ranges
pub const RANGE_MARGIN: f32 = 1.0;

/// Nodes per cell; every ingested cell is a hexahedron
pub const NODES_PER_CELL: usize = 8;

/// Cell type tag of an 8-node hexahedron
pub const HEXAHEDRON_CELL_TYPE: u8 = 12;

/// `[min, max]` interval of cell scalars, widened by [`RANGE_MARGIN`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarRange {
    pub min: f32,
    pub max: f32,
}

impl ScalarRange {
    /// Range of `values` widened by the margin; `None` when nothing is finite
    pub fn from_values(values: &[f32]) -> Option<Self> {
        let (min, max) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        (min <= max).then(|| Self {
            min: min - RANGE_MARGIN,
            max: max + RANGE_MARGIN,
        })
    }

    /// Smallest range covering both
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn as_array(&self) -> [f32; 2] {
        [self.min, self.max]
    }
}

/// Per-axis `[min, max]` of vertex positions, widened by [`RANGE_MARGIN`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds3 {
    pub fn from_points(points: &[[f32; 3]]) -> Option<Self> {
        let mut iter = points.iter().filter(|p| p.iter().all(|c| c.is_finite()));
        let first = *iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }

        Some(Self {
            min: min.map(|c| c - RANGE_MARGIN),
            max: max.map(|c| c + RANGE_MARGIN),
        })
    }

    pub fn union(self, other: Self) -> Self {
        let mut out = self;
        for axis in 0..3 {
            out.min[axis] = out.min[axis].min(other.min[axis]);
            out.max[axis] = out.max[axis].max(other.max[axis]);
        }
        out
    }
}

/// Typed mesh and scalar buffers of one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBuffers {
    pub vertex_positions: Vec<[f32; 3]>,
    pub connectivity: Vec<u32>,
    pub cell_offsets: Vec<u32>,
    pub cell_types: Vec<u8>,
    pub cell_scalars: Vec<f32>,
    pub scalar_range: Option<ScalarRange>,
    pub spatial_bounds: Option<Bounds3>,
}

impl VolumeBuffers {
    /// Validate and decode a raw payload.
    ///
    /// Each block's byte length must match the header counts exactly.
    pub fn decode(raw: RawPayload) -> Result<Self> {
        let cells = raw.cell_count;
        check_block("vertex.position", raw.vertex_positions.len(), raw.vertex_count, 12)?;
        check_block(
            "index",
            raw.connectivity.len(),
            cells.checked_mul(NODES_PER_CELL).ok_or_else(|| overflow(cells))?,
            4,
        )?;
        check_block("cell.index", raw.cell_offsets.len(), cells, 4)?;
        check_block("cell.type", raw.cell_types.len(), cells, 1)?;
        check_block("cell.data", raw.cell_scalars.len(), cells, 4)?;

        let vertex_positions: Vec<[f32; 3]> = bytemuck::pod_collect_to_vec(&raw.vertex_positions);
        let cell_scalars: Vec<f32> = bytemuck::pod_collect_to_vec(&raw.cell_scalars);
        let scalar_range = ScalarRange::from_values(&cell_scalars);
        let spatial_bounds = Bounds3::from_points(&vertex_positions);

        Ok(Self {
            vertex_positions,
            connectivity: bytemuck::pod_collect_to_vec(&raw.connectivity),
            cell_offsets: bytemuck::pod_collect_to_vec(&raw.cell_offsets),
            cell_types: raw.cell_types,
            cell_scalars,
            scalar_range,
            spatial_bounds,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_positions.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cell_scalars.len()
    }
}

fn overflow(cells: usize) -> MikrError {
    MikrError::Protocol(format!("cell count {} overflows", cells))
}

fn check_block(name: &str, actual: usize, elements: usize, width: usize) -> Result<()> {
    let expected = elements
        .checked_mul(width)
        .ok_or_else(|| MikrError::Protocol(format!("{}: {} elements overflow", name, elements)))?;
    if actual != expected {
        return Err(MikrError::Protocol(format!(
            "{}: declared {} bytes, expected {} ({} x {})",
            name, actual, expected, elements, width
        )));
    }
    Ok(())
}

/// One simulation snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Timestep {
    /// Producer-supplied label
    pub name: String,
    /// Filled by the transfer phase
    pub buffers: Option<VolumeBuffers>,
    /// Filled by the create phase, on the mutation thread only
    pub scene: Option<SceneHandles>,
}

impl Timestep {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: None,
            scene: None,
        }
    }

    pub fn is_transferred(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn scalar_range(&self) -> Option<ScalarRange> {
        self.buffers.as_ref().and_then(|b| b.scalar_range)
    }
}
