//! Per-timestep payload frame.
//!
//! Layout after the request: `vertex_count`, `cell_count`, then five
//! `(byte_len, bytes)` blocks in this order: vertex positions, connectivity,
//! cell offsets, cell types, cell scalars. The declared byte length of each
//! block is what gets read; the element counts only size the typed buffers.

use super::codec::{FrameReader, FrameWriter};
use crate::error::Result;
use std::io::{Read, Write};

/// Names of the five payload blocks, in wire order
pub const BLOCK_NAMES: [&str; 5] = [
    "vertex.position",
    "index",
    "cell.index",
    "cell.type",
    "cell.data",
];

/// Undecoded payload of a single timestep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    pub vertex_count: usize,
    pub cell_count: usize,
    pub vertex_positions: Vec<u8>,
    pub connectivity: Vec<u8>,
    pub cell_offsets: Vec<u8>,
    pub cell_types: Vec<u8>,
    pub cell_scalars: Vec<u8>,
}

impl RawPayload {
    /// Decode a payload response
    pub fn read_from<R: Read>(reader: &mut FrameReader<R>) -> Result<Self> {
        let vertex_count = reader.read_len()?;
        let cell_count = reader.read_len()?;
        tracing::debug!(vertex_count, cell_count, "payload header");

        let vertex_positions = reader.read_block()?;
        let connectivity = reader.read_block()?;
        let cell_offsets = reader.read_block()?;
        let cell_types = reader.read_block()?;
        let cell_scalars = reader.read_block()?;

        Ok(Self {
            vertex_count,
            cell_count,
            vertex_positions,
            connectivity,
            cell_offsets,
            cell_types,
            cell_scalars,
        })
    }

    /// Encode the payload the way a producer sends it
    pub fn write_to<W: Write>(&self, writer: &mut FrameWriter<W>) -> Result<()> {
        writer.write_count(self.vertex_count as i64)?;
        writer.write_count(self.cell_count as i64)?;
        for block in self.blocks() {
            writer.write_block(block)?;
        }
        Ok(())
    }

    /// Build a payload from typed hexahedral buffers.
    ///
    /// Cell offsets are `8 * i` and every cell is tagged as a hexahedron.
    pub fn hexahedral(vertices: &[[f32; 3]], connectivity: &[u32], scalars: &[f32]) -> Self {
        let cell_count = scalars.len();
        let offsets: Vec<u32> = (0..cell_count as u32).map(|i| i * 8).collect();
        let types = vec![crate::catalog::HEXAHEDRON_CELL_TYPE; cell_count];

        Self {
            vertex_count: vertices.len(),
            cell_count,
            vertex_positions: bytemuck::cast_slice(vertices).to_vec(),
            connectivity: bytemuck::cast_slice(connectivity).to_vec(),
            cell_offsets: bytemuck::cast_slice(&offsets).to_vec(),
            cell_types: types,
            cell_scalars: bytemuck::cast_slice(scalars).to_vec(),
        }
    }

    /// The five blocks in wire order
    pub fn blocks(&self) -> [&[u8]; 5] {
        [
            &self.vertex_positions,
            &self.connectivity,
            &self.cell_offsets,
            &self.cell_types,
            &self.cell_scalars,
        ]
    }

    /// Total bytes carried by the blocks
    pub fn byte_len(&self) -> usize {
        self.blocks().iter().map(|b| b.len()).sum()
    }
}
