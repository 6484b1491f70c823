//! Test data builders for producer scripts and payloads

use mikr_rs::protocol::{write_catalog, FrameWriter, RawPayload};

/// Builder for a single-hexahedron-per-cell payload
pub struct PayloadBuilder {
    vertices: Vec<[f32; 3]>,
    connectivity: Vec<u32>,
    scalars: Vec<f32>,
}

impl PayloadBuilder {
    /// Unit cube with one cell
    pub fn cube() -> Self {
        Self {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
            ],
            connectivity: (0..8).collect(),
            scalars: vec![0.0],
        }
    }

    /// `cells` cells sharing the first four vertices
    pub fn cells(cells: usize) -> Self {
        Self {
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            connectivity: (0..cells * 8).map(|i| (i % 4) as u32).collect(),
            scalars: vec![0.0; cells],
        }
    }

    pub fn scalars(mut self, scalars: &[f32]) -> Self {
        self.scalars = scalars.to_vec();
        self
    }

    pub fn scalar(self, value: f32) -> Self {
        let cells = self.scalars.len();
        self.scalars(&vec![value; cells])
    }

    pub fn build(self) -> RawPayload {
        RawPayload::hexahedral(&self.vertices, &self.connectivity, &self.scalars)
    }
}

/// Builder for the bytes a producer writes to its stdout
#[derive(Default)]
pub struct ScriptBuilder {
    names: Vec<String>,
    payloads: Vec<RawPayload>,
    tail: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timestep(mut self, name: &str, payload: RawPayload) -> Self {
        self.names.push(name.to_string());
        self.payloads.push(payload);
        self
    }

    /// Catalog entry whose payload is never sent
    pub fn missing_timestep(mut self, name: &str) -> Self {
        self.names.push(name.to_string());
        self
    }

    /// Raw bytes appended after everything else
    pub fn tail(mut self, bytes: &[u8]) -> Self {
        self.tail.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        write_catalog(&mut writer, &self.names).expect("catalog encodes");
        for payload in &self.payloads {
            payload.write_to(&mut writer).expect("payload encodes");
        }
        let mut bytes = writer.into_inner();
        bytes.extend_from_slice(&self.tail);
        bytes
    }
}
