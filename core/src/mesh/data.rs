//! CPU-side mesh data structures.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`CpuMesh`] - CPU-side mesh holding raw vertex and index data

use std::sync::Arc;

use crate::material::CpuMaterial;

use super::layout::{VertexAttributeSemantic, VertexLayout};

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// A CPU-side mesh primitive holding raw vertex and index data.
///
/// Vertex and index bytes are immutable once built and shared via `Arc`,
/// so cloning a mesh (e.g. to give it a different material) never copies
/// geometry. The material is an `Arc` too: replacing it on a clone leaves
/// every other holder of the original untouched.
#[derive(Clone)]
pub struct CpuMesh {
    layout: Arc<VertexLayout>,
    topology: PrimitiveTopology,
    vertex_buffers: Vec<Arc<[u8]>>,
    vertex_count: u32,
    index_data: Option<Arc<[u8]>>,
    index_format: Option<IndexFormat>,
    index_count: u32,
    material: Option<Arc<CpuMaterial>>,
    label: Option<String>,
}

impl CpuMesh {
    /// Create a new empty CpuMesh with the given layout.
    ///
    /// Vertex buffers are initialized as empty slices matching
    /// the layout's buffer count.
    pub fn new(layout: Arc<VertexLayout>) -> Self {
        let buffer_count = layout.buffer_count();
        Self {
            layout,
            topology: PrimitiveTopology::TriangleList,
            vertex_buffers: vec![Arc::from(Vec::new()); buffer_count],
            vertex_count: 0,
            index_data: None,
            index_format: None,
            index_count: 0,
            material: None,
            label: None,
        }
    }

    /// Set raw vertex data for a specific buffer slot.
    ///
    /// Vertex count is inferred from the data length and stride.
    pub fn with_vertex_data(mut self, buffer_index: usize, data: Vec<u8>) -> Self {
        let stride = self.layout.buffer_stride(buffer_index) as usize;
        if stride > 0 {
            self.vertex_count = (data.len() / stride) as u32;
        }
        if buffer_index < self.vertex_buffers.len() {
            self.vertex_buffers[buffer_index] = Arc::from(data);
        }
        self
    }

    /// Set index data as u16 indices.
    pub fn with_indices_u16(mut self, indices: &[u16]) -> Self {
        self.index_data = Some(Arc::from(bytemuck::cast_slice::<u16, u8>(indices)));
        self.index_format = Some(IndexFormat::Uint16);
        self.index_count = indices.len() as u32;
        self
    }

    /// Set index data as u32 indices.
    pub fn with_indices_u32(mut self, indices: &[u32]) -> Self {
        self.index_data = Some(Arc::from(bytemuck::cast_slice::<u32, u8>(indices)));
        self.index_format = Some(IndexFormat::Uint32);
        self.index_count = indices.len() as u32;
        self
    }

    /// Set the primitive topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the material.
    pub fn with_material(mut self, material: Arc<CpuMaterial>) -> Self {
        self.material = Some(material);
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    /// Get the primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Get raw vertex data for a specific buffer slot.
    pub fn vertex_buffer_data(&self, index: usize) -> Option<&[u8]> {
        self.vertex_buffers.get(index).map(|v| &v[..])
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Get the raw index data.
    pub fn index_data(&self) -> Option<&[u8]> {
        self.index_data.as_deref()
    }

    /// Get the index format.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Check if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.index_data.is_some()
    }

    /// Get the material, if set.
    pub fn material(&self) -> Option<&Arc<CpuMaterial>> {
        self.material.as_ref()
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether the layout carries a first UV set.
    pub fn has_uvs(&self) -> bool {
        self.layout.has_semantic(VertexAttributeSemantic::TexCoord0)
    }

    /// Read the first UV set, one `[u, v]` per vertex.
    ///
    /// Returns `None` if the layout has no `TexCoord0` attribute or the
    /// buffer is too short.
    pub fn read_uvs(&self) -> Option<Vec<[f32; 2]>> {
        let attr = self
            .layout
            .get_attribute(VertexAttributeSemantic::TexCoord0)?;
        let data = self.vertex_buffer_data(attr.buffer_index as usize)?;
        let stride = self.layout.buffer_stride(attr.buffer_index as usize) as usize;
        let offset = attr.offset as usize;

        (0..self.vertex_count as usize)
            .map(|i| {
                let start = i * stride + offset;
                let bytes = data.get(start..start + 8)?;
                Some(bytemuck::pod_read_unaligned::<[f32; 2]>(bytes))
            })
            .collect()
    }

    /// Indices widened to `u32`, or `0..vertex_count` for non-indexed meshes.
    pub fn read_indices(&self) -> Vec<u32> {
        match (self.index_data.as_deref(), self.index_format) {
            (Some(data), Some(IndexFormat::Uint16)) => data
                .chunks_exact(2)
                .map(|b| u16::from_ne_bytes([b[0], b[1]]) as u32)
                .collect(),
            (Some(data), Some(IndexFormat::Uint32)) => data
                .chunks_exact(4)
                .map(|b| u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
            _ => (0..self.vertex_count).collect(),
        }
    }

    /// Whether both meshes point at the same vertex storage.
    pub fn shares_geometry_with(&self, other: &CpuMesh) -> bool {
        self.vertex_buffers.len() == other.vertex_buffers.len()
            && self
                .vertex_buffers
                .iter()
                .zip(&other.vertex_buffers)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl std::fmt::Debug for CpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuMesh")
            .field("label", &self.label)
            .field("topology", &self.topology)
            .field("vertex_count", &self.vertex_count)
            .field("buffer_count", &self.vertex_buffers.len())
            .field("index_count", &self.index_count)
            .field(
                "material",
                &self.material.as_ref().map(|m| m.name.as_deref()),
            )
            .field("layout", &self.layout.label)
            .finish()
    }
}
