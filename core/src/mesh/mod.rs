//! CPU-side mesh types and generators.
//!
//! - [`VertexLayout`] - Describes vertex attributes across buffers
//! - [`CpuMesh`] - One primitive: vertex bytes, index bytes, layout, material
//! - Generators for common shapes (cylinder, quad)

mod data;
pub mod generators;
mod layout;

pub use data::{CpuMesh, IndexFormat, PrimitiveTopology};
pub use layout::{
    VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexBufferLayout,
    VertexLayout,
};
