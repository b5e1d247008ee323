//! Loader failures.

use thiserror::Error;

/// Why a mug model could not be turned into a [`Scene`](crate::scene::Scene).
#[derive(Debug, Error)]
pub enum GltfError {
    /// The bytes are neither a glTF JSON document nor a GLB container.
    #[error("not a readable glTF/GLB model: {0}")]
    Parse(#[from] gltf_dep::Error),

    /// Triangle fans and line loops have no counterpart in [`PrimitiveTopology`](crate::mesh::PrimitiveTopology).
    #[error("primitive mode {0} cannot be represented")]
    UnsupportedTopology(String),

    #[error("mesh {mesh} primitive {primitive}: no POSITION accessor")]
    MissingPositions { mesh: usize, primitive: usize },

    /// Attribute or index data disagrees with the vertex count.
    #[error("inconsistent accessor, {0}")]
    InvalidAccessor(String),

    /// Buffer bytes that only a file system or network fetch could provide.
    #[error("unresolved buffer, {0}")]
    MissingBuffer(String),
}
