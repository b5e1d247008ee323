//! # Mugprint Core
//!
//! Format-agnostic CPU data model shared by the Mugprint crates: scene
//! graphs, meshes, property-based materials, samplers, textures, the
//! background task handle used for asynchronous work, and the glTF loader.

pub mod compute;
#[cfg(feature = "gltf")]
pub mod gltf;
pub mod material;
pub mod mesh;
pub mod sampler;
pub mod scene;
pub mod texture;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the core library version.
pub fn init() {
    log::info!("Mugprint Core v{} initialized", VERSION);
}
