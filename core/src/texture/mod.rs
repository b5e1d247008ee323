//! CPU-side texture types.
//!
//! Provides [`CpuTexture`] for holding raw pixel data and the
//! [`TextureFormat`] enum.

mod types;

pub use types::{CpuTexture, TextureFormat};
