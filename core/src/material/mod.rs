//! CPU-side material definitions.
//!
//! - [`CpuMaterial`]: Named material holding semantic-tagged properties
//! - [`MaterialSemantic`] / [`MaterialValue`]: Property tag and typed value
//! - [`TextureRef`]: Texture + sampler + UV set + UV transform reference
//! - [`AlphaMode`]: Alpha rendering mode (opaque, mask, blend)

mod types;

pub use types::{
    AlphaMode, CpuMaterial, MaterialProperty, MaterialSemantic, MaterialValue, TextureRef,
    TextureSource, TextureTransform,
};
