//! CPU-side sampler types.
//!
//! Provides [`CpuSampler`] for describing texture sampling parameters,
//! along with the [`FilterMode`] and [`AddressMode`] enums.

mod types;

pub use types::{AddressMode, CpuSampler, FilterMode};
