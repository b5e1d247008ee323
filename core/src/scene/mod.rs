//! Scene graph types for representing loaded scenes.
//!
//! These types are format-agnostic and can be produced by any loader
//! or built programmatically.
//!
//! - [`Scene`]: A scene with nodes and the meshes they draw
//! - [`SceneNode`]: A node in the scene tree
//! - [`NodeTransform`]: TRS transform using plain arrays

mod types;

pub use types::{NodeTransform, Scene, SceneNode};
