//! glTF 2.0 loader.
//!
//! Loads `.glb` files (and `.gltf` files with embedded data URIs) into
//! [`Scene`]s: one [`CpuMesh`](crate::mesh::CpuMesh) per glTF primitive,
//! each carrying an `Arc<CpuMaterial>` shared by every primitive that uses
//! the same glTF material.
//!
//! Image payloads are not decoded. A material's base color texture is kept
//! as a [`TextureSource::Named`](crate::material::TextureSource::Named)
//! reference (image name, URI, or `image{index}`), which is all the
//! texture binder and the inspector need.
//!
//! # Example
//!
//! ```ignore
//! use mugprint_core::gltf::load_gltf;
//!
//! let data = std::fs::read("mug.glb")?;
//! let doc = load_gltf(&data)?;
//! let scene = doc.default_scene().expect("document has no scene");
//! println!("{} primitives", scene.meshes.len());
//! ```

mod error;
mod loader;

pub use error::GltfError;

use crate::scene::Scene;

/// A loaded glTF document.
#[derive(Debug)]
pub struct GltfDocument {
    /// All scenes in the document. Each scene owns a copy of the mesh list
    /// (geometry is `Arc`-shared between them).
    pub scenes: Vec<Scene>,
    /// Index of the default scene, if specified.
    pub default_scene: Option<usize>,
}

impl GltfDocument {
    /// The default scene, or the first scene when none is marked default.
    pub fn default_scene(&self) -> Option<&Scene> {
        self.default_scene
            .and_then(|i| self.scenes.get(i))
            .or_else(|| self.scenes.first())
    }

    /// Consume the document, keeping only the default scene.
    pub fn into_default_scene(mut self) -> Option<Scene> {
        let index = self
            .default_scene
            .filter(|&i| i < self.scenes.len())
            .unwrap_or(0);
        if index < self.scenes.len() {
            Some(self.scenes.swap_remove(index))
        } else {
            None
        }
    }
}

/// Load a glTF document from binary data.
///
/// Supports both binary glTF (`.glb`) and JSON glTF (`.gltf` with embedded
/// data URIs). External buffer files are not supported.
pub fn load_gltf(data: &[u8]) -> Result<GltfDocument, GltfError> {
    let gltf = gltf_dep::Gltf::from_slice(data)?;
    let buffers = loader::resolve_buffers(&gltf.document, gltf.blob.as_deref())?;

    let mut ctx = loader::LoadContext::new(&gltf.document, &buffers);
    ctx.load_materials();
    ctx.load_meshes()?;
    let scenes = ctx.load_scenes();
    let default_scene = gltf.document.default_scene().map(|s| s.index());

    log::debug!(
        "Loaded glTF: {} scene(s), {} material(s)",
        scenes.len(),
        gltf.document.materials().len()
    );

    Ok(GltfDocument {
        scenes,
        default_scene,
    })
}
