//! Internal glTF loading logic.
//!
//! The [`LoadContext`] holds all state needed during loading: resolved
//! buffer data, the shared materials, the flat primitive list, and the
//! layout cache.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose;

use crate::material::{
    AlphaMode, CpuMaterial, MaterialSemantic, MaterialValue, TextureRef, TextureSource,
    TextureTransform,
};
use crate::mesh::{CpuMesh, PrimitiveTopology, VertexLayout};
use crate::sampler::{AddressMode, CpuSampler, FilterMode};
use crate::scene::{NodeTransform, Scene, SceneNode};

use super::error::GltfError;

/// Prebuilt layouts, created on first use so every primitive of the same
/// shape points at one `Arc`.
#[derive(Default)]
struct LayoutCache {
    position_only: Option<Arc<VertexLayout>>,
    position_normal: Option<Arc<VertexLayout>>,
    position_uv: Option<Arc<VertexLayout>>,
    position_normal_uv: Option<Arc<VertexLayout>>,
}

impl LayoutCache {
    fn get(&mut self, normals: bool, uvs: bool) -> Arc<VertexLayout> {
        let (slot, make): (_, fn() -> Arc<VertexLayout>) = match (normals, uvs) {
            (false, false) => (&mut self.position_only, VertexLayout::position_only),
            (true, false) => (&mut self.position_normal, VertexLayout::position_normal),
            (false, true) => (&mut self.position_uv, VertexLayout::position_uv),
            (true, true) => (&mut self.position_normal_uv, VertexLayout::position_normal_uv),
        };
        Arc::clone(slot.get_or_insert_with(make))
    }
}

/// Internal loading context that holds resolved data during loading.
pub(crate) struct LoadContext<'a> {
    document: &'a gltf_dep::Document,
    buffers: &'a [Vec<u8>],
    layouts: LayoutCache,
    /// One shared material per glTF material index.
    materials: Vec<Arc<CpuMaterial>>,
    /// Flat primitive list; index = position in `Scene::meshes`.
    meshes: Vec<CpuMesh>,
    /// glTF mesh index -> flat primitive indices.
    mesh_index_map: Vec<Vec<usize>>,
}

impl<'a> LoadContext<'a> {
    pub fn new(document: &'a gltf_dep::Document, buffers: &'a [Vec<u8>]) -> Self {
        Self {
            document,
            buffers,
            layouts: LayoutCache::default(),
            materials: Vec::new(),
            meshes: Vec::new(),
            mesh_index_map: Vec::new(),
        }
    }

    /// Convert every glTF material into a property-based [`CpuMaterial`].
    pub fn load_materials(&mut self) {
        self.materials = self
            .document
            .materials()
            .map(|mat| Arc::new(convert_material(&mat)))
            .collect();
    }

    /// Load every primitive of every mesh. Must run after `load_materials`.
    pub fn load_meshes(&mut self) -> Result<(), GltfError> {
        for (mesh_idx, mesh) in self.document.meshes().enumerate() {
            let primitive_count = mesh.primitives().len();
            let mut flat_indices = Vec::with_capacity(primitive_count);

            for (prim_idx, primitive) in mesh.primitives().enumerate() {
                let label = mesh.name().map(|name| {
                    if primitive_count > 1 {
                        format!("{name}_prim{prim_idx}")
                    } else {
                        name.to_string()
                    }
                });

                let mut cpu_mesh = self.load_primitive(&primitive, mesh_idx, prim_idx)?;
                if let Some(label) = label {
                    cpu_mesh = cpu_mesh.with_label(label);
                }
                if let Some(material) = primitive
                    .material()
                    .index()
                    .and_then(|i| self.materials.get(i))
                {
                    cpu_mesh = cpu_mesh.with_material(Arc::clone(material));
                }

                flat_indices.push(self.meshes.len());
                self.meshes.push(cpu_mesh);
            }

            self.mesh_index_map.push(flat_indices);
        }
        Ok(())
    }

    fn load_primitive(
        &mut self,
        primitive: &gltf_dep::Primitive<'_>,
        mesh_idx: usize,
        prim_idx: usize,
    ) -> Result<CpuMesh, GltfError> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or(GltfError::MissingPositions {
                mesh: mesh_idx,
                primitive: prim_idx,
            })?
            .collect();
        let vertex_count = positions.len();

        let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
        let normals = match normals {
            Some(n) if n.len() != vertex_count => {
                log::warn!(
                    "mesh {mesh_idx} primitive {prim_idx}: {} normals for {vertex_count} vertices, ignoring normals",
                    n.len()
                );
                None
            }
            other => other,
        };

        let uvs: Option<Vec<[f32; 2]>> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().collect());
        if let Some(uvs) = &uvs
            && uvs.len() != vertex_count
        {
            return Err(GltfError::InvalidAccessor(format!(
                "mesh {mesh_idx} primitive {prim_idx}: {} UVs for {vertex_count} vertices",
                uvs.len()
            )));
        }

        let topology = map_topology(primitive.mode())?;
        let layout = self.layouts.get(normals.is_some(), uvs.is_some());
        let floats_per_vertex = layout.buffer_stride(0) as usize / 4;

        let mut interleaved = Vec::with_capacity(vertex_count * floats_per_vertex);
        for (i, position) in positions.iter().enumerate() {
            interleaved.extend_from_slice(position);
            if let Some(normals) = &normals {
                interleaved.extend_from_slice(&normals[i]);
            }
            if let Some(uvs) = &uvs {
                interleaved.extend_from_slice(&uvs[i]);
            }
        }

        let mut mesh = CpuMesh::new(layout)
            .with_topology(topology)
            .with_vertex_data(0, bytemuck::cast_slice(&interleaved).to_vec());

        if let Some(indices) = reader.read_indices() {
            let indices: Vec<u32> = indices.into_u32().collect();
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(GltfError::InvalidAccessor(format!(
                    "mesh {mesh_idx} primitive {prim_idx}: index {bad} out of range ({vertex_count} vertices)"
                )));
            }
            mesh = if vertex_count <= u16::MAX as usize + 1 {
                let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
                mesh.with_indices_u16(&narrow)
            } else {
                mesh.with_indices_u32(&indices)
            };
        }

        Ok(mesh)
    }

    /// Build one [`Scene`] per glTF scene.
    ///
    /// A document without scenes yields a single scene with one root node
    /// per glTF mesh, so its geometry is still reachable.
    pub fn load_scenes(&self) -> Vec<Scene> {
        let scenes: Vec<Scene> = self
            .document
            .scenes()
            .map(|scene| {
                let mut out = Scene::new()
                    .with_nodes(
                        scene
                            .nodes()
                            .map(|n| load_node(&n, &self.mesh_index_map))
                            .collect(),
                    )
                    .with_meshes(self.meshes.clone());
                out.name = scene.name().map(String::from);
                out
            })
            .collect();

        if !scenes.is_empty() || self.meshes.is_empty() {
            return scenes;
        }

        let nodes = self
            .document
            .meshes()
            .map(|mesh| {
                let mut node = SceneNode::new().with_meshes(self.mesh_index_map[mesh.index()].clone());
                node.name = mesh.name().map(String::from);
                node
            })
            .collect();
        vec![Scene::new().with_nodes(nodes).with_meshes(self.meshes.clone())]
    }
}

// -- Helper functions --

/// Recursively load a node and its children.
fn load_node(node: &gltf_dep::Node<'_>, mesh_index_map: &[Vec<usize>]) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();

    let meshes = node
        .mesh()
        .and_then(|m| mesh_index_map.get(m.index()).cloned())
        .unwrap_or_default();

    let mut out = SceneNode::new()
        .with_transform(
            NodeTransform::IDENTITY
                .with_translation(translation)
                .with_rotation(rotation)
                .with_scale(scale),
        )
        .with_meshes(meshes)
        .with_children(
            node.children()
                .map(|c| load_node(&c, mesh_index_map))
                .collect(),
        );
    out.name = node.name().map(String::from);
    out
}

fn convert_material(mat: &gltf_dep::Material<'_>) -> CpuMaterial {
    let pbr = mat.pbr_metallic_roughness();
    let alpha_mode = match mat.alpha_mode() {
        gltf_dep::material::AlphaMode::Opaque => AlphaMode::Opaque,
        gltf_dep::material::AlphaMode::Mask => AlphaMode::Mask,
        gltf_dep::material::AlphaMode::Blend => AlphaMode::Blend,
    };

    let mut out = CpuMaterial::new()
        .with_alpha_mode(alpha_mode)
        .with_double_sided(mat.double_sided());
    out.name = mat.name().map(String::from);

    out.set(
        MaterialSemantic::BaseColorFactor,
        MaterialValue::Vec4(pbr.base_color_factor()),
    );
    out.set(
        MaterialSemantic::MetallicFactor,
        MaterialValue::Float(pbr.metallic_factor()),
    );
    out.set(
        MaterialSemantic::RoughnessFactor,
        MaterialValue::Float(pbr.roughness_factor()),
    );
    out.set(
        MaterialSemantic::EmissiveFactor,
        MaterialValue::Vec3(mat.emissive_factor()),
    );
    if let Some(cutoff) = mat.alpha_cutoff() {
        out.set(MaterialSemantic::AlphaCutoff, MaterialValue::Float(cutoff));
    }

    let textures = [
        (MaterialSemantic::BaseColorTexture, pbr.base_color_texture()),
        (
            MaterialSemantic::MetallicRoughnessTexture,
            pbr.metallic_roughness_texture(),
        ),
        (MaterialSemantic::EmissiveTexture, mat.emissive_texture()),
    ];
    for (semantic, info) in textures {
        if let Some(info) = info {
            out.set(
                semantic,
                MaterialValue::Texture(named_texture_ref(&info.texture(), info.tex_coord())),
            );
        }
    }
    if let Some(normal) = mat.normal_texture() {
        out.set(
            MaterialSemantic::NormalTexture,
            MaterialValue::Texture(named_texture_ref(&normal.texture(), normal.tex_coord())),
        );
    }
    if let Some(occlusion) = mat.occlusion_texture() {
        out.set(
            MaterialSemantic::OcclusionTexture,
            MaterialValue::Texture(named_texture_ref(
                &occlusion.texture(),
                occlusion.tex_coord(),
            )),
        );
    }

    out
}

/// Reference a glTF texture by name without decoding its image.
fn named_texture_ref(texture: &gltf_dep::Texture<'_>, tex_coord: u32) -> TextureRef {
    let image = texture.source();
    let name = image
        .name()
        .map(String::from)
        .or_else(|| match image.source() {
            gltf_dep::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                Some(uri.to_string())
            }
            _ => None,
        })
        .unwrap_or_else(|| format!("image{}", image.index()));

    TextureRef {
        texture: TextureSource::Named(name),
        sampler: Some(Arc::new(convert_sampler(&texture.sampler()))),
        tex_coord,
        transform: TextureTransform::IDENTITY,
    }
}

fn convert_sampler(sampler: &gltf_dep::texture::Sampler<'_>) -> CpuSampler {
    use gltf_dep::texture::{MagFilter, MinFilter};

    let mag_filter = match sampler.mag_filter() {
        Some(MagFilter::Nearest) => FilterMode::Nearest,
        _ => FilterMode::Linear,
    };
    let (min_filter, mipmap_filter) = match sampler.min_filter() {
        Some(MinFilter::Nearest) => (FilterMode::Nearest, None),
        Some(MinFilter::Linear) => (FilterMode::Linear, None),
        Some(MinFilter::NearestMipmapNearest) => (FilterMode::Nearest, Some(FilterMode::Nearest)),
        Some(MinFilter::NearestMipmapLinear) => (FilterMode::Nearest, Some(FilterMode::Linear)),
        Some(MinFilter::LinearMipmapNearest) => (FilterMode::Linear, Some(FilterMode::Nearest)),
        Some(MinFilter::LinearMipmapLinear) | None => {
            (FilterMode::Linear, Some(FilterMode::Linear))
        }
    };

    let mut out = CpuSampler::linear().with_address_modes(
        map_wrapping(sampler.wrap_s()),
        map_wrapping(sampler.wrap_t()),
    );
    out.mag_filter = mag_filter;
    out.min_filter = min_filter;
    out.mipmap_filter = mipmap_filter;
    out.name = sampler.name().map(String::from);
    out
}

fn map_wrapping(wrap: gltf_dep::texture::WrappingMode) -> AddressMode {
    match wrap {
        gltf_dep::texture::WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        gltf_dep::texture::WrappingMode::MirroredRepeat => AddressMode::MirrorRepeat,
        gltf_dep::texture::WrappingMode::Repeat => AddressMode::Repeat,
    }
}

fn map_topology(mode: gltf_dep::mesh::Mode) -> Result<PrimitiveTopology, GltfError> {
    use gltf_dep::mesh::Mode;

    match mode {
        Mode::Points => Ok(PrimitiveTopology::PointList),
        Mode::Lines => Ok(PrimitiveTopology::LineList),
        Mode::LineStrip => Ok(PrimitiveTopology::LineStrip),
        Mode::Triangles => Ok(PrimitiveTopology::TriangleList),
        Mode::TriangleStrip => Ok(PrimitiveTopology::TriangleStrip),
        Mode::LineLoop | Mode::TriangleFan => {
            Err(GltfError::UnsupportedTopology(format!("{mode:?}")))
        }
    }
}

/// Parse a data URI (e.g., `data:application/octet-stream;base64,...`).
fn parse_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (_, encoded) = rest.split_once(";base64,")?;
    general_purpose::STANDARD.decode(encoded.trim()).ok()
}

/// Resolve all buffer data from the glTF document.
///
/// For binary glTF (.glb), the `Bin` buffer is the embedded blob.
pub(crate) fn resolve_buffers(
    document: &gltf_dep::Document,
    blob: Option<&[u8]>,
) -> Result<Vec<Vec<u8>>, GltfError> {
    document
        .buffers()
        .map(|buffer| match buffer.source() {
            gltf_dep::buffer::Source::Bin => blob.map(<[u8]>::to_vec).ok_or_else(|| {
                GltfError::MissingBuffer("binary buffer referenced but no blob present".into())
            }),
            gltf_dep::buffer::Source::Uri(uri) => parse_data_uri(uri).ok_or_else(|| {
                GltfError::MissingBuffer(format!("external buffer URIs not supported: {uri}"))
            }),
        })
        .collect()
}
