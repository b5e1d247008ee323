//! Binds a composited texture onto the printable material of a mug scene.
//!
//! The binder works on a clone of the scene. Vertex and index data stay
//! shared with the source; materials are `Arc`s that get replaced in the
//! clone, never edited in place.

use std::sync::Arc;

use mugprint_core::material::{CpuMaterial, MaterialSemantic, MaterialValue, TextureRef};
use mugprint_core::mesh::CpuMesh;
use mugprint_core::scene::{Scene, SceneNode};
use serde::{Deserialize, Serialize};

use crate::compositor::CompositedTexture;
use crate::config::BinderConfig;

/// A rule for picking which material slots of a scene receive the design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Material name contains one of [`BinderConfig::name_hints`].
    NameHint,
    /// Base color luminance at or above [`BinderConfig::luminance_threshold`].
    Luminance,
    /// The first candidate slot in pre-order traversal.
    FirstSlot,
}

/// One primitive of a node, seen as a material slot.
#[derive(Debug, Clone, Copy)]
struct MaterialSlot<'a> {
    /// Position in `SceneNode::meshes`.
    slot: usize,
    mesh_index: usize,
    mesh: &'a CpuMesh,
}

impl MaterialSlot<'_> {
    fn material(&self) -> Option<&Arc<CpuMaterial>> {
        self.mesh.material()
    }

    fn is_candidate(&self) -> bool {
        self.mesh.has_uvs() && self.material().is_some()
    }
}

fn material_slots<'a>(scene: &'a Scene, node: &SceneNode) -> Vec<MaterialSlot<'a>> {
    node.meshes
        .iter()
        .enumerate()
        .filter_map(|(slot, &mesh_index)| {
            let mesh = scene.meshes.get(mesh_index)?;
            Some(MaterialSlot {
                slot,
                mesh_index,
                mesh,
            })
        })
        .collect()
}

fn matches_strategy(
    strategy: SelectionStrategy,
    material: &CpuMaterial,
    config: &BinderConfig,
) -> bool {
    match strategy {
        SelectionStrategy::NameHint => {
            let Some(name) = material.name.as_deref() else {
                return false;
            };
            let name = name.to_lowercase();
            config
                .name_hints
                .iter()
                .filter(|hint| !hint.is_empty())
                .any(|hint| name.contains(&hint.to_lowercase()))
        }
        SelectionStrategy::Luminance => {
            material.base_color_luminance() >= config.luminance_threshold
        }
        SelectionStrategy::FirstSlot => true,
    }
}

/// Material slots of every node, in pre-order traversal.
fn scene_slots(scene: &Scene) -> Vec<Vec<MaterialSlot<'_>>> {
    let mut nodes = Vec::new();
    scene.visit_nodes(|node, _| nodes.push(material_slots(scene, node)));
    nodes
}

/// Slots to texture per node (indexed like [`scene_slots`]), each list
/// ascending.
///
/// Strategies run over the candidates of the whole scene: a later strategy
/// is only tried when no slot anywhere matched the earlier ones.
fn select_slots(nodes: &[Vec<MaterialSlot<'_>>], config: &BinderConfig) -> Vec<Vec<usize>> {
    let candidates: Vec<(usize, &MaterialSlot<'_>)> = nodes
        .iter()
        .enumerate()
        .flat_map(|(ordinal, slots)| slots.iter().map(move |s| (ordinal, s)))
        .filter(|(_, s)| s.is_candidate())
        .collect();

    let mut selection = vec![Vec::new(); nodes.len()];
    for &strategy in &config.strategies {
        let picked: Vec<(usize, usize)> = match strategy {
            SelectionStrategy::FirstSlot => candidates
                .first()
                .map(|(ordinal, s)| (*ordinal, s.slot))
                .into_iter()
                .collect(),
            _ => candidates
                .iter()
                .filter(|(_, s)| {
                    s.material()
                        .is_some_and(|m| matches_strategy(strategy, m, config))
                })
                .map(|(ordinal, s)| (*ordinal, s.slot))
                .collect(),
        };
        if !picked.is_empty() {
            log::debug!("{:?} selected {} slot(s)", strategy, picked.len());
            for (ordinal, slot) in picked {
                selection[ordinal].push(slot);
            }
            break;
        }
    }
    selection
}

/// Clone `material` with the design as base color texture on a white factor.
fn textured_material(material: &CpuMaterial, texture: &TextureRef) -> CpuMaterial {
    let mut material = material.clone();
    material.set(
        MaterialSemantic::BaseColorTexture,
        MaterialValue::Texture(texture.clone()),
    );
    material.set(
        MaterialSemantic::BaseColorFactor,
        MaterialValue::Vec4([1.0, 1.0, 1.0, 1.0]),
    );
    material.needs_update = true;
    material
}

fn node_label(node: &SceneNode) -> &str {
    node.name.as_deref().unwrap_or("<unnamed>")
}

/// Return a copy of `scene` with `texture` bound to its printable material
/// slots.
///
/// `None` for the scene yields an empty scene; `None` for the texture yields
/// an untouched clone. The source scene is never modified.
pub fn apply_texture(
    scene: Option<&Scene>,
    texture: Option<&CompositedTexture>,
    config: &BinderConfig,
) -> Scene {
    let Some(source) = scene else {
        return Scene::new();
    };
    let mut textured = source.clone();
    let Some(texture) = texture else {
        return textured;
    };

    let texture_ref = texture.texture_ref();
    let first_new = source.meshes.len();
    let mut new_meshes: Vec<CpuMesh> = Vec::new();

    let nodes = scene_slots(source);
    let selection = select_slots(&nodes, config);
    let mut ordinal = 0;

    textured.visit_nodes_mut(|node| {
        let slots = &nodes[ordinal];
        let selected = &selection[ordinal];
        ordinal += 1;

        if node.meshes.is_empty() {
            return;
        }
        if slots.iter().all(|s| s.material().is_none()) {
            log::warn!(
                "Node '{}' has no material slots, leaving it untextured",
                node_label(node)
            );
            return;
        }
        if !slots.iter().any(|s| s.is_candidate()) {
            log::debug!("Node '{}' has no UVs, skipping", node_label(node));
            return;
        }

        for &slot in selected {
            let Some(source_slot) = slots.iter().find(|s| s.slot == slot) else {
                continue;
            };
            let Some(material) = source_slot.material() else {
                continue;
            };
            let material = Arc::new(textured_material(material, &texture_ref));
            log::debug!(
                "Texturing node '{}' slot {} (mesh {}, material {:?})",
                node_label(node),
                slot,
                source_slot.mesh_index,
                material.name
            );
            new_meshes.push(source_slot.mesh.clone().with_material(material));
            node.meshes[slot] = first_new + new_meshes.len() - 1;
        }
    });

    log::info!(
        "Bound texture {:?} to {} primitive(s)",
        texture.id,
        new_meshes.len()
    );
    textured.meshes.extend(new_meshes);
    textured
}

/// One row of the material inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSummary {
    pub node: Option<String>,
    /// Position in the node's mesh list.
    pub slot: usize,
    pub mesh_index: usize,
    pub material: Option<String>,
    pub base_color: [f32; 4],
    pub has_uvs: bool,
    /// Whether the material already carries a base color texture.
    pub textured: bool,
    /// Whether [`apply_texture`] would bind the design here.
    pub selected: bool,
}

/// List every material slot of every node, in traversal order.
pub fn describe_materials(scene: &Scene, config: &BinderConfig) -> Vec<MaterialSummary> {
    let nodes = scene_slots(scene);
    let selection = select_slots(&nodes, config);
    let mut rows = Vec::new();
    let mut ordinal = 0;
    scene.visit_nodes(|node, _| {
        let slots = &nodes[ordinal];
        let selected = &selection[ordinal];
        ordinal += 1;
        for s in slots {
            let material = s.material();
            rows.push(MaterialSummary {
                node: node.name.clone(),
                slot: s.slot,
                mesh_index: s.mesh_index,
                material: material.and_then(|m| m.name.clone()),
                base_color: material.map_or([1.0; 4], |m| m.base_color()),
                has_uvs: s.mesh.has_uvs(),
                textured: material
                    .is_some_and(|m| m.get_texture(&MaterialSemantic::BaseColorTexture).is_some()),
                selected: selected.contains(&s.slot),
            });
        }
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DesignSurface;
    use mugprint_core::material::{MaterialProperty, TextureSource};
    use mugprint_core::mesh::generators::{generate_cylinder, generate_cylinder_untextured};
    use rstest::rstest;

    fn material(name: &str, color: [f32; 4]) -> Arc<CpuMaterial> {
        Arc::new(
            CpuMaterial::new()
                .with_name(name)
                .with_property(MaterialProperty {
                    semantic: MaterialSemantic::BaseColorFactor,
                    value: MaterialValue::Vec4(color),
                })
                .with_property(MaterialProperty {
                    semantic: MaterialSemantic::MetallicFactor,
                    value: MaterialValue::Float(0.1),
                }),
        )
    }

    fn textured_cylinder(mat: Arc<CpuMaterial>) -> CpuMesh {
        generate_cylinder(1.0, 2.0, 8).with_material(mat)
    }

    fn design() -> CompositedTexture {
        let mut surface = DesignSurface::new(8, 4);
        surface.fill([255, 255, 255, 255]);
        CompositedTexture::new(surface.to_shared_texture("design"), 0.0, 0.0)
    }

    /// One node, one primitive per material.
    fn mug(materials: &[(&str, [f32; 4])]) -> Scene {
        let meshes: Vec<_> = materials
            .iter()
            .map(|(name, color)| textured_cylinder(material(name, *color)))
            .collect();
        let node = SceneNode::new()
            .with_name("Mug")
            .with_meshes((0..meshes.len()).collect());
        Scene::new().with_nodes(vec![node]).with_meshes(meshes)
    }

    fn node_materials(scene: &Scene, node: &str) -> Vec<Arc<CpuMaterial>> {
        let node = scene.find_node(node).unwrap();
        scene
            .node_meshes(node)
            .filter_map(|m| m.material().cloned())
            .collect()
    }

    fn is_textured(material: &CpuMaterial) -> bool {
        material
            .get_texture(&MaterialSemantic::BaseColorTexture)
            .is_some()
    }

    const GREY: [f32; 4] = [0.5, 0.5, 0.5, 1.0];
    const WHITE: [f32; 4] = [0.95, 0.95, 0.95, 1.0];

    #[test]
    fn no_scene_yields_empty_scene() {
        let out = apply_texture(None, Some(&design()), &BinderConfig::default());
        assert!(out.nodes.is_empty());
        assert!(out.meshes.is_empty());
    }

    #[test]
    fn no_texture_yields_untouched_clone() {
        let scene = mug(&[("Caneca-corpo", GREY)]);
        let out = apply_texture(Some(&scene), None, &BinderConfig::default());

        assert_eq!(out.meshes.len(), 1);
        assert!(Arc::ptr_eq(
            out.meshes[0].material().unwrap(),
            scene.meshes[0].material().unwrap()
        ));
        assert!(out.meshes[0].shares_geometry_with(&scene.meshes[0]));
    }

    #[test]
    fn glass_is_skipped_for_body() {
        let scene = mug(&[("Glass", WHITE), ("Caneca-corpo", GREY)]);
        let tex = design();
        let out = apply_texture(Some(&scene), Some(&tex), &BinderConfig::default());

        let mats = node_materials(&out, "Mug");
        assert_eq!(mats[0].name.as_deref(), Some("Glass"));
        assert!(!is_textured(&mats[0]));
        assert!(Arc::ptr_eq(&mats[0], scene.meshes[0].material().unwrap()));

        assert_eq!(mats[1].name.as_deref(), Some("Caneca-corpo"));
        assert!(is_textured(&mats[1]));
        assert_eq!(mats[1].base_color(), [1.0; 4]);
        assert!(mats[1].needs_update);
    }

    #[test]
    fn source_scene_is_not_mutated() {
        let scene = mug(&[("Caneca-corpo", GREY)]);
        let before = scene.meshes[0].material().cloned().unwrap();
        let tex = design();
        let out = apply_texture(Some(&scene), Some(&tex), &BinderConfig::default());

        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.nodes[0].meshes, vec![0]);
        let after = scene.meshes[0].material().unwrap();
        assert!(Arc::ptr_eq(&before, after));
        assert!(!is_textured(after));
        assert_eq!(after.base_color(), GREY);
        assert!(!after.needs_update);

        // New primitive appended; geometry still shared.
        assert_eq!(out.meshes.len(), 2);
        assert_eq!(out.nodes[0].meshes, vec![1]);
        assert!(out.meshes[1].shares_geometry_with(&scene.meshes[0]));
    }

    #[test]
    fn textured_material_keeps_other_properties() {
        let scene = mug(&[("Caneca-corpo", GREY)]);
        let tex = design();
        let out = apply_texture(Some(&scene), Some(&tex), &BinderConfig::default());
        let mat = &node_materials(&out, "Mug")[0];

        assert_eq!(mat.get_float(&MaterialSemantic::MetallicFactor), Some(0.1));
        let tex_ref = mat.get_texture(&MaterialSemantic::BaseColorTexture).unwrap();
        assert_eq!(*tex_ref, tex.texture_ref());
        match &tex_ref.texture {
            TextureSource::Cpu(t) => assert!(Arc::ptr_eq(t, &tex.texture)),
            TextureSource::Named(n) => panic!("expected CPU texture, got {n}"),
        }
    }

    #[rstest]
    #[case::name_hint(&[("Handle", WHITE), ("Mug Body", GREY)], vec![1])]
    #[case::luminance(&[("Dark", GREY), ("Bright", WHITE)], vec![1])]
    #[case::first_slot(&[("A", GREY), ("B", GREY)], vec![0])]
    #[case::several_hints(&[("outer", GREY), ("x", GREY), ("cup", GREY)], vec![0, 2])]
    fn strategy_fallbacks(#[case] materials: &[(&str, [f32; 4])], #[case] expected: Vec<usize>) {
        let scene = mug(materials);
        let selection = select_slots(&scene_slots(&scene), &BinderConfig::default());
        assert_eq!(selection, vec![expected]);
    }

    #[test]
    fn strategy_order_is_configurable() {
        let scene = mug(&[("Caneca-corpo", GREY), ("Bright", WHITE)]);
        let slots = scene_slots(&scene);
        let config = BinderConfig {
            strategies: vec![SelectionStrategy::Luminance, SelectionStrategy::NameHint],
            ..Default::default()
        };
        assert_eq!(select_slots(&slots, &config), vec![vec![1]]);

        let none = BinderConfig {
            strategies: vec![SelectionStrategy::NameHint],
            name_hints: vec!["nothing".into()],
            ..Default::default()
        };
        assert_eq!(select_slots(&slots, &none), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn mesh_without_uvs_is_unchanged() {
        let mesh = generate_cylinder_untextured(1.0, 2.0, 8).with_material(material("Caneca-corpo", GREY));
        let scene = Scene::new()
            .with_nodes(vec![SceneNode::new().with_name("Mug").with_meshes(vec![0])])
            .with_meshes(vec![mesh]);
        let out = apply_texture(Some(&scene), Some(&design()), &BinderConfig::default());

        assert_eq!(out.meshes.len(), 1);
        assert_eq!(out.nodes[0].meshes, vec![0]);
        assert!(!is_textured(out.meshes[0].material().unwrap()));
    }

    #[test]
    fn node_without_materials_is_untouched() {
        let scene = Scene::new()
            .with_nodes(vec![SceneNode::new().with_meshes(vec![0])])
            .with_meshes(vec![generate_cylinder(1.0, 1.0, 6)]);
        let out = apply_texture(Some(&scene), Some(&design()), &BinderConfig::default());
        assert_eq!(out.meshes.len(), 1);
        assert!(out.meshes[0].material().is_none());
    }

    #[test]
    fn shared_primitive_is_cloned_per_node() {
        let scene = Scene::new()
            .with_nodes(vec![
                SceneNode::new().with_name("Front").with_meshes(vec![0]),
                SceneNode::new()
                    .with_name("Group")
                    .with_children(vec![SceneNode::new().with_name("Back").with_meshes(vec![0])]),
            ])
            .with_meshes(vec![textured_cylinder(material("Caneca-corpo", GREY))]);
        let out = apply_texture(Some(&scene), Some(&design()), &BinderConfig::default());

        assert_eq!(out.meshes.len(), 3);
        let front = out.find_node("Front").unwrap().meshes[0];
        let back = out.find_node("Back").unwrap().meshes[0];
        assert_ne!(front, back);
        assert!(front >= 1 && back >= 1);
        assert!(!is_textured(out.meshes[0].material().unwrap()));
        assert!(is_textured(out.meshes[front].material().unwrap()));
        assert!(is_textured(out.meshes[back].material().unwrap()));
    }

    /// Body and handle exported as sibling nodes, handle UV-mapped too.
    fn two_node_mug(body: &str, handle: &str, handle_color: [f32; 4]) -> Scene {
        Scene::new()
            .with_nodes(vec![
                SceneNode::new().with_name("Body").with_meshes(vec![0]),
                SceneNode::new().with_name("Handle").with_meshes(vec![1]),
            ])
            .with_meshes(vec![
                textured_cylinder(material(body, GREY)),
                textured_cylinder(material(handle, handle_color)),
            ])
    }

    #[test]
    fn name_match_on_one_node_keeps_other_nodes_plain() {
        let scene = two_node_mug("Caneca-corpo", "Alca", GREY);
        let out = apply_texture(Some(&scene), Some(&design()), &BinderConfig::default());

        assert!(is_textured(&node_materials(&out, "Body")[0]));
        let handle = &node_materials(&out, "Handle")[0];
        assert_eq!(handle.name.as_deref(), Some("Alca"));
        assert!(!is_textured(handle));
        assert_eq!(out.meshes.len(), 3);
    }

    #[test]
    fn luminance_is_not_tried_once_a_name_matched() {
        // A bright handle would pass the luminance test on its own.
        let scene = two_node_mug("Mug body", "Alca", WHITE);
        let rows = describe_materials(&scene, &BinderConfig::default());
        let selected: Vec<_> = rows.iter().map(|r| r.selected).collect();
        assert_eq!(selected, vec![true, false]);
    }

    #[test]
    fn first_slot_fallback_picks_one_slot_in_whole_scene() {
        let scene = two_node_mug("A", "B", GREY);
        let selection = select_slots(&scene_slots(&scene), &BinderConfig::default());
        assert_eq!(selection, vec![vec![0], vec![]]);
    }

    #[test]
    fn describe_lists_every_slot() {
        let mut scene = mug(&[("Glass", WHITE), ("Caneca-corpo", GREY)]);
        scene.meshes.push(generate_cylinder_untextured(1.0, 1.0, 4));
        scene.nodes[0].meshes.push(2);

        let rows = describe_materials(&scene, &BinderConfig::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].material.as_deref(), Some("Glass"));
        assert!(!rows[0].selected);
        assert_eq!(rows[1].material.as_deref(), Some("Caneca-corpo"));
        assert!(rows[1].selected);
        assert!(rows[1].has_uvs);
        assert_eq!(rows[1].base_color, GREY);
        assert!(!rows[1].textured);
        assert_eq!(rows[2].material, None);
        assert!(!rows[2].has_uvs);

        let out = apply_texture(Some(&scene), Some(&design()), &BinderConfig::default());
        let rows = describe_materials(&out, &BinderConfig::default());
        assert!(rows[1].textured);
        assert_eq!(rows[1].mesh_index, 3);
    }
}
