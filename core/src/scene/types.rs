//! Scene graph data types.
//!
//! All types use plain arrays (`[f32; 3]`, `[f32; 4]`, etc.) instead of
//! math library types to keep the core crate free of `glam`.

use crate::mesh::CpuMesh;

/// Node transform decomposed into translation, rotation, and scale.
///
/// Uses plain arrays for portability. Convert to `glam` types as needed:
/// `Vec3::from(t.translation)`, `Quat::from_array(t.rotation)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in a scene graph tree.
///
/// Nodes form a recursive tree structure. Each node has a local transform,
/// the mesh primitives it draws, and child nodes. Mesh references are
/// indices into the owning [`Scene::meshes`]; their order is the node's
/// material slot order.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name, if any.
    pub name: Option<String>,
    /// Local transform relative to parent.
    pub transform: NodeTransform,
    /// Indices into [`Scene::meshes`].
    /// Empty if the node carries no mesh.
    pub meshes: Vec<usize>,
    /// Child nodes forming the sub-tree.
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Creates a new node with default (identity) transform and no attachments.
    pub fn new() -> Self {
        Self {
            name: None,
            transform: NodeTransform::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the node name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the mesh indices.
    #[must_use]
    pub fn with_meshes(mut self, meshes: Vec<usize>) -> Self {
        self.meshes = meshes;
        self
    }

    /// Set the child nodes.
    #[must_use]
    pub fn with_children(mut self, children: Vec<SceneNode>) -> Self {
        self.children = children;
        self
    }

    /// Whether this node draws at least one primitive.
    pub fn is_drawable(&self) -> bool {
        !self.meshes.is_empty()
    }

    fn walk<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a SceneNode, usize)) {
        f(self, depth);
        for child in &self.children {
            child.walk(depth + 1, f);
        }
    }

    fn walk_mut(&mut self, f: &mut impl FnMut(&mut SceneNode)) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new()
    }
}

/// A scene containing a tree of nodes and all meshes they reference.
///
/// Nodes are organized as a forest of trees (multiple root nodes). The
/// mesh array is owned by the scene so that node indices resolve locally.
/// Cloning a scene is shallow for geometry: mesh buffers are `Arc`-shared.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Scene name, if any.
    pub name: Option<String>,
    /// Root nodes of the scene.
    pub nodes: Vec<SceneNode>,
    /// All meshes referenced by nodes in this scene.
    pub meshes: Vec<CpuMesh>,
}

impl Scene {
    /// Creates a new empty scene.
    pub fn new() -> Self {
        Self {
            name: None,
            nodes: Vec::new(),
            meshes: Vec::new(),
        }
    }

    /// Set the scene name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the root nodes.
    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<SceneNode>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Set the meshes.
    #[must_use]
    pub fn with_meshes(mut self, meshes: Vec<CpuMesh>) -> Self {
        self.meshes = meshes;
        self
    }

    /// Visit every node depth-first, pre-order, with its depth (roots are 0).
    pub fn visit_nodes<'a>(&'a self, mut f: impl FnMut(&'a SceneNode, usize)) {
        for node in &self.nodes {
            node.walk(0, &mut f);
        }
    }

    /// Visit every node mutably, depth-first, pre-order.
    pub fn visit_nodes_mut(&mut self, mut f: impl FnMut(&mut SceneNode)) {
        for node in &mut self.nodes {
            node.walk_mut(&mut f);
        }
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.visit_nodes(|_, _| count += 1);
        count
    }

    /// Find the first node (pre-order) with the given name.
    pub fn find_node(&self, name: &str) -> Option<&SceneNode> {
        let mut found = None;
        self.visit_nodes(|node, _| {
            if found.is_none() && node.name.as_deref() == Some(name) {
                found = Some(node);
            }
        });
        found
    }

    /// Resolve a node's mesh indices, skipping any that are out of range.
    pub fn node_meshes<'a>(&'a self, node: &'a SceneNode) -> impl Iterator<Item = &'a CpuMesh> {
        node.meshes.iter().filter_map(|&i| self.meshes.get(i))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
