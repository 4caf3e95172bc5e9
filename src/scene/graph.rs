//! Scene graph: node arena, draw lists and scene-level resources
//!
//! The [`SceneGraph`] is an explicit context object passed to the loader and
//! the render pipeline — there is no process-wide scene state. It owns the
//! node arena, the main-camera designation, the two flat draw lists, the
//! material arena and the optional sky cubemaps.

use cgmath::{Matrix4, SquareMatrix};

use crate::gfx::bindings::SceneBindings;
use crate::gfx::cubemap::Cubemap;

use super::camera::CameraUniform;
use super::material::MaterialSet;
use super::node::{Node, NodeId, NodeKind};

/// Hierarchical scene with flat draw lists.
///
/// Nodes are stored in a slot arena; removing a subtree frees its slots and
/// purges every draw-list entry referring to them, so each GPU resource is
/// released exactly once when its owning node goes away.
pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    main_camera: Option<NodeId>,
    opaque: Vec<NodeId>,
    transparent: Vec<NodeId>,
    pub materials: MaterialSet,
    skybox: Option<Cubemap>,
    skybox_irradiance: Option<Cubemap>,
    skybox_radiance: Option<Cubemap>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = Node::group("root");
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
            main_camera: None,
            opaque: Vec::new(),
            transparent: Vec::new(),
            materials: MaterialSet::new(),
            skybox: None,
            skybox_irradiance: None,
            skybox_radiance: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Inserts `node` as the last child of `parent`.
    ///
    /// A mesh node joins exactly one draw list, picked by its transparent
    /// flag; the first camera added becomes the main camera.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = Some(parent);
        let id = NodeId(self.nodes.len());
        match &node.kind {
            NodeKind::Mesh(mesh) => {
                if mesh.is_transparent() {
                    self.transparent.push(id);
                } else {
                    self.opaque.push(id);
                }
            }
            NodeKind::Camera(_) => {
                if self.main_camera.is_none() {
                    self.main_camera = Some(id);
                }
            }
            NodeKind::Group => {}
        }
        self.nodes.push(Some(node));
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        id
    }

    /// Removes a node and its whole subtree.
    ///
    /// Removing the root releases the entire tree (and the sky cubemaps) and
    /// leaves a fresh empty root behind.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            self.clear();
            return;
        }

        // Detach from the parent first so the subtree is unreachable.
        if let Some(parent_id) = self.node(id).and_then(|n| n.parent) {
            if let Some(parent) = self.node_mut(parent_id) {
                parent.children.retain(|&child| child != id);
            }
        }

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children.iter().copied());
                if self.main_camera == Some(current) {
                    self.main_camera = None;
                }
            }
        }

        self.opaque.retain(|&m| self.nodes[m.0].is_some());
        self.transparent.retain(|&m| self.nodes[m.0].is_some());
    }

    /// Releases the whole tree, the draw lists, all materials and the sky
    /// cubemaps, leaving an empty scene with a fresh root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.nodes.push(Some(Node::group("root")));
        self.root = NodeId(0);
        self.main_camera = None;
        self.opaque.clear();
        self.transparent.clear();
        self.materials.clear();
        self.skybox = None;
        self.skybox_irradiance = None;
        self.skybox_radiance = None;
    }

    /// Recomputes world transforms for every node reachable from the root,
    /// parents before children. Pure CPU work; no GPU calls.
    pub fn update(&mut self) {
        let mut stack = vec![(self.root, Matrix4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id.0).and_then(|slot| slot.as_mut()) else {
                continue;
            };
            let world = parent_world * node.local_transform();
            node.world = world;
            for &child in &node.children {
                stack.push((child, world));
            }
        }
    }

    pub fn set_main_camera(&mut self, id: NodeId) {
        self.main_camera = Some(id);
    }

    pub fn main_camera(&self) -> Option<NodeId> {
        self.main_camera
    }

    /// Camera uniform for the current viewport, or `None` when the scene has
    /// no usable main camera (draws are skipped in that case).
    pub fn camera_uniform(&self, width: u32, height: u32) -> Option<CameraUniform> {
        let node = self.node(self.main_camera?)?;
        let camera = node.as_camera()?;
        Some(camera.uniform(&node.world_transform(), width, height))
    }

    pub fn set_skybox(&mut self, cubemap: Option<Cubemap>) {
        self.skybox = cubemap;
    }

    pub fn skybox(&self) -> Option<&Cubemap> {
        self.skybox.as_ref()
    }

    pub fn set_skybox_irradiance(&mut self, cubemap: Option<Cubemap>) {
        self.skybox_irradiance = cubemap;
    }

    pub fn skybox_irradiance(&self) -> Option<&Cubemap> {
        self.skybox_irradiance.as_ref()
    }

    pub fn set_skybox_radiance(&mut self, cubemap: Option<Cubemap>) {
        self.skybox_radiance = cubemap;
    }

    pub fn skybox_radiance(&self) -> Option<&Cubemap> {
        self.skybox_radiance.as_ref()
    }

    /// Ids of the opaque draw list, in insertion order.
    pub fn opaque_meshes(&self) -> &[NodeId] {
        &self.opaque
    }

    /// Ids of the transparent draw list, in insertion order.
    pub fn transparent_meshes(&self) -> &[NodeId] {
        &self.transparent
    }

    /// Creates GPU resources for every mesh and material.
    ///
    /// Must be called after the GPU context is available and before
    /// rendering.
    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &SceneBindings,
    ) {
        for slot in &mut self.nodes {
            if let Some(node) = slot {
                if let Some(mesh) = node.as_mesh_mut() {
                    mesh.init_gpu_resources(device, bindings);
                }
            }
        }
        self.materials.init_gpu_resources(device, queue, bindings);
    }

    /// Syncs every mesh node's world transform into its GPU uniform.
    pub fn write_transforms(&mut self, queue: &wgpu::Queue) {
        for slot in &mut self.nodes {
            if let Some(node) = slot {
                let world = node.world;
                if let Some(mesh) = node.as_mesh_mut() {
                    mesh.write_transform(queue, &world);
                }
            }
        }
    }

    /// Draws the opaque list in insertion order (used by the geometry pass).
    ///
    /// No sorting or culling is performed; submission order is load order.
    pub fn draw_opaque<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        self.draw_list(&self.opaque, render_pass);
    }

    /// Draws the transparent list in insertion order (forward shading).
    pub fn draw_transparent<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        self.draw_list(&self.transparent, render_pass);
    }

    fn draw_list<'a>(&'a self, list: &[NodeId], render_pass: &mut wgpu::RenderPass<'a>) {
        for &id in list {
            if let Some(mesh) = self.node(id).and_then(Node::as_mesh) {
                mesh.draw(render_pass, &self.materials);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::camera::Camera;
    use crate::scene::material::MaterialId;
    use crate::scene::mesh::Mesh;
    use crate::scene::node::NodeKind;
    use cgmath::{Deg, Vector3, Vector4};

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a[c][r] - b[c][r]).abs() < 1e-5,
                    "matrices differ at [{c}][{r}]: {} vs {}",
                    a[c][r],
                    b[c][r]
                );
            }
        }
    }

    fn mesh_node(transparent: bool) -> Node {
        Node::new(
            "mesh",
            NodeKind::Mesh(Mesh::new(Vec::new(), Vec::new(), MaterialId::DEFAULT, transparent)),
        )
    }

    #[test]
    fn world_transform_composes_three_levels() {
        let mut scene = SceneGraph::new();

        let mut a = Node::group("a");
        a.set_position(1.0, 0.0, 0.0);
        let a = scene.add_child(scene.root(), a);

        let mut b = Node::group("b");
        b.set_position(0.0, 2.0, 0.0);
        b.set_rotation(0.0, 90.0, 0.0);
        let b = scene.add_child(a, b);

        let mut c = Node::group("c");
        c.set_position(0.0, 0.0, 3.0);
        let c = scene.add_child(b, c);

        scene.update();

        let expected_b = Matrix4::from_translation(Vector3::new(1.0, 2.0, 0.0))
            * Matrix4::from_angle_y(Deg(90.0));
        assert_matrix_eq(scene.node(b).unwrap().world_transform(), expected_b);

        // Parent world ∘ local, for every node.
        let expected_c = expected_b * Matrix4::from_translation(Vector3::new(0.0, 0.0, 3.0));
        assert_matrix_eq(scene.node(c).unwrap().world_transform(), expected_c);

        // The 90° yaw maps the child's +Z offset onto +X.
        let pos = expected_c * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((pos.x - 4.0).abs() < 1e-5);
        assert!((pos.y - 2.0).abs() < 1e-5);
        assert!(pos.z.abs() < 1e-5);
    }

    #[test]
    fn update_handles_root_identity() {
        let mut scene = SceneGraph::new();
        scene.update();
        assert_matrix_eq(
            scene.node(scene.root()).unwrap().world_transform(),
            Matrix4::identity(),
        );
    }

    #[test]
    fn removing_ancestor_removes_descendants() {
        let mut scene = SceneGraph::new();
        let a = scene.add_child(scene.root(), Node::group("a"));
        let b = scene.add_child(a, Node::group("b"));
        let c = scene.add_child(b, mesh_node(false));

        assert_eq!(scene.opaque_meshes(), &[c]);

        scene.remove(a);

        assert!(scene.node(a).is_none());
        assert!(scene.node(b).is_none());
        assert!(scene.node(c).is_none());
        assert!(scene.opaque_meshes().is_empty());
        assert!(scene.node(scene.root()).unwrap().children().is_empty());
    }

    #[test]
    fn each_mesh_joins_exactly_one_list() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let opaque = scene.add_child(root, mesh_node(false));
        let transparent = scene.add_child(root, mesh_node(true));

        assert_eq!(scene.opaque_meshes(), &[opaque]);
        assert_eq!(scene.transparent_meshes(), &[transparent]);
    }

    #[test]
    fn draw_lists_preserve_insertion_order() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let first = scene.add_child(root, mesh_node(false));
        let second = scene.add_child(root, mesh_node(false));
        let third = scene.add_child(root, mesh_node(false));

        assert_eq!(scene.opaque_meshes(), &[first, second, third]);
    }

    #[test]
    fn first_camera_becomes_main() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let first = scene.add_child(root, Node::new("cam1", NodeKind::Camera(Camera::default())));
        let _second = scene.add_child(root, Node::new("cam2", NodeKind::Camera(Camera::default())));

        assert_eq!(scene.main_camera(), Some(first));
    }

    #[test]
    fn camera_uniform_absent_without_camera() {
        let mut scene = SceneGraph::new();
        scene.update();
        assert!(scene.camera_uniform(800, 600).is_none());
    }

    #[test]
    fn camera_uniform_tracks_camera_world_position() {
        let mut scene = SceneGraph::new();
        let mut node = Node::new("cam", NodeKind::Camera(Camera::default()));
        node.set_position(0.0, 5.0, 10.0);
        scene.add_child(scene.root(), node);
        scene.update();

        let uniform = scene.camera_uniform(800, 600).unwrap();
        assert_eq!(uniform.view_position, [0.0, 5.0, 10.0, 1.0]);
    }

    #[test]
    fn removing_camera_clears_main_designation() {
        let mut scene = SceneGraph::new();
        let cam = scene.add_child(
            scene.root(),
            Node::new("cam", NodeKind::Camera(Camera::default())),
        );
        assert_eq!(scene.main_camera(), Some(cam));
        scene.remove(cam);
        assert_eq!(scene.main_camera(), None);
        assert!(scene.camera_uniform(800, 600).is_none());
    }

    #[test]
    fn clear_resets_everything() {
        let mut scene = SceneGraph::new();
        scene.add_child(scene.root(), mesh_node(false));
        scene.add_child(
            scene.root(),
            Node::new("cam", NodeKind::Camera(Camera::default())),
        );
        scene.clear();

        assert!(scene.opaque_meshes().is_empty());
        assert!(scene.main_camera().is_none());
        assert!(scene.skybox().is_none());
        assert!(scene.node(scene.root()).unwrap().children().is_empty());
    }
}
