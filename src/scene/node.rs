//! Scene graph nodes
//!
//! A [`Node`] is the basic entity of the scene: a named local transform with
//! an optional payload (camera or mesh). Nodes live in the arena owned by
//! [`SceneGraph`](super::SceneGraph) and refer to each other through
//! [`NodeId`] handles, so a node is reachable through exactly one parent
//! chain and the tree is acyclic by construction.

use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

use super::camera::Camera;
use super::mesh::Mesh;

/// Handle to a node inside a scene graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Node payload: what a node is, beyond its transform.
///
/// Dispatch on node type is explicit — there are no downcasts anywhere in
/// the engine.
pub enum NodeKind {
    /// Pure transform node grouping its children.
    Group,
    /// Viewpoint node; see [`Camera`].
    Camera(Camera),
    /// Drawable leaf; see [`Mesh`].
    Mesh(Mesh),
}

/// A named transform in the scene hierarchy.
///
/// World transform = parent world transform ∘ local transform, recomputed
/// top-down on every [`SceneGraph::update`](super::SceneGraph::update).
/// Rotation is Euler angles in degrees, applied Z, then Y, then X.
pub struct Node {
    pub name: String,
    position: Vector3<f32>,
    rotation: Vector3<f32>,
    scale: Vector3<f32>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) world: Matrix4<f32>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
            world: SquareMatrix::identity(),
            kind,
        }
    }

    /// Creates a plain grouping node.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vector3::new(x, y, z);
    }

    /// Sets the local Euler rotation in degrees (applied Z, then Y, then X).
    pub fn set_rotation(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Vector3::new(x, y, z);
    }

    pub fn set_scale(&mut self, x: f32, y: f32, z: f32) {
        self.scale = Vector3::new(x, y, z);
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// World transform as of the last scene update.
    pub fn world_transform(&self) -> Matrix4<f32> {
        self.world
    }

    /// Local transform matrix: translation ∘ Rz ∘ Ry ∘ Rx ∘ scale.
    pub fn local_transform(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_z(Deg(self.rotation.z))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_x(Deg(self.rotation.x))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    #[test]
    fn local_transform_defaults_to_identity() {
        let node = Node::group("n");
        assert_eq!(node.local_transform(), Matrix4::identity());
    }

    #[test]
    fn translation_lands_in_last_column() {
        let mut node = Node::group("n");
        node.set_position(1.0, 2.0, 3.0);
        let m = node.local_transform();
        assert_eq!(m.w.x, 1.0);
        assert_eq!(m.w.y, 2.0);
        assert_eq!(m.w.z, 3.0);
    }

    #[test]
    fn rotation_applies_z_before_y_before_x() {
        let mut node = Node::group("n");
        node.set_rotation(30.0, 45.0, 60.0);
        let expected = Matrix4::from_angle_z(Deg(60.0))
            * Matrix4::from_angle_y(Deg(45.0))
            * Matrix4::from_angle_x(Deg(30.0));
        let m = node.local_transform();
        for c in 0..4 {
            for r in 0..4 {
                assert!((m[c][r] - expected[c][r]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn capability_queries_match_kind() {
        let group = Node::group("g");
        assert!(group.as_camera().is_none());
        assert!(group.as_mesh().is_none());

        let camera = Node::new("c", NodeKind::Camera(Camera::default()));
        assert!(camera.as_camera().is_some());
        assert!(camera.as_mesh().is_none());
    }
}
