//! Mesh import
//!
//! Turns an OBJ source file into a small node hierarchy: one container node
//! per file, one mesh leaf per model inside it. Geometry is triangulated and
//! single-indexed by the loader; normals are taken from the file when
//! present and reconstructed from faces otherwise, and tangents are derived
//! from UVs for normal mapping.
//!
//! A 4×4 transform supplied for an imported subtree is decomposed in the
//! fixed order translation → Euler Z-Y-X rotation → scale before being
//! applied to the container node.

use std::io::BufRead;
use std::path::Path;

use cgmath::{InnerSpace, Matrix4, Vector3};

use crate::error::SceneError;
use crate::gfx::vertex::Vertex3D;

use super::graph::SceneGraph;
use super::material::MaterialId;
use super::mesh::Mesh;
use super::node::{Node, NodeId, NodeKind};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    }
}

/// Imports an OBJ file as a child of `parent`.
///
/// Every model in the file becomes one mesh leaf using `material` and the
/// given transparency, registered in the matching draw list. Returns the id
/// of the container node.
pub fn import_obj(
    scene: &mut SceneGraph,
    parent: NodeId,
    path: &Path,
    material: MaterialId,
    transparent: bool,
    transform: Option<Matrix4<f32>>,
) -> Result<NodeId, SceneError> {
    let (models, _materials) =
        tobj::load_obj(path, &load_options()).map_err(|source| SceneError::MeshImport {
            path: path.to_path_buf(),
            source,
        })?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    Ok(insert_models(
        scene,
        parent,
        &name,
        models,
        material,
        transparent,
        transform,
    ))
}

/// Imports OBJ data from an in-memory reader; used by tests and embedded
/// assets.
pub fn import_obj_buf<R: BufRead>(
    scene: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    reader: &mut R,
    material: MaterialId,
    transparent: bool,
) -> Result<NodeId, SceneError> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Ok((Vec::new(), Default::default()))
    })
    .map_err(|source| SceneError::MeshImport {
        path: name.into(),
        source,
    })?;

    Ok(insert_models(
        scene, parent, name, models, material, transparent, None,
    ))
}

fn insert_models(
    scene: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    models: Vec<tobj::Model>,
    material: MaterialId,
    transparent: bool,
    transform: Option<Matrix4<f32>>,
) -> NodeId {
    let mut container = Node::group(name);
    if let Some(matrix) = transform {
        let (translation, rotation, scale) = decompose_transform(&matrix);
        container.set_position(translation.x, translation.y, translation.z);
        container.set_rotation(rotation.x, rotation.y, rotation.z);
        container.set_scale(scale.x, scale.y, scale.z);
    }
    let container = scene.add_child(parent, container);

    for model in models {
        let vertices = build_vertices(&model.mesh);
        let mesh = Mesh::new(vertices, model.mesh.indices.clone(), material, transparent);
        scene.add_child(container, Node::new(model.name, NodeKind::Mesh(mesh)));
    }

    container
}

fn build_vertices(mesh: &tobj::Mesh) -> Vec<Vertex3D> {
    let vertex_count = mesh.positions.len() / 3;

    let normals = if mesh.normals.len() == mesh.positions.len() {
        mesh.normals.clone()
    } else {
        face_normals(&mesh.positions, &mesh.indices)
    };

    let mut vertices = Vec::with_capacity(vertex_count);
    for i in 0..vertex_count {
        let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
            [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
        } else {
            [0.0, 0.0]
        };
        vertices.push(Vertex3D {
            position: [
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
            ],
            normal: [normals[i * 3], normals[i * 3 + 1], normals[i * 3 + 2]],
            tangent: [0.0, 0.0, 0.0],
            uv,
        });
    }

    compute_tangents(&mut vertices, &mesh.indices);
    vertices
}

/// Reconstructs smooth per-vertex normals by averaging face normals.
fn face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0f32; positions.len()];

    for triangle in indices.chunks(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let v = |i: usize| {
            Vector3::new(
                positions[i * 3],
                positions[i * 3 + 1],
                positions[i * 3 + 2],
            )
        };
        let face = (v(i1) - v(i0)).cross(v(i2) - v(i0));
        for &i in &[i0, i1, i2] {
            normals[i * 3] += face.x;
            normals[i * 3 + 1] += face.y;
            normals[i * 3 + 2] += face.z;
        }
    }

    for normal in normals.chunks_mut(3) {
        let length = (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        if length > 0.0 {
            normal[0] /= length;
            normal[1] /= length;
            normal[2] /= length;
        }
    }

    normals
}

/// Derives per-vertex tangents from triangle UV gradients.
///
/// Triangles with degenerate UVs contribute nothing; any vertex left without
/// a tangent gets an arbitrary axis orthogonal to its normal so the shader
/// always receives a usable basis.
fn compute_tangents(vertices: &mut [Vertex3D], indices: &[u32]) {
    let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];

    for triangle in indices.chunks(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let p0 = Vector3::from(vertices[i0].position);
        let p1 = Vector3::from(vertices[i1].position);
        let p2 = Vector3::from(vertices[i2].position);
        let uv0 = vertices[i0].uv;
        let uv1 = vertices[i1].uv;
        let uv2 = vertices[i2].uv;

        let edge1 = p1 - p0;
        let edge2 = p2 - p0;
        let du1 = uv1[0] - uv0[0];
        let dv1 = uv1[1] - uv0[1];
        let du2 = uv2[0] - uv0[0];
        let dv2 = uv2[1] - uv0[1];

        let det = du1 * dv2 - du2 * dv1;
        if det.abs() < 1e-8 {
            continue;
        }
        let tangent = (edge1 * dv2 - edge2 * dv1) / det;
        for &i in &[i0, i1, i2] {
            accumulated[i] += tangent;
        }
    }

    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let normal = Vector3::from(vertex.normal);
        let tangent = if tangent.magnitude2() > 1e-12 {
            // Gram-Schmidt against the normal.
            (tangent - normal * normal.dot(tangent)).normalize()
        } else {
            orthogonal_axis(normal)
        };
        vertex.tangent = tangent.into();
    }
}

fn orthogonal_axis(normal: Vector3<f32>) -> Vector3<f32> {
    let axis = if normal.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    let tangent = axis - normal * normal.dot(axis);
    if tangent.magnitude2() > 1e-12 {
        tangent.normalize()
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    }
}

/// Decomposes a column-major transform into translation, Euler Z-Y-X
/// rotation (degrees) and scale, in that order.
///
/// The rotation convention matches [`Node::local_transform`]: the matrix is
/// assumed to be T · Rz · Ry · Rx · S with positive scale.
pub fn decompose_transform(
    matrix: &Matrix4<f32>,
) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
    let translation = matrix.w.truncate();

    let mut x_axis = matrix.x.truncate();
    let mut y_axis = matrix.y.truncate();
    let mut z_axis = matrix.z.truncate();
    let scale = Vector3::new(x_axis.magnitude(), y_axis.magnitude(), z_axis.magnitude());
    if scale.x > 0.0 {
        x_axis /= scale.x;
    }
    if scale.y > 0.0 {
        y_axis /= scale.y;
    }
    if scale.z > 0.0 {
        z_axis /= scale.z;
    }

    // For R = Rz(a) · Ry(b) · Rx(g): the first column is
    // (cos a cos b, sin a cos b, -sin b).
    let sin_b = (-x_axis.z).clamp(-1.0, 1.0);
    let angle_y = sin_b.asin();
    let (angle_z, angle_x) = if sin_b.abs() < 0.999_999 {
        (x_axis.y.atan2(x_axis.x), y_axis.z.atan2(z_axis.z))
    } else {
        // Gimbal lock: pitch is ±90°, only the sum/difference of the other
        // two angles is determined. Put it all into the Z angle.
        ((-y_axis.x).atan2(y_axis.y), 0.0)
    };

    let rotation = Vector3::new(
        angle_x.to_degrees(),
        angle_y.to_degrees(),
        angle_z.to_degrees(),
    );

    (translation, rotation, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Deg;
    use std::io::Cursor;

    const TRIANGLE_OBJ: &str = "\
o triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
vn 0.0 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/2 3/3/3
";

    const TWO_MODEL_OBJ: &str = "\
o first
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
o second
v 0.0 0.0 1.0
v 1.0 0.0 1.0
v 0.0 1.0 1.0
f 4 5 6
";

    fn compose(translation: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Matrix4<f32> {
        Matrix4::from_translation(translation)
            * Matrix4::from_angle_z(Deg(rotation.z))
            * Matrix4::from_angle_y(Deg(rotation.y))
            * Matrix4::from_angle_x(Deg(rotation.x))
            * Matrix4::from_nonuniform_scale(scale.x, scale.y, scale.z)
    }

    fn assert_vec_eq(a: Vector3<f32>, b: Vector3<f32>) {
        assert!((a.x - b.x).abs() < 1e-4, "{a:?} vs {b:?}");
        assert!((a.y - b.y).abs() < 1e-4, "{a:?} vs {b:?}");
        assert!((a.z - b.z).abs() < 1e-4, "{a:?} vs {b:?}");
    }

    #[test]
    fn decompose_roundtrips_composed_transform() {
        let translation = Vector3::new(1.0, -2.0, 3.0);
        let rotation = Vector3::new(20.0, 40.0, -60.0);
        let scale = Vector3::new(2.0, 0.5, 1.5);
        let matrix = compose(translation, rotation, scale);

        let (t, r, s) = decompose_transform(&matrix);
        assert_vec_eq(t, translation);
        assert_vec_eq(r, rotation);
        assert_vec_eq(s, scale);
    }

    #[test]
    fn decompose_identity() {
        let (t, r, s) = decompose_transform(&cgmath::SquareMatrix::identity());
        assert_vec_eq(t, Vector3::new(0.0, 0.0, 0.0));
        assert_vec_eq(r, Vector3::new(0.0, 0.0, 0.0));
        assert_vec_eq(s, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn decompose_survives_gimbal_lock() {
        let matrix = compose(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 90.0, 30.0),
            Vector3::new(1.0, 1.0, 1.0),
        );
        let (_, rotation, _) = decompose_transform(&matrix);
        // The recovered angles must reproduce the same matrix even if the
        // individual values differ from the inputs.
        let rebuilt = compose(Vector3::new(0.0, 0.0, 0.0), rotation, Vector3::new(1.0, 1.0, 1.0));
        for c in 0..4 {
            for r in 0..4 {
                assert!((matrix[c][r] - rebuilt[c][r]).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn import_builds_container_and_mesh_leaves() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let container = import_obj_buf(
            &mut scene,
            root,
            "triangle",
            &mut Cursor::new(TRIANGLE_OBJ),
            MaterialId::DEFAULT,
            false,
        )
        .unwrap();

        let children = scene.node(container).unwrap().children().to_vec();
        assert_eq!(children.len(), 1);
        let mesh = scene.node(children[0]).unwrap().as_mesh().unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.index_count(), 3);
        assert_eq!(scene.opaque_meshes(), &[children[0]]);
    }

    #[test]
    fn transparent_flag_routes_to_transparent_list() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        import_obj_buf(
            &mut scene,
            root,
            "triangle",
            &mut Cursor::new(TRIANGLE_OBJ),
            MaterialId::DEFAULT,
            true,
        )
        .unwrap();

        assert!(scene.opaque_meshes().is_empty());
        assert_eq!(scene.transparent_meshes().len(), 1);
    }

    #[test]
    fn every_model_becomes_its_own_mesh() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let container = import_obj_buf(
            &mut scene,
            root,
            "pair",
            &mut Cursor::new(TWO_MODEL_OBJ),
            MaterialId::DEFAULT,
            false,
        )
        .unwrap();

        assert_eq!(scene.node(container).unwrap().children().len(), 2);
        assert_eq!(scene.opaque_meshes().len(), 2);
    }

    #[test]
    fn missing_normals_are_reconstructed() {
        // A triangle in the XY plane gets +Z normals.
        let normals = face_normals(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        );
        for vertex in normals.chunks(3) {
            assert!((vertex[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn tangents_are_orthogonal_to_normals() {
        let mut vertices = vec![
            Vertex3D {
                position: [0.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                tangent: [0.0; 3],
                uv: [0.0, 0.0],
            },
            Vertex3D {
                position: [1.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                tangent: [0.0; 3],
                uv: [1.0, 0.0],
            },
            Vertex3D {
                position: [0.0, 1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
                tangent: [0.0; 3],
                uv: [0.0, 1.0],
            },
        ];
        compute_tangents(&mut vertices, &[0, 1, 2]);

        for vertex in &vertices {
            let normal = Vector3::from(vertex.normal);
            let tangent = Vector3::from(vertex.tangent);
            assert!((tangent.magnitude() - 1.0).abs() < 1e-5);
            assert!(normal.dot(tangent).abs() < 1e-5);
        }
    }
}
