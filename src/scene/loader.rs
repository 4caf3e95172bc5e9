//! Scene description loader
//!
//! Scenes are described as JSON documents (a node tree plus optional sky
//! cubemaps). Parsing is plain serde into description structs; graph
//! construction walks the description with an explicit [`LoadContext`] and
//! drives the same mutation API (`add_child`, `set_position`, `set_albedo`,
//! …) the engine exposes to callers, so the two halves can be tested
//! independently.
//!
//! The loader is the sole writer of initial topology. Failures leave the
//! scene empty or partially constructed; the frame loop tolerates both.

use std::path::{Path, PathBuf};

use cgmath::Matrix4;
use serde::Deserialize;

use crate::error::SceneError;
use crate::gfx::cubemap::Cubemap;
use crate::gfx::texture::TextureResource;

use super::camera::Camera;
use super::graph::SceneGraph;
use super::importer;
use super::material::{Material, MaterialId};
use super::node::{Node, NodeKind};

/// Root of a scene description document.
#[derive(Debug, Default, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    pub skybox: Option<CubemapDescription>,
    pub skybox_irradiance: Option<CubemapDescription>,
    pub skybox_radiance: Option<CubemapDescription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NodeDescription {
    pub name: Option<String>,
    pub position: Option<[f32; 3]>,
    /// Euler rotation in degrees, applied Z, then Y, then X.
    pub rotation: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
    pub camera: Option<CameraDescription>,
    /// Material for meshes imported in this subtree, until one consumes it.
    pub material: Option<MaterialDescription>,
    pub mesh: Option<MeshDescription>,
    #[serde(default)]
    pub children: Vec<NodeDescription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CameraDescription {
    pub near: Option<f32>,
    pub far: Option<f32>,
    pub fov: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaterialDescription {
    /// RGB or RGBA; a missing alpha defaults to opaque.
    pub albedo: Option<Vec<f32>>,
    pub metalness: Option<f32>,
    pub roughness: Option<f32>,
    pub emission: Option<[f32; 3]>,
    pub albedo_map: Option<PathBuf>,
    pub metalness_map: Option<PathBuf>,
    pub roughness_map: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
    pub emission_map: Option<PathBuf>,
    pub ambient_occlusion_map: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct MeshDescription {
    pub path: PathBuf,
    #[serde(default)]
    pub transparent: bool,
    /// Optional column-major 4×4 transform for the imported subtree,
    /// decomposed translation → Euler Z-Y-X → scale.
    pub transform: Option<[f32; 16]>,
}

#[derive(Debug, Deserialize)]
pub struct CubemapDescription {
    pub path: String,
    pub extension: String,
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Source of GPU image assets referenced by a scene description.
///
/// The production implementation is [`GpuAssets`]; tests substitute a stub
/// so graph construction can run without a device.
pub trait AssetSource {
    fn load_texture(&mut self, path: &Path, srgb: bool) -> Result<TextureResource, SceneError>;
    fn load_cubemap(
        &mut self,
        dir: &Path,
        extension: &str,
        with_mips: bool,
    ) -> Result<Cubemap, SceneError>;
}

/// Loads textures and cubemaps through a live wgpu device.
pub struct GpuAssets<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
}

impl AssetSource for GpuAssets<'_> {
    fn load_texture(&mut self, path: &Path, srgb: bool) -> Result<TextureResource, SceneError> {
        TextureResource::from_file(self.device, self.queue, path, srgb)
    }

    fn load_cubemap(
        &mut self,
        dir: &Path,
        extension: &str,
        with_mips: bool,
    ) -> Result<Cubemap, SceneError> {
        Cubemap::load(self.device, self.queue, dir, extension, with_mips)
    }
}

/// Explicit state carried through graph construction.
struct LoadContext<'a, A: AssetSource> {
    scene: &'a mut SceneGraph,
    assets: &'a mut A,
    /// Directory scene-relative asset paths resolve against.
    root_dir: PathBuf,
    /// Material waiting to be consumed by the next mesh import.
    pending_material: Option<MaterialId>,
}

/// Loads a scene description file, replacing any existing scene content.
pub fn load_scene_file<A: AssetSource>(
    scene: &mut SceneGraph,
    assets: &mut A,
    path: &Path,
) -> Result<(), SceneError> {
    let json = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let root_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    load_scene_str(scene, assets, &json, &root_dir)
}

/// Loads a scene description from a JSON string.
pub fn load_scene_str<A: AssetSource>(
    scene: &mut SceneGraph,
    assets: &mut A,
    json: &str,
    root_dir: &Path,
) -> Result<(), SceneError> {
    let description = SceneDescription::from_json(json)?;
    apply_description(scene, assets, &description, root_dir)
}

/// Builds graph content from a parsed description.
///
/// The existing scene is cleared first, mirroring a fresh load. Sky cubemap
/// and material-map failures are logged and skipped rather than aborting the
/// whole load.
pub fn apply_description<A: AssetSource>(
    scene: &mut SceneGraph,
    assets: &mut A,
    description: &SceneDescription,
    root_dir: &Path,
) -> Result<(), SceneError> {
    scene.clear();

    let mut context = LoadContext {
        scene,
        assets,
        root_dir: root_dir.to_path_buf(),
        pending_material: None,
    };

    let root = context.scene.root();
    for node in &description.nodes {
        build_node(&mut context, root, node)?;
    }

    load_sky(&mut context, description);
    Ok(())
}

fn build_node<A: AssetSource>(
    context: &mut LoadContext<'_, A>,
    parent: super::node::NodeId,
    description: &NodeDescription,
) -> Result<(), SceneError> {
    let name = description.name.clone().unwrap_or_default();

    let kind = match &description.camera {
        Some(camera) => {
            let mut payload = Camera::default();
            if let Some(near) = camera.near {
                payload.set_near(near);
            }
            if let Some(far) = camera.far {
                payload.set_far(far);
            }
            if let Some(fov) = camera.fov {
                payload.set_fov(fov);
            }
            NodeKind::Camera(payload)
        }
        None => NodeKind::Group,
    };

    let mut node = Node::new(name, kind);
    if let Some([x, y, z]) = description.position {
        node.set_position(x, y, z);
    }
    if let Some([x, y, z]) = description.rotation {
        node.set_rotation(x, y, z);
    }
    if let Some([x, y, z]) = description.scale {
        node.set_scale(x, y, z);
    }
    let id = context.scene.add_child(parent, node);

    if let Some(material) = &description.material {
        let material = build_material(context, material);
        context.pending_material = Some(context.scene.materials.add(material));
    }

    if let Some(mesh) = &description.mesh {
        let material = context.pending_material.take().unwrap_or(MaterialId::DEFAULT);
        let path = context.root_dir.join(&mesh.path);
        let transform = mesh.transform.map(matrix_from_column_major);
        importer::import_obj(context.scene, id, &path, material, mesh.transparent, transform)?;
    }

    for child in &description.children {
        build_node(context, id, child)?;
    }

    Ok(())
}

fn build_material<A: AssetSource>(
    context: &mut LoadContext<'_, A>,
    description: &MaterialDescription,
) -> Material {
    let mut material = Material::default();

    if let Some(albedo) = &description.albedo {
        if albedo.len() >= 3 {
            let alpha = albedo.get(3).copied().unwrap_or(1.0);
            material.set_albedo(albedo[0], albedo[1], albedo[2], alpha);
        } else {
            log::warn!("material albedo needs 3 or 4 components, got {}", albedo.len());
        }
    }
    if let Some(metalness) = description.metalness {
        material.set_metalness(metalness);
    }
    if let Some(roughness) = description.roughness {
        material.set_roughness(roughness);
    }
    if let Some([r, g, b]) = description.emission {
        material.set_emission(r, g, b);
    }

    let maps: [(&Option<PathBuf>, bool, fn(&mut Material, TextureResource)); 6] = [
        (&description.albedo_map, true, Material::set_albedo_map),
        (&description.metalness_map, false, Material::set_metalness_map),
        (&description.roughness_map, false, Material::set_roughness_map),
        (&description.normal_map, false, Material::set_normal_map),
        (&description.emission_map, true, Material::set_emission_map),
        (
            &description.ambient_occlusion_map,
            false,
            Material::set_ambient_occlusion_map,
        ),
    ];
    for (path, srgb, set) in maps {
        if let Some(path) = path {
            let path = context.root_dir.join(path);
            match context.assets.load_texture(&path, srgb) {
                Ok(texture) => set(&mut material, texture),
                Err(err) => log::error!("skipping material map: {err}"),
            }
        }
    }

    material
}

fn load_sky<A: AssetSource>(context: &mut LoadContext<'_, A>, description: &SceneDescription) {
    let base = load_one_cubemap(context, &description.skybox, false, "skybox");
    context.scene.set_skybox(base);
    let irradiance = load_one_cubemap(
        context,
        &description.skybox_irradiance,
        false,
        "skybox irradiance",
    );
    context.scene.set_skybox_irradiance(irradiance);
    let radiance = load_one_cubemap(
        context,
        &description.skybox_radiance,
        true,
        "skybox radiance",
    );
    context.scene.set_skybox_radiance(radiance);
}

fn load_one_cubemap<A: AssetSource>(
    context: &mut LoadContext<'_, A>,
    description: &Option<CubemapDescription>,
    with_mips: bool,
    what: &str,
) -> Option<Cubemap> {
    let description = description.as_ref()?;
    let dir = context.root_dir.join(&description.path);
    match context
        .assets
        .load_cubemap(&dir, &description.extension, with_mips)
    {
        Ok(cubemap) => Some(cubemap),
        Err(err) => {
            log::error!("skipping {what}: {err}");
            None
        }
    }
}

fn matrix_from_column_major(values: [f32; 16]) -> Matrix4<f32> {
    let m = &values;
    Matrix4::new(
        m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12], m[13],
        m[14], m[15],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stands in for GPU asset loading; panics if a test description
    /// unexpectedly references image assets.
    struct StubAssets;

    impl AssetSource for StubAssets {
        fn load_texture(&mut self, path: &Path, _srgb: bool) -> Result<TextureResource, SceneError> {
            panic!("test description should not reference textures: {}", path.display());
        }

        fn load_cubemap(
            &mut self,
            dir: &Path,
            _extension: &str,
            _with_mips: bool,
        ) -> Result<Cubemap, SceneError> {
            panic!("test description should not reference cubemaps: {}", dir.display());
        }
    }

    const BASIC_SCENE: &str = r#"{
        "nodes": [
            {
                "name": "world",
                "position": [0.0, 1.0, 0.0],
                "children": [
                    {
                        "name": "eye",
                        "position": [0.0, 2.0, 8.0],
                        "camera": { "near": 0.5, "far": 250.0, "fov": 45.0 }
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_and_builds_node_tree() {
        let mut scene = SceneGraph::new();
        let mut assets = StubAssets;
        load_scene_str(&mut scene, &mut assets, BASIC_SCENE, Path::new(".")).unwrap();

        let root = scene.node(scene.root()).unwrap();
        assert_eq!(root.children().len(), 1);

        let world = scene.node(root.children()[0]).unwrap();
        assert_eq!(world.name, "world");
        assert_eq!(world.position().y, 1.0);
        assert_eq!(world.children().len(), 1);

        let eye = scene.node(world.children()[0]).unwrap();
        let camera = eye.as_camera().unwrap();
        assert_eq!(camera.near(), 0.5);
        assert_eq!(camera.far(), 250.0);
        assert_eq!(camera.fov(), 45.0);
        assert_eq!(scene.main_camera(), Some(world.children()[0]));
    }

    #[test]
    fn scalar_material_needs_no_assets() {
        let json = r#"{
            "nodes": [
                {
                    "name": "holder",
                    "material": {
                        "albedo": [1.0, 0.0, 0.0, 1.0],
                        "metalness": 0.8,
                        "roughness": 0.2
                    }
                }
            ]
        }"#;

        let mut scene = SceneGraph::new();
        let mut assets = StubAssets;
        load_scene_str(&mut scene, &mut assets, json, Path::new(".")).unwrap();

        // Default material plus the described one.
        assert_eq!(scene.materials.len(), 2);
        let material = scene.materials.get(crate::scene::material::MaterialId(1));
        assert_eq!(material.albedo, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(material.metalness, 0.8);
        assert_eq!(material.roughness, 0.2);
    }

    #[test]
    fn albedo_alpha_defaults_to_opaque() {
        let json = r#"{
            "nodes": [
                { "material": { "albedo": [0.2, 0.4, 0.6] } }
            ]
        }"#;

        let mut scene = SceneGraph::new();
        let mut assets = StubAssets;
        load_scene_str(&mut scene, &mut assets, json, Path::new(".")).unwrap();

        let material = scene.materials.get(crate::scene::material::MaterialId(1));
        assert_eq!(material.albedo[3], 1.0);
    }

    #[test]
    fn malformed_json_is_an_error_not_a_panic() {
        let mut scene = SceneGraph::new();
        let mut assets = StubAssets;
        let result = load_scene_str(&mut scene, &mut assets, "{ not json", Path::new("."));
        assert!(matches!(result, Err(SceneError::Parse(_))));
    }

    #[test]
    fn loading_replaces_previous_content() {
        let mut scene = SceneGraph::new();
        scene.add_child(scene.root(), Node::group("stale"));

        let mut assets = StubAssets;
        load_scene_str(&mut scene, &mut assets, r#"{ "nodes": [] }"#, Path::new(".")).unwrap();

        assert!(scene.node(scene.root()).unwrap().children().is_empty());
    }

    #[test]
    fn empty_description_yields_empty_scene() {
        let mut scene = SceneGraph::new();
        let mut assets = StubAssets;
        load_scene_str(&mut scene, &mut assets, "{}", Path::new(".")).unwrap();
        assert!(scene.main_camera().is_none());
        assert!(scene.opaque_meshes().is_empty());
    }

    #[test]
    fn column_major_matrix_roundtrip() {
        let mut values = [0.0f32; 16];
        values[0] = 1.0;
        values[5] = 1.0;
        values[10] = 1.0;
        values[15] = 1.0;
        values[12] = 4.0; // translation x
        let matrix = matrix_from_column_major(values);
        assert_eq!(matrix.w.x, 4.0);
        assert_eq!(matrix.x.x, 1.0);
    }
}
