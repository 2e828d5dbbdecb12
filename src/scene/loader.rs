//! Scene description loading and saving
//!
//! Uses RON (Rusty Object Notation) for human-readable scene files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use serde::{Serialize, Deserialize};

use crate::error::RasterError;
use crate::rasterizer::{Camera, Mat4, Material, PointLight, Projection, ShadingOptions, Texture, Vec4};
use super::{Face, FaceVertex, Mesh, Scene};

/// (x, y, z) or (r, g, b)
pub type Triple = (f32, f32, f32);

const WHITE: Triple = (255.0, 255.0, 255.0);

fn point(t: Triple) -> Vec4 {
    Vec4::point(t.0, t.1, t.2)
}

fn direction(t: Triple) -> Vec4 {
    Vec4::direction(t.0, t.1, t.2)
}

fn color(t: Triple) -> Vec4 {
    Vec4::rgb(t.0, t.1, t.2)
}

/// Error type for scene loading
#[derive(Debug)]
pub enum SceneError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    ImageError(image::ImageError),
    RasterError(RasterError),
    UnknownTexture(String),
    InvalidMesh(String),
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for SceneError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneError::ParseError(e)
    }
}

impl From<ron::Error> for SceneError {
    fn from(e: ron::Error) -> Self {
        SceneError::SerializeError(e)
    }
}

impl From<image::ImageError> for SceneError {
    fn from(e: image::ImageError) -> Self {
        SceneError::ImageError(e)
    }
}

impl From<RasterError> for SceneError {
    fn from(e: RasterError) -> Self {
        SceneError::RasterError(e)
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::IoError(e) => write!(f, "IO error: {}", e),
            SceneError::ParseError(e) => write!(f, "Parse error: {}", e),
            SceneError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            SceneError::ImageError(e) => write!(f, "Image error: {}", e),
            SceneError::RasterError(e) => write!(f, "{}", e),
            SceneError::UnknownTexture(name) => write!(f, "Unknown texture: {}", name),
            SceneError::InvalidMesh(msg) => write!(f, "Invalid mesh: {}", msg),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::IoError(e) => Some(e),
            SceneError::ParseError(e) => Some(e),
            SceneError::SerializeError(e) => Some(e),
            SceneError::ImageError(e) => Some(e),
            SceneError::RasterError(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Description types
// ============================================================================

/// Output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Supersampling factor per axis (power of two)
    pub msaa: usize,
    /// Enable mipmapped sampling on every texture
    pub mipmap: bool,
    /// Frames of a turntable orbit; 1 renders a still
    pub frames: usize,
    /// Total orbit angle across all frames
    pub turntable_degrees: f32,
    pub output: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            msaa: 1,
            mipmap: true,
            frames: 1,
            turntable_degrees: 360.0,
            output: "render.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ProjectionDesc {
    /// (vertical fov in degrees, near, far)
    Perspective(f32, f32, f32),
    /// (half height, near, far)
    Orthographic(f32, f32, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDesc {
    pub position: Triple,
    #[serde(default)]
    pub target: Triple,
    #[serde(default = "default_up")]
    pub up: Triple,
    pub projection: ProjectionDesc,
}

fn default_up() -> Triple {
    (0.0, 1.0, 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDesc {
    pub position: Triple,
    #[serde(default = "default_light_color")]
    pub color: Triple,
}

fn default_light_color() -> Triple {
    WHITE
}

/// Where texture pixels come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextureSource {
    /// Image file, relative to the scene file
    File(String),
    /// (size, cell, color a, color b)
    Checkerboard(usize, usize, Triple, Triple),
    /// (size, color)
    Solid(usize, Triple),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeDesc {
    Cube,
    /// Square in the xz plane with the given half extent
    Plane(f32),
    /// Indexed triangles/polygons; normals and uvs share the position index
    Triangles {
        positions: Vec<Triple>,
        #[serde(default)]
        normals: Vec<Triple>,
        #[serde(default)]
        uvs: Vec<(f32, f32)>,
        faces: Vec<Vec<usize>>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    /// Name in `SceneDesc::textures`; plain white when absent
    pub texture: Option<String>,
    /// Wireframe overlay color
    pub wireframe: Option<Triple>,
    pub shading: ShadingOptions,
}

/// Model transform step, applied in list order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransformOp {
    Translate(f32, f32, f32),
    Scale(f32, f32, f32),
    /// (axis, degrees)
    Rotate(Triple, f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDesc {
    pub shape: ShapeDesc,
    #[serde(default)]
    pub material: MaterialDesc,
    #[serde(default)]
    pub transform: Vec<TransformOp>,
}

/// A complete scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub render: RenderConfig,
    pub camera: CameraDesc,
    pub light: LightDesc,
    #[serde(default)]
    pub textures: BTreeMap<String, TextureSource>,
    pub meshes: Vec<MeshDesc>,
}

impl SceneDesc {
    pub fn aspect(&self) -> f32 {
        self.render.width as f32 / self.render.height.max(1) as f32
    }

    pub fn camera(&self) -> Camera {
        let aspect = self.aspect();
        let projection = match self.camera.projection {
            ProjectionDesc::Perspective(fov, near, far) => Projection::Perspective {
                fov_y: fov.to_radians(),
                aspect,
                near,
                far,
            },
            ProjectionDesc::Orthographic(half_height, near, far) => Projection::Orthographic {
                half_height,
                aspect,
                near,
                far,
            },
        };
        Camera {
            position: point(self.camera.position),
            target: point(self.camera.target),
            up: direction(self.camera.up),
            projection,
        }
    }

    /// Load textures and assemble meshes. Relative texture paths resolve
    /// against `base_dir`.
    pub fn build(&self, base_dir: &Path) -> Result<Scene, SceneError> {
        let mut textures = BTreeMap::new();
        for (name, source) in &self.textures {
            let tex = load_texture(name, source, base_dir)?.with_mipmap(self.render.mipmap);
            info!("Loaded texture: {} ({}x{}, {} levels)", name, tex.size(), tex.size(), tex.levels());
            textures.insert(name.clone(), Arc::new(tex));
        }
        let fallback = Arc::new(Texture::solid(1, color(WHITE))?.with_name("white"));

        let light = PointLight::new(point(self.light.position)).with_color(color(self.light.color));
        let mut scene = Scene::new(self.camera(), light);
        for (i, desc) in self.meshes.iter().enumerate() {
            let mesh = build_mesh(desc, &textures, &fallback)?;
            if mesh.triangle_count() == 0 {
                warn!("Mesh {} has no faces and will draw nothing", i);
            }
            scene.meshes.push(mesh);
        }

        info!("Scene ready: {} meshes, {} triangles", scene.meshes.len(), scene.triangle_count());
        Ok(scene)
    }
}

fn load_texture(name: &str, source: &TextureSource, base_dir: &Path) -> Result<Texture, SceneError> {
    let tex = match source {
        TextureSource::File(file) => {
            let path = base_dir.join(file);
            let img = image::open(&path)?.to_rgba8();
            let (width, height) = img.dimensions();
            Texture::from_rgba8(width as usize, height as usize, img.as_raw())?
        }
        TextureSource::Checkerboard(size, cell, a, b) => Texture::checkerboard(*size, *cell, color(*a), color(*b))?,
        TextureSource::Solid(size, c) => Texture::solid(*size, color(*c))?,
    };
    Ok(tex.with_name(name))
}

fn build_mesh(
    desc: &MeshDesc,
    textures: &BTreeMap<String, Arc<Texture>>,
    fallback: &Arc<Texture>,
) -> Result<Mesh, SceneError> {
    let texture = match &desc.material.texture {
        Some(name) => textures
            .get(name)
            .cloned()
            .ok_or_else(|| SceneError::UnknownTexture(name.clone()))?,
        None => Arc::clone(fallback),
    };
    let mut material = Material::new(texture).with_shading(desc.material.shading);
    if let Some(c) = desc.material.wireframe {
        material = material.with_wireframe(color(c));
    }

    let mesh = match &desc.shape {
        ShapeDesc::Cube => Mesh::cube(material),
        ShapeDesc::Plane(half_extent) => Mesh::plane(*half_extent, material),
        ShapeDesc::Triangles { positions, normals, uvs, faces } => {
            if !normals.is_empty() && normals.len() != positions.len() {
                return Err(SceneError::InvalidMesh("normals must match positions".to_string()));
            }
            if !uvs.is_empty() && uvs.len() != positions.len() {
                return Err(SceneError::InvalidMesh("uvs must match positions".to_string()));
            }
            let corner = |i: usize| FaceVertex {
                position: i,
                uv: (!uvs.is_empty()).then_some(i),
                normal: (!normals.is_empty()).then_some(i),
            };
            Mesh::new(
                positions.iter().copied().map(point).collect(),
                normals.iter().copied().map(direction).collect(),
                uvs.iter().map(|&(u, v)| Vec4::new(u, v, 0.0, 0.0)).collect(),
                faces.iter().map(|f| Face::new(f.iter().copied().map(corner).collect())).collect(),
                material,
            )?
        }
    };

    Ok(mesh.with_model(model_matrix(&desc.transform)))
}

/// Fold transform steps into one model matrix
pub fn model_matrix(ops: &[TransformOp]) -> Mat4 {
    ops.iter().fold(Mat4::identity(), |m, op| match *op {
        TransformOp::Translate(x, y, z) => m.translate(Vec4::direction(x, y, z)),
        TransformOp::Scale(x, y, z) => m.scale(Vec4::direction(x, y, z)),
        TransformOp::Rotate(axis, degrees) => m.rotate(direction(axis), degrees.to_radians()),
    })
}

/// Load a scene description from a RON file
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneDesc, SceneError> {
    let contents = fs::read_to_string(path)?;
    load_scene_from_str(&contents)
}

/// Load a scene description from a RON string
pub fn load_scene_from_str(s: &str) -> Result<SceneDesc, SceneError> {
    Ok(ron::from_str(s)?)
}

/// Save a scene description to a RON file
pub fn save_scene<P: AsRef<Path>>(desc: &SceneDesc, path: P) -> Result<(), SceneError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(4)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(desc, config)?;
    fs::write(path, contents)?;
    Ok(())
}
