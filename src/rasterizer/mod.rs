//! CPU software rasterizer for triangle meshes
//!
//! Features:
//! - Perspective-correct attribute interpolation
//! - Larger-z-is-nearer depth buffering
//! - Mipmapped (trilinear) texture sampling
//! - Blinn-Phong shading from a single point light
//! - Wireframe overlay and MSAA box-filter resolve

mod aabb;
mod camera;
mod math;
mod render;
mod shading;
mod texture;
mod types;

pub use aabb::*;
pub use camera::*;
pub use math::*;
pub use render::*;
pub use shading::*;
pub use texture::*;
pub use types::*;
