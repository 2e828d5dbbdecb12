//! Softraster: a CPU triangle rasterizer
//!
//! Scene (meshes, camera, light) in, row-major RGBA float pixels out.
//! Single-threaded; every render call runs to completion or returns an error.

pub mod error;
pub mod output;
pub mod rasterizer;
pub mod scene;

pub use error::RasterError;
pub use rasterizer::{Camera, Material, PointLight, Rasterizer, Texture, Vec4};
pub use scene::{Mesh, Scene, SceneDesc, SceneError};
