//! Scene module - what a render call draws
//!
//! - Meshes with materials and explicit model matrices
//! - One point light and one camera
//! - RON scene descriptions that build all of the above

mod loader;
mod mesh;

pub use loader::*;
pub use mesh::*;

use crate::rasterizer::{Camera, PointLight};

/// Everything one frame needs. Read-only during a render pass.
#[derive(Debug, Clone)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    pub light: PointLight,
    pub camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera, light: PointLight) -> Self {
        Self {
            meshes: Vec::new(),
            light,
            camera,
        }
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }
}
