//! Core types for the rasterizer

use std::sync::Arc;
use serde::{Serialize, Deserialize};

use super::math::Vec4;
use super::texture::Texture;

/// A vertex with position, normal, and texture coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    /// Homogeneous position (w = 1)
    pub position: Vec4,
    /// Surface normal (w = 0)
    pub normal: Vec4,
    /// Texture coordinate in x, y; z and w are unused
    pub uv: Vec4,
}

impl Vertex {
    pub fn new(position: Vec4, normal: Vec4, uv: Vec4) -> Self {
        Self { position, normal, uv }
    }

    pub fn from_pos(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec4::point(x, y, z),
            normal: Vec4::ZERO,
            uv: Vec4::ZERO,
        }
    }
}

/// Shading mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingMode {
    /// Raw texture color
    Unlit,
    /// Ambient + diffuse + specular from the scene's point light
    #[default]
    BlinnPhong,
}

/// Reflectance coefficients for Blinn-Phong
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingOptions {
    pub mode: ShadingMode,
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub shininess: f32,
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            mode: ShadingMode::BlinnPhong,
            ambient: 0.2,
            diffuse: 0.7,
            specular: 0.3,
            shininess: 32.0,
        }
    }
}

/// Surface appearance of a mesh
#[derive(Debug, Clone)]
pub struct Material {
    pub texture: Arc<Texture>,
    pub show_wireframe: bool,
    pub wireframe_color: Vec4,
    pub shading: ShadingOptions,
}

impl Material {
    pub fn new(texture: Arc<Texture>) -> Self {
        Self {
            texture,
            show_wireframe: false,
            wireframe_color: Vec4::rgb(255.0, 255.0, 255.0),
            shading: ShadingOptions::default(),
        }
    }

    pub fn with_wireframe(mut self, color: Vec4) -> Self {
        self.show_wireframe = true;
        self.wireframe_color = color;
        self
    }

    pub fn with_shading(mut self, shading: ShadingOptions) -> Self {
        self.shading = shading;
        self
    }
}

/// Point light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec4,
    /// 0-255 per channel; white leaves shaded colors untinted
    pub color: Vec4,
}

impl PointLight {
    pub fn new(position: Vec4) -> Self {
        Self {
            position: position.to_point(),
            color: Vec4::rgb(255.0, 255.0, 255.0),
        }
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }
}
