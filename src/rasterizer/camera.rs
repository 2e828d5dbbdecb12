//! Camera: view placement plus a perspective or orthographic projection

use serde::{Serialize, Deserialize};

use super::math::{Mat4, Vec4};

/// Projection model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half the visible height in world units
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y, aspect, near, far } => {
                Mat4::perspective(fov_y, aspect, near, far)
            }
            Projection::Orthographic { half_height, aspect, near, far } => {
                let half_width = half_height * aspect;
                Mat4::orthographic(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }
}

/// Camera looking from `position` toward `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec4,
    pub target: Vec4,
    pub up: Vec4,
    pub projection: Projection,
}

impl Camera {
    pub fn perspective(position: Vec4, target: Vec4, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: position.to_point(),
            target: target.to_point(),
            up: Vec4::UP,
            projection: Projection::Perspective { fov_y, aspect, near, far },
        }
    }

    pub fn orthographic(position: Vec4, target: Vec4, half_height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position: position.to_point(),
            target: target.to_point(),
            up: Vec4::UP,
            projection: Projection::Orthographic { half_height, aspect, near, far },
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    pub fn proj_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Perspective cameras need perspective-correct attribute interpolation
    pub fn is_perspective(&self) -> bool {
        matches!(self.projection, Projection::Perspective { .. })
    }

    /// Orbit the eye around `target` about the world up axis
    pub fn orbit(&self, angle: f32) -> Self {
        let offset = self.position - self.target;
        let rotated = Mat4::rotation(Vec4::UP, angle).apply(offset.to_direction());
        Self {
            position: (self.target + rotated).to_point(),
            ..*self
        }
    }
}
