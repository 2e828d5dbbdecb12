//! Triangle meshes in model space
//!
//! Pure data plus a fan-triangulating iterator. Positions, normals and
//! UVs live in separate arrays; each face corner indexes into them.

use serde::{Serialize, Deserialize};

use crate::rasterizer::{Mat4, Material, Vec4, Vertex};
use super::SceneError;

/// One corner of a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceVertex {
    pub position: usize,
    pub uv: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceVertex {
    /// Same index into positions, UVs and normals
    pub fn shared(index: usize) -> Self {
        Self {
            position: index,
            uv: Some(index),
            normal: Some(index),
        }
    }
}

/// A polygon, counter-clockwise when seen from the front
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: Vec<FaceVertex>,
}

impl Face {
    pub fn new(vertices: Vec<FaceVertex>) -> Self {
        Self { vertices }
    }

    /// Create a triangle face with shared attribute indices
    pub fn tri(v0: usize, v1: usize, v2: usize) -> Self {
        Self::new(vec![FaceVertex::shared(v0), FaceVertex::shared(v1), FaceVertex::shared(v2)])
    }

    /// Create a quad face with shared attribute indices
    pub fn quad(v0: usize, v1: usize, v2: usize, v3: usize) -> Self {
        Self::new(vec![
            FaceVertex::shared(v0),
            FaceVertex::shared(v1),
            FaceVertex::shared(v2),
            FaceVertex::shared(v3),
        ])
    }
}

/// Mesh with its material and model transform
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec4>,
    pub normals: Vec<Vec4>,
    pub uvs: Vec<Vec4>,
    pub faces: Vec<Face>,
    pub material: Material,
    /// Model-to-world transform
    pub model: Mat4,
}

impl Mesh {
    /// Build a mesh, rejecting faces with fewer than three corners or
    /// indices past the end of their attribute arrays
    pub fn new(
        positions: Vec<Vec4>,
        normals: Vec<Vec4>,
        uvs: Vec<Vec4>,
        faces: Vec<Face>,
        material: Material,
    ) -> Result<Self, SceneError> {
        for (i, face) in faces.iter().enumerate() {
            if face.vertices.len() < 3 {
                return Err(SceneError::InvalidMesh(format!(
                    "face {} has {} vertices",
                    i,
                    face.vertices.len()
                )));
            }
            for fv in &face.vertices {
                let in_range = fv.position < positions.len()
                    && fv.uv.map_or(true, |t| t < uvs.len())
                    && fv.normal.map_or(true, |n| n < normals.len());
                if !in_range {
                    return Err(SceneError::InvalidMesh(format!("face {} indexes past the vertex data", i)));
                }
            }
        }

        Ok(Self {
            positions: positions.into_iter().map(Vec4::to_point).collect(),
            normals: normals.into_iter().map(Vec4::to_direction).collect(),
            uvs,
            faces,
            material,
            model: Mat4::identity(),
        })
    }

    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    pub fn translated(self, t: Vec4) -> Self {
        let model = self.model.translate(t);
        self.with_model(model)
    }

    pub fn scaled(self, s: Vec4) -> Self {
        let model = self.model.scale(s);
        self.with_model(model)
    }

    pub fn rotated(self, axis: Vec4, angle: f32) -> Self {
        let model = self.model.rotate(axis, angle);
        self.with_model(model)
    }

    /// Number of triangles after fan triangulation
    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|f| f.vertices.len().saturating_sub(2)).sum()
    }

    /// Model-space triangles, fanned from each face's first corner
    pub fn triangles(&self) -> impl Iterator<Item = [Vertex; 3]> + '_ {
        self.faces.iter().flat_map(move |face| {
            let corners = &face.vertices;
            (1..corners.len().saturating_sub(1))
                .filter_map(move |i| self.triangle(corners[0], corners[i], corners[i + 1]))
        })
    }

    fn triangle(&self, a: FaceVertex, b: FaceVertex, c: FaceVertex) -> Option<[Vertex; 3]> {
        let pa = *self.positions.get(a.position)?;
        let pb = *self.positions.get(b.position)?;
        let pc = *self.positions.get(c.position)?;
        let face_normal = (pb - pa).cross(pc - pa).normalize();

        let vertex = |fv: FaceVertex, position: Vec4| Vertex {
            position,
            normal: fv
                .normal
                .and_then(|n| self.normals.get(n).copied())
                .unwrap_or(face_normal),
            uv: fv.uv.and_then(|t| self.uvs.get(t).copied()).unwrap_or(Vec4::ZERO),
        };

        Some([vertex(a, pa), vertex(b, pb), vertex(c, pc)])
    }

    /// Unit cube centered on the origin (side 2), one quad per side
    pub fn cube(material: Material) -> Self {
        // Each side: outward normal and corners counter-clockwise from outside
        let sides: [(Vec4, [(f32, f32, f32); 4]); 6] = [
            (Vec4::direction(0.0, 0.0, 1.0), [(-1.0, -1.0, 1.0), (1.0, -1.0, 1.0), (1.0, 1.0, 1.0), (-1.0, 1.0, 1.0)]),
            (Vec4::direction(0.0, 0.0, -1.0), [(1.0, -1.0, -1.0), (-1.0, -1.0, -1.0), (-1.0, 1.0, -1.0), (1.0, 1.0, -1.0)]),
            (Vec4::direction(1.0, 0.0, 0.0), [(1.0, -1.0, 1.0), (1.0, -1.0, -1.0), (1.0, 1.0, -1.0), (1.0, 1.0, 1.0)]),
            (Vec4::direction(-1.0, 0.0, 0.0), [(-1.0, -1.0, -1.0), (-1.0, -1.0, 1.0), (-1.0, 1.0, 1.0), (-1.0, 1.0, -1.0)]),
            (Vec4::direction(0.0, 1.0, 0.0), [(-1.0, 1.0, 1.0), (1.0, 1.0, 1.0), (1.0, 1.0, -1.0), (-1.0, 1.0, -1.0)]),
            (Vec4::direction(0.0, -1.0, 0.0), [(-1.0, -1.0, -1.0), (1.0, -1.0, -1.0), (1.0, -1.0, 1.0), (-1.0, -1.0, 1.0)]),
        ];
        let corner_uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];

        let mut positions = Vec::with_capacity(24);
        let mut normals = Vec::with_capacity(24);
        let mut uvs = Vec::with_capacity(24);
        let mut faces = Vec::with_capacity(6);

        for (normal, corners) in sides {
            let base = positions.len();
            for ((x, y, z), (u, v)) in corners.into_iter().zip(corner_uvs) {
                positions.push(Vec4::point(x, y, z));
                normals.push(normal);
                uvs.push(Vec4::new(u, v, 0.0, 0.0));
            }
            faces.push(Face::quad(base, base + 1, base + 2, base + 3));
        }

        Self {
            positions,
            normals,
            uvs,
            faces,
            material,
            model: Mat4::identity(),
        }
    }

    /// Square in the xz plane facing +y
    pub fn plane(half_extent: f32, material: Material) -> Self {
        let h = half_extent;
        Self {
            positions: vec![
                Vec4::point(-h, 0.0, h),
                Vec4::point(h, 0.0, h),
                Vec4::point(h, 0.0, -h),
                Vec4::point(-h, 0.0, -h),
            ],
            normals: vec![Vec4::UP; 4],
            uvs: vec![
                Vec4::new(0.0, 0.0, 0.0, 0.0),
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(1.0, 1.0, 0.0, 0.0),
                Vec4::new(0.0, 1.0, 0.0, 0.0),
            ],
            faces: vec![Face::quad(0, 1, 2, 3)],
            material,
            model: Mat4::identity(),
        }
    }
}
