//! Axis-aligned bounding boxes for triangle/viewport overlap tests

use super::math::Vec4;

/// Axis-aligned bounding box over x, y, z
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec4,
    pub max: Vec4,
}

impl Aabb {
    /// Box with explicit corners (e.g. the viewport volume)
    pub fn new(min: Vec4, max: Vec4) -> Self {
        Self {
            min: min.to_point(),
            max: max.to_point(),
        }
    }

    /// Tightest box around three points
    pub fn from_triangle(v1: Vec4, v2: Vec4, v3: Vec4) -> Self {
        Self {
            min: Vec4::point(
                v1.x.min(v2.x).min(v3.x),
                v1.y.min(v2.y).min(v3.y),
                v1.z.min(v2.z).min(v3.z),
            ),
            max: Vec4::point(
                v1.x.max(v2.x).max(v3.x),
                v1.y.max(v2.y).max(v3.y),
                v1.z.max(v2.z).max(v3.z),
            ),
        }
    }

    /// Overlap on all three axes. Shared boundaries count as intersecting.
    pub fn intersect(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
            && self.min.y <= other.max.y && self.max.y >= other.min.y
            && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Check if a point is inside the box
    pub fn contains(&self, point: Vec4) -> bool {
        point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }
}
