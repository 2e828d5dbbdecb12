//! Core rendering functions
//! Triangle scan-conversion with depth buffering, mipmapped texturing,
//! Blinn-Phong shading, wireframe overlay and MSAA resolve

use log::debug;

use super::aabb::Aabb;
use super::math::{lerp, lerp_v, Mat4, Vec4};
use super::shading::{blinn_phong, shade_color};
use super::texture::scale_down_2x;
use super::types::{Material, PointLight, Vertex};
use crate::error::RasterError;
use crate::scene::{Mesh, Scene};

/// Depth buffer clear value. Larger z is nearer, so anything above this passes.
pub const DEPTH_CLEAR: f32 = -1.0;

/// Maximum depth mismatch for a wireframe pixel to count as on the surface
pub const WIREFRAME_EPSILON: f32 = 1e-3;

/// Clip-space w at or below this is behind (or on) the eye plane
const NEAR_W_EPSILON: f32 = 1e-6;

/// Triangles with less screen area than this are treated as degenerate
const DEGENERATE_AREA: f32 = 1e-8;

/// Fixed view direction in screen space
const VIEW_DIR: Vec4 = Vec4 { x: 0.0, y: 0.0, z: -1.0, w: 0.0 };

/// Bounds-checked write into a row-major buffer. Writes outside
/// `[0, width) x [0, height)` are dropped and return false.
pub fn update_buffer<T: Copy>(buf: &mut [T], width: usize, height: usize, x: i32, y: i32, value: T) -> bool {
    if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
        return false;
    }
    match buf.get_mut(y as usize * width + x as usize) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Framebuffer for software rendering. Row 0 is the bottom of the image.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub color: Vec<Vec4>,
    pub depth: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            color: vec![Vec4::rgb(0.0, 0.0, 0.0); width * height],
            depth: vec![DEPTH_CLEAR; width * height],
            width,
            height,
        }
    }

    /// Reset to opaque black and the far depth sentinel
    pub fn clear(&mut self) {
        self.color.fill(Vec4::rgb(0.0, 0.0, 0.0));
        self.depth.fill(DEPTH_CLEAR);
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Vec4> {
        self.index(x, y).map(|i| self.color[i])
    }

    pub fn depth_at(&self, x: i32, y: i32) -> Option<f32> {
        self.index(x, y).map(|i| self.depth[i])
    }

    /// True iff `z` is strictly nearer than the stored depth
    pub fn pass_depth_test(&self, x: i32, y: i32, z: f32) -> bool {
        match self.depth_at(x, y) {
            Some(stored) => z > stored,
            None => false,
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Vec4) -> bool {
        update_buffer(&mut self.color, self.width, self.height, x, y, color)
    }

    /// Store depth and color of one fragment together
    pub fn write_fragment(&mut self, x: i32, y: i32, z: f32, color: Vec4) {
        if update_buffer(&mut self.depth, self.width, self.height, x, y, z) {
            self.set_pixel(x, y, color);
        }
    }

    /// Draw a line from `from` to `to` using Bresenham's algorithm.
    /// A pixel is only colored where the linearly interpolated line depth
    /// is within `epsilon` of the stored depth. Returns pixels drawn.
    pub fn draw_line(&mut self, from: Vec4, to: Vec4, color: Vec4, epsilon: f32) -> usize {
        let (mut x0, mut y0) = (from.x.floor() as i32, from.y.floor() as i32);
        let (mut x1, mut y1) = (to.x.floor() as i32, to.y.floor() as i32);
        let (mut z0, mut z1) = (from.z, to.z);

        // Walk along the major axis, always in increasing order
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
            std::mem::swap(&mut z0, &mut z1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        let y_step = if y0 < y1 { 1 } else { -1 };
        let mut err = dx / 2;
        let mut y = y0;
        let mut drawn = 0;

        for x in x0..=x1 {
            let t = if dx == 0 { 0.0 } else { (x - x0) as f32 / dx as f32 };
            let z = lerp(z0, z1, t);
            let (px, py) = if steep { (y, x) } else { (x, y) };

            if let Some(stored) = self.depth_at(px, py) {
                if (stored - z).abs() <= epsilon && self.set_pixel(px, py, color) {
                    drawn += 1;
                }
            }

            err -= dy;
            if err < 0 {
                y += y_step;
                err += dx;
            }
        }

        drawn
    }
}

// ============================================================================
// Vertex stage
// ============================================================================

/// Per-mesh transforms handed to the vertex stage
#[derive(Debug, Clone, Copy)]
pub struct Uniforms {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Mat4,
    /// Inverse-transpose of `model`
    pub normal: Mat4,
    /// Interpolate attributes with 1/w weights
    pub perspective: bool,
}

impl Uniforms {
    pub fn new(model: Mat4, view: Mat4, projection: Mat4, viewport: Mat4, perspective: bool) -> Result<Self, RasterError> {
        Ok(Self {
            model,
            view,
            projection,
            viewport,
            normal: model.normal_matrix()?,
            perspective,
        })
    }
}

/// Vertex after the vertex stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedVertex {
    /// Pixel x, y and NDC depth (w = 1)
    pub screen: Vec4,
    /// 1 / clip w (1 for orthographic projections)
    pub inv_w: f32,
    /// World-space position for lighting
    pub world: Vec4,
    /// World-space unit normal
    pub normal: Vec4,
    pub uv: Vec4,
}

impl ShadedVertex {
    /// Vertex already in screen space, with identity lighting data
    pub fn from_screen(x: f32, y: f32, z: f32) -> Self {
        Self {
            screen: Vec4::point(x, y, z),
            inv_w: 1.0,
            world: Vec4::point(x, y, z),
            normal: Vec4::direction(0.0, 0.0, 1.0),
            uv: Vec4::ZERO,
        }
    }
}

/// Vertex after model, view and projection, before the perspective divide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipVertex {
    pub clip: Vec4,
    /// World-space position for lighting
    pub world: Vec4,
    /// World-space normal
    pub normal: Vec4,
    pub uv: Vec4,
}

impl ClipVertex {
    /// Signed distance to the near plane in clip space; >= 0 is in front.
    /// Both projections map the near plane to z = w.
    pub fn near_distance(&self) -> f32 {
        self.clip.w - self.clip.z
    }

    fn lerp(a: &ClipVertex, b: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: lerp_v(a.clip, b.clip, t),
            world: lerp_v(a.world, b.world, t),
            normal: lerp_v(a.normal, b.normal, t),
            uv: lerp_v(a.uv, b.uv, t),
        }
    }
}

/// Model, view and projection transforms of one vertex
pub fn transform_vertex(uniforms: &Uniforms, vertex: &Vertex) -> ClipVertex {
    let world = uniforms.model.apply(vertex.position.to_point());
    ClipVertex {
        clip: uniforms.projection.apply(uniforms.view.apply(world)),
        world,
        normal: uniforms.normal.apply(vertex.normal.to_direction()).normalize(),
        uv: vertex.uv,
    }
}

/// Perspective divide and viewport transform. Returns `None` when clip w
/// is too close to zero to divide by.
pub fn project_vertex(uniforms: &Uniforms, v: &ClipVertex) -> Option<ShadedVertex> {
    if v.clip.w <= NEAR_W_EPSILON {
        return None;
    }

    let screen = uniforms.viewport.apply(v.clip).scale(1.0 / v.clip.w);
    let inv_w = if uniforms.perspective { 1.0 / v.clip.w } else { 1.0 };

    Some(ShadedVertex {
        screen,
        inv_w,
        world: v.world,
        normal: v.normal.normalize(),
        uv: v.uv,
    })
}

/// Transform one vertex to screen space. Returns `None` when the vertex
/// lies behind the eye plane and cannot be perspective-divided.
pub fn vertex_shader(uniforms: &Uniforms, vertex: &Vertex) -> Option<ShadedVertex> {
    project_vertex(uniforms, &transform_vertex(uniforms, vertex))
}

/// Clip a triangle against the near plane. Returns zero, one or two
/// triangles with the original winding; attributes on the cut edges are
/// interpolated linearly in clip space.
pub fn clip_near(tri: &[ClipVertex; 3]) -> Vec<[ClipVertex; 3]> {
    let mut polygon: Vec<ClipVertex> = Vec::with_capacity(4);
    for i in 0..3 {
        let a = &tri[i];
        let b = &tri[(i + 1) % 3];
        let (da, db) = (a.near_distance(), b.near_distance());
        if da >= 0.0 {
            polygon.push(*a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            polygon.push(ClipVertex::lerp(a, b, da / (da - db)));
        }
    }

    (1..polygon.len().saturating_sub(1))
        .map(|i| [polygon[0], polygon[i], polygon[i + 1]])
        .collect()
}

// ============================================================================
// Triangle helpers
// ============================================================================

/// Signed doubled area of (a, b, p) in the xy plane
fn edge_function(a: Vec4, b: Vec4, p: Vec4) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Barycentric coordinates of `p` in triangle (a, b, c), z ignored.
/// Degenerate triangles give (-1, -1, -1), which rejects every pixel.
pub fn compute_barycentric(p: Vec4, a: Vec4, b: Vec4, c: Vec4) -> [f32; 3] {
    let area = edge_function(a, b, c);
    if area.abs() < DEGENERATE_AREA {
        return [-1.0, -1.0, -1.0];
    }

    let alpha = edge_function(b, c, p) / area;
    let beta = edge_function(c, a, p) / area;
    [alpha, beta, 1.0 - alpha - beta]
}

/// Weighted sum of three attributes
pub fn barycentric_interpolation(weights: [f32; 3], a: Vec4, b: Vec4, c: Vec4) -> Vec4 {
    a.scale(weights[0]) + b.scale(weights[1]) + c.scale(weights[2])
}

/// Screen-space barycentrics reweighted by 1/w so attributes interpolate
/// correctly under perspective
pub fn perspective_weights(bary: [f32; 3], inv_w: [f32; 3]) -> [f32; 3] {
    let w = [bary[0] * inv_w[0], bary[1] * inv_w[1], bary[2] * inv_w[2]];
    let sum = w[0] + w[1] + w[2];
    if sum.abs() < f32::EPSILON {
        return bary;
    }
    [w[0] / sum, w[1] / sum, w[2] / sum]
}

/// Screen-space winding test. Edge-on triangles (dot == 0) count as back faces.
pub fn is_backfacing(a: Vec4, b: Vec4, c: Vec4) -> bool {
    let normal = (b - a).cross(c - a);
    normal.dot(VIEW_DIR) >= 0.0
}

/// The three edges of a triangle, in winding order
pub fn wireframe_edges(v: [Vec4; 3]) -> [(Vec4, Vec4); 3] {
    [(v[0], v[1]), (v[1], v[2]), (v[2], v[0])]
}

/// Mipmap level from the UV footprint of one pixel: 0 is full resolution,
/// each step up halves it
pub fn mipmap_level(uv: Vec4, uv_dx: Vec4, uv_dy: Vec4, texture_size: usize) -> f32 {
    let len2 = |d: Vec4| (d.x * d.x + d.y * d.y).sqrt();
    let rho = len2(uv_dx - uv).max(len2(uv_dy - uv)) * texture_size as f32;
    if rho > 0.0 {
        rho.log2()
    } else {
        0.0
    }
}

/// Downsample a supersampled buffer `log2(msaa)` times
pub fn antialiasing(buf: &[Vec4], width: usize, height: usize, msaa: usize) -> Result<Vec<Vec4>, RasterError> {
    check_msaa(msaa)?;
    let mut out = buf.to_vec();
    let (mut w, mut h) = (width, height);
    let mut factor = msaa;
    while factor > 1 {
        out = scale_down_2x(w, h, &out)?;
        w /= 2;
        h /= 2;
        factor /= 2;
    }
    Ok(out)
}

fn check_msaa(msaa: usize) -> Result<(), RasterError> {
    if !msaa.is_power_of_two() {
        return Err(RasterError::InvalidConfig(format!(
            "MSAA factor must be a power of two >= 1, got {}",
            msaa
        )));
    }
    Ok(())
}

// ============================================================================
// Rasterizer
// ============================================================================

/// Per-render counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub triangles: usize,
    /// Entirely behind the near plane
    pub near_rejected: usize,
    /// Straddling the near plane and cut down to the visible part
    pub near_clipped: usize,
    pub backface_culled: usize,
    pub viewport_culled: usize,
    pub drawn: usize,
    pub fragments: usize,
    pub wireframe_pixels: usize,
}

/// Single-threaded scan-conversion rasterizer
pub struct Rasterizer {
    width: usize,
    height: usize,
    msaa: usize,
    framebuffer: Framebuffer,
    stats: RenderStats,
}

impl Rasterizer {
    /// `width` x `height` is the output resolution; rendering happens at
    /// `msaa` times that in each direction
    pub fn new(width: usize, height: usize, msaa: usize) -> Result<Self, RasterError> {
        if width == 0 {
            return Err(RasterError::InvalidSize { what: "output width", size: width });
        }
        if height == 0 {
            return Err(RasterError::InvalidSize { what: "output height", size: height });
        }
        check_msaa(msaa)?;

        Ok(Self {
            width,
            height,
            msaa,
            framebuffer: Framebuffer::new(width * msaa, height * msaa),
            stats: RenderStats::default(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn msaa(&self) -> usize {
        self.msaa
    }

    /// Supersampled buffers of the last render
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Clear buffers and counters before drawing individual triangles
    pub fn begin_frame(&mut self) {
        self.framebuffer.clear();
        self.stats = RenderStats::default();
    }

    /// Render every mesh of `scene` and return `width * height` colors,
    /// row-major, bottom row first
    pub fn render(&mut self, scene: &Scene) -> Result<Vec<Vec4>, RasterError> {
        self.begin_frame();

        let view = scene.camera.view_matrix();
        let projection = scene.camera.proj_matrix();
        let viewport = Mat4::viewport(self.framebuffer.width as f32, self.framebuffer.height as f32);
        let perspective = scene.camera.is_perspective();

        for mesh in &scene.meshes {
            let uniforms = Uniforms::new(mesh.model, view, projection, viewport, perspective)?;

            for tri in mesh.triangles() {
                self.stats.triangles += 1;
                let clip = tri.map(|v| transform_vertex(&uniforms, &v));

                match clip.iter().filter(|v| v.near_distance() >= 0.0).count() {
                    0 => self.stats.near_rejected += 1,
                    3 => self.draw_clip_triangle(&uniforms, &clip, mesh, scene)?,
                    _ => {
                        self.stats.near_clipped += 1;
                        for piece in clip_near(&clip) {
                            self.draw_clip_triangle(&uniforms, &piece, mesh, scene)?;
                        }
                    }
                }
            }
        }

        debug!(
            "Rendered {} triangles: {} drawn, {} back-facing, {} off-screen, {} behind eye, {} near-clipped, {} fragments",
            self.stats.triangles,
            self.stats.drawn,
            self.stats.backface_culled,
            self.stats.viewport_culled,
            self.stats.near_rejected,
            self.stats.near_clipped,
            self.stats.fragments,
        );

        antialiasing(&self.framebuffer.color, self.framebuffer.width, self.framebuffer.height, self.msaa)
    }

    /// Project a triangle already in front of the near plane and draw it
    fn draw_clip_triangle(
        &mut self,
        uniforms: &Uniforms,
        tri: &[ClipVertex; 3],
        mesh: &Mesh,
        scene: &Scene,
    ) -> Result<(), RasterError> {
        match (
            project_vertex(uniforms, &tri[0]),
            project_vertex(uniforms, &tri[1]),
            project_vertex(uniforms, &tri[2]),
        ) {
            (Some(a), Some(b), Some(c)) => {
                self.draw_triangle(&[a, b, c], &mesh.material, &scene.light, scene.camera.position)
            }
            _ => {
                self.stats.near_rejected += 1;
                Ok(())
            }
        }
    }

    /// Cull, scan-convert, shade and (optionally) outline one triangle
    pub fn draw_triangle(
        &mut self,
        tri: &[ShadedVertex; 3],
        material: &Material,
        light: &PointLight,
        eye: Vec4,
    ) -> Result<(), RasterError> {
        let [s1, s2, s3] = [tri[0].screen, tri[1].screen, tri[2].screen];

        if is_backfacing(s1, s2, s3) {
            self.stats.backface_culled += 1;
            return Ok(());
        }

        let bounds = Aabb::from_triangle(s1, s2, s3);
        let screen = Aabb::new(
            Vec4::point(0.0, 0.0, -1.0),
            Vec4::point(self.framebuffer.width as f32, self.framebuffer.height as f32, 1.0),
        );
        if !bounds.intersect(&screen) {
            self.stats.viewport_culled += 1;
            return Ok(());
        }

        self.stats.drawn += 1;
        self.rasterize(tri, &bounds, material, light, eye)?;

        if material.show_wireframe {
            for (from, to) in wireframe_edges([s1, s2, s3]) {
                self.stats.wireframe_pixels +=
                    self.framebuffer.draw_line(from, to, material.wireframe_color, WIREFRAME_EPSILON);
            }
        }

        Ok(())
    }

    fn rasterize(
        &mut self,
        tri: &[ShadedVertex; 3],
        bounds: &Aabb,
        material: &Material,
        light: &PointLight,
        eye: Vec4,
    ) -> Result<(), RasterError> {
        let [v1, v2, v3] = tri;
        let (s1, s2, s3) = (v1.screen, v2.screen, v3.screen);
        let inv_w = [v1.inv_w, v2.inv_w, v3.inv_w];

        // Pre-divide by w; undone by the interpolated 1/w
        let uv_at = |px: f32, py: f32| {
            let bary = compute_barycentric(Vec4::point(px, py, 0.0), s1, s2, s3);
            barycentric_interpolation(perspective_weights(bary, inv_w), v1.uv, v2.uv, v3.uv)
        };

        let texture = &material.texture;
        let fb_w = self.framebuffer.width as i32;
        let fb_h = self.framebuffer.height as i32;

        // Pixel box grown by one on each side so edge pixels are not missed
        let x_min = (bounds.min.x.floor() as i32 - 1).max(0);
        let x_max = (bounds.max.x.ceil() as i32 + 1).min(fb_w - 1);
        let y_min = (bounds.min.y.floor() as i32 - 1).max(0);
        let y_max = (bounds.max.y.ceil() as i32 + 1).min(fb_h - 1);

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let bary = compute_barycentric(Vec4::point(px, py, 0.0), s1, s2, s3);
                if bary.iter().any(|&b| b < 0.0) {
                    continue;
                }

                let z = bary[0] * s1.z + bary[1] * s2.z + bary[2] * s3.z;
                if !self.framebuffer.pass_depth_test(x, y, z) {
                    continue;
                }

                let weights = perspective_weights(bary, inv_w);
                let uv = barycentric_interpolation(weights, v1.uv, v2.uv, v3.uv);
                let normal = barycentric_interpolation(weights, v1.normal, v2.normal, v3.normal).normalize();
                let world = barycentric_interpolation(weights, v1.world, v2.world, v3.world).to_point();

                let lod = if texture.mipmap_enabled() {
                    mipmap_level(uv, uv_at(px + 1.0, py), uv_at(px, py + 1.0), texture.size())
                } else {
                    0.0
                };

                let texel = texture.query(uv.x.clamp(0.0, 1.0), uv.y.clamp(0.0, 1.0), lod)?;
                let intensity = blinn_phong(world, normal, &material.shading, light, eye);
                let color = shade_color(texel, intensity, light);

                self.framebuffer.write_fragment(x, y, z, color);
                self.stats.fragments += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::f32::consts::FRAC_PI_2;
    use crate::rasterizer::{Camera, Texture, ShadingMode, ShadingOptions};
    use crate::scene::{Face, FaceVertex, Mesh, Scene};

    const WHITE: Vec4 = Vec4 { x: 255.0, y: 255.0, z: 255.0, w: 255.0 };
    const BLACK: Vec4 = Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 255.0 };
    const RED: Vec4 = Vec4 { x: 255.0, y: 0.0, z: 0.0, w: 255.0 };

    fn unlit_material() -> Material {
        let tex = Texture::solid(2, WHITE).unwrap().with_mipmap(false);
        Material::new(Arc::new(tex)).with_shading(ShadingOptions {
            mode: ShadingMode::Unlit,
            ..ShadingOptions::default()
        })
    }

    fn light() -> PointLight {
        PointLight::new(Vec4::point(0.0, 0.0, 10.0))
    }

    fn eye() -> Vec4 {
        Vec4::point(0.0, 0.0, 10.0)
    }

    fn screen_tri(pts: [(f32, f32); 3], z: f32) -> [ShadedVertex; 3] {
        pts.map(|(x, y)| ShadedVertex::from_screen(x, y, z))
    }

    fn lit_pixels(fb: &Framebuffer) -> usize {
        fb.color.iter().filter(|c| **c != BLACK).count()
    }

    fn textured(tex: Texture) -> Material {
        Material::new(Arc::new(tex)).with_shading(unlit_material().shading)
    }

    /// Quad with uv (0,0), (1,0), (1,1), (0,1) at its corners
    fn quad(corners: [(f32, f32, f32); 4], material: Material) -> Mesh {
        let positions = corners.iter().map(|&(x, y, z)| Vec4::point(x, y, z)).collect();
        let uvs = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]
            .iter()
            .map(|&(u, v)| Vec4::new(u, v, 0.0, 0.0))
            .collect();
        let face = Face::new((0..4).map(|i| FaceVertex { position: i, uv: Some(i), normal: None }).collect());
        Mesh::new(positions, Vec::new(), uvs, vec![face], material).unwrap()
    }

    fn clip_vertex(clip: Vec4, uv: Vec4) -> ClipVertex {
        ClipVertex {
            clip,
            world: Vec4::point(0.0, 0.0, 0.0),
            normal: Vec4::direction(0.0, 0.0, 1.0),
            uv,
        }
    }

    #[test]
    fn test_barycentric_at_vertices() {
        let a = Vec4::point(1.0, 1.0, 0.0);
        let b = Vec4::point(8.0, 2.0, 0.0);
        let c = Vec4::point(3.0, 7.0, 0.0);
        let expect: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for (p, e) in [a, b, c].iter().zip(expect.iter()) {
            let bary = compute_barycentric(*p, a, b, c);
            for i in 0..3 {
                assert!((bary[i] - e[i]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_barycentric_sums_to_one() {
        let a = Vec4::point(0.0, 0.0, 0.0);
        let b = Vec4::point(10.0, 0.0, 0.0);
        let c = Vec4::point(0.0, 10.0, 0.0);
        for p in [Vec4::point(2.0, 3.0, 0.0), Vec4::point(-4.0, 20.0, 0.0), Vec4::point(5.0, 5.0, 0.0)] {
            let bary = compute_barycentric(p, a, b, c);
            assert!((bary.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
        // Outside point has a negative weight
        let outside = compute_barycentric(Vec4::point(8.0, 8.0, 0.0), a, b, c);
        assert!(outside.iter().any(|&w| w < 0.0));
    }

    #[test]
    fn test_degenerate_barycentric_rejects() {
        let a = Vec4::point(0.0, 0.0, 0.0);
        let b = Vec4::point(1.0, 1.0, 0.0);
        let c = Vec4::point(2.0, 2.0, 0.0);
        assert_eq!(compute_barycentric(b, a, b, c), [-1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_interpolation_reproduces_vertex() {
        let a = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vec4::new(-5.0, 0.5, 9.0, 0.0);
        let c = Vec4::new(7.0, 7.0, 7.0, 7.0);
        assert_eq!(barycentric_interpolation([1.0, 0.0, 0.0], a, b, c), a);
        assert_eq!(barycentric_interpolation([0.0, 1.0, 0.0], a, b, c), b);
        assert_eq!(barycentric_interpolation([0.0, 0.0, 1.0], a, b, c), c);
    }

    #[test]
    fn test_perspective_weights_favor_near_vertex() {
        let w = perspective_weights([0.5, 0.5, 0.0], [1.0, 0.25, 1.0]);
        assert!((w[0] - 0.8).abs() < 1e-6);
        assert!((w[1] - 0.2).abs() < 1e-6);
        // Uniform 1/w leaves weights unchanged
        let w = perspective_weights([0.2, 0.3, 0.5], [1.0, 1.0, 1.0]);
        assert!((w[0] - 0.2).abs() < 1e-6 && (w[1] - 0.3).abs() < 1e-6 && (w[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_depth_test() {
        let mut fb = Framebuffer::new(4, 4);
        assert!(fb.pass_depth_test(1, 1, -0.999));
        assert!(!fb.pass_depth_test(1, 1, -1.0));
        fb.write_fragment(1, 1, 0.5, WHITE);
        assert!(!fb.pass_depth_test(1, 1, 0.5));
        assert!(fb.pass_depth_test(1, 1, 0.6));
        assert!(!fb.pass_depth_test(9, 1, 0.9));
    }

    #[test]
    fn test_update_buffer_discards_out_of_bounds() {
        let mut buf = vec![0u8; 6];
        assert!(!update_buffer(&mut buf, 3, 2, -1, 0, 9));
        assert!(!update_buffer(&mut buf, 3, 2, 3, 0, 9));
        assert!(!update_buffer(&mut buf, 3, 2, 0, 2, 9));
        assert_eq!(buf, vec![0u8; 6]);
        assert!(update_buffer(&mut buf, 3, 2, 2, 1, 9));
        assert_eq!(buf[5], 9);
    }

    #[test]
    fn test_clear_resets_buffers() {
        let mut fb = Framebuffer::new(2, 2);
        fb.write_fragment(0, 0, 0.3, RED);
        fb.clear();
        assert_eq!(fb.pixel(0, 0), Some(BLACK));
        assert_eq!(fb.depth_at(0, 0), Some(DEPTH_CLEAR));
    }

    #[test]
    fn test_backface_policy() {
        let a = Vec4::point(0.0, 0.0, 0.0);
        let b = Vec4::point(4.0, 0.0, 0.0);
        let c = Vec4::point(0.0, 4.0, 0.0);
        assert!(!is_backfacing(a, b, c));
        assert!(is_backfacing(a, c, b));
        // Edge-on triangle is culled
        assert!(is_backfacing(a, b, Vec4::point(8.0, 0.0, 0.0)));
    }

    #[test]
    fn test_wireframe_triangle_scenario() {
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        r.begin_frame();
        let tri = screen_tri([(9.0, 0.0), (0.0, 9.0), (0.0, 0.0)], 0.5);

        let edges = wireframe_edges([tri[0].screen, tri[1].screen, tri[2].screen]);
        assert_eq!(edges.len(), 3);
        let diagonal = edges.iter().filter(|(from, to)| {
            let d = *to - *from;
            d.x.abs() == 9.0 && d.y.abs() == 9.0 && d.x == -d.y && d.z == 0.0
        });
        assert_eq!(diagonal.count(), 1);

        let material = unlit_material().with_wireframe(RED);
        r.draw_triangle(&tri, &material, &light(), eye()).unwrap();

        let fb = r.framebuffer();
        // Bottom edge pixels sit on the filled surface and are outlined
        assert_eq!(fb.pixel(4, 0), Some(RED));
        assert_eq!(fb.pixel(0, 4), Some(RED));
        // Interior stays filled
        assert_eq!(fb.pixel(3, 3), Some(WHITE));
        // Line pixels with no surface behind them are skipped
        assert_eq!(fb.pixel(9, 0), Some(BLACK));
        assert!(r.stats().wireframe_pixels > 0);
    }

    #[test]
    fn test_fill_covers_pixel_centers() {
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        r.begin_frame();
        let tri = screen_tri([(9.5, 0.0), (0.0, 9.5), (0.0, 0.0)], 0.0);
        r.draw_triangle(&tri, &unlit_material(), &light(), eye()).unwrap();
        // Centers (x + 0.5, y + 0.5) with x + y <= 8
        assert_eq!(lit_pixels(r.framebuffer()), 45);
        assert_eq!(r.stats().fragments, 45);
    }

    #[test]
    fn test_backfacing_triangle_writes_nothing() {
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        r.begin_frame();
        let tri = screen_tri([(0.0, 0.0), (0.0, 9.0), (9.0, 0.0)], 0.0);
        r.draw_triangle(&tri, &unlit_material(), &light(), eye()).unwrap();
        assert_eq!(lit_pixels(r.framebuffer()), 0);
        assert_eq!(r.stats().backface_culled, 1);
    }

    #[test]
    fn test_offscreen_triangle_is_culled() {
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        r.begin_frame();
        let tri = screen_tri([(30.0, 20.0), (40.0, 20.0), (30.0, 30.0)], 0.0);
        r.draw_triangle(&tri, &unlit_material(), &light(), eye()).unwrap();
        // Behind the far plane
        let far = screen_tri([(0.0, 0.0), (9.0, 0.0), (0.0, 9.0)], -2.0);
        r.draw_triangle(&far, &unlit_material(), &light(), eye()).unwrap();
        assert_eq!(lit_pixels(r.framebuffer()), 0);
        assert_eq!(r.stats().viewport_culled, 2);
    }

    #[test]
    fn test_straddling_triangle_clipped_to_screen() {
        let mut r = Rasterizer::new(8, 8, 1).unwrap();
        r.begin_frame();
        let tri = screen_tri([(-20.0, -20.0), (40.0, -20.0), (-20.0, 40.0)], 0.0);
        r.draw_triangle(&tri, &unlit_material(), &light(), eye()).unwrap();
        let fb = r.framebuffer();
        assert_eq!(fb.color.len(), 64);
        assert_eq!(lit_pixels(fb), 64);
        assert_eq!(r.stats().fragments, 64);
    }

    #[test]
    fn test_nearer_triangle_wins() {
        let mut r = Rasterizer::new(8, 8, 1).unwrap();
        r.begin_frame();
        let far = unlit_material();
        let near = Material::new(Arc::new(Texture::solid(1, RED).unwrap())).with_shading(far.shading);
        let pts = [(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)];
        r.draw_triangle(&screen_tri(pts, 0.5), &near, &light(), eye()).unwrap();
        r.draw_triangle(&screen_tri(pts, 0.1), &far, &light(), eye()).unwrap();
        assert_eq!(r.framebuffer().pixel(1, 1), Some(RED));
        let depth = r.framebuffer().depth_at(1, 1).unwrap();
        assert!((depth - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_mipmap_level() {
        let uv = Vec4::new(0.5, 0.5, 0.0, 0.0);
        // One texel per pixel
        let lod = mipmap_level(uv, Vec4::new(0.5 + 1.0 / 64.0, 0.5, 0.0, 0.0), uv, 64);
        assert!(lod.abs() < 1e-4);
        // Four texels per pixel
        let lod = mipmap_level(uv, uv, Vec4::new(0.5, 0.5 + 4.0 / 64.0, 0.0, 0.0), 64);
        assert!((lod - 2.0).abs() < 1e-4);
        assert_eq!(mipmap_level(uv, uv, uv, 64), 0.0);
    }

    #[test]
    fn test_antialiasing_box_filter() {
        let buf = [
            Vec4::rgb(255.0, 255.0, 255.0),
            Vec4::rgb(0.0, 0.0, 0.0),
            Vec4::rgb(0.0, 0.0, 0.0),
            Vec4::rgb(255.0, 255.0, 255.0),
        ];
        let out = antialiasing(&buf, 2, 2, 2).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].approx_eq(Vec4::rgb(127.5, 127.5, 127.5), 1e-4));
    }

    #[test]
    fn test_antialiasing_identity_without_msaa() {
        let buf = vec![RED, WHITE, BLACK];
        assert_eq!(antialiasing(&buf, 3, 1, 1).unwrap(), buf);
    }

    #[test]
    fn test_antialiasing_two_passes() {
        let mut buf = vec![BLACK; 16];
        buf[0] = Vec4::rgb(160.0, 160.0, 160.0);
        let out = antialiasing(&buf, 4, 4, 4).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(Rasterizer::new(0, 10, 1), Err(RasterError::InvalidSize { .. })));
        assert!(matches!(Rasterizer::new(10, 10, 3), Err(RasterError::InvalidConfig(_))));
        assert!(matches!(Rasterizer::new(10, 10, 0), Err(RasterError::InvalidConfig(_))));
        let r = Rasterizer::new(10, 6, 4).unwrap();
        assert_eq!(r.framebuffer().width, 40);
        assert_eq!(r.framebuffer().height, 24);
    }

    #[test]
    fn test_clip_near_splits_straddling_triangle() {
        let tri = [
            clip_vertex(Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(0.0, 0.0, 0.0, 0.0)),
            clip_vertex(Vec4::new(1.0, 0.0, 0.0, 1.0), Vec4::new(1.0, 0.0, 0.0, 0.0)),
            clip_vertex(Vec4::new(0.0, 1.0, 3.0, 1.0), Vec4::new(0.0, 1.0, 0.0, 0.0)),
        ];
        let pieces = clip_near(&tri);
        assert_eq!(pieces.len(), 2);
        for piece in &pieces {
            for v in piece {
                assert!(v.near_distance() >= -1e-6);
            }
        }
        // Cut point on edge b -> c, one third of the way along
        let cut = pieces[0][2];
        assert!(cut.clip.approx_eq(Vec4::new(2.0 / 3.0, 1.0 / 3.0, 1.0, 1.0), 1e-5));
        assert!(cut.uv.approx_eq(Vec4::new(2.0 / 3.0, 1.0 / 3.0, 0.0, 0.0), 1e-5));

        // One vertex in front leaves a single smaller triangle
        let tri = [tri[2], tri[0], tri[1]].map(|mut v| {
            v.clip.z = 3.0 - v.clip.z;
            v
        });
        assert_eq!(clip_near(&tri).len(), 1);
    }

    #[test]
    fn test_clip_near_trivial_cases() {
        let inside = [
            clip_vertex(Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::ZERO),
            clip_vertex(Vec4::new(1.0, 0.0, 0.5, 1.0), Vec4::ZERO),
            clip_vertex(Vec4::new(0.0, 1.0, -0.5, 1.0), Vec4::ZERO),
        ];
        assert_eq!(clip_near(&inside), vec![inside]);

        let behind = inside.map(|mut v| {
            v.clip.z = 2.0;
            v
        });
        assert!(clip_near(&behind).is_empty());
    }

    #[test]
    fn test_floor_through_camera_is_clipped_not_dropped() {
        // Camera one unit above a large floor, looking 45 degrees down.
        // Both floor triangles have corners behind the eye.
        let camera = Camera::perspective(
            Vec4::point(0.0, 1.0, 0.0),
            Vec4::point(0.0, 0.0, -1.0),
            FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        );
        let scene = Scene::new(camera, light()).with_mesh(Mesh::plane(10.0, unlit_material()));
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        let frame = r.render(&scene).unwrap();

        let stats = r.stats();
        assert_eq!(stats.near_clipped, 2);
        assert_eq!(stats.near_rejected, 0);
        // Lower half of the view looks at floor within one unit of the camera
        for y in 0..8 {
            for x in 0..16 {
                assert_eq!(frame[y * 16 + x], WHITE, "pixel ({}, {})", x, y);
            }
        }
        // Top row looks past the far edge of the floor
        assert_eq!(frame[15 * 16 + 8], BLACK);
    }

    #[test]
    fn test_receding_plane_is_perspective_correct() {
        // Floor from z = -2 to z = -6 with v = 0.5 at z = -4; camera at
        // height 1 looking down -z. z = -4 projects to screen row 24 of 64,
        // while screen-linear interpolation would put the edge near row 21.
        let camera = Camera::perspective(
            Vec4::point(0.0, 1.0, 0.0),
            Vec4::point(0.0, 1.0, -1.0),
            FRAC_PI_2,
            1.0,
            0.1,
            100.0,
        );
        let tex = Texture::new(2, vec![WHITE, WHITE, BLACK, BLACK]).unwrap().with_mipmap(false);
        let floor = quad([(-4.0, 0.0, -2.0), (4.0, 0.0, -2.0), (4.0, 0.0, -6.0), (-4.0, 0.0, -6.0)], textured(tex));
        let scene = Scene::new(camera, light()).with_mesh(floor);
        let mut r = Rasterizer::new(64, 64, 1).unwrap();
        let frame = r.render(&scene).unwrap();

        let at = |row: usize| frame[row * 64 + 48];
        assert_eq!(at(22), WHITE);
        assert_eq!(at(23), WHITE);
        assert_eq!(at(24), BLACK);
        assert_eq!(at(25), BLACK);
    }

    #[test]
    fn test_minified_texture_samples_coarser_level() {
        // 64x64 one-texel checkerboard squeezed onto 16x16 pixels: four
        // texels per pixel, so every level above 0 is uniform gray
        let camera = Camera::orthographic(Vec4::point(0.0, 0.0, 5.0), Vec4::point(0.0, 0.0, 0.0), 1.0, 1.0, 0.1, 10.0);
        let corners = [(-1.0, -1.0, 0.0), (1.0, -1.0, 0.0), (1.0, 1.0, 0.0), (-1.0, 1.0, 0.0)];
        let checker = Texture::checkerboard(64, 1, WHITE, BLACK).unwrap();

        let scene = Scene::new(camera, light()).with_mesh(quad(corners, textured(checker.clone())));
        let mut r = Rasterizer::new(16, 16, 1).unwrap();
        let frame = r.render(&scene).unwrap();
        for c in [frame[8 * 16 + 8], frame[3 * 16 + 12]] {
            assert!((c.x - 127.5).abs() < 1.0, "got {}", c.x);
        }

        // Without mipmaps every pixel is a single full-resolution texel
        let scene = Scene::new(camera, light()).with_mesh(quad(corners, textured(checker.with_mipmap(false))));
        let frame = r.render(&scene).unwrap();
        let c = frame[8 * 16 + 8];
        assert!(c.x == 0.0 || c.x == 255.0);
    }

    #[test]
    fn test_vertex_shader_rejects_behind_eye() {
        let uniforms = Uniforms::new(
            Mat4::identity(),
            Mat4::look_at(Vec4::point(0.0, 0.0, 5.0), Vec4::point(0.0, 0.0, 0.0), Vec4::UP),
            Mat4::perspective(1.0, 1.0, 0.1, 100.0),
            Mat4::viewport(10.0, 10.0),
            true,
        )
        .unwrap();
        assert!(vertex_shader(&uniforms, &Vertex::from_pos(0.0, 0.0, 6.0)).is_none());
        let v = vertex_shader(&uniforms, &Vertex::from_pos(0.0, 0.0, 0.0)).unwrap();
        assert!((v.screen.x - 5.0).abs() < 1e-4);
        assert!((v.screen.y - 5.0).abs() < 1e-4);
        assert!((v.inv_w - 0.2).abs() < 1e-5);
    }
}
