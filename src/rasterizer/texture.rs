//! Square power-of-two textures with a mipmap pyramid
//!
//! Texel rows are stored bottom-up: row 0 is v = 0. Colors are `Vec4`
//! in 0-255 range (x = r, y = g, z = b, w = a).

use super::math::{lerp_v, Vec4};
use crate::error::RasterError;

/// Texture with precomputed mipmap levels (level 0 = full resolution)
#[derive(Debug, Clone)]
pub struct Texture {
    size: usize,
    mipmap: Vec<Vec<Vec4>>,
    enable_mipmap: bool,
    pub name: String,
}

impl Texture {
    /// Build a texture from `size * size` texels and generate its mipmaps
    pub fn new(size: usize, data: Vec<Vec4>) -> Result<Self, RasterError> {
        if size * size != data.len() {
            return Err(RasterError::SizeMismatch {
                expected: size * size,
                actual: data.len(),
            });
        }
        if size > 1 && !size.is_power_of_two() {
            return Err(RasterError::InvalidSize { what: "texture", size });
        }

        let mipmap = create_mipmap(size, data)?;

        Ok(Self {
            size,
            mipmap,
            enable_mipmap: true,
            name: String::new(),
        })
    }

    /// Build a texture from tightly packed RGBA8 rows, top row first
    /// (the layout image decoders produce)
    pub fn from_rgba8(width: usize, height: usize, bytes: &[u8]) -> Result<Self, RasterError> {
        if width != height {
            return Err(RasterError::InvalidSize { what: "non-square texture", size: width.max(height) });
        }
        if bytes.len() != width * height * 4 {
            return Err(RasterError::SizeMismatch {
                expected: width * height * 4,
                actual: bytes.len(),
            });
        }

        let mut data = Vec::with_capacity(width * height);
        for row in bytes.chunks_exact(width * 4).rev() {
            data.extend(row.chunks_exact(4).map(|p| {
                Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32)
            }));
        }

        Self::new(width, data)
    }

    /// Create a checkerboard test texture
    pub fn checkerboard(size: usize, cell: usize, color1: Vec4, color2: Vec4) -> Result<Self, RasterError> {
        let cell = cell.max(1);
        let mut data = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let checker = ((x / cell) + (y / cell)) % 2 == 0;
                data.push(if checker { color1 } else { color2 });
            }
        }
        let mut tex = Self::new(size, data)?;
        tex.name = "checkerboard".to_string();
        Ok(tex)
    }

    /// Single-color texture
    pub fn solid(size: usize, color: Vec4) -> Result<Self, RasterError> {
        Self::new(size, vec![color; size * size])
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_mipmap(mut self, enabled: bool) -> Self {
        self.enable_mipmap = enabled;
        self
    }

    pub fn mipmap_enabled(&self) -> bool {
        self.enable_mipmap
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of mipmap levels, including level 0
    pub fn levels(&self) -> usize {
        self.mipmap.len()
    }

    /// Texels of one mipmap level
    pub fn level(&self, lod: usize) -> Option<&[Vec4]> {
        self.mipmap.get(lod).map(|l| l.as_slice())
    }

    /// Sample at (u, v) in [0, 1]. `lod` is the level of detail where 0 is
    /// full resolution; it only matters when mipmapping is enabled.
    ///
    /// The LOD is clamped to `[0, levels - 2]`. Below 1 the full-resolution
    /// level is sampled directly, otherwise levels `floor(lod - 1)` and the
    /// one above it are blended.
    pub fn query(&self, u: f32, v: f32, lod: f32) -> Result<Vec4, RasterError> {
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return Err(RasterError::OutOfRange { u, v });
        }

        if !self.enable_mipmap {
            return Ok(self.query_naive(u, v));
        }

        let max_lod = self.levels().saturating_sub(2) as f32;
        let lod = if lod.is_nan() { 0.0 } else { lod.clamp(0.0, max_lod) };

        if lod < 1.0 {
            Ok(self.query_naive(u, v))
        } else {
            Ok(self.query_trilinear(u, v, lod))
        }
    }

    /// Nearest texel of level 0
    pub fn query_naive(&self, u: f32, v: f32) -> Vec4 {
        let x = ((u * self.size as f32) as usize).min(self.size - 1);
        let y = ((v * self.size as f32) as usize).min(self.size - 1);
        self.mipmap[0][y * self.size + x]
    }

    /// Blend of levels `floor(lod - 1)` and the next coarser one, weighted
    /// by the fractional part of `lod`
    pub fn query_trilinear(&self, u: f32, v: f32, lod: f32) -> Vec4 {
        let max_level = self.levels() - 1;
        let shifted = (lod - 1.0).max(0.0);
        let h = (shifted.floor() as usize).min(max_level);
        let l = (h + 1).min(max_level);
        let t = (shifted - h as f32).clamp(0.0, 1.0);

        let dim_h = (self.size >> h) as f32;
        let dim_l = (self.size >> l) as f32;
        let ch = self.query_bilinear(h, u * dim_h, v * dim_h);
        let cl = self.query_bilinear(l, u * dim_l, v * dim_l);
        lerp_v(ch, cl, t)
    }

    /// Bilinear sample of level `lod` at texel-space position (x, y).
    /// The 2x2 window is shifted inward at the borders.
    pub fn query_bilinear(&self, lod: usize, x: f32, y: f32) -> Vec4 {
        let dim = self.size >> lod;
        let level = &self.mipmap[lod];
        if dim <= 1 {
            return level[0];
        }

        let (x0, s) = bilinear_window(x, dim);
        let (y0, t) = bilinear_window(y, dim);

        let texel = |tx: usize, ty: usize| level[ty * dim + tx];
        let bottom = lerp_v(texel(x0, y0), texel(x0 + 1, y0), s);
        let top = lerp_v(texel(x0, y0 + 1), texel(x0 + 1, y0 + 1), s);
        lerp_v(bottom, top, t)
    }
}

/// Left texel index of the 2-texel window around texel-space `p` and the
/// blend factor toward the right texel
fn bilinear_window(p: f32, dim: usize) -> (usize, f32) {
    let centered = p - 0.5;
    let i0 = (centered.floor().max(0.0) as usize).min(dim - 2);
    let frac = (centered - i0 as f32).clamp(0.0, 1.0);
    (i0, frac)
}

/// Number of mipmap levels for a square texture of `size`
pub fn mipmap_levels(size: usize) -> Result<usize, RasterError> {
    if !size.is_power_of_two() {
        return Err(RasterError::InvalidMipmapLevel { size });
    }
    Ok(size.trailing_zeros() as usize + 1)
}

/// Build the pyramid from `size x size` down to 1x1
pub fn create_mipmap(size: usize, data: Vec<Vec4>) -> Result<Vec<Vec<Vec4>>, RasterError> {
    let levels = mipmap_levels(size)?;
    let mut mipmap = Vec::with_capacity(levels);
    mipmap.push(data);

    let mut dim = size;
    for _ in 1..levels {
        let next = scale_down_2x(dim, dim, &mipmap[mipmap.len() - 1])?;
        mipmap.push(next);
        dim /= 2;
    }

    Ok(mipmap)
}

/// Average every 2x2 block into one value. Width and height must be even.
pub fn scale_down_2x(width: usize, height: usize, buf: &[Vec4]) -> Result<Vec<Vec4>, RasterError> {
    if width % 2 != 0 || height % 2 != 0 {
        return Err(RasterError::OddDimension { width, height });
    }
    if buf.len() != width * height {
        return Err(RasterError::SizeMismatch {
            expected: width * height,
            actual: buf.len(),
        });
    }

    let (w2, h2) = (width / 2, height / 2);
    let mut out = Vec::with_capacity(w2 * h2);
    for y in 0..h2 {
        for x in 0..w2 {
            let i = (2 * y) * width + 2 * x;
            let sum = buf[i] + buf[i + 1] + buf[i + width] + buf[i + width + 1];
            out.push(sum.scale(0.25));
        }
    }
    Ok(out)
}
