//! Frame output: float pixels to RGBA8 and PNG files

use std::path::{Path, PathBuf};

use crate::rasterizer::Vec4;

/// Convert a rendered frame (bottom row first, 0-255 floats) into
/// top-down RGBA8 bytes
pub fn to_rgba8(frame: &[Vec4], width: usize, height: usize) -> Vec<u8> {
    let to_byte = |v: f32| v.clamp(0.0, 255.0).round() as u8;
    let mut bytes = Vec::with_capacity(width * height * 4);
    for row in frame.chunks_exact(width).take(height).rev() {
        for c in row {
            bytes.extend_from_slice(&[to_byte(c.x), to_byte(c.y), to_byte(c.z), to_byte(c.w)]);
        }
    }
    bytes
}

/// Encode a rendered frame to an image file (format from the extension)
pub fn save_png<P: AsRef<Path>>(path: P, frame: &[Vec4], width: usize, height: usize) -> image::ImageResult<()> {
    let bytes = to_rgba8(frame, width, height);
    let img = image::RgbaImage::from_raw(width as u32, height as u32, bytes).ok_or_else(|| {
        image::ImageError::Parameter(image::error::ParameterError::from_kind(
            image::error::ParameterErrorKind::DimensionMismatch,
        ))
    })?;
    img.save(path)
}

/// `render.png` -> `render_007.png`
pub fn frame_path(base: &Path, index: usize) -> PathBuf {
    let stem = base.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let ext = base.extension().map(|e| e.to_string_lossy().to_string()).unwrap_or_else(|| "png".to_string());
    base.with_file_name(format!("{}_{:03}.{}", stem, index, ext))
}
