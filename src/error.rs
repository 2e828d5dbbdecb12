//! Error types for the rasterizer core
//!
//! Every failure here is a precondition violation reported at construction
//! or call time. Culled triangles and out-of-bounds pixel writes are not
//! errors and never show up here.

use std::fmt;

/// Error type for the rasterizer core
#[derive(Debug, Clone, PartialEq)]
pub enum RasterError {
    /// Output resolution (or texture size) is too small or not a power of two
    InvalidSize { what: &'static str, size: usize },
    /// Rendering parameter outside its allowed range (e.g. MSAA factor)
    InvalidConfig(String),
    /// Pixel buffer length does not match the declared dimensions
    SizeMismatch { expected: usize, actual: usize },
    /// log2(size) + 1 is not a whole number of mipmap levels
    InvalidMipmapLevel { size: usize },
    /// 2x downscale requested for an odd width or height
    OddDimension { width: usize, height: usize },
    /// Texture coordinate outside [0, 1]
    OutOfRange { u: f32, v: f32 },
    /// Matrix with (near) zero determinant cannot be inverted
    SingularMatrix { determinant: f32 },
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::InvalidSize { what, size } => write!(f, "Invalid {} size: {}", what, size),
            RasterError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            RasterError::SizeMismatch { expected, actual } => {
                write!(f, "Size mismatch: expected {} values, got {}", expected, actual)
            }
            RasterError::InvalidMipmapLevel { size } => {
                write!(f, "Cannot build a whole number of mipmap levels for size {}", size)
            }
            RasterError::OddDimension { width, height } => {
                write!(f, "Cannot downscale odd dimensions {}x{}", width, height)
            }
            RasterError::OutOfRange { u, v } => write!(f, "Texture coordinate ({}, {}) out of range", u, v),
            RasterError::SingularMatrix { determinant } => {
                write!(f, "Matrix is not invertible (determinant {})", determinant)
            }
        }
    }
}

impl std::error::Error for RasterError {}
