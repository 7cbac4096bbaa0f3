//! Error types for rendering and PNG encoding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Buffer of {len} bytes does not match {width}x{height} with {channels} channel(s)")]
    DimensionMismatch {
        width: usize,
        height: usize,
        channels: usize,
        len: usize,
    },

    #[error("Cannot create a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error("PNG decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Grids differ in shape: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
}

impl RenderError {
    pub(crate) fn check_len(buf: &[u8], width: usize, height: usize, channels: usize) -> Result<()> {
        if buf.len() != width * height * channels {
            return Err(Self::DimensionMismatch {
                width,
                height,
                channels,
                len: buf.len(),
            });
        }
        Ok(())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
