//! Image rendering for GFS raster products.
//!
//! - 8-bit grayscale and RGBA PNG encoding, grayscale decoding
//! - Gaussian smoothing and linear resampling of scalar fields
//! - Contour lines (marching squares)
//! - Wind arrows and streamlines

pub mod contour;
pub mod error;
pub mod png;
pub mod resample;
pub mod smoothing;
pub mod vectors;

pub use error::{RenderError, Result};
