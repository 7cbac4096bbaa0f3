//! Error types for the raster pipeline.

use std::path::{Path, PathBuf};

use grib2_parser::Grib2Error;
use renderer::RenderError;
use thiserror::Error;

/// Errors that can occur while producing rasters and derived products.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source grid could not be decoded or subset.
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Grib2Error,
    },

    /// Every finite value in the field is the same.
    #[error("degenerate value range in {}: every value equals {value}", .path.display())]
    DegenerateRange { path: PathBuf, value: f64 },

    /// The field has no finite values at all.
    #[error("no finite values in {}", .path.display())]
    NoFiniteValues { path: PathBuf },

    /// No metadata records exist for a family.
    #[error("no rasters with metadata for {parameter} {level}")]
    NoData { parameter: String, level: String },

    /// A metadata record lacks the local extrema needed to decode its raster.
    #[error("{} has no {key}", .path.display())]
    MissingExtent { path: PathBuf, key: &'static str },

    /// Two rasters cannot be combined into a wind product.
    #[error("cannot pair {} with {}: {reason}", .u.display(), .v.display())]
    PairMismatch {
        u: PathBuf,
        v: PathBuf,
        reason: String,
    },

    /// A metadata or phase file is malformed.
    #[error("malformed metadata in {}: {reason}", .path.display())]
    Metadata { path: PathBuf, reason: String },

    /// The family is not in a phase that allows the requested step.
    #[error("family {parameter} {level} is {found}, expected {expected}")]
    Phase {
        parameter: String,
        level: String,
        found: String,
        expected: &'static str,
    },

    /// Image encoding, decoding or drawing failed.
    #[error("raster error for {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    /// Filesystem error.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create a Decode error.
    pub fn decode(path: impl AsRef<Path>, source: Grib2Error) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a Render error.
    pub fn render(path: impl AsRef<Path>, source: RenderError) -> Self {
        Self::Render {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create an Io error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a Metadata error.
    pub fn metadata(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a NoData error.
    pub fn no_data(parameter: &str, level: &str) -> Self {
        Self::NoData {
            parameter: parameter.to_string(),
            level: level.to_string(),
        }
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
