//! GFS grids to normalized 8-bit rasters and derived products.
//!
//! Each source grid becomes a grayscale PNG plus an `.info` record. Rasters
//! of one parameter and level form a family that is reconciled to shared
//! extrema and re-encoded against them, so one byte value means the same
//! physical value across forecast hours. Height families also get isobaric
//! contour overlays, and paired U/V components get wind overlays.

pub mod config;
pub mod decode;
pub mod error;
pub mod family;
pub mod fsutil;
pub mod isobaric;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod renormalize;
pub mod wind;

pub use config::{ContourSettings, PipelineConfig, WindMode, WindSettings};
pub use decode::{GriddedField, RasterOutput};
pub use error::{PipelineError, Result};
pub use family::{Family, Phase};
pub use isobaric::IsobaricProduct;
pub use metadata::{InfoRecord, RasterMetadata};
pub use normalize::{DegeneratePolicy, Extent, NormalizeError};
pub use pipeline::{FamilyReport, FileOutcome, Pipeline};
pub use wind::WindPair;
