//! Common types shared across the GFS raster product crates.

pub mod bbox;
pub mod cycle;
pub mod naming;

pub use bbox::{BboxParseError, BoundingBox};
pub use cycle::{Cycle, CycleParseError};
pub use naming::{
    isobaric_stem, wind_stem, wind_suffix, NameParseError, RasterName, WindComponent,
    INFO_EXTENSION, ISOBARIC_PREFIX, PNG_EXTENSION, SOURCE_EXTENSION, U_COMPONENT_PREFIX,
    V_COMPONENT_PREFIX, WIND_PREFIX,
};
