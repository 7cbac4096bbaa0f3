//! GRIB2 parser implementation (WMO FM 92 GRIB Edition 2).
//!
//! Decodes regular latitude/longitude grids and cuts geographic subregions
//! out of the decoded field. Simple packing is unpacked in-house; the complex
//! and PNG packings NCEP publishes GFS with go through the `grib` crate.

pub mod reader;
pub mod sections;
pub mod subset;
pub mod unpacking;

pub use reader::{Grib2Message, Grib2Reader};
pub use subset::{extract_subgrid, SubGrid};
pub use unpacking::{unpack_simple, unpack_with_grib};

use thiserror::Error;

/// Errors produced while reading or decoding GRIB2 data.
#[derive(Debug, Error)]
pub enum Grib2Error {
    #[error("Invalid GRIB2 data: {0}")]
    InvalidFormat(String),

    #[error("Invalid section {section}: {reason}")]
    InvalidSection { section: u8, reason: String },

    #[error("Unsupported template {template} in section {section}")]
    UnsupportedTemplate { section: u8, template: u16 },

    #[error("Unpacking failed: {0}")]
    UnpackingError(String),

    #[error("File contains no GRIB2 messages")]
    NoMessages,

    #[error("Expected a single GRIB2 message, found {0}")]
    MultipleMessages(usize),

    #[error("Message index {index} out of range (file has {count})")]
    MessageIndexOutOfRange { index: usize, count: usize },

    #[error("Bounding box {bbox} does not intersect the grid")]
    EmptySubgrid { bbox: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Grib2Error>;
