//! Source grid decoding and local normalization into raster + metadata.

use std::path::{Path, PathBuf};

use gfs_common::naming::{INFO_EXTENSION, PNG_EXTENSION};
use gfs_common::{BoundingBox, RasterName};
use grib2_parser::{Grib2Message, Grib2Reader};

use crate::error::{PipelineError, Result};
use crate::family::{Family, Phase};
use crate::fsutil::{stem_of, write_atomic};
use crate::metadata::RasterMetadata;
use crate::normalize::{normalize_with_policy, DegeneratePolicy, NormalizeError};

/// A decoded subgrid with its provenance.
#[derive(Debug, Clone)]
pub struct GriddedField {
    pub parameter: String,
    pub level: String,
    pub source: PathBuf,
    pub width: usize,
    pub height: usize,
    /// Row-major, north row first. Missing points are NaN.
    pub values: Vec<f32>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl GriddedField {
    /// Cells without a finite value, typically masked out by the bitmap.
    pub fn missing_cells(&self) -> usize {
        self.values.iter().filter(|v| !v.is_finite()).count()
    }
}

/// Decode the single message of a GRIB2 file and cut out `bbox`.
pub fn decode_field(path: &Path, bbox: &BoundingBox) -> Result<GriddedField> {
    let reader = Grib2Reader::open(path).map_err(|e| PipelineError::decode(path, e))?;
    let message = reader
        .single_message()
        .map_err(|e| PipelineError::decode(path, e))?;
    field_from_message(path, &message, bbox)
}

/// Decode message `index` of a multi-message GRIB2 file and cut out `bbox`.
pub fn decode_message(path: &Path, index: usize, bbox: &BoundingBox) -> Result<GriddedField> {
    let reader = Grib2Reader::open(path).map_err(|e| PipelineError::decode(path, e))?;
    let message = reader
        .message_at(index)
        .map_err(|e| PipelineError::decode(path, e))?;
    field_from_message(path, &message, bbox)
}

fn field_from_message(path: &Path, message: &Grib2Message, bbox: &BoundingBox) -> Result<GriddedField> {
    let sub = message
        .extract(bbox)
        .map_err(|e| PipelineError::decode(path, e))?;

    // Provenance comes from the file name when it is canonical.
    let (parameter, level) = match RasterName::from_path(path) {
        Ok(name) => (name.parameter, name.level),
        Err(_) => (
            message.parameter().to_string(),
            message
                .product_definition
                .level_description
                .replace(' ', "_"),
        ),
    };

    tracing::debug!(
        path = %path.display(),
        parameter = %parameter,
        level = %level,
        width = sub.width,
        height = sub.height,
        "Decoded subgrid"
    );

    Ok(GriddedField {
        parameter,
        level,
        source: path.to_path_buf(),
        width: sub.width,
        height: sub.height,
        values: sub.values,
        latitudes: sub.latitudes,
        longitudes: sub.longitudes,
    })
}

/// Stem of the raster produced from a source file.
pub fn raster_stem_for(source: &Path) -> String {
    match RasterName::from_path(source) {
        Ok(name) => name.raster_stem(),
        Err(_) => stem_of(source).replace('.', "_"),
    }
}

/// Paths and metadata of a written raster.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub png_path: PathBuf,
    pub info_path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub metadata: RasterMetadata,
}

/// Encode a decoded field against its own extrema and write the raster and
/// its `.info` record to `output_dir`.
///
/// A family already reconciled in `output_dir` is reset to local first, so
/// the new member cannot be renormalized against extrema that never saw it.
pub fn write_raster(
    field: &GriddedField,
    bbox: &BoundingBox,
    output_dir: &Path,
    policy: DegeneratePolicy,
) -> Result<RasterOutput> {
    let (pixels, local) = normalize_with_policy(&field.values, policy).map_err(|e| match e {
        NormalizeError::DegenerateRange { value } => PipelineError::DegenerateRange {
            path: field.source.clone(),
            value,
        },
        NormalizeError::NoFiniteValues => PipelineError::NoFiniteValues {
            path: field.source.clone(),
        },
    })?;
    if local.is_degenerate() {
        tracing::warn!(
            source = %field.source.display(),
            value = local.min,
            "Flat field written as mid-gray"
        );
    }

    let missing = field.missing_cells();
    if missing > 0 {
        tracing::warn!(
            source = %field.source.display(),
            missing,
            cells = field.values.len(),
            "Missing cells encoded as byte 0"
        );
    }

    let family = Family::new(field.parameter.as_str(), field.level.as_str());
    if !matches!(family.read_phase(output_dir), Ok(None) | Ok(Some(Phase::Local))) {
        family.write_phase(output_dir, Phase::Local)?;
        tracing::info!(family = %family, "New member resets family to local");
    }

    let stem = raster_stem_for(&field.source);
    let png_path = output_dir.join(format!("{stem}.{PNG_EXTENSION}"));
    let info_path = output_dir.join(format!("{stem}.{INFO_EXTENSION}"));

    let png = renderer::png::create_png_grayscale(&pixels, field.width, field.height)
        .map_err(|e| PipelineError::render(&png_path, e))?;
    write_atomic(&png_path, &png)?;

    let source_file = field
        .source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let metadata = RasterMetadata {
        parameter: field.parameter.clone(),
        level: field.level.clone(),
        latitude_bounds: (bbox.lat_min(), bbox.lat_max()),
        longitude_bounds: (bbox.lon_min(), bbox.lon_max()),
        source_file,
        local,
        global: None,
        renormalized: None,
    };
    metadata.write(&info_path)?;

    tracing::info!(
        raster = %png_path.display(),
        width = field.width,
        height = field.height,
        min = local.min,
        max = local.max,
        "Wrote raster"
    );

    Ok(RasterOutput {
        png_path,
        info_path,
        width: field.width,
        height: field.height,
        metadata,
    })
}

/// Decode a single-message GRIB2 file into a raster and its metadata.
pub fn decode_to_raster(
    path: &Path,
    bbox: &BoundingBox,
    output_dir: &Path,
    policy: DegeneratePolicy,
) -> Result<RasterOutput> {
    let field = decode_field(path, bbox)?;
    write_raster(&field, bbox, output_dir, policy)
}
