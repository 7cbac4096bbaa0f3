//! Isobaric contour products built from height rasters.
//!
//! The raster is scaled to `[0, 1]`, Gaussian-smoothed, resampled to a
//! square grid and traced at evenly spaced levels between the resampled
//! field's own extrema. The result is a transparent PNG of white isolines
//! named `ISOBARIC{stem}.png`, with a `.info` record listing the levels.

use std::path::{Path, PathBuf};

use gfs_common::naming::{isobaric_stem, INFO_EXTENSION, PNG_EXTENSION};
use renderer::contour::{evenly_spaced_levels, render_contours};
use renderer::png::{read_grayscale, GrayImage};
use renderer::resample::resample_linear;
use renderer::smoothing::gaussian_filter;

use crate::config::ContourSettings;
use crate::error::{PipelineError, Result};
use crate::fsutil::{stem_of, write_atomic};
use crate::metadata::{self, Value};

pub const MIN_VALUE: &str = "Min Value";
pub const MAX_VALUE: &str = "Max Value";
pub const CONTOUR_LEVELS: &str = "Contour Levels";

/// Smoothed, resampled field ready for tracing.
#[derive(Debug, Clone)]
pub struct ContourField {
    pub size: usize,
    pub values: Vec<f32>,
    pub min: f64,
    pub max: f64,
    pub levels: Vec<f64>,
}

/// Smooth and resample a raster and pick its contour levels.
pub fn prepare_field(image: &GrayImage, settings: &ContourSettings) -> ContourField {
    let unit = image.to_unit_f32();
    let smoothed = gaussian_filter(&unit, image.width, image.height, settings.sigma, settings.truncate);
    let size = settings.resolution;
    let values = resample_linear(&smoothed, image.width, image.height, size, size);

    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
    let levels = evenly_spaced_levels(min, max, settings.levels);

    ContourField {
        size,
        values,
        min,
        max,
        levels,
    }
}

/// A written isobaric product.
#[derive(Debug, Clone)]
pub struct IsobaricProduct {
    pub image_path: PathBuf,
    pub info_path: PathBuf,
    pub min: f64,
    pub max: f64,
    pub levels: Vec<f64>,
}

/// Build the isobaric product for one raster, next to it.
pub fn build_contours(raster: &Path, settings: &ContourSettings) -> Result<IsobaricProduct> {
    let image = read_grayscale(raster).map_err(|e| PipelineError::render(raster, e))?;
    let field = prepare_field(&image, settings);

    let dir = raster.parent().unwrap_or_else(|| Path::new("."));
    let stem = isobaric_stem(stem_of(raster));
    let image_path = dir.join(format!("{stem}.{PNG_EXTENSION}"));
    let info_path = dir.join(format!("{stem}.{INFO_EXTENSION}"));

    let config = settings.render_config(&field.levels);
    let png = render_contours(&field.values, field.size, field.size, &config)
        .map_err(|e| PipelineError::render(&image_path, e))?;
    write_atomic(&image_path, &png)?;

    let levels: Vec<String> = field.levels.iter().map(|l| l.to_string()).collect();
    metadata::write(
        &info_path,
        &[
            (MIN_VALUE, Value::from(field.min.to_string())),
            (MAX_VALUE, Value::from(field.max.to_string())),
            (CONTOUR_LEVELS, Value::from(levels)),
        ],
    )?;

    tracing::info!(
        raster = %raster.display(),
        product = %image_path.display(),
        levels = field.levels.len(),
        "Built isobaric product"
    );

    Ok(IsobaricProduct {
        image_path,
        info_path,
        min: field.min,
        max: field.max,
        levels: field.levels,
    })
}

/// Read the contour levels back from an isobaric `.info` record.
pub fn read_levels(info_path: &Path) -> Result<Vec<f64>> {
    let record = metadata::read(info_path)?;
    let items = record
        .get_list(CONTOUR_LEVELS)
        .ok_or_else(|| PipelineError::metadata(info_path, "no contour levels"))?;
    items
        .iter()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| PipelineError::metadata(info_path, format!("bad level {s:?}")))
        })
        .collect()
}
