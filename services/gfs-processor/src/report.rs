//! JSON summaries printed by the subcommands.

use std::path::{Path, PathBuf};

use raster_pipeline::{Extent, FamilyReport, IsobaricProduct, PipelineError, RasterOutput};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RasterSummary {
    pub png: PathBuf,
    pub info: PathBuf,
    pub width: usize,
    pub height: usize,
    pub min: f64,
    pub max: f64,
}

impl From<&RasterOutput> for RasterSummary {
    fn from(out: &RasterOutput) -> Self {
        Self {
            png: out.png_path.clone(),
            info: out.info_path.clone(),
            width: out.width,
            height: out.height,
            min: out.metadata.local.min,
            max: out.metadata.local.max,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub error: String,
}

impl Failure {
    pub fn new(path: &Path, error: &PipelineError) -> Self {
        Self {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateSummary {
    pub parameter: String,
    pub level: String,
    pub rasters: Vec<RasterSummary>,
    pub failures: Vec<Failure>,
    pub global: Option<Extent>,
    pub renormalized: usize,
    pub isobaric: Vec<PathBuf>,
    pub isobaric_failures: Vec<String>,
}

impl From<&FamilyReport> for GenerateSummary {
    fn from(report: &FamilyReport) -> Self {
        Self {
            parameter: report.family.parameter.clone(),
            level: report.family.level.clone(),
            rasters: report.succeeded().map(RasterSummary::from).collect(),
            failures: report.failed().map(|(p, e)| Failure::new(p, e)).collect(),
            global: report.global,
            renormalized: report.renormalized,
            isobaric: report
                .isobaric
                .iter()
                .filter_map(|r| r.as_ref().ok().map(|p| p.image_path.clone()))
                .collect(),
            isobaric_failures: report
                .isobaric
                .iter()
                .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReconcileSummary {
    pub parameter: String,
    pub level: String,
    pub global_min: f64,
    pub global_max: f64,
    pub renormalized: usize,
}

#[derive(Debug, Serialize)]
pub struct ContourSummary {
    pub image: PathBuf,
    pub levels: Vec<f64>,
}

impl From<&IsobaricProduct> for ContourSummary {
    fn from(product: &IsobaricProduct) -> Self {
        Self {
            image: product.image_path.clone(),
            levels: product.levels.clone(),
        }
    }
}

/// Print a summary as pretty JSON on stdout.
pub fn print<T: Serialize>(summary: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
