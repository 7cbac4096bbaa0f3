//! Pipeline facade tying the steps together for one source and one output directory.

use std::path::{Path, PathBuf};

use gfs_common::naming::{INFO_EXTENSION, ISOBARIC_PREFIX, PNG_EXTENSION};
use gfs_common::BoundingBox;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::decode::{self, RasterOutput};
use crate::error::{PipelineError, Result};
use crate::family::{Family, Phase};
use crate::fsutil::{ensure_dir, list_files, stem_of};
use crate::isobaric::{self, IsobaricProduct};
use crate::normalize::Extent;
use crate::reconcile;
use crate::renormalize::{self, PENDING_EXTENSION};
use crate::wind;

/// Result of decoding one source file during a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub result: Result<RasterOutput>,
}

/// Report of a [`Pipeline::generate_family`] run.
#[derive(Debug)]
pub struct FamilyReport {
    pub family: Family,
    pub files: Vec<FileOutcome>,
    /// Global extrema, when at least one raster was written.
    pub global: Option<Extent>,
    pub renormalized: usize,
    pub isobaric: Vec<Result<IsobaricProduct>>,
}

impl FamilyReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &RasterOutput> {
        self.files.iter().filter_map(|f| f.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &PipelineError)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().err().map(|e| (f.source.as_path(), e)))
    }
}

/// Raster pipeline over a configured source and output directory.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate the configuration and create the output directory.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        ensure_dir(&config.output_dir)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Decode a single-message source file into a raster and its metadata.
    pub fn decode_to_raster(&self, file: &Path, bbox: &BoundingBox) -> Result<RasterOutput> {
        decode::decode_to_raster(file, bbox, &self.config.output_dir, self.config.degenerate_policy)
    }

    /// Decode message `index` of a multi-message source file.
    pub fn decode_message_to_raster(
        &self,
        file: &Path,
        index: usize,
        bbox: &BoundingBox,
    ) -> Result<RasterOutput> {
        let field = decode::decode_message(file, index, bbox)?;
        decode::write_raster(&field, bbox, &self.config.output_dir, self.config.degenerate_policy)
    }

    /// Reconcile a family and record the global extrema in every member.
    pub fn normalize_family(&self, parameter: &str, level: &str) -> Result<(f64, f64)> {
        let global = reconcile::normalize_family(self.output_dir(), &Family::new(parameter, level))?;
        Ok((global.min, global.max))
    }

    /// Re-encode every raster of a reconciled family against the global extrema.
    pub fn renormalize_family(
        &self,
        parameter: &str,
        level: &str,
        global_min: f64,
        global_max: f64,
    ) -> Result<usize> {
        renormalize::renormalize_family(
            self.output_dir(),
            &Family::new(parameter, level),
            Extent::new(global_min, global_max),
        )
    }

    /// Build the isobaric product of one raster. Returns the image path and levels.
    pub fn build_contours(&self, raster: &Path) -> Result<(PathBuf, Vec<f64>)> {
        let product = isobaric::build_contours(raster, &self.config.contour)?;
        Ok((product.image_path, product.levels))
    }

    pub fn build_wind_product(&self, u_path: &Path, v_path: &Path) -> Result<PathBuf> {
        wind::build_wind_product(u_path, v_path, &self.config.wind)
    }

    /// Wind products for every matched U/V pair in the output directory.
    pub fn build_wind_products(&self) -> Result<Vec<PathBuf>> {
        wind::build_wind_products(self.output_dir(), &self.config.wind)
    }

    /// Isobaric products for every raster of a family.
    pub fn build_family_contours(&self, family: &Family) -> Result<Vec<Result<IsobaricProduct>>> {
        let rasters = family.rasters(self.output_dir())?;
        Ok(rasters
            .par_iter()
            .map(|raster| isobaric::build_contours(raster, &self.config.contour))
            .collect())
    }

    /// Isobaric products for every raster of a configured isobaric parameter.
    pub fn build_isobaric_products(&self) -> Result<Vec<Result<IsobaricProduct>>> {
        let rasters: Vec<PathBuf> = list_files(self.output_dir(), PNG_EXTENSION)?
            .into_iter()
            .filter(|p| {
                let stem = stem_of(p);
                !stem.starts_with(ISOBARIC_PREFIX) && self.config.wants_isobaric(stem)
            })
            .collect();
        Ok(rasters
            .par_iter()
            .map(|raster| isobaric::build_contours(raster, &self.config.contour))
            .collect())
    }

    /// Rasters of a family in the output directory, sorted.
    pub fn list_family(&self, parameter: &str, level: &str) -> Result<Vec<PathBuf>> {
        Family::new(parameter, level).rasters(self.output_dir())
    }

    /// Source files of a family in the source directory, sorted.
    pub fn find_sources(&self, parameter: &str, level: &str) -> Result<Vec<PathBuf>> {
        Family::new(parameter, level).sources(&self.config.source_dir)
    }

    /// Decode every source of a family, reconcile, renormalize and build the
    /// isobaric products when the parameter calls for them.
    ///
    /// A failing source is reported and does not stop its siblings.
    /// Reconciliation runs only after every decode has finished.
    pub fn generate_family(
        &self,
        parameter: &str,
        level: &str,
        bbox: Option<&BoundingBox>,
    ) -> Result<FamilyReport> {
        let family = Family::new(parameter, level);
        let bbox = bbox.copied().unwrap_or(self.config.bbox);
        let sources = self.find_sources(parameter, level)?;
        if sources.is_empty() {
            return Err(PipelineError::no_data(parameter, level));
        }

        let files: Vec<FileOutcome> = sources
            .par_iter()
            .map(|source| FileOutcome {
                source: source.clone(),
                result: self.decode_to_raster(source, &bbox),
            })
            .collect();
        for (source, err) in files
            .iter()
            .filter_map(|f| f.result.as_ref().err().map(|e| (&f.source, e)))
        {
            tracing::warn!(source = %source.display(), error = %err, "Source skipped");
        }
        family.write_phase(self.output_dir(), Phase::Local)?;

        let mut report = FamilyReport {
            family: family.clone(),
            files,
            global: None,
            renormalized: 0,
            isobaric: Vec::new(),
        };
        if report.succeeded().next().is_none() {
            return Ok(report);
        }

        let global = reconcile::normalize_family(self.output_dir(), &family)?;
        report.global = Some(global);
        report.renormalized = renormalize::renormalize_family(self.output_dir(), &family, global)?;

        if self.config.wants_isobaric(parameter) {
            report.isobaric = self.build_family_contours(&family)?;
        }

        tracing::info!(
            family = %family,
            sources = report.files.len(),
            failed = report.failed().count(),
            global_min = global.min,
            global_max = global.max,
            isobaric = report.isobaric.len(),
            "Generated family"
        );
        Ok(report)
    }

    /// Delete every raster, record and derived product in the output directory.
    ///
    /// Returns the number of files removed.
    pub fn purge(&self) -> Result<usize> {
        let dir = self.output_dir();
        let mut targets = list_files(dir, PNG_EXTENSION)?;
        targets.extend(list_files(dir, INFO_EXTENSION)?);
        targets.extend(list_files(dir, "phase")?);
        targets.extend(list_files(dir, PENDING_EXTENSION)?);

        for path in &targets {
            std::fs::remove_file(path).map_err(|e| PipelineError::io(path, e))?;
        }
        tracing::info!(dir = %dir.display(), removed = targets.len(), "Purged output directory");
        Ok(targets.len())
    }
}
