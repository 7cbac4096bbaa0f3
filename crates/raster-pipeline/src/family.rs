//! Raster families and their processing phase.
//!
//! A family is every raster of one (parameter, level) in a directory,
//! across forecast hours. The phase file `.{PARAM}_{LEVEL}.phase` records
//! how far the family has been processed so that reconciliation and
//! renormalization cannot run out of order.

use std::fmt;
use std::path::{Path, PathBuf};

use gfs_common::naming::{INFO_EXTENSION, PNG_EXTENSION, SOURCE_EXTENSION};
use gfs_common::RasterName;

use crate::error::{PipelineError, Result};
use crate::fsutil::{list_files, stem_of, write_atomic};
use crate::metadata::{InfoRecord, GLOBAL_MAX, GLOBAL_MIN};
use crate::normalize::Extent;

const PHASE_KEY: &str = "Phase";

/// All rasters of one parameter at one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Family {
    pub parameter: String,
    pub level: String,
}

impl Family {
    pub fn new(parameter: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            level: level.into(),
        }
    }

    pub fn of(name: &RasterName) -> Self {
        Self::new(name.parameter.clone(), name.level.clone())
    }

    /// Whether a file stem belongs to this family.
    ///
    /// Canonical names must match parameter and level exactly. Other stems
    /// fall back to `{parameter}_` prefix plus `_{level}_` token matching.
    pub fn matches_stem(&self, stem: &str) -> bool {
        match RasterName::parse_stem(stem) {
            Ok(name) => name.parameter == self.parameter && name.level == self.level,
            Err(_) => {
                stem.starts_with(&format!("{}_", self.parameter))
                    && stem.contains(&format!("_{}_", self.level))
            }
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.matches_stem(stem_of(path))
    }

    /// Member files in `dir` with the given extension, sorted.
    pub fn members(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
        Ok(list_files(dir, extension)?
            .into_iter()
            .filter(|p| self.matches(p))
            .collect())
    }

    pub fn rasters(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.members(dir, PNG_EXTENSION)
    }

    pub fn info_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.members(dir, INFO_EXTENSION)
    }

    pub fn sources(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        self.members(dir, SOURCE_EXTENSION)
    }

    pub fn phase_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(".{}_{}.phase", self.parameter, self.level))
    }

    /// Current phase, `None` if the family has never been marked.
    pub fn read_phase(&self, dir: &Path) -> Result<Option<Phase>> {
        let path = self.phase_path(dir);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| PipelineError::io(&path, e))?;
        Phase::from_record(&path, &InfoRecord::parse(&text)).map(Some)
    }

    pub fn write_phase(&self, dir: &Path, phase: Phase) -> Result<()> {
        let path = self.phase_path(dir);
        write_atomic(&path, phase.to_record().render().as_bytes())?;
        tracing::debug!(family = %self, phase = %phase, "Family phase updated");
        Ok(())
    }

    pub(crate) fn phase_error(&self, found: Option<Phase>, expected: &'static str) -> PipelineError {
        PipelineError::Phase {
            parameter: self.parameter.clone(),
            level: self.level.clone(),
            found: found.map(|p| p.to_string()).unwrap_or_else(|| "unmarked".to_string()),
            expected,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.parameter, self.level)
    }
}

/// How far a family has been processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Every raster is encoded against its own extrema.
    Local,
    /// Global extrema are written to every record; bytes are still local.
    Reconciled(Extent),
    /// Bytes are encoded against the global extrema.
    Renormalized(Extent),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Local => "local",
            Phase::Reconciled(_) => "reconciled",
            Phase::Renormalized(_) => "renormalized",
        }
    }

    pub fn global(&self) -> Option<Extent> {
        match self {
            Phase::Local => None,
            Phase::Reconciled(e) | Phase::Renormalized(e) => Some(*e),
        }
    }

    fn to_record(self) -> InfoRecord {
        let mut record = InfoRecord::new();
        record.set(PHASE_KEY, self.name());
        if let Some(global) = self.global() {
            record.set(GLOBAL_MIN, global.min.to_string());
            record.set(GLOBAL_MAX, global.max.to_string());
        }
        record
    }

    fn from_record(path: &Path, record: &InfoRecord) -> Result<Self> {
        let global = || -> Result<Extent> {
            match (record.get_f64(path, GLOBAL_MIN)?, record.get_f64(path, GLOBAL_MAX)?) {
                (Some(lo), Some(hi)) => Ok(Extent::new(lo, hi)),
                _ => Err(PipelineError::metadata(path, "phase without global extrema")),
            }
        };
        match record.get_str(PHASE_KEY) {
            Some("local") => Ok(Phase::Local),
            Some("reconciled") => Ok(Phase::Reconciled(global()?)),
            Some("renormalized") => Ok(Phase::Renormalized(global()?)),
            other => Err(PipelineError::metadata(
                path,
                format!("unknown phase {:?}", other.unwrap_or_default()),
            )),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.global() {
            Some(g) => write!(f, "{} ({} to {})", self.name(), g.min, g.max),
            None => f.write_str(self.name()),
        }
    }
}
