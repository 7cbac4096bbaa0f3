//! Deterministic file naming for source grids, rasters and derived products.
//!
//! Layout:
//! - source grid:  `{PARAM}_{LEVEL}_{cycleDate}_{cycleRun}_f{HHH}.grb2`
//! - raster:       same stem with `.` replaced by `_`, plus `.png` / `.info`
//! - isobaric:     `ISOBARIC{raster_stem}.png` / `.info`
//! - wind:         `WIND_{common_suffix}.png`

use std::fmt;
use std::path::Path;

use crate::cycle::{Cycle, DATE_PREFIX};

pub const SOURCE_EXTENSION: &str = "grb2";
pub const PNG_EXTENSION: &str = "png";
pub const INFO_EXTENSION: &str = "info";
pub const ISOBARIC_PREFIX: &str = "ISOBARIC";
pub const WIND_PREFIX: &str = "WIND_";
pub const U_COMPONENT_PREFIX: &str = "UGRD_";
pub const V_COMPONENT_PREFIX: &str = "VGRD_";

/// Identity of one forecast-hour raster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RasterName {
    pub parameter: String,
    /// Level descriptor as used in file names, e.g. `500_mb` or `surface`.
    pub level: String,
    /// Cycle date token exactly as it appeared (`gfs.20241009`, `gfs_20241009`, `20241009`).
    pub cycle_date: String,
    /// Two-digit run token.
    pub cycle_run: String,
    pub forecast_hour: u32,
}

impl RasterName {
    pub fn new(parameter: &str, level: &str, cycle: &Cycle, forecast_hour: u32) -> Self {
        Self {
            parameter: parameter.to_string(),
            level: level.to_string(),
            cycle_date: cycle.date_token(),
            cycle_run: cycle.run_token(),
            forecast_hour,
        }
    }

    /// Parse a file stem (no extension) of either a source grid or a raster.
    pub fn parse_stem(stem: &str) -> Result<Self, NameParseError> {
        let tokens: Vec<&str> = stem.split('_').collect();
        let bad = || NameParseError::Malformed(stem.to_string());

        if tokens.len() < 5 {
            return Err(bad());
        }
        let n = tokens.len();

        let forecast_hour = tokens[n - 1]
            .strip_prefix('f')
            .filter(|h| !h.is_empty() && h.chars().all(|c| c.is_ascii_digit()))
            .and_then(|h| h.parse::<u32>().ok())
            .ok_or_else(bad)?;

        let cycle_run = tokens[n - 2];
        if cycle_run.len() != 2 || !cycle_run.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }

        // A raster stem splits `gfs.20241009` into `gfs` + `20241009`.
        let date_token = tokens[n - 3];
        let (cycle_date, level_end) = if is_date_digits(date_token) && tokens[n - 4] == DATE_PREFIX
        {
            (format!("{}_{}", DATE_PREFIX, date_token), n - 4)
        } else if is_date_digits(date_token) || is_prefixed_date(date_token) {
            (date_token.to_string(), n - 3)
        } else {
            return Err(bad());
        };

        if level_end < 2 || tokens[0].is_empty() {
            return Err(bad());
        }
        let level = tokens[1..level_end].join("_");

        Ok(Self {
            parameter: tokens[0].to_string(),
            level,
            cycle_date,
            cycle_run: cycle_run.to_string(),
            forecast_hour,
        })
    }

    /// Parse the name of a file on disk, ignoring its directory and extension.
    pub fn from_path(path: &Path) -> Result<Self, NameParseError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| NameParseError::Malformed(path.display().to_string()))?;
        Self::parse_stem(stem)
    }

    /// The cycle this raster belongs to, when the date token is well formed.
    pub fn cycle(&self) -> Option<Cycle> {
        Cycle::parse(&self.cycle_date, &self.cycle_run).ok()
    }

    /// Stem of the upstream source file (keeps the `.` in the date token).
    pub fn source_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}_f{:03}",
            self.parameter, self.level, self.cycle_date, self.cycle_run, self.forecast_hour
        )
    }

    pub fn source_file_name(&self) -> String {
        format!("{}.{}", self.source_stem(), SOURCE_EXTENSION)
    }

    /// Stem shared by the raster PNG and its `.info` record.
    pub fn raster_stem(&self) -> String {
        self.source_stem().replace('.', "_")
    }

    pub fn png_file_name(&self) -> String {
        format!("{}.{}", self.raster_stem(), PNG_EXTENSION)
    }

    pub fn info_file_name(&self) -> String {
        format!("{}.{}", self.raster_stem(), INFO_EXTENSION)
    }

    /// Stem of the isobaric product derived from this raster.
    pub fn isobaric_stem(&self) -> String {
        isobaric_stem(&self.raster_stem())
    }
}

impl fmt::Display for RasterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raster_stem())
    }
}

/// `ISOBARIC{stem}`.
pub fn isobaric_stem(raster_stem: &str) -> String {
    format!("{}{}", ISOBARIC_PREFIX, raster_stem)
}

/// Which orthogonal wind component a raster holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindComponent {
    U,
    V,
}

/// Split a component raster stem into its component and the shared suffix.
///
/// `UGRD_500_mb_f000` → `(U, "500_mb_f000")`.
pub fn wind_suffix(stem: &str) -> Option<(WindComponent, &str)> {
    if let Some(rest) = stem.strip_prefix(U_COMPONENT_PREFIX) {
        return (!rest.is_empty()).then_some((WindComponent::U, rest));
    }
    if let Some(rest) = stem.strip_prefix(V_COMPONENT_PREFIX) {
        return (!rest.is_empty()).then_some((WindComponent::V, rest));
    }
    None
}

/// `WIND_{suffix}`.
pub fn wind_stem(suffix: &str) -> String {
    format!("{}{}", WIND_PREFIX, suffix)
}

fn is_date_digits(token: &str) -> bool {
    token.len() == 8 && token.chars().all(|c| c.is_ascii_digit())
}

fn is_prefixed_date(token: &str) -> bool {
    token
        .strip_prefix(DATE_PREFIX)
        .and_then(|rest| rest.strip_prefix('.'))
        .map(is_date_digits)
        .unwrap_or(false)
}

#[derive(Debug, thiserror::Error)]
pub enum NameParseError {
    #[error("File name does not follow PARAM_LEVEL_DATE_RUN_fHHH: {0}")]
    Malformed(String),
}
