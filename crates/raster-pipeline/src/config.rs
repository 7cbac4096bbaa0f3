//! Configuration for the raster pipeline.

use std::path::PathBuf;

use gfs_common::BoundingBox;
use renderer::contour::ContourConfig;
use renderer::smoothing::DEFAULT_TRUNCATE;
use renderer::vectors::{VectorConfig, VectorMode};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::normalize::DegeneratePolicy;

/// Default request box over the continental US, longitudes in 0..360.
pub const DEFAULT_BBOX: BoundingBox = BoundingBox {
    min_x: 235.0,
    min_y: 24.396308,
    max_x: 293.06543,
    max_y: 49.384358,
};

/// Configuration for the raster pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding downloaded `.grb2` files.
    pub source_dir: PathBuf,

    /// Directory receiving rasters, `.info` records and derived products.
    pub output_dir: PathBuf,

    /// Region cut out of every source grid.
    pub bbox: BoundingBox,

    /// Handling of fields whose values are all equal.
    pub degenerate_policy: DegeneratePolicy,

    /// Parameters whose families get isobaric contour products (prefix match).
    pub isobaric_parameters: Vec<String>,

    pub contour: ContourSettings,

    pub wind: WindSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("gfs_data"),
            output_dir: PathBuf::from("png_data"),
            bbox: DEFAULT_BBOX,
            degenerate_policy: DegeneratePolicy::MidGray,
            isobaric_parameters: vec!["HGT".to_string()],
            contour: ContourSettings::default(),
            wind: WindSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override fields from environment variables that are set and parse.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("GFS_DATA_DIR") {
            self.source_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("PNG_DATA_DIR") {
            self.output_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("GFS_BBOX") {
            if let Ok(bbox) = BoundingBox::parse(&val) {
                self.bbox = bbox;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_SIGMA") {
            if let Ok(sigma) = val.parse() {
                self.contour.sigma = sigma;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_LEVELS") {
            if let Ok(levels) = val.parse() {
                self.contour.levels = levels;
            }
        }

        if let Ok(val) = std::env::var("CONTOUR_RESOLUTION") {
            if let Ok(resolution) = val.parse() {
                self.contour.resolution = resolution;
            }
        }

        if let Ok(val) = std::env::var("WIND_GLYPH_GRID") {
            if let Ok(n) = val.parse() {
                self.wind.glyph_grid = n;
            }
        }

        if let Ok(val) = std::env::var("WIND_MODE") {
            self.wind.mode = WindMode::from_str(&val);
        }

        if let Ok(val) = std::env::var("DEGENERATE_POLICY") {
            self.degenerate_policy = DegeneratePolicy::from_str(&val);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.bbox
            .validate()
            .map_err(|e| PipelineError::config(format!("bbox: {e}")))?;

        if !(self.contour.sigma >= 0.0) {
            return Err(PipelineError::config("contour.sigma must be >= 0"));
        }

        if self.contour.levels == 0 {
            return Err(PipelineError::config("contour.levels must be > 0"));
        }

        if self.contour.resolution < 2 {
            return Err(PipelineError::config("contour.resolution must be >= 2"));
        }

        if self.contour.canvas_width == 0 || self.contour.canvas_height == 0 {
            return Err(PipelineError::config("contour canvas must be non-empty"));
        }

        if self.wind.glyph_grid == 0 {
            return Err(PipelineError::config("wind.glyph_grid must be > 0"));
        }

        if !(self.wind.scale > 0.0) {
            return Err(PipelineError::config("wind.scale must be > 0"));
        }

        if self.wind.canvas_width == 0 || self.wind.canvas_height == 0 {
            return Err(PipelineError::config("wind canvas must be non-empty"));
        }

        Ok(())
    }

    /// Whether rasters of `parameter` get isobaric contour products.
    pub fn wants_isobaric(&self, parameter: &str) -> bool {
        self.isobaric_parameters
            .iter()
            .any(|prefix| parameter.starts_with(prefix.as_str()))
    }
}

/// Isobaric contour product settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourSettings {
    /// Gaussian smoothing standard deviation, in raster cells.
    pub sigma: f64,

    /// Kernel radius in standard deviations.
    pub truncate: f64,

    /// Number of evenly spaced isolines.
    pub levels: usize,

    /// Side of the square grid the smoothed field is resampled to.
    pub resolution: usize,

    pub line_width: f32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ContourSettings {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            truncate: DEFAULT_TRUNCATE,
            levels: 20,
            resolution: 500,
            line_width: 1.0,
            canvas_width: 2048,
            canvas_height: 1024,
        }
    }
}

impl ContourSettings {
    /// Renderer configuration for a given list of levels.
    pub fn render_config(&self, levels: &[f64]) -> ContourConfig {
        ContourConfig {
            levels: levels.iter().map(|&l| l as f32).collect(),
            line_width: self.line_width,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            ..ContourConfig::default()
        }
    }
}

/// Wind product settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindSettings {
    pub mode: WindMode,

    /// Glyphs per axis after strided subsampling.
    pub glyph_grid: usize,

    /// Quiver scale: a unit vector spans `canvas_width / scale` pixels.
    pub scale: f32,

    pub line_width: f32,

    /// Streamline seeds per axis.
    pub seed_density: usize,

    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for WindSettings {
    fn default() -> Self {
        let vectors = VectorConfig::default();
        Self {
            mode: WindMode::Arrows,
            glyph_grid: vectors.glyph_grid,
            scale: vectors.scale,
            line_width: vectors.line_width,
            seed_density: vectors.seed_density,
            canvas_width: vectors.canvas_width,
            canvas_height: vectors.canvas_height,
        }
    }
}

impl WindSettings {
    pub fn render_config(&self) -> VectorConfig {
        VectorConfig {
            glyph_grid: self.glyph_grid,
            scale: self.scale,
            line_width: self.line_width,
            seed_density: self.seed_density,
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            ..VectorConfig::default()
        }
    }
}

/// How wind products are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindMode {
    /// Quiver arrows on the glyph grid.
    #[default]
    Arrows,
    /// Streamlines integrated through the field.
    Streamlines,
}

impl WindMode {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "streamlines" | "streamline" => Self::Streamlines,
            _ => Self::Arrows,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrows => "arrows",
            Self::Streamlines => "streamlines",
        }
    }

    pub fn vector_mode(&self) -> VectorMode {
        match self {
            Self::Arrows => VectorMode::Arrows,
            Self::Streamlines => VectorMode::Streamlines,
        }
    }
}

impl std::fmt::Display for WindMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.source_dir, PathBuf::from("gfs_data"));
        assert_eq!(config.output_dir, PathBuf::from("png_data"));
        assert_eq!(config.contour.levels, 20);
        assert_eq!(config.wind.glyph_grid, 40);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.contour.levels = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.contour.sigma = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.bbox = BoundingBox::new(10.0, 0.0, 5.0, 1.0);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_wants_isobaric() {
        let config = PipelineConfig::default();
        assert!(config.wants_isobaric("HGT"));
        assert!(config.wants_isobaric("HGTPRS"));
        assert!(!config.wants_isobaric("TMP"));
    }

    #[test]
    fn test_wind_mode_parsing() {
        assert_eq!(WindMode::from_str("Streamlines"), WindMode::Streamlines);
        assert_eq!(WindMode::from_str("quiver"), WindMode::Arrows);
        assert_eq!(WindMode::Streamlines.vector_mode(), VectorMode::Streamlines);
    }
}
