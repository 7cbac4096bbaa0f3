//! Layered configuration: defaults, optional YAML file, then environment.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use raster_pipeline::PipelineConfig;

/// Load the pipeline configuration.
///
/// Fields missing from the YAML file keep their defaults. Environment
/// variables override both.
pub fn load(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            parse_yaml(&text).with_context(|| format!("Failed to parse config from {:?}", path))?
        }
        None => PipelineConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

pub fn parse_yaml(text: &str) -> Result<PipelineConfig> {
    if text.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    Ok(serde_yaml::from_str(text)?)
}

pub fn to_yaml(config: &PipelineConfig) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_pipeline::{DegeneratePolicy, WindMode};
    use std::path::PathBuf;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = parse_yaml(
            r#"
output_dir: /tmp/rasters
degenerate_policy: error
contour:
  sigma: 1.5
wind:
  mode: streamlines
"#,
        )
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/rasters"));
        assert_eq!(config.source_dir, PathBuf::from("gfs_data"));
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Error);
        assert_eq!(config.contour.sigma, 1.5);
        assert_eq!(config.contour.levels, 20);
        assert_eq!(config.wind.mode, WindMode::Streamlines);
        assert_eq!(config.wind.glyph_grid, 40);
    }

    #[test]
    fn test_bbox_from_yaml() {
        let config = parse_yaml("bbox:\n  min_x: 250\n  min_y: 30\n  max_x: 260\n  max_y: 40\n").unwrap();
        assert_eq!(config.bbox.lat_min(), 30.0);
        assert_eq!(config.bbox.lon_max(), 260.0);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = PipelineConfig::default();
        let back = parse_yaml(&to_yaml(&config).unwrap()).unwrap();
        assert_eq!(back.bbox, config.bbox);
        assert_eq!(back.isobaric_parameters, config.isobaric_parameters);
    }

    #[test]
    fn test_unknown_policy_is_an_error() {
        assert!(parse_yaml("degenerate_policy: sometimes\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load(Some(Path::new("/nonexistent/gfs-processor.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
