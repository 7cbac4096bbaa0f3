//! Wind vector products from paired U/V component rasters.
//!
//! `UGRD_{suffix}.png` pairs with `VGRD_{suffix}.png` and produces
//! `WIND_{suffix}.png` in the same directory. Components without a partner
//! are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gfs_common::naming::{wind_stem, wind_suffix, WindComponent, PNG_EXTENSION, WIND_PREFIX};
use renderer::png::read_grayscale;
use renderer::vectors::{render_vectors, VectorField};

use crate::config::WindSettings;
use crate::error::{PipelineError, Result};
use crate::fsutil::{list_files, stem_of, write_atomic};
use crate::metadata::{self, info_path_for, RENORMALIZED};

/// A matched pair of component rasters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindPair {
    pub suffix: String,
    pub u: PathBuf,
    pub v: PathBuf,
}

/// Match `UGRD_x` with `VGRD_x` on identical suffix `x`.
///
/// Returns the pairs sorted by suffix and the component files left unmatched.
pub fn pair_components(paths: &[PathBuf]) -> (Vec<WindPair>, Vec<PathBuf>) {
    let mut slots: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
    for path in paths {
        let Some((component, suffix)) = wind_suffix(stem_of(path)) else {
            continue;
        };
        let slot = slots.entry(suffix.to_string()).or_default();
        match component {
            WindComponent::U => slot.0 = Some(path.clone()),
            WindComponent::V => slot.1 = Some(path.clone()),
        }
    }

    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();
    for (suffix, slot) in slots {
        match slot {
            (Some(u), Some(v)) => pairs.push(WindPair { suffix, u, v }),
            (Some(lone), None) | (None, Some(lone)) => unmatched.push(lone),
            (None, None) => {}
        }
    }
    (pairs, unmatched)
}

/// Render the wind product for one U/V pair.
pub fn build_wind_product(u_path: &Path, v_path: &Path, settings: &WindSettings) -> Result<PathBuf> {
    let mismatch = |reason: String| PipelineError::PairMismatch {
        u: u_path.to_path_buf(),
        v: v_path.to_path_buf(),
        reason,
    };

    let suffix = match (wind_suffix(stem_of(u_path)), wind_suffix(stem_of(v_path))) {
        (Some((WindComponent::U, su)), Some((WindComponent::V, sv))) if su == sv => su.to_string(),
        (Some((WindComponent::U, su)), Some((WindComponent::V, sv))) => {
            return Err(mismatch(format!("suffixes differ: {su} vs {sv}")))
        }
        _ => return Err(mismatch("expected a UGRD_ and a VGRD_ raster".to_string())),
    };

    for path in [u_path, v_path] {
        warn_if_local(path);
    }

    let u = read_grayscale(u_path).map_err(|e| PipelineError::render(u_path, e))?;
    let v = read_grayscale(v_path).map_err(|e| PipelineError::render(v_path, e))?;
    let field = VectorField::from_rasters(&u, &v).map_err(|e| mismatch(e.to_string()))?;

    let dir = u_path.parent().unwrap_or_else(|| Path::new("."));
    let out = dir.join(format!("{}.{PNG_EXTENSION}", wind_stem(&suffix)));
    let png = render_vectors(&field, settings.mode.vector_mode(), &settings.render_config())
        .map_err(|e| PipelineError::render(&out, e))?;
    write_atomic(&out, &png)?;

    tracing::info!(
        product = %out.display(),
        mode = %settings.mode,
        width = field.width,
        height = field.height,
        "Built wind product"
    );
    Ok(out)
}

/// Build a wind product for every matched pair in `dir`.
pub fn build_wind_products(dir: &Path, settings: &WindSettings) -> Result<Vec<PathBuf>> {
    let candidates: Vec<PathBuf> = list_files(dir, PNG_EXTENSION)?
        .into_iter()
        .filter(|p| !stem_of(p).starts_with(WIND_PREFIX))
        .collect();
    let (pairs, unmatched) = pair_components(&candidates);

    for lone in &unmatched {
        tracing::warn!(raster = %lone.display(), "Wind component has no partner, skipping");
    }

    pairs
        .iter()
        .map(|pair| build_wind_product(&pair.u, &pair.v, settings))
        .collect()
}

/// Components are expected to share one encoding; a raster still on its
/// local extrema is drawn anyway.
fn warn_if_local(raster: &Path) {
    let info = info_path_for(raster);
    if !info.exists() {
        return;
    }
    match metadata::read(&info) {
        Ok(record) if !record.contains(RENORMALIZED) => {
            tracing::warn!(raster = %raster.display(), "Wind component is not renormalized");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(raster = %raster.display(), error = %e, "Unreadable metadata"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/r/{n}"))).collect()
    }

    #[test]
    fn test_pairs_on_identical_suffix() {
        let (pairs, unmatched) = pair_components(&paths(&[
            "VGRD_500_mb_f000.png",
            "UGRD_500_mb_f000.png",
            "UGRD_500_mb_f006.png",
            "HGT_500_mb_f000.png",
        ]));
        assert_eq!(
            pairs,
            vec![WindPair {
                suffix: "500_mb_f000".to_string(),
                u: PathBuf::from("/r/UGRD_500_mb_f000.png"),
                v: PathBuf::from("/r/VGRD_500_mb_f000.png"),
            }]
        );
        assert_eq!(unmatched, vec![PathBuf::from("/r/UGRD_500_mb_f006.png")]);
    }

    #[test]
    fn test_mismatched_suffix_is_rejected() {
        let err = build_wind_product(
            Path::new("/r/UGRD_500_mb_f000.png"),
            Path::new("/r/VGRD_500_mb_f006.png"),
            &WindSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::PairMismatch { .. }));
    }

    #[test]
    fn test_swapped_components_are_rejected() {
        let err = build_wind_product(
            Path::new("/r/VGRD_500_mb_f000.png"),
            Path::new("/r/UGRD_500_mb_f000.png"),
            &WindSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::PairMismatch { .. }));
    }
}
