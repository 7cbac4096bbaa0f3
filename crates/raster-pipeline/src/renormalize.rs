//! Re-encoding rasters against family-wide extrema.
//!
//! A raster moves to a new encoding in three steps: the re-encoded PNG is
//! staged next to it, the record gets a `Renormalizing` marker, then the
//! staged file replaces the raster and the record commits `Renormalized`.
//! A run interrupted anywhere in between is completed by the next one
//! instead of being applied twice.

use std::path::{Path, PathBuf};

use renderer::png::{read_grayscale, GrayImage};

use crate::error::{PipelineError, Result};
use crate::family::{Family, Phase};
use crate::fsutil::{stem_of, write_atomic};
use crate::metadata::{self, info_path_for, InfoRecord, RasterMetadata, RENORMALIZED, RENORMALIZING};
use crate::normalize::Extent;

/// Extension of a staged re-encoded raster.
pub const PENDING_EXTENSION: &str = "pending";

/// Outcome of renormalizing one raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rewritten,
    /// Already encoded against the requested extrema.
    Unchanged,
}

/// Decode bytes through `current` and re-encode them against `global`.
pub fn renormalize_bytes(bytes: &[u8], current: Extent, global: Extent) -> Vec<u8> {
    bytes
        .iter()
        .map(|&b| global.encode(current.decode(b)))
        .collect()
}

/// Where the re-encoded raster is staged before it replaces `raster`.
pub fn pending_path_for(raster: &Path) -> PathBuf {
    raster.with_extension(PENDING_EXTENSION)
}

/// Renormalize one raster in place and mark its record.
pub fn renormalize_raster(raster: &Path, global: Extent) -> Result<Outcome> {
    let info = info_path_for(raster);
    if !info.exists() {
        return Err(PipelineError::MissingExtent {
            path: info,
            key: metadata::MIN_VALUE,
        });
    }
    let mut record = metadata::read(&info)?;
    if let Some((lo, hi)) = record.get_pair(&info, RENORMALIZING, " ")? {
        let staged = Extent::new(lo, hi);
        tracing::warn!(
            raster = %raster.display(),
            target_min = staged.min,
            target_max = staged.max,
            "Completing interrupted renormalization"
        );
        record = commit(raster, &info, record, staged)?;
    }

    let meta = RasterMetadata::from_record(&info, &record)?;
    if meta.renormalized == Some(global) {
        return Ok(Outcome::Unchanged);
    }

    let image = read_grayscale(raster).map_err(|e| PipelineError::render(raster, e))?;
    let pixels = renormalize_bytes(&image.pixels, meta.encoding(), global);
    let png = GrayImage::new(image.width, image.height, pixels)
        .and_then(|img| img.encode())
        .map_err(|e| PipelineError::render(raster, e))?;

    write_atomic(&pending_path_for(raster), &png)?;
    record.set(RENORMALIZING, metadata::renormalized_value(global));
    metadata::write_record(&info, &record)?;
    commit(raster, &info, record, global)?;

    tracing::debug!(
        raster = %raster.display(),
        from_min = meta.encoding().min,
        from_max = meta.encoding().max,
        "Renormalized raster"
    );
    Ok(Outcome::Rewritten)
}

/// Swap in a staged raster encoded against `target` and commit the record.
///
/// Without a staged file the swap already happened and only the record is
/// left to update.
fn commit(raster: &Path, info: &Path, mut record: InfoRecord, target: Extent) -> Result<InfoRecord> {
    let pending = pending_path_for(raster);
    if pending.exists() {
        std::fs::rename(&pending, raster).map_err(|e| PipelineError::io(raster, e))?;
    }
    for (key, value) in metadata::global_fields(target) {
        record.set(key, value);
    }
    record.set(RENORMALIZED, metadata::renormalized_value(target));
    record.remove(RENORMALIZING);
    metadata::write_record(info, &record)?;
    Ok(record)
}

/// Renormalize every raster of a family against `global`.
///
/// The family must be reconciled against the same extrema (or already
/// renormalized against them), and every member record must carry those
/// globals and lie within them. Nothing is rewritten unless all members
/// pass. Returns the number of rasters rewritten.
pub fn renormalize_family(dir: &Path, family: &Family, global: Extent) -> Result<usize> {
    let phase = family.read_phase(dir)?;
    match phase {
        Some(Phase::Reconciled(g)) | Some(Phase::Renormalized(g)) if g == global => {}
        other => return Err(family.phase_error(other, "reconciled with matching extrema")),
    }

    let rasters = family.rasters(dir)?;
    for raster in &rasters {
        check_member(family, raster, global)?;
    }

    let mut rewritten = 0;
    for raster in &rasters {
        if renormalize_raster(raster, global)? == Outcome::Rewritten {
            rewritten += 1;
        }
    }
    family.write_phase(dir, Phase::Renormalized(global))?;

    tracing::info!(
        family = %family,
        rewritten,
        global_min = global.min,
        global_max = global.max,
        "Renormalized family"
    );
    Ok(rewritten)
}

/// A member is ready when its record carries `global` and its own extrema
/// fall inside it.
fn check_member(family: &Family, raster: &Path, global: Extent) -> Result<()> {
    let info = info_path_for(raster);
    if !info.exists() {
        return Err(PipelineError::MissingExtent {
            path: info,
            key: metadata::MIN_VALUE,
        });
    }
    let meta = RasterMetadata::read(&info)?;
    if meta.global == Some(global) && global.contains(&meta.local) {
        return Ok(());
    }
    Err(PipelineError::Phase {
        parameter: family.parameter.clone(),
        level: family.level.clone(),
        found: format!(
            "stale ({} spans {} to {} with globals {:?})",
            stem_of(raster),
            meta.local.min,
            meta.local.max,
            meta.global.map(|g| (g.min, g.max))
        ),
        expected: "every member reconciled into the requested extrema",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_128_maps_to_64() {
        let out = renormalize_bytes(&[128], Extent::new(0.0, 10.0), Extent::new(0.0, 20.0));
        assert_eq!(out, vec![64]);
    }

    #[test]
    fn test_same_extent_is_identity() {
        let bytes: Vec<u8> = (0..=255).collect();
        let extent = Extent::new(-3.0, 12.0);
        assert_eq!(renormalize_bytes(&bytes, extent, extent), bytes);
    }

    #[test]
    fn test_endpoints_land_on_global_positions() {
        // local (50, 150) inside global (-20, 150)
        let out = renormalize_bytes(&[0, 255], Extent::new(50.0, 150.0), Extent::new(-20.0, 150.0));
        assert_eq!(out, vec![105, 255]);
    }

    fn staged_raster(dir: &Path, pixels: &[u8], local: Extent) -> (PathBuf, PathBuf) {
        let raster = dir.join("TMP_500_mb_gfs_20241009_00_f000.png");
        let info = info_path_for(&raster);
        let png = GrayImage::new(pixels.len(), 1, pixels.to_vec())
            .and_then(|img| img.encode())
            .unwrap();
        std::fs::write(&raster, png).unwrap();
        metadata::write(
            &info,
            &[
                (metadata::MIN_VALUE, local.min.to_string().into()),
                (metadata::MAX_VALUE, local.max.to_string().into()),
            ],
        )
        .unwrap();
        (raster, info)
    }

    fn pixels(raster: &Path) -> Vec<u8> {
        read_grayscale(raster).unwrap().pixels
    }

    fn mark_renormalizing(info: &Path, target: Extent) {
        metadata::append(info, &[(RENORMALIZING, metadata::renormalized_value(target))]).unwrap();
    }

    #[test]
    fn test_interrupted_after_swap_is_not_applied_twice() {
        let dir = tempfile::tempdir().unwrap();
        let (raster, info) = staged_raster(dir.path(), &[0, 128, 255], Extent::new(0.0, 10.0));
        let global = Extent::new(0.0, 20.0);

        // The swap landed but the record still says local
        let swapped = GrayImage::new(3, 1, vec![0, 64, 128]).and_then(|i| i.encode()).unwrap();
        std::fs::write(&raster, swapped).unwrap();
        mark_renormalizing(&info, global);

        assert_eq!(renormalize_raster(&raster, global).unwrap(), Outcome::Unchanged);
        assert_eq!(pixels(&raster), vec![0, 64, 128]);

        let record = metadata::read(&info).unwrap();
        assert_eq!(record.get_str(RENORMALIZED), Some("0 20"));
        assert!(!record.contains(RENORMALIZING));
    }

    #[test]
    fn test_interrupted_before_swap_finishes_from_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let (raster, info) = staged_raster(dir.path(), &[0, 128, 255], Extent::new(0.0, 10.0));
        let global = Extent::new(0.0, 20.0);

        let staged = GrayImage::new(3, 1, vec![0, 64, 128]).and_then(|i| i.encode()).unwrap();
        std::fs::write(pending_path_for(&raster), staged).unwrap();
        mark_renormalizing(&info, global);

        renormalize_raster(&raster, global).unwrap();
        assert_eq!(pixels(&raster), vec![0, 64, 128]);
        assert!(!pending_path_for(&raster).exists());
    }

    #[test]
    fn test_staged_file_without_marker_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let (raster, _) = staged_raster(dir.path(), &[0, 128, 255], Extent::new(0.0, 10.0));
        // Left over from a run that stopped before marking the record
        std::fs::write(pending_path_for(&raster), b"partial").unwrap();

        assert_eq!(
            renormalize_raster(&raster, Extent::new(0.0, 20.0)).unwrap(),
            Outcome::Rewritten
        );
        assert_eq!(pixels(&raster), vec![0, 64, 128]);
        assert!(!pending_path_for(&raster).exists());
    }

    #[test]
    fn test_flat_global_is_mid_gray() {
        let out = renormalize_bytes(&[127, 127], Extent::new(7.0, 7.0), Extent::new(7.0, 7.0));
        assert_eq!(out, vec![127, 127]);
    }
}
