//! Reconciliation and renormalization over rasters on disk.

use std::path::{Path, PathBuf};

use raster_pipeline::family::{Family, Phase};
use raster_pipeline::metadata::{self, GLOBAL_MAX, GLOBAL_MIN, RENORMALIZED};
use raster_pipeline::normalize::Extent;
use gfs_common::BoundingBox;
use raster_pipeline::{decode, reconcile, renormalize, DegeneratePolicy, GriddedField, PipelineError, RasterMetadata};
use renderer::png::{create_png_grayscale, read_grayscale};
use test_utils::fixtures;

/// Write a raster and its record the way the decoder does.
fn write_raster(dir: &Path, parameter: &str, level: &str, fh: u32, pixels: &[u8], local: Extent) -> PathBuf {
    let stem = fixtures::raster_stem(parameter, level, fh);
    let png = dir.join(format!("{stem}.png"));
    std::fs::write(&png, create_png_grayscale(pixels, pixels.len(), 1).unwrap()).unwrap();
    RasterMetadata {
        parameter: parameter.to_string(),
        level: level.to_string(),
        latitude_bounds: (36.0, 45.0),
        longitude_bounds: (230.0, 239.0),
        source_file: fixtures::source_file_name(parameter, level, fh),
        local,
        global: None,
        renormalized: None,
    }
    .write(&png.with_extension("info"))
    .unwrap();
    png
}

fn pixels(path: &Path) -> Vec<u8> {
    read_grayscale(path).unwrap().pixels
}

/// Write a 10x10 field ramping from `min` to `max` through the decoder's writer.
fn decode_ramp(dir: &Path, fh: u32, min: f32, max: f32) -> PathBuf {
    let values: Vec<f32> = (0..100).map(|i| min + (max - min) * i as f32 / 99.0).collect();
    let field = GriddedField {
        parameter: "HGT".to_string(),
        level: "500_mb".to_string(),
        source: PathBuf::from(fixtures::source_file_name("HGT", "500_mb", fh)),
        width: 10,
        height: 10,
        values,
        latitudes: vec![40.0; 100],
        longitudes: vec![235.0; 100],
    };
    let bbox = BoundingBox::new(230.0, 36.0, 239.0, 45.0);
    decode::write_raster(&field, &bbox, dir, DegeneratePolicy::MidGray)
        .unwrap()
        .png_path
}

#[test]
fn test_reconcile_family_is_order_independent() {
    let extents = [Extent::new(1.0, 5.0), Extent::new(0.0, 10.0), Extent::new(2.0, 3.0)];
    // Forecast hours decide the on-disk listing order, so permute them
    for hours in [[0, 3, 6], [6, 0, 3], [3, 6, 0]] {
        let dir = tempfile::tempdir().unwrap();
        for (extent, fh) in extents.iter().zip(hours) {
            write_raster(dir.path(), "TMP", "500_mb", fh, &[0, 255], *extent);
        }
        let family = Family::new("TMP", "500_mb");
        let global = reconcile::normalize_family(dir.path(), &family).unwrap();
        assert_eq!(global, Extent::new(0.0, 10.0));
    }
}

#[test]
fn test_reconcile_writes_globals_and_phase() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(1.0, 5.0));
    let b = write_raster(dir.path(), "TMP", "500_mb", 3, &[0, 255], Extent::new(0.0, 10.0));
    // Another family in the same directory is left alone
    let other = write_raster(dir.path(), "TMP", "850_mb", 0, &[0, 255], Extent::new(-50.0, 50.0));

    let family = Family::new("TMP", "500_mb");
    reconcile::normalize_family(dir.path(), &family).unwrap();

    for raster in [&a, &b] {
        let meta = RasterMetadata::read(&raster.with_extension("info")).unwrap();
        assert_eq!(meta.global, Some(Extent::new(0.0, 10.0)));
    }
    let untouched = RasterMetadata::read(&other.with_extension("info")).unwrap();
    assert_eq!(untouched.global, None);
    assert_eq!(
        family.read_phase(dir.path()).unwrap(),
        Some(Phase::Reconciled(Extent::new(0.0, 10.0)))
    );
}

#[test]
fn test_repeated_reconcile_does_not_duplicate_keys() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(1.0, 5.0));
    let family = Family::new("TMP", "500_mb");
    reconcile::normalize_family(dir.path(), &family).unwrap();
    reconcile::normalize_family(dir.path(), &family).unwrap();

    let text = std::fs::read_to_string(raster.with_extension("info")).unwrap();
    assert_eq!(text.matches(GLOBAL_MIN).count(), 1);
    assert_eq!(text.matches(GLOBAL_MAX).count(), 1);
}

#[test]
fn test_empty_family_is_no_data() {
    let dir = tempfile::tempdir().unwrap();
    write_raster(dir.path(), "TMP", "850_mb", 0, &[0, 255], Extent::new(0.0, 1.0));
    let err = reconcile::normalize_family(dir.path(), &Family::new("HGT", "500_mb")).unwrap_err();
    assert!(matches!(err, PipelineError::NoData { .. }));
}

#[test]
fn test_raster_without_record_blocks_reconcile() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(0.0, 1.0));
    write_raster(dir.path(), "TMP", "500_mb", 3, &[0, 255], Extent::new(0.0, 2.0));
    std::fs::remove_file(raster.with_extension("info")).unwrap();

    let err = reconcile::normalize_family(dir.path(), &Family::new("TMP", "500_mb")).unwrap_err();
    assert!(matches!(err, PipelineError::Metadata { .. }));
}

#[test]
fn test_renormalize_byte_128_to_64() {
    let dir = tempfile::tempdir().unwrap();
    let narrow = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 128, 255], Extent::new(0.0, 10.0));
    write_raster(dir.path(), "TMP", "500_mb", 3, &[0, 128, 255], Extent::new(0.0, 20.0));

    let family = Family::new("TMP", "500_mb");
    let global = reconcile::normalize_family(dir.path(), &family).unwrap();
    assert_eq!(global, Extent::new(0.0, 20.0));

    let rewritten = renormalize::renormalize_family(dir.path(), &family, global).unwrap();
    assert_eq!(rewritten, 2);
    assert_eq!(pixels(&narrow), vec![0, 64, 128]);

    let meta = RasterMetadata::read(&narrow.with_extension("info")).unwrap();
    // Original extrema are preserved, the marker records the encoding
    assert_eq!(meta.local, Extent::new(0.0, 10.0));
    assert_eq!(meta.renormalized, Some(Extent::new(0.0, 20.0)));
    assert_eq!(
        family.read_phase(dir.path()).unwrap(),
        Some(Phase::Renormalized(global))
    );
}

#[test]
fn test_renormalize_twice_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 77, 128, 255], Extent::new(0.0, 10.0));
    write_raster(dir.path(), "TMP", "500_mb", 3, &[0, 255], Extent::new(-5.0, 20.0));

    let family = Family::new("TMP", "500_mb");
    let global = reconcile::normalize_family(dir.path(), &family).unwrap();
    renormalize::renormalize_family(dir.path(), &family, global).unwrap();
    let once = pixels(&raster);

    assert_eq!(renormalize::renormalize_family(dir.path(), &family, global).unwrap(), 0);
    assert_eq!(pixels(&raster), once);

    // A fresh reconcile over unchanged records finds the same extrema
    let again = reconcile::normalize_family(dir.path(), &family).unwrap();
    assert_eq!(again, global);
    assert_eq!(renormalize::renormalize_family(dir.path(), &family, again).unwrap(), 0);
    assert_eq!(pixels(&raster), once);
}

#[test]
fn test_widened_extrema_decode_through_marker() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 51, 102, 255], Extent::new(0.0, 10.0));
    let family = Family::new("TMP", "500_mb");

    let first = reconcile::normalize_family(dir.path(), &family).unwrap();
    renormalize::renormalize_family(dir.path(), &family, first).unwrap();

    // A later forecast hour widens the family
    write_raster(dir.path(), "TMP", "500_mb", 6, &[0, 255], Extent::new(0.0, 20.0));
    let second = reconcile::normalize_family(dir.path(), &family).unwrap();
    assert_eq!(second, Extent::new(0.0, 20.0));
    renormalize::renormalize_family(dir.path(), &family, second).unwrap();

    // 0, 2, 4, 10 on a 0..20 scale
    assert_eq!(pixels(&raster), vec![0, 26, 51, 128]);
}

#[test]
fn test_renormalize_requires_reconciled_phase() {
    let dir = tempfile::tempdir().unwrap();
    write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(0.0, 10.0));
    let family = Family::new("TMP", "500_mb");

    let err = renormalize::renormalize_family(dir.path(), &family, Extent::new(0.0, 10.0)).unwrap_err();
    assert!(matches!(err, PipelineError::Phase { .. }));

    family.write_phase(dir.path(), Phase::Local).unwrap();
    let err = renormalize::renormalize_family(dir.path(), &family, Extent::new(0.0, 10.0)).unwrap_err();
    assert!(matches!(err, PipelineError::Phase { .. }));

    // Extrema that differ from the reconciled ones are refused too
    let global = reconcile::normalize_family(dir.path(), &family).unwrap();
    let err = renormalize::renormalize_family(dir.path(), &family, Extent::new(global.min, global.max + 1.0))
        .unwrap_err();
    assert!(matches!(err, PipelineError::Phase { .. }));
}

#[test]
fn test_missing_extent_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(0.0, 10.0));
    let info = raster.with_extension("info");
    let text = std::fs::read_to_string(&info).unwrap();
    std::fs::write(&info, text.replace("Min value", "Minimum")).unwrap();

    let err = renormalize::renormalize_raster(&raster, Extent::new(0.0, 20.0)).unwrap_err();
    assert!(matches!(err, PipelineError::MissingExtent { .. }));

    std::fs::remove_file(&info).unwrap();
    let err = renormalize::renormalize_raster(&raster, Extent::new(0.0, 20.0)).unwrap_err();
    assert!(matches!(err, PipelineError::MissingExtent { .. }));
}

#[test]
fn test_marker_format() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 255], Extent::new(0.5, 10.0));
    renormalize::renormalize_raster(&raster, Extent::new(-20.0, 150.5)).unwrap();
    let record = metadata::read(&raster.with_extension("info")).unwrap();
    assert_eq!(record.get_str(RENORMALIZED), Some("-20 150.5"));
    assert_eq!(record.get_str("Min value"), Some("0.5"));
}

#[test]
fn test_late_member_is_not_renormalized_against_stale_extrema() {
    let dir = tempfile::tempdir().unwrap();
    let family = Family::new("HGT", "500_mb");
    decode_ramp(dir.path(), 0, 0.0, 100.0);
    decode_ramp(dir.path(), 3, 50.0, 150.0);
    let first = reconcile::normalize_family(dir.path(), &family).unwrap();
    assert_eq!(first, Extent::new(0.0, 150.0));

    // A later forecast hour lands after reconciliation
    let late = decode_ramp(dir.path(), 6, -500.0, 900.0);
    assert_eq!(family.read_phase(dir.path()).unwrap(), Some(Phase::Local));
    let err = renormalize::renormalize_family(dir.path(), &family, first).unwrap_err();
    assert!(matches!(err, PipelineError::Phase { .. }));

    let second = reconcile::normalize_family(dir.path(), &family).unwrap();
    assert_eq!(second, Extent::new(-500.0, 900.0));
    assert_eq!(renormalize::renormalize_family(dir.path(), &family, second).unwrap(), 3);

    // The late raster spans the whole family range, so nothing is clipped
    let bytes = pixels(&late);
    assert_eq!(bytes[0], 0);
    assert_eq!(bytes[99], 255);
    assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 1);
    assert_eq!(bytes.iter().filter(|&&b| b == 255).count(), 1);
}

#[test]
fn test_stale_record_blocks_renormalization_before_any_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let family = Family::new("TMP", "500_mb");
    let early = write_raster(dir.path(), "TMP", "500_mb", 0, &[0, 128, 255], Extent::new(0.0, 10.0));
    write_raster(dir.path(), "TMP", "500_mb", 3, &[0, 255], Extent::new(0.0, 20.0));
    let global = reconcile::normalize_family(dir.path(), &family).unwrap();

    // A member written behind the phase file's back
    write_raster(dir.path(), "TMP", "500_mb", 6, &[0, 255], Extent::new(-5.0, 30.0));
    family.write_phase(dir.path(), Phase::Reconciled(global)).unwrap();

    let err = renormalize::renormalize_family(dir.path(), &family, global).unwrap_err();
    assert!(matches!(err, PipelineError::Phase { .. }));
    assert_eq!(pixels(&early), vec![0, 128, 255]);
    assert_eq!(
        RasterMetadata::read(&early.with_extension("info")).unwrap().renormalized,
        None
    );
}
