//! Wind products from component rasters on disk.

use std::path::{Path, PathBuf};

use raster_pipeline::{Pipeline, PipelineConfig, PipelineError, WindMode};
use renderer::png::{create_png_grayscale, decode_grayscale};
use test_utils::DataDirs;

fn write_component(dir: &Path, name: &str, value: u8) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, create_png_grayscale(&vec![value; 64 * 32], 64, 32).unwrap()).unwrap();
    path
}

fn pipeline(dirs: &DataDirs, mode: WindMode) -> Pipeline {
    let mut config = PipelineConfig {
        source_dir: dirs.grib_dir(),
        output_dir: dirs.png_dir(),
        ..PipelineConfig::default()
    };
    config.wind.mode = mode;
    config.wind.canvas_width = 512;
    config.wind.canvas_height = 256;
    Pipeline::new(config).unwrap()
}

fn has_ink(png: &Path) -> bool {
    let bytes = std::fs::read(png).unwrap();
    // Transparent background decodes to black luma, strokes are white
    decode_grayscale(&bytes).unwrap().pixels.iter().any(|&p| p > 0)
}

#[test]
fn test_pair_builds_wind_product() {
    let dirs = DataDirs::new();
    let dir = dirs.png_dir();
    let u = write_component(&dir, "UGRD_500_mb_f000.png", 255);
    let v = write_component(&dir, "VGRD_500_mb_f000.png", 128);

    let out = pipeline(&dirs, WindMode::Arrows).build_wind_product(&u, &v).unwrap();
    assert_eq!(out, dir.join("WIND_500_mb_f000.png"));
    assert!(has_ink(&out));
}

#[test]
fn test_lone_component_is_skipped() {
    let dirs = DataDirs::new();
    let dir = dirs.png_dir();
    write_component(&dir, "UGRD_500_mb_f000.png", 255);

    let products = pipeline(&dirs, WindMode::Arrows).build_wind_products().unwrap();
    assert!(products.is_empty());
    assert!(!dir.join("WIND_500_mb_f000.png").exists());
}

#[test]
fn test_batch_builds_every_matched_pair() {
    let dirs = DataDirs::new();
    let dir = dirs.png_dir();
    for fh in ["f000", "f003"] {
        write_component(&dir, &format!("UGRD_500_mb_{fh}.png"), 200);
        write_component(&dir, &format!("VGRD_500_mb_{fh}.png"), 60);
    }
    write_component(&dir, "VGRD_500_mb_f006.png", 60);

    let pipeline = pipeline(&dirs, WindMode::Streamlines);
    let products = pipeline.build_wind_products().unwrap();
    assert_eq!(
        products,
        vec![dir.join("WIND_500_mb_f000.png"), dir.join("WIND_500_mb_f003.png")]
    );

    // Existing products are not mistaken for components on a rerun
    assert_eq!(pipeline.build_wind_products().unwrap().len(), 2);
}

#[test]
fn test_shape_mismatch_is_pair_mismatch() {
    let dirs = DataDirs::new();
    let dir = dirs.png_dir();
    let u = write_component(&dir, "UGRD_500_mb_f000.png", 255);
    let v = dir.join("VGRD_500_mb_f000.png");
    std::fs::write(&v, create_png_grayscale(&[128; 16], 4, 4).unwrap()).unwrap();

    let err = pipeline(&dirs, WindMode::Arrows)
        .build_wind_product(&u, &v)
        .unwrap_err();
    assert!(matches!(err, PipelineError::PairMismatch { .. }));
}

#[test]
fn test_missing_component_file_is_reported() {
    let dirs = DataDirs::new();
    let dir = dirs.png_dir();
    let u = write_component(&dir, "UGRD_500_mb_f000.png", 255);
    let v = dir.join("VGRD_500_mb_f000.png");

    let err = pipeline(&dirs, WindMode::Arrows)
        .build_wind_product(&u, &v)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Render { .. }));
}
