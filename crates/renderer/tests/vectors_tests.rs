//! Tests for wind arrow and streamline rendering.

use renderer::png::{decode_grayscale, GrayImage};
use renderer::vectors::{
    render_arrows, render_vectors, trace_streamlines, VectorConfig, VectorField, VectorMode,
};
use test_utils::{create_u_wind_grid, create_v_wind_grid};

fn small_config() -> VectorConfig {
    VectorConfig {
        glyph_grid: 4,
        canvas_width: 160,
        canvas_height: 80,
        ..VectorConfig::default()
    }
}

#[test]
fn test_field_from_rasters() {
    let u = GrayImage::new(2, 1, vec![0, 255]).unwrap();
    let v = GrayImage::new(2, 1, vec![255, 0]).unwrap();
    let field = VectorField::from_rasters(&u, &v).unwrap();
    assert_eq!(field.u, vec![-1.0, 1.0]);
    assert_eq!(field.v, vec![1.0, -1.0]);
}

#[test]
fn test_eastward_arrows_extend_right_of_centre() {
    // Single glyph at the grid centre, unit eastward flow
    let field = VectorField::new(3, 3, vec![1.0; 9], vec![0.0; 9]).unwrap();
    let config = VectorConfig {
        glyph_grid: 1,
        scale: 4.0,
        canvas_width: 120,
        canvas_height: 120,
        ..VectorConfig::default()
    };
    let pixmap = render_arrows(&field, &config).unwrap();

    // Arrow is centred on grid (0, 0) -> canvas (0, 0); length 30 px
    let alpha_at = |x: u32, y: u32| pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0);
    assert!(alpha_at(10, 0) > 0);
    assert_eq!(alpha_at(0, 40), 0);
    assert_eq!(alpha_at(40, 0), 0);
}

#[test]
fn test_both_modes_encode_canvas_sized_png() {
    let u = create_u_wind_grid(40, 20);
    let v = create_v_wind_grid(40, 20);
    let field = VectorField::new(40, 20, u, v).unwrap();

    for mode in [VectorMode::Arrows, VectorMode::Streamlines] {
        let png = render_vectors(&field, mode, &small_config()).unwrap();
        let decoded = decode_grayscale(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (160, 80));
        let rgba = image::load_from_memory(&png).unwrap().to_rgba8();
        assert!(rgba.pixels().any(|p| p.0[3] > 0), "{:?} drew nothing", mode);
    }
}

#[test]
fn test_streamlines_are_deterministic() {
    let field = VectorField::new(
        40,
        20,
        create_u_wind_grid(40, 20),
        create_v_wind_grid(40, 20),
    )
    .unwrap();
    let config = small_config();
    assert_eq!(trace_streamlines(&field, &config), trace_streamlines(&field, &config));
}
