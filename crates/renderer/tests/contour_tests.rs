//! Tests for the contour pipeline: smoothing, resampling, tracing, rendering.

use renderer::contour::{
    connect_segments, evenly_spaced_levels, generate_all_contours, march_squares,
    render_contours, render_contours_to_canvas, ContourConfig,
};
use renderer::png::decode_grayscale;
use renderer::resample::resample_linear;
use renderer::smoothing::{gaussian_filter, DEFAULT_TRUNCATE};
use test_utils::create_height_grid;

fn small_config(levels: Vec<f32>) -> ContourConfig {
    ContourConfig {
        levels,
        canvas_width: 200,
        canvas_height: 100,
        ..ContourConfig::default()
    }
}

fn prepared_field() -> (Vec<f32>, usize, usize) {
    let raw = create_height_grid(40, 20);
    let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let unit: Vec<f32> = raw.iter().map(|v| (v - min) / (max - min)).collect();
    let smoothed = gaussian_filter(&unit, 40, 20, 2.0, DEFAULT_TRUNCATE);
    (resample_linear(&smoothed, 40, 20, 100, 100), 100, 100)
}

#[test]
fn test_levels_span_field_range() {
    let (field, _, _) = prepared_field();
    let min = field.iter().cloned().fold(f32::INFINITY, f32::min) as f64;
    let max = field.iter().cloned().fold(f32::NEG_INFINITY, f32::max) as f64;
    let levels = evenly_spaced_levels(min, max, 20);

    assert_eq!(levels.len(), 20);
    assert_eq!(levels[0], min);
    assert_eq!(levels[19], max);
    assert!(levels.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_contouring_is_deterministic() {
    let (field, w, h) = prepared_field();
    let levels: Vec<f32> = evenly_spaced_levels(0.2, 0.8, 7)
        .into_iter()
        .map(|l| l as f32)
        .collect();
    let config = small_config(levels);

    let first = render_contours(&field, w, h, &config).unwrap();
    let second = render_contours(&field, w, h, &config).unwrap();
    assert_eq!(first, second);

    let a = generate_all_contours(&field, w, h, &config);
    let b = generate_all_contours(&field, w, h, &config);
    assert_eq!(a.len(), b.len());
    for (ca, cb) in a.iter().zip(b.iter()) {
        assert_eq!(ca.points, cb.points);
    }
}

#[test]
fn test_rendered_lines_are_white_on_transparent() {
    let (field, w, h) = prepared_field();
    let config = small_config(vec![0.5]);
    let contours = generate_all_contours(&field, w, h, &config);
    assert!(!contours.is_empty());

    let pixmap = render_contours_to_canvas(&contours, w, h, &config).unwrap();
    assert_eq!((pixmap.width(), pixmap.height()), (200, 100));
    let lit: Vec<_> = pixmap.pixels().iter().filter(|p| p.alpha() > 0).collect();
    assert!(!lit.is_empty());
    assert!(lit.len() < 200 * 100 / 2);
    for p in lit {
        let c = p.demultiply();
        assert!(c.red() >= 250 && c.green() >= 250 && c.blue() >= 250);
    }
}

#[test]
fn test_png_output_has_canvas_size() {
    let (field, w, h) = prepared_field();
    let png = render_contours(&field, w, h, &small_config(vec![0.3, 0.6])).unwrap();
    let decoded = decode_grayscale(&png).unwrap();
    assert_eq!((decoded.width, decoded.height), (200, 100));
}

#[test]
fn test_flat_field_has_no_contours() {
    let field = vec![0.5f32; 100];
    let config = small_config(vec![0.25, 0.75]);
    assert!(generate_all_contours(&field, 10, 10, &config).is_empty());
}

#[test]
fn test_vertical_ramp_gives_vertical_line() {
    // Values increase left to right; level 1.5 crosses between columns 1 and 2
    let data: Vec<f32> = (0..5).flat_map(|_| (0..4).map(|c| c as f32)).collect();
    let segments = march_squares(&data, 4, 5, 1.5);
    assert_eq!(segments.len(), 4);
    let contours = connect_segments(segments);
    assert_eq!(contours.len(), 1);
    assert!(!contours[0].closed);
    assert!(contours[0].points.iter().all(|p| (p.x - 1.5).abs() < 1e-6));
}

#[test]
fn test_nan_cells_are_skipped() {
    let mut data: Vec<f32> = (0..5).flat_map(|_| (0..4).map(|c| c as f32)).collect();
    data[4 * 2 + 1] = f32::NAN;
    let segments = march_squares(&data, 4, 5, 1.5);
    // The NaN corner touches two cells of the crossing column
    assert_eq!(segments.len(), 2);
}
