//! Contour line (isoline) rendering using marching squares algorithm.
//!
//! Contours are traced in grid coordinates and stroked onto a transparent
//! canvas whose extent maps `[0, width] x [0, height]` of the grid, row 0 at
//! the top.

use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{RenderError, Result};
use crate::png;

/// A point in 2D space (grid coordinates until rendered)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two points
#[derive(Debug, Clone)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A complete contour line (polyline)
#[derive(Debug, Clone)]
pub struct Contour {
    pub level: f32,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// Configuration for contour rendering
#[derive(Debug, Clone)]
pub struct ContourConfig {
    /// Contour levels to draw
    pub levels: Vec<f32>,
    /// Line width in pixels
    pub line_width: f32,
    /// Line color [R, G, B, A]
    pub line_color: [u8; 4],
    /// Number of Chaikin smoothing passes (0 = no smoothing)
    pub smoothing_passes: u32,
    /// Output canvas size in pixels
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            levels: vec![],
            line_width: 1.0,
            line_color: [255, 255, 255, 255],
            smoothing_passes: 0,
            canvas_width: 2048,
            canvas_height: 1024,
        }
    }
}

/// `n` evenly spaced levels from `min` to `max`, both ends included.
///
/// A flat range yields the single level `min`; non-finite bounds yield none.
pub fn evenly_spaced_levels(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 0 || !min.is_finite() || !max.is_finite() {
        return vec![];
    }
    if n == 1 || max <= min {
        return vec![min];
    }
    let step = (max - min) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { max } else { min + step * i as f64 })
        .collect()
}

/// Marching squares algorithm to generate contour lines
///
/// # Arguments
/// * `data` - Grid data in row-major order
/// * `width` - Grid width
/// * `height` - Grid height
/// * `level` - Contour level to extract
///
/// # Returns
/// Vector of line segments representing the contour
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x];
            let tr = data[y * width + x + 1];
            let bl = data[(y + 1) * width + x];
            let br = data[(y + 1) * width + x + 1];

            // Skip cells with NaN values
            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut cell_index = 0;
            if tl >= level {
                cell_index |= 1;
            }
            if tr >= level {
                cell_index |= 2;
            }
            if br >= level {
                cell_index |= 4;
            }
            if bl >= level {
                cell_index |= 8;
            }

            segments.extend(get_cell_segments(
                cell_index, x as f32, y as f32, tl, tr, br, bl, level,
            ));
        }
    }

    segments
}

/// Get line segments for a marching squares cell
///
/// Uses linear interpolation to find where the contour crosses cell edges
#[allow(clippy::too_many_arguments)]
fn get_cell_segments(
    cell_index: u8,
    x: f32,
    y: f32,
    tl: f32,
    tr: f32,
    br: f32,
    bl: f32,
    level: f32,
) -> Vec<Segment> {
    let top = interpolate_edge(x, y, x + 1.0, y, tl, tr, level);
    let right = interpolate_edge(x + 1.0, y, x + 1.0, y + 1.0, tr, br, level);
    let bottom = interpolate_edge(x, y + 1.0, x + 1.0, y + 1.0, bl, br, level);
    let left = interpolate_edge(x, y, x, y + 1.0, tl, bl, level);

    match cell_index {
        0 | 15 => vec![],
        1 | 14 => vec![Segment { start: left, end: top }],
        2 | 13 => vec![Segment { start: top, end: right }],
        3 | 12 => vec![Segment { start: left, end: right }],
        4 | 11 => vec![Segment { start: right, end: bottom }],
        // Saddles: two separate segments
        5 => vec![
            Segment { start: left, end: top },
            Segment { start: right, end: bottom },
        ],
        6 | 9 => vec![Segment { start: top, end: bottom }],
        7 | 8 => vec![Segment { start: left, end: bottom }],
        10 => vec![
            Segment { start: top, end: right },
            Segment { start: left, end: bottom },
        ],
        _ => vec![],
    }
}

/// Linearly interpolate between two edge points based on data values
fn interpolate_edge(x1: f32, y1: f32, x2: f32, y2: f32, val1: f32, val2: f32, level: f32) -> Point {
    if (val2 - val1).abs() < 1e-6 {
        return Point::new((x1 + x2) / 2.0, (y1 + y2) / 2.0);
    }

    let t = ((level - val1) / (val2 - val1)).clamp(0.0, 1.0);
    Point::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1))
}

/// Connect line segments into continuous polylines
///
/// Segments are chained greedily in input order, so identical input gives
/// identical polylines.
pub fn connect_segments(segments: Vec<Segment>) -> Vec<Contour> {
    if segments.is_empty() {
        return vec![];
    }

    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];
    let epsilon = 0.001; // Tolerance for point matching

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        let mut points = vec![segments[start_idx].start, segments[start_idx].end];
        used[start_idx] = true;

        let mut changed = true;
        while changed {
            changed = false;
            let Some(&current_end) = points.last() else {
                break;
            };

            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if seg.start.distance(&current_end) < epsilon {
                    points.push(seg.end);
                } else if seg.end.distance(&current_end) < epsilon {
                    points.push(seg.start);
                } else {
                    continue;
                }
                used[i] = true;
                changed = true;
                break;
            }
        }

        let closed = points.len() > 2 && points[0].distance(&points[points.len() - 1]) < epsilon;
        contours.push(Contour {
            level: 0.0, // Level will be set by caller
            points,
            closed,
        });
    }

    contours
}

/// Apply Chaikin's corner cutting algorithm for smoothing
pub fn smooth_contour(contour: &Contour, iterations: u32) -> Contour {
    if iterations == 0 || contour.points.len() < 3 {
        return contour.clone();
    }

    let mut points = contour.points.clone();

    for _ in 0..iterations {
        let mut new_points = Vec::with_capacity(points.len() * 2 + 2);
        if !contour.closed {
            new_points.push(points[0]);
        }

        let pairs = if contour.closed {
            points.len()
        } else {
            points.len() - 1
        };
        for i in 0..pairs {
            let p1 = points[i];
            let p2 = points[(i + 1) % points.len()];
            // 25% and 75% along the segment
            new_points.push(Point::new(0.75 * p1.x + 0.25 * p2.x, 0.75 * p1.y + 0.25 * p2.y));
            new_points.push(Point::new(0.25 * p1.x + 0.75 * p2.x, 0.25 * p1.y + 0.75 * p2.y));
        }

        if !contour.closed {
            new_points.push(points[points.len() - 1]);
        }
        points = new_points;
    }

    Contour {
        level: contour.level,
        points,
        closed: contour.closed,
    }
}

/// Generate all contours for multiple levels
pub fn generate_all_contours(
    data: &[f32],
    width: usize,
    height: usize,
    config: &ContourConfig,
) -> Vec<Contour> {
    let mut all_contours = Vec::new();

    for &level in &config.levels {
        let segments = march_squares(data, width, height, level);
        let mut contours = connect_segments(segments);

        for contour in &mut contours {
            contour.level = level;
            if config.smoothing_passes > 0 {
                *contour = smooth_contour(contour, config.smoothing_passes);
            }
        }

        all_contours.extend(contours);
    }

    all_contours
}

/// Stroke contours traced on a `grid_width x grid_height` grid onto a
/// transparent canvas.
pub fn render_contours_to_canvas(
    contours: &[Contour],
    grid_width: usize,
    grid_height: usize,
    config: &ContourConfig,
) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(config.canvas_width, config.canvas_height).ok_or(
        RenderError::Canvas {
            width: config.canvas_width,
            height: config.canvas_height,
        },
    )?;
    pixmap.fill(Color::TRANSPARENT);

    let sx = config.canvas_width as f32 / grid_width.max(1) as f32;
    let sy = config.canvas_height as f32 / grid_height.max(1) as f32;

    let mut paint = Paint::default();
    let [r, g, b, a] = config.line_color;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: config.line_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };

    for contour in contours {
        if contour.points.len() < 2 {
            continue;
        }

        let mut pb = PathBuilder::new();
        pb.move_to(contour.points[0].x * sx, contour.points[0].y * sy);
        for point in &contour.points[1..] {
            pb.line_to(point.x * sx, point.y * sy);
        }
        if contour.closed {
            pb.close();
        }

        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    Ok(pixmap)
}

/// Trace, stroke and PNG-encode the contours of a scalar grid.
pub fn render_contours(
    data: &[f32],
    width: usize,
    height: usize,
    config: &ContourConfig,
) -> Result<Vec<u8>> {
    let contours = generate_all_contours(data, width, height, config);

    tracing::debug!(
        grid_width = width,
        grid_height = height,
        num_levels = config.levels.len(),
        num_contours = contours.len(),
        total_points = contours.iter().map(|c| c.points.len()).sum::<usize>(),
        "Generated contours"
    );

    let pixmap = render_contours_to_canvas(&contours, width, height, config)?;
    png::encode_pixmap(&pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evenly_spaced_levels() {
        assert_eq!(evenly_spaced_levels(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(evenly_spaced_levels(3.0, 3.0, 20), vec![3.0]);
        assert_eq!(evenly_spaced_levels(2.0, 9.0, 1), vec![2.0]);
        assert!(evenly_spaced_levels(0.0, f64::NAN, 5).is_empty());
        assert!(evenly_spaced_levels(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_last_level_is_exact_max() {
        let levels = evenly_spaced_levels(0.1, 0.7, 20);
        assert_eq!(levels.len(), 20);
        assert_eq!(levels[19], 0.7);
    }

    #[test]
    fn test_interpolate_edge() {
        let p = interpolate_edge(0.0, 0.0, 1.0, 0.0, 0.0, 10.0, 5.0);
        assert!((p.x - 0.5).abs() < 0.01);
        assert!((p.y - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_march_squares_flat() {
        let data = vec![5.0; 9];
        assert!(march_squares(&data, 3, 3, 6.0).is_empty());
    }

    #[test]
    fn test_peak_gives_closed_ring() {
        let data = vec![
            0.0, 0.0, 0.0, //
            0.0, 10.0, 0.0, //
            0.0, 0.0, 0.0,
        ];
        let segments = march_squares(&data, 3, 3, 5.0);
        assert_eq!(segments.len(), 4);
        let contours = connect_segments(segments);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed);
    }

    #[test]
    fn test_chaikin_keeps_open_endpoints() {
        let contour = Contour {
            level: 1.0,
            points: vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0), Point::new(4.0, 4.0)],
            closed: false,
        };
        let smoothed = smooth_contour(&contour, 1);
        assert_eq!(smoothed.points.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(smoothed.points.last(), Some(&Point::new(4.0, 4.0)));
        assert_eq!(smoothed.points.len(), 6);
    }
}
