//! Wind vector rendering: arrows (quiver) and streamlines.
//!
//! Components come from 8-bit rasters and are decoded to `[-1, 1]` with
//! `2 * (byte / 255) - 1`. Positive U points right and positive V points
//! down the image (row 0 at the top), matching an inverted y axis.

use std::f64::consts::PI;

use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{RenderError, Result};
use crate::png::{self, GrayImage};
use crate::resample::{linspace, sample_bilinear};

/// How a wind field is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorMode {
    #[default]
    Arrows,
    Streamlines,
}

/// Configuration for wind vector rendering
#[derive(Debug, Clone)]
pub struct VectorConfig {
    /// Glyphs per axis after strided subsampling
    pub glyph_grid: usize,
    /// Magnitude that spans the full canvas width (larger = shorter arrows)
    pub scale: f32,
    /// Stroke width in pixels
    pub line_width: f32,
    /// Line color [R, G, B, A]
    pub color: [u8; 4],
    /// Streamline seeds per axis, also the resolution of the occupancy mask
    pub seed_density: usize,
    /// Integration step in grid cells
    pub step: f64,
    /// Maximum integration steps per direction
    pub max_steps: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            glyph_grid: 40,
            scale: 20.0,
            line_width: 2.0,
            color: [255, 255, 255, 230],
            seed_density: 30,
            step: 0.5,
            max_steps: 400,
            canvas_width: 2048,
            canvas_height: 1024,
        }
    }
}

/// Paired U/V components on the same grid.
#[derive(Debug, Clone)]
pub struct VectorField {
    pub width: usize,
    pub height: usize,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
}

impl VectorField {
    pub fn new(width: usize, height: usize, u: Vec<f32>, v: Vec<f32>) -> Result<Self> {
        if u.len() != width * height || v.len() != width * height {
            return Err(RenderError::ShapeMismatch {
                left: (width, height),
                right: (u.len(), v.len()),
            });
        }
        Ok(Self {
            width,
            height,
            u,
            v,
        })
    }

    /// Decode two 8-bit component rasters to signed values.
    pub fn from_rasters(u: &GrayImage, v: &GrayImage) -> Result<Self> {
        if (u.width, u.height) != (v.width, v.height) {
            return Err(RenderError::ShapeMismatch {
                left: (u.width, u.height),
                right: (v.width, v.height),
            });
        }
        Self::new(u.width, u.height, decode_signed(&u.pixels), decode_signed(&v.pixels))
    }

    fn velocity(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let u = sample_bilinear(&self.u, self.width, self.height, x, y)?;
        let v = sample_bilinear(&self.v, self.width, self.height, x, y)?;
        Some((u as f64, v as f64))
    }
}

/// `2 * (byte / 255) - 1` for every pixel.
pub fn decode_signed(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&b| b as f32 / 255.0 * 2.0 - 1.0).collect()
}

/// Take every `dim / n`-th row and column (at least 1), keeping the first `n` of each.
///
/// Returns the sampled values with the source row and column indices they came from.
pub fn subsample_strided(
    data: &[f32],
    width: usize,
    height: usize,
    n: usize,
) -> (Vec<f32>, Vec<usize>, Vec<usize>) {
    let row_stride = (height / n.max(1)).max(1);
    let col_stride = (width / n.max(1)).max(1);
    let rows: Vec<usize> = (0..height).step_by(row_stride).take(n).collect();
    let cols: Vec<usize> = (0..width).step_by(col_stride).take(n).collect();

    let mut out = Vec::with_capacity(rows.len() * cols.len());
    for &r in &rows {
        for &c in &cols {
            out.push(data[r * width + c]);
        }
    }
    (out, rows, cols)
}

/// Convert U and V wind components to speed and direction (radians FROM)
///
/// Direction follows the meteorological convention: 0 = from North,
/// π/2 = from East.
pub fn uv_to_speed_direction(u: f32, v: f32) -> (f64, f64) {
    let u = u as f64;
    let v = v as f64;
    let speed = (u * u + v * v).sqrt();

    let mut direction = (-u).atan2(-v);
    if direction < 0.0 {
        direction += 2.0 * PI;
    }

    (speed, direction)
}

fn new_canvas(config: &VectorConfig) -> Result<Pixmap> {
    let mut pixmap = Pixmap::new(config.canvas_width, config.canvas_height).ok_or(
        RenderError::Canvas {
            width: config.canvas_width,
            height: config.canvas_height,
        },
    )?;
    pixmap.fill(Color::TRANSPARENT);
    Ok(pixmap)
}

fn paint(config: &VectorConfig) -> Paint<'static> {
    let mut paint = Paint::default();
    let [r, g, b, a] = config.color;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

/// Draw a quiver plot: one arrow per subsampled cell, pivoting on its centre.
///
/// Glyph centres are spread evenly over `[0, width - 1] x [0, height - 1]`
/// of the source grid.
pub fn render_arrows(field: &VectorField, config: &VectorConfig) -> Result<Pixmap> {
    let mut pixmap = new_canvas(config)?;
    let paint = paint(config);
    let stroke = Stroke {
        width: config.line_width,
        line_cap: LineCap::Butt,
        ..Stroke::default()
    };

    let (us, rows, cols) = subsample_strided(&field.u, field.width, field.height, config.glyph_grid);
    let (vs, _, _) = subsample_strided(&field.v, field.width, field.height, config.glyph_grid);

    let xs = linspace(0.0, field.width.saturating_sub(1) as f64, cols.len());
    let ys = linspace(0.0, field.height.saturating_sub(1) as f64, rows.len());
    let sx = config.canvas_width as f64 / field.width.max(1) as f64;
    let sy = config.canvas_height as f64 / field.height.max(1) as f64;
    let full_length = config.canvas_width as f64 / config.scale.max(f32::EPSILON) as f64;

    let mut drawn = 0usize;
    for (ri, &y) in ys.iter().enumerate() {
        for (ci, &x) in xs.iter().enumerate() {
            let idx = ri * cols.len() + ci;
            let (u, v) = (us[idx], vs[idx]);
            if u.is_nan() || v.is_nan() {
                continue;
            }
            let (speed, _) = uv_to_speed_direction(u, v);
            if speed == 0.0 {
                continue;
            }

            let length = speed * full_length;
            let (dx, dy) = (u as f64 / speed, v as f64 / speed);
            let (cx, cy) = (x * sx, y * sy);
            let tail = (cx - dx * length / 2.0, cy - dy * length / 2.0);
            let tip = (cx + dx * length / 2.0, cy + dy * length / 2.0);

            draw_arrow(&mut pixmap, tail, tip, (dx, dy), config.line_width as f64, &paint, &stroke);
            drawn += 1;
        }
    }

    tracing::debug!(arrows = drawn, rows = rows.len(), cols = cols.len(), "Rendered wind arrows");
    Ok(pixmap)
}

fn draw_arrow(
    pixmap: &mut Pixmap,
    tail: (f64, f64),
    tip: (f64, f64),
    dir: (f64, f64),
    shaft_width: f64,
    paint: &Paint,
    stroke: &Stroke,
) {
    let length = ((tip.0 - tail.0).powi(2) + (tip.1 - tail.1).powi(2)).sqrt();
    let head_length = (shaft_width * 5.0).min(length * 0.5);
    let head_half_width = head_length * 0.6;
    let base = (tip.0 - dir.0 * head_length, tip.1 - dir.1 * head_length);
    let normal = (-dir.1, dir.0);

    let mut pb = PathBuilder::new();
    pb.move_to(tail.0 as f32, tail.1 as f32);
    pb.line_to(base.0 as f32, base.1 as f32);
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, paint, stroke, Transform::identity(), None);
    }

    let mut head = PathBuilder::new();
    head.move_to(tip.0 as f32, tip.1 as f32);
    head.line_to(
        (base.0 + normal.0 * head_half_width) as f32,
        (base.1 + normal.1 * head_half_width) as f32,
    );
    head.line_to(
        (base.0 - normal.0 * head_half_width) as f32,
        (base.1 - normal.1 * head_half_width) as f32,
    );
    head.close();
    if let Some(path) = head.finish() {
        pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
    }
}

/// Trace streamlines through the field with midpoint (RK2) integration.
///
/// Seeds sit on a `seed_density x seed_density` lattice visited in row-major
/// order. A coarse occupancy mask of the same resolution stops a line when it
/// enters a cell already claimed by an earlier one.
pub fn trace_streamlines(field: &VectorField, config: &VectorConfig) -> Vec<Vec<(f64, f64)>> {
    let n = config.seed_density.max(1);
    if field.width < 2 || field.height < 2 {
        return vec![];
    }
    let max_x = (field.width - 1) as f64;
    let max_y = (field.height - 1) as f64;
    let mask_cell = |x: f64, y: f64| -> usize {
        let mc = ((x / max_x * n as f64) as usize).min(n - 1);
        let mr = ((y / max_y * n as f64) as usize).min(n - 1);
        mr * n + mc
    };

    let mut occupied = vec![false; n * n];
    let mut lines = Vec::new();

    for sy in linspace(0.0, max_y, n) {
        for sx in linspace(0.0, max_x, n) {
            if occupied[mask_cell(sx, sy)] {
                continue;
            }

            let mut claimed = vec![mask_cell(sx, sy)];
            let backward = integrate(field, (sx, sy), -1.0, config, &occupied, &mask_cell, &mut claimed);
            let forward = integrate(field, (sx, sy), 1.0, config, &occupied, &mask_cell, &mut claimed);

            let mut line: Vec<(f64, f64)> = backward.into_iter().rev().collect();
            line.push((sx, sy));
            line.extend(forward);
            if line.len() < 3 {
                continue;
            }
            for cell in claimed {
                occupied[cell] = true;
            }
            lines.push(line);
        }
    }
    lines
}

fn integrate(
    field: &VectorField,
    start: (f64, f64),
    sign: f64,
    config: &VectorConfig,
    occupied: &[bool],
    mask_cell: &impl Fn(f64, f64) -> usize,
    claimed: &mut Vec<usize>,
) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    let (mut x, mut y) = start;
    let mut current_cell = mask_cell(x, y);

    for _ in 0..config.max_steps {
        let Some((u1, v1)) = field.velocity(x, y) else { break };
        let speed1 = (u1 * u1 + v1 * v1).sqrt();
        if speed1 < 1e-6 {
            break;
        }
        // Unit-speed steps so line length does not depend on magnitude
        let h = sign * config.step;
        let mid = (x + 0.5 * h * u1 / speed1, y + 0.5 * h * v1 / speed1);
        let Some((u2, v2)) = field.velocity(mid.0, mid.1) else { break };
        let speed2 = (u2 * u2 + v2 * v2).sqrt();
        if speed2 < 1e-6 {
            break;
        }
        let next = (x + h * u2 / speed2, y + h * v2 / speed2);
        if field.velocity(next.0, next.1).is_none() {
            break;
        }

        let cell = mask_cell(next.0, next.1);
        if cell != current_cell {
            if occupied[cell] || claimed.contains(&cell) {
                break;
            }
            claimed.push(cell);
            current_cell = cell;
        }
        (x, y) = next;
        points.push(next);
    }
    points
}

/// Stroke traced streamlines onto a transparent canvas.
pub fn render_streamlines(field: &VectorField, config: &VectorConfig) -> Result<Pixmap> {
    let mut pixmap = new_canvas(config)?;
    let paint = paint(config);
    let stroke = Stroke {
        width: config.line_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let sx = config.canvas_width as f64 / field.width.max(1) as f64;
    let sy = config.canvas_height as f64 / field.height.max(1) as f64;

    let lines = trace_streamlines(field, config);
    for line in &lines {
        let mut pb = PathBuilder::new();
        pb.move_to((line[0].0 * sx) as f32, (line[0].1 * sy) as f32);
        for &(x, y) in &line[1..] {
            pb.line_to((x * sx) as f32, (y * sy) as f32);
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    tracing::debug!(streamlines = lines.len(), "Rendered streamlines");
    Ok(pixmap)
}

/// Render a wind field in the requested mode and encode it as PNG.
pub fn render_vectors(field: &VectorField, mode: VectorMode, config: &VectorConfig) -> Result<Vec<u8>> {
    let pixmap = match mode {
        VectorMode::Arrows => render_arrows(field, config)?,
        VectorMode::Streamlines => render_streamlines(field, config)?,
    };
    png::encode_pixmap(&pixmap)
}
