//! Grid-aligned linear resampling.
//!
//! Output sample `j` of `n` sits at source coordinate `j * (len - 1) / (n - 1)`,
//! so the first and last samples land exactly on the source corners.

/// Evenly spaced source coordinates, inclusive of both ends.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Bilinear sample at fractional grid coordinates; `None` outside the grid
/// or when a contributing cell is NaN.
pub fn sample_bilinear(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> Option<f32> {
    if width == 0 || height == 0 || data.len() != width * height {
        return None;
    }
    if !(0.0..=(width - 1) as f64).contains(&x) || !(0.0..=(height - 1) as f64).contains(&y) {
        return None;
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let dx = x - x0 as f64;
    let dy = y - y0 as f64;

    let v00 = data[y0 * width + x0] as f64;
    let v10 = data[y0 * width + x1] as f64;
    let v01 = data[y1 * width + x0] as f64;
    let v11 = data[y1 * width + x1] as f64;
    let value = (v00 * (1.0 - dx) + v10 * dx) * (1.0 - dy) + (v01 * (1.0 - dx) + v11 * dx) * dy;
    (!value.is_nan()).then_some(value as f32)
}

/// Bilinearly resample a row-major grid to `out_width x out_height`.
pub fn resample_linear(
    data: &[f32],
    width: usize,
    height: usize,
    out_width: usize,
    out_height: usize,
) -> Vec<f32> {
    if width == 0 || height == 0 || data.len() != width * height {
        return Vec::new();
    }

    let xs = linspace(0.0, (width - 1) as f64, out_width);
    let ys = linspace(0.0, (height - 1) as f64, out_height);

    let mut out = Vec::with_capacity(out_width * out_height);
    for &y in &ys {
        let y0 = (y.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let dy = y - y0 as f64;
        for &x in &xs {
            let x0 = (x.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let dx = x - x0 as f64;

            let v00 = data[y0 * width + x0] as f64;
            let v10 = data[y0 * width + x1] as f64;
            let v01 = data[y1 * width + x0] as f64;
            let v11 = data[y1 * width + x1] as f64;

            let top = v00 * (1.0 - dx) + v10 * dx;
            let bottom = v01 * (1.0 - dx) + v11 * dx;
            out.push((top * (1.0 - dy) + bottom * dy) as f32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 4.0, 5), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(linspace(2.0, 9.0, 1), vec![2.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_corners_preserved() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        let out = resample_linear(&data, 2, 2, 5, 7);
        assert_eq!(out.len(), 35);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[4], 2.0);
        assert_eq!(out[30], 3.0);
        assert_eq!(out[34], 4.0);
    }

    #[test]
    fn test_midpoint_is_average() {
        let data = vec![0.0, 10.0, 20.0, 30.0];
        let out = resample_linear(&data, 2, 2, 3, 3);
        assert!((out[4] - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_sample_bilinear() {
        let data = vec![0.0, 10.0, 20.0, 30.0];
        assert_eq!(sample_bilinear(&data, 2, 2, 0.5, 0.5), Some(15.0));
        assert_eq!(sample_bilinear(&data, 2, 2, 1.0, 1.0), Some(30.0));
        assert_eq!(sample_bilinear(&data, 2, 2, 1.5, 0.0), None);
        assert_eq!(sample_bilinear(&data, 2, 2, -0.1, 0.0), None);
    }

    #[test]
    fn test_linear_ramp_stays_linear() {
        let data: Vec<f32> = (0..4).map(|x| x as f32).collect();
        let out = resample_linear(&data, 4, 1, 7, 1);
        for (i, v) in out.iter().enumerate() {
            assert!((v - i as f32 * 0.5).abs() < 1e-6);
        }
    }
}
