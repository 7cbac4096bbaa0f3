//! Separable Gaussian smoothing of scalar grids.
//!
//! Boundary handling is the half-sample symmetric `reflect` mode
//! (`d c b a | a b c d | d c b a`), and the kernel radius is
//! `floor(truncate * sigma + 0.5)`.

/// Default kernel truncation in standard deviations.
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Normalized 1-D Gaussian weights from `-radius` to `+radius`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (truncate * sigma + 0.5).floor() as i64;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Map an out-of-range index back into `0..len` by mirroring about the edges.
fn reflect_index(i: i64, len: usize) -> usize {
    let n = len as i64;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

fn convolve_rows(data: &[f64], width: usize, height: usize, kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as i64;
    let mut out = vec![0.0; data.len()];
    for row in 0..height {
        let line = &data[row * width..(row + 1) * width];
        for col in 0..width {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let src = reflect_index(col as i64 + k as i64 - radius, width);
                acc += w * line[src];
            }
            out[row * width + col] = acc;
        }
    }
    out
}

fn convolve_cols(data: &[f64], width: usize, height: usize, kernel: &[f64]) -> Vec<f64> {
    let radius = (kernel.len() / 2) as i64;
    let mut out = vec![0.0; data.len()];
    for row in 0..height {
        for col in 0..width {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let src = reflect_index(row as i64 + k as i64 - radius, height);
                acc += w * data[src * width + col];
            }
            out[row * width + col] = acc;
        }
    }
    out
}

/// Smooth a row-major grid with a Gaussian of standard deviation `sigma` (in cells).
///
/// Accumulation is done in f64. An empty grid or `sigma <= 0` returns the
/// input unchanged.
pub fn gaussian_filter(
    data: &[f32],
    width: usize,
    height: usize,
    sigma: f64,
    truncate: f64,
) -> Vec<f32> {
    if width == 0 || height == 0 || data.len() != width * height || sigma <= 0.0 {
        return data.to_vec();
    }

    let kernel = gaussian_kernel(sigma, truncate);
    let wide: Vec<f64> = data.iter().map(|&v| v as f64).collect();
    let smoothed = convolve_cols(&convolve_rows(&wide, width, height, &kernel), width, height, &kernel);
    smoothed.into_iter().map(|v| v as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_shape() {
        let k = gaussian_kernel(2.0, 4.0);
        // radius = floor(8.5) = 8
        assert_eq!(k.len(), 17);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(k[8] > k[7] && (k[7] - k[9]).abs() < 1e-15);
    }

    #[test]
    fn test_reflect_index() {
        // d c b a | a b c d | d c b a
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        // Radius wider than the grid still lands inside
        assert_eq!(reflect_index(-9, 2), 0);
        assert!(reflect_index(17, 3) < 3);
    }

    #[test]
    fn test_constant_field_is_unchanged() {
        let data = vec![0.5f32; 30];
        let out = gaussian_filter(&data, 6, 5, 2.0, DEFAULT_TRUNCATE);
        assert!(out.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_impulse_spreads_and_preserves_mass() {
        let mut data = vec![0.0f32; 21 * 21];
        data[10 * 21 + 10] = 1.0;
        let out = gaussian_filter(&data, 21, 21, 1.0, DEFAULT_TRUNCATE);
        let total: f32 = out.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(out[10 * 21 + 10] < 1.0);
        assert!(out[10 * 21 + 11] > 0.0);
        // Symmetric spread
        assert!((out[10 * 21 + 9] - out[10 * 21 + 11]).abs() < 1e-7);
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(gaussian_filter(&data, 2, 2, 0.0, DEFAULT_TRUNCATE), data);
    }
}
