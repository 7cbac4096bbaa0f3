//! Test data generators for creating synthetic weather-like data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite. All grids are row-major.

/// Creates a geopotential-height-like field in meters.
///
/// A ridge/trough wave pattern around 5600 m, roughly what a 500 mb
/// height field looks like over a regional box.
pub fn create_height_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x = col as f32 / width.max(1) as f32 * std::f32::consts::TAU;
            let y = row as f32 / height.max(1) as f32;
            // Heights fall towards the pole (row 0 is north)
            let z = 5600.0 + 150.0 * x.sin() + 200.0 * y;
            data.push(z);
        }
    }
    data
}

/// Creates a U-component wind grid (west-east component), -20..20 m/s
/// varying by row.
pub fn create_u_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for _col in 0..width {
            let lat_factor = (row as f32 / height as f32 - 0.5) * 2.0; // -1 to 1
            data.push(lat_factor * 20.0);
        }
    }
    data
}

/// Creates a V-component wind grid (south-north component), -15..15 m/s
/// varying by column.
pub fn create_v_wind_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let lon_factor = (col as f32 / width as f32 - 0.5) * 2.0; // -1 to 1
            data.push(lon_factor * 15.0);
        }
    }
    data
}

/// Creates an 8-bit ramp image: each row runs 0..=255 across its width.
pub fn create_gray_ramp(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            let denom = width.saturating_sub(1).max(1);
            pixels.push(((col * 255) / denom) as u8);
        }
    }
    pixels
}
