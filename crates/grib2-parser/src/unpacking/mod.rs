//! GRIB2 data unpacking.
//!
//! Simple packing (template 5.0) is unpacked here. Complex packing with and
//! without spatial differencing (5.2, 5.3) and PNG packing (5.41) are decoded
//! through the `grib` crate.

use std::io::Cursor;

use crate::Grib2Error;

/// Largest grid accepted before buffers are sized from header fields.
/// The global 0.25 degree GFS grid has 1_038_240 points.
pub const MAX_GRID_POINTS: usize = 1 << 24;

/// Number of points flagged present among the first `num_points` bits of a
/// Section 6 bitmap, or `None` when the bitmap is too short for the grid.
pub fn count_present(bitmap: &[u8], num_points: usize) -> Option<usize> {
    if bitmap.len().checked_mul(8)? < num_points {
        return None;
    }
    let full_bytes = num_points / 8;
    let mut count: usize = bitmap[..full_bytes]
        .iter()
        .map(|b| b.count_ones() as usize)
        .sum();
    let rest = num_points % 8;
    if rest > 0 {
        count += (bitmap[full_bytes] >> (8 - rest)).count_ones() as usize;
    }
    Some(count)
}

/// Decode a complete single-field message with the `grib` crate.
///
/// Bitmap-masked points come back as NaN. The result must hold exactly
/// `num_points` values.
pub fn unpack_with_grib(message: &[u8], num_points: usize) -> Result<Vec<f32>, Grib2Error> {
    let grib2 = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib: {}", e)))?;
    let (_, submessage) = grib2.iter().next().ok_or(Grib2Error::NoMessages)?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder: {}", e)))?;
    let values: Vec<f32> = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("grib dispatch: {}", e)))?
        .collect();

    if values.len() != num_points {
        return Err(Grib2Error::InvalidFormat(format!(
            "Decoded {} values for a grid of {} points",
            values.len(),
            num_points
        )));
    }
    Ok(values)
}

/// Unpack simple packed GRIB2 data.
///
/// Simple packing formula: `value = (R + X * 2^E) / 10^D`.
///
/// `num_points` is the number of grid points. When a bitmap is present only
/// the points whose bit is set consume a packed value; the others come back
/// as `None`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: usize,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&[u8]>,
) -> Result<Vec<Option<f32>>, Grib2Error> {
    let binary_scale = 2.0_f64.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(-(decimal_scale_factor as i32));
    let reference = reference_value as f64;

    let mut values = Vec::with_capacity(num_points);
    let mut bit_position = 0;
    let bits_per_value = bits_per_value as usize;

    for i in 0..num_points {
        let has_value = match bitmap {
            // 1 bit per grid point, MSB first, 1 = value present
            Some(bm) => {
                let byte_idx = i / 8;
                let bit_idx = 7 - (i % 8);
                byte_idx < bm.len() && (bm[byte_idx] >> bit_idx) & 1 == 1
            }
            None => true,
        };

        if !has_value {
            values.push(None);
            continue;
        }

        let packed_value = if bits_per_value == 0 {
            // Constant field: every value equals the reference value
            0
        } else {
            extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("Failed to extract bits: {}", e)))?
        };
        bit_position += bits_per_value;

        let value = (reference + packed_value as f64 * binary_scale) * decimal_scale;
        values.push(Some(value as f32));
    }

    Ok(values)
}

/// Extract bits from a byte array
/// Returns the bits as a 32-bit unsigned integer
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("Invalid number of bits: {}", num_bits));
    }

    let mut result = 0u32;

    for i in 0..num_bits {
        let absolute_bit = start_bit + i;
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8); // MSB first

        if byte_idx >= data.len() {
            return Err("Not enough data to extract bits".to_string());
        }

        let bit = (data[byte_idx] >> bit_idx) & 1;
        result = (result << 1) | (bit as u32);
    }

    Ok(result)
}
