//! GRIB2 section parsing.
//!
//! Each GRIB2 message consists of numbered sections: 0 (indicator),
//! 1 (identification), an optional 2 (local use), 3 (grid definition),
//! 4 (product definition), 5 (data representation), 6 (bitmap),
//! 7 (data) and the `7777` end marker. The functions here take the bytes of
//! a single message.

use crate::Grib2Error;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};

/// Length of Section 0 in bytes.
pub const INDICATOR_LEN: usize = 16;

/// Data representation template 5.0.
pub const SIMPLE_PACKING: u16 = 0;
/// Data representation template 5.2.
pub const COMPLEX_PACKING: u16 = 2;
/// Data representation template 5.3, the packing NCEP uses for GFS.
pub const COMPLEX_PACKING_SPATIAL_DIFF: u16 = 3;
/// Data representation template 5.41.
pub const PNG_PACKING: u16 = 41;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub significance_of_reference_time: u8,
    pub reference_time: DateTime<Utc>,
    pub production_status: u8,
    pub data_type: u8,
}

/// Section 3: Grid Definition Section (template 3.0, regular lat/lon).
///
/// Angles are stored in microdegrees as they appear on the wire.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template: u16,
    pub grid_shape: u8,
    /// Ni: points along a parallel.
    pub num_points_longitude: u32,
    /// Nj: points along a meridian.
    pub num_points_latitude: u32,
    pub first_latitude: i32,
    pub first_longitude: i32,
    pub last_latitude: i32,
    pub last_longitude: i32,
    pub i_increment: u32,
    pub j_increment: u32,
    pub scanning_mode: u8,
}

impl GridDefinition {
    pub fn num_points(&self) -> usize {
        self.num_points_longitude as usize * self.num_points_latitude as usize
    }

    /// Latitude of every row, in scan order.
    pub fn latitudes(&self) -> Vec<f64> {
        let nj = self.num_points_latitude as usize;
        let first = micro_to_degrees(self.first_latitude);
        let last = micro_to_degrees(self.last_latitude);
        let step = step_between(first, last, self.j_increment, nj);
        (0..nj).map(|j| first + step * j as f64).collect()
    }

    /// Longitude of every column, in scan order, wrapped into [0, 360) when the
    /// grid uses the positive convention.
    pub fn longitudes(&self) -> Vec<f64> {
        let ni = self.num_points_longitude as usize;
        let first = micro_to_degrees(self.first_longitude);
        let mut last = micro_to_degrees(self.last_longitude);
        let negative_i = self.scanning_mode & 0x80 != 0;
        if !negative_i && last < first {
            last += 360.0;
        }
        let step = step_between(first, last, self.i_increment, ni);
        (0..ni)
            .map(|i| {
                let lon = first + step * i as f64;
                if first >= 0.0 && lon >= 360.0 {
                    lon - 360.0
                } else {
                    lon
                }
            })
            .collect()
    }

    /// True when every longitude of the grid is non-negative (0..360 convention).
    pub fn uses_positive_longitudes(&self) -> bool {
        self.first_longitude >= 0 && self.last_longitude >= 0
    }
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub parameter_short_name: String,
    pub level_type: u8,
    pub level_value: f64,
    pub level_description: String,
    pub forecast_hour: u32,
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

/// Section 6: Bitmap Section (present bitmaps only)
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub data: Bytes,
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < INDICATOR_LEN {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 1-4: "GRIB", 5-6 reserved, 7 discipline, 8 edition,
    // 9-16 total message length (8-byte big-endian)
    let discipline = data[6];
    let edition = data[7];

    if edition != 2 {
        return Err(Grib2Error::InvalidFormat(format!(
            "Expected GRIB edition 2, got {}",
            edition
        )));
    }

    let mut length = [0u8; 8];
    length.copy_from_slice(&data[8..16]);

    Ok(Indicator {
        discipline,
        edition,
        message_length: u64::from_be_bytes(length),
    })
}

/// Parse Section 1 (Identification), located right after Section 0.
pub fn parse_identification(data: &[u8]) -> Result<Identification, Grib2Error> {
    let section_offset = find_section(data, 1)?;
    let section_data = &data[section_offset..];

    if section_data.len() < 19 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "Not enough data".to_string(),
        });
    }

    // Skip section length (4 bytes) and section number (1 byte)
    let sec = &section_data[5..];

    let center = u16::from_be_bytes([sec[0], sec[1]]);
    let sub_center = u16::from_be_bytes([sec[2], sec[3]]);
    let significance_of_reference_time = sec[6];

    let year = u16::from_be_bytes([sec[7], sec[8]]);
    let (month, day, hour, minute, second) = (sec[9], sec[10], sec[11], sec[12], sec[13]);

    let reference_time = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .and_then(|date| date.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Grib2Error::InvalidSection {
            section: 1,
            reason: format!(
                "Invalid date: {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })?;

    Ok(Identification {
        center,
        sub_center,
        significance_of_reference_time,
        reference_time: DateTime::<Utc>::from_naive_utc_and_offset(reference_time, Utc),
        production_status: sec.get(14).copied().unwrap_or(0),
        data_type: sec.get(15).copied().unwrap_or(0),
    })
}

/// Parse Section 3 (Grid Definition). Only template 3.0 is supported.
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition, Grib2Error> {
    let section_offset = find_section(data, 3)?;
    let section_data = &data[section_offset..];

    if section_data.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 0-3: length, 4: number, 5: source, 6-9: number of data points,
    // 10-11: optional list, 12-13: template number, 14+: template data
    let template = u16::from_be_bytes([section_data[12], section_data[13]]);
    if template != 0 {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 3,
            template,
        });
    }

    // Template 3.0 (offsets relative to byte 14):
    // 0 shape of earth, 16-19 Ni, 20-23 Nj, 32-35 La1, 36-39 Lo1,
    // 40 resolution flags, 41-44 La2, 45-48 Lo2, 49-52 Di, 53-56 Dj,
    // 57 scanning mode
    let gd = &section_data[14..];
    if gd.len() < 58 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: format!("Template 0 needs at least 58 bytes, got {}", gd.len()),
        });
    }

    let grid = GridDefinition {
        template,
        grid_shape: gd[0],
        num_points_longitude: read_u32(gd, 16),
        num_points_latitude: read_u32(gd, 20),
        first_latitude: read_i32(gd, 32),
        first_longitude: read_i32(gd, 36),
        last_latitude: read_i32(gd, 41),
        last_longitude: read_i32(gd, 45),
        i_increment: read_u32(gd, 49),
        j_increment: read_u32(gd, 53),
        scanning_mode: gd[57],
    };

    if grid.num_points() == 0 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "Grid has no points".to_string(),
        });
    }

    Ok(grid)
}

/// Parse Section 4 (Product Definition)
pub fn parse_product_definition(data: &[u8], discipline: u8) -> Result<ProductDefinition, Grib2Error> {
    let section_offset = find_section(data, 4)?;
    let section_data = &data[section_offset..];

    if section_data.len() < 28 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 7-8: template, 9: category, 10: number, 18-21: forecast time,
    // 22: type of first fixed surface, 23: scale factor, 24-27: scaled value
    let template = u16::from_be_bytes([section_data[7], section_data[8]]);
    let parameter_category = section_data[9];
    let parameter_number = section_data[10];
    let forecast_hour = read_u32(section_data, 18);
    let level_type = section_data[22];
    let scale_factor = section_data[23] as i8;
    let scaled_value = read_u32(section_data, 24);

    let level_value = scaled_value as f64 / 10f64.powi(scale_factor as i32);

    Ok(ProductDefinition {
        template,
        parameter_category,
        parameter_number,
        parameter_short_name: get_parameter_short_name(discipline, parameter_category, parameter_number),
        level_type,
        level_value,
        level_description: get_level_description(level_type, level_value),
        forecast_hour,
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    let section_offset = find_section(data, 5)?;
    let section_data = &data[section_offset..];

    if section_data.len() < 21 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "Not enough data".to_string(),
        });
    }

    // Octets 6-9 [5-8]: number of packed values
    // Octets 10-11 [9-10]: template number
    // Templates 5.0, 5.2, 5.3 and 5.41 share the leading fields:
    // [11-14] reference value (IEEE f32), [15-16] binary scale,
    // [17-18] decimal scale, [19] bits per value (per group reference for
    // the complex packings), [20] original type
    let template = u16::from_be_bytes([section_data[9], section_data[10]]);
    if !matches!(
        template,
        SIMPLE_PACKING | COMPLEX_PACKING | COMPLEX_PACKING_SPATIAL_DIFF | PNG_PACKING
    ) {
        return Err(Grib2Error::UnsupportedTemplate {
            section: 5,
            template,
        });
    }

    Ok(DataRepresentation {
        num_data_points: read_u32(section_data, 5),
        template,
        reference_value: f32::from_bits(read_u32(section_data, 11)),
        binary_scale_factor: read_sign_magnitude_i16(section_data, 15),
        decimal_scale_factor: read_sign_magnitude_i16(section_data, 17),
        bits_per_value: section_data[19],
        original_data_type: section_data[20],
    })
}

/// Parse Section 6 (Bitmap). Returns `None` when no bitmap applies.
pub fn parse_bitmap(data: &[u8]) -> Result<Option<Bitmap>, Grib2Error> {
    let section_offset = match find_section(data, 6) {
        Ok(offset) => offset,
        Err(_) => return Ok(None),
    };
    let section_data = &data[section_offset..];

    if section_data.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Not enough data".to_string(),
        });
    }

    let section_length = read_u32(section_data, 0) as usize;
    if section_length < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Invalid section length".to_string(),
        });
    }
    match section_data[5] {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            data: Bytes::copy_from_slice(&section_data[6..section_length]),
        })),
        other => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("Unsupported bitmap indicator {}", other),
        }),
    }
}

/// Parse Section 7 (Data)
pub fn parse_data_section(data: &[u8]) -> Result<DataSection, Grib2Error> {
    let section_offset = find_section(data, 7)?;
    let section_data = &data[section_offset..];
    let section_length = read_u32(section_data, 0) as usize;

    let data_bytes = if section_length > 5 {
        Bytes::copy_from_slice(&section_data[5..section_length])
    } else {
        Bytes::new()
    };

    Ok(DataSection { data: data_bytes })
}

// ===== Helper Functions =====

/// Find a section by number within a message.
///
/// Walks the length-prefixed sections after Section 0 and stops at the
/// `7777` end marker.
fn find_section(data: &[u8], section_num: u8) -> Result<usize, Grib2Error> {
    let mut offset = INDICATOR_LEN;

    loop {
        if offset + 4 <= data.len() && &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Reached end of message without finding section".to_string(),
            });
        }

        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }

        let section_length = read_u32(data, offset) as usize;

        if section_length < 5 || offset + section_length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        if data[offset + 4] == section_num {
            return Ok(offset);
        }

        offset += section_length;
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_i32(data: &[u8], at: usize) -> i32 {
    // GRIB2 encodes signed angles as sign-and-magnitude, not two's complement.
    let raw = read_u32(data, at);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn read_sign_magnitude_i16(data: &[u8], at: usize) -> i16 {
    let raw = u16::from_be_bytes([data[at], data[at + 1]]);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn micro_to_degrees(value: i32) -> f64 {
    value as f64 / 1_000_000.0
}

/// Signed step from `first` towards `last` for `n` points.
fn step_between(first: f64, last: f64, increment_micro: u32, n: usize) -> f64 {
    let direction = if last < first { -1.0 } else { 1.0 };
    if increment_micro != 0 && increment_micro != u32::MAX {
        direction * increment_micro as f64 / 1_000_000.0
    } else if n > 1 {
        (last - first) / (n - 1) as f64
    } else {
        0.0
    }
}

/// Get parameter short name
fn get_parameter_short_name(discipline: u8, category: u8, number: u8) -> String {
    match (discipline, category, number) {
        // Category 0: Temperature
        (0, 0, 0) => "TMP".to_string(),
        (0, 0, 6) => "DPT".to_string(),

        // Category 1: Moisture
        (0, 1, 1) => "RH".to_string(),
        (0, 1, 3) => "PWAT".to_string(),
        (0, 1, 8) => "APCP".to_string(),

        // Category 2: Momentum (wind)
        (0, 2, 1) => "WIND".to_string(),
        (0, 2, 2) => "UGRD".to_string(),
        (0, 2, 3) => "VGRD".to_string(),
        (0, 2, 8) => "VVEL".to_string(),
        (0, 2, 10) => "ABSV".to_string(),
        (0, 2, 22) => "GUST".to_string(),

        // Category 3: Mass (pressure/height)
        (0, 3, 0) => "PRES".to_string(),
        (0, 3, 1) => "PRMSL".to_string(),
        (0, 3, 5) => "HGT".to_string(),

        // Category 6: Cloud
        (0, 6, 1) => "TCDC".to_string(),

        // Category 7: Thermodynamic Stability
        (0, 7, 6) => "CAPE".to_string(),
        (0, 7, 7) => "CIN".to_string(),

        _ => format!("P{}_{}_{}", discipline, category, number),
    }
}

/// Get level description
fn get_level_description(level_type: u8, level_value: f64) -> String {
    match level_type {
        1 => "surface".to_string(),
        6 => "max wind".to_string(),
        7 => "tropopause".to_string(),
        10 | 200 => "entire atmosphere".to_string(),
        // Isobaric surfaces are encoded in Pa
        100 => format!("{} mb", (level_value / 100.0).round()),
        101 => "mean sea level".to_string(),
        102 => format!("{} m above MSL", level_value),
        103 => format!("{} m above ground", level_value),
        _ => format!("Level type {} value {}", level_type, level_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_magnitude() {
        let data = [0x80, 0x02];
        assert_eq!(read_sign_magnitude_i16(&data, 0), -2);
        let data = [0x00, 0x02];
        assert_eq!(read_sign_magnitude_i16(&data, 0), 2);

        let data = 0x8000_0005u32.to_be_bytes();
        assert_eq!(read_i32(&data, 0), -5);
    }

    #[test]
    fn test_indicator_rejects_edition_1() {
        let mut data = b"GRIB".to_vec();
        data.extend_from_slice(&[0, 0, 0, 1]);
        data.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            parse_indicator(&data),
            Err(Grib2Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_level_description_isobaric_pa() {
        assert_eq!(get_level_description(100, 50000.0), "500 mb");
        assert_eq!(get_level_description(1, 0.0), "surface");
    }

    #[test]
    fn test_grid_coordinates_north_to_south() {
        let grid = GridDefinition {
            template: 0,
            grid_shape: 6,
            num_points_longitude: 3,
            num_points_latitude: 3,
            first_latitude: 45_000_000,
            first_longitude: 358_000_000,
            last_latitude: 43_000_000,
            last_longitude: 0,
            i_increment: 1_000_000,
            j_increment: 1_000_000,
            scanning_mode: 0,
        };
        assert_eq!(grid.latitudes(), vec![45.0, 44.0, 43.0]);
        assert_eq!(grid.longitudes(), vec![358.0, 359.0, 0.0]);
    }
}
