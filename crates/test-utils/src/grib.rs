//! GRIB2 test data builder.
//!
//! Creates minimal synthetic GRIB2 messages (template 3.0 grid, template 4.0
//! product, simple or complex packing) that the parser accepts.

/// Data representation written into Sections 5 and 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Template 5.0, 16 bits per value.
    Simple,
    /// Template 5.3 with first-order spatial differencing in a single group,
    /// the layout of the NCEP GFS products.
    ComplexSpatialDiff,
}

/// Build a minimal GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    // Grid definition
    ni: u32,       // columns
    nj: u32,       // rows
    la1: i32,      // first lat (microdegrees)
    lo1: i32,      // first lon (microdegrees)
    la2: i32,      // last lat (microdegrees)
    lo2: i32,      // last lon (microdegrees)
    di: u32,       // lon increment (microdegrees)
    dj: u32,       // lat increment (microdegrees)
    scanning_mode: u8,
    // Product definition
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_value: u32,
    forecast_hour: u32,
    // Data
    data_values: Vec<f32>,
    missing: Option<Vec<bool>>,
    packing: Packing,
}

impl Grib2Builder {
    /// A 10x10 one-degree grid over the Pacific Northwest, 500 mb heights.
    pub fn new_gfs() -> Self {
        let ni = 10;
        let nj = 10;
        Self {
            discipline: 0, // Meteorological
            center: 7,     // NCEP
            year: 2024,
            month: 10,
            day: 9,
            hour: 0,
            ni,
            nj,
            la1: 45_000_000,  // 45.0N
            lo1: 230_000_000, // 230.0E = -130W
            la2: 36_000_000,  // 36.0N
            lo2: 239_000_000, // 239.0E
            di: 1_000_000,
            dj: 1_000_000,
            scanning_mode: 0, // +i, -j (north to south)
            param_category: 3,
            param_number: 5,  // HGT
            level_type: 100,  // isobaric
            level_value: 50000, // Pa
            forecast_hour: 0,
            data_values: vec![5500.0; (ni * nj) as usize],
            missing: None,
            packing: Packing::Simple,
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    /// Resize the grid keeping the one-degree spacing from the first point.
    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.la2 = self.la1 - (nj.saturating_sub(1) as i32) * self.dj as i32;
        self.lo2 = self.lo1 + (ni.saturating_sub(1) as i32) * self.di as i32;
        self.data_values = vec![0.0; (ni * nj) as usize];
        self
    }

    /// Move the first grid point (degrees).
    pub fn with_origin(mut self, lat: f64, lon: f64) -> Self {
        self.la1 = (lat * 1_000_000.0).round() as i32;
        self.lo1 = (lon * 1_000_000.0).round() as i32;
        self.la2 = self.la1 - (self.nj.saturating_sub(1) as i32) * self.dj as i32;
        self.lo2 = self.lo1 + (self.ni.saturating_sub(1) as i32) * self.di as i32;
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_value = level_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.forecast_hour = hour;
        self
    }

    pub fn with_constant_value(mut self, value: f32) -> Self {
        self.data_values = vec![value; (self.ni * self.nj) as usize];
        self
    }

    pub fn with_gradient(mut self, min_val: f32, max_val: f32) -> Self {
        let n = (self.ni * self.nj) as usize;
        let denom = (n.max(2) - 1) as f32;
        self.data_values = (0..n)
            .map(|i| min_val + (max_val - min_val) * (i as f32 / denom))
            .collect();
        self
    }

    pub fn with_data(mut self, data: Vec<f32>) -> Self {
        self.data_values = data;
        self
    }

    /// Mark points as missing through a Section 6 bitmap.
    pub fn with_missing(mut self, missing: Vec<bool>) -> Self {
        self.missing = Some(missing);
        self
    }

    /// Pack values with template 5.3 instead of simple packing.
    pub fn with_complex_packing(mut self) -> Self {
        self.packing = Packing::ComplexSpatialDiff;
        self
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut message = Vec::new();

        let section1 = self.build_section1();
        let section3 = self.build_section3();
        let section4 = self.build_section4();
        let section5 = self.build_section5();
        let section6 = self.build_section6();
        let section7 = self.build_section7();

        let message_length = 16 // Section 0
            + section1.len()
            + section3.len()
            + section4.len()
            + section5.len()
            + section6.len()
            + section7.len()
            + 4; // Section 8 (end)

        // Section 0: Indicator
        message.extend_from_slice(b"GRIB");
        message.extend_from_slice(&[0, 0]); // Reserved
        message.push(self.discipline);
        message.push(2); // Edition 2
        message.extend_from_slice(&(message_length as u64).to_be_bytes());

        message.extend_from_slice(&section1);
        message.extend_from_slice(&section3);
        message.extend_from_slice(&section4);
        message.extend_from_slice(&section5);
        message.extend_from_slice(&section6);
        message.extend_from_slice(&section7);

        // Section 8: End
        message.extend_from_slice(b"7777");

        message
    }

    fn present_values(&self) -> Vec<f32> {
        match &self.missing {
            Some(mask) => self
                .data_values
                .iter()
                .zip(mask.iter().chain(std::iter::repeat(&false)))
                .filter(|(_, &m)| !m)
                .map(|(&v, _)| v)
                .collect(),
            None => self.data_values.clone(),
        }
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 21;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(1); // Section number

        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2); // Master table version
        section.push(1); // Local table version
        section.push(1); // Significance of reference time (start of forecast)

        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(0); // Minute
        section.push(0); // Second

        section.push(0); // Production status (operational)
        section.push(1); // Type of data (forecast)

        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();

        // Template 3.0: Latitude/Longitude
        let template_data_len = 58;
        let section_length: u32 = 14 + template_data_len;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(3); // Section number

        section.push(0); // Source of grid definition
        section.extend_from_slice(&(self.ni * self.nj).to_be_bytes());
        section.push(0); // Number of octets for optional list
        section.push(0); // Interpretation of optional list
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 3.0

        section.push(6); // Shape of Earth (spherical with radius 6371229m)
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section.extend_from_slice(&self.ni.to_be_bytes());
        section.extend_from_slice(&self.nj.to_be_bytes());
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&0xFFFFFFFFu32.to_be_bytes()); // Subdivisions

        section.extend_from_slice(&sign_magnitude_i32(self.la1));
        section.extend_from_slice(&sign_magnitude_i32(self.lo1));
        section.push(48); // Resolution and component flags
        section.extend_from_slice(&sign_magnitude_i32(self.la2));
        section.extend_from_slice(&sign_magnitude_i32(self.lo2));
        section.extend_from_slice(&self.di.to_be_bytes());
        section.extend_from_slice(&self.dj.to_be_bytes());
        section.push(self.scanning_mode);

        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 34;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(4); // Section number

        section.extend_from_slice(&0u16.to_be_bytes()); // Number of coordinate values
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 4.0

        section.push(self.param_category);
        section.push(self.param_number);
        section.push(2); // Type of generating process (forecast)
        section.push(0); // Background generating process
        section.push(0); // Analysis or forecast process
        section.extend_from_slice(&0u16.to_be_bytes()); // Hours of cutoff
        section.push(0); // Minutes of cutoff
        section.push(1); // Time range unit (hours)
        section.extend_from_slice(&self.forecast_hour.to_be_bytes());

        section.push(self.level_type);
        section.push(0); // Scale factor
        section.extend_from_slice(&self.level_value.to_be_bytes());

        section.push(255); // Type of second fixed surface (none)
        section.push(0);
        section.extend_from_slice(&0u32.to_be_bytes());

        section
    }

    /// Packing parameters: (reference, binary scale factor, bits per value).
    fn packing(&self) -> (f32, i16, u8) {
        let present = self.present_values();
        let (min_val, max_val) = present.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        );
        if present.is_empty() {
            return (0.0, 0, 0);
        }
        let range = max_val - min_val;
        if range == 0.0 {
            return (min_val, 0, 0);
        }
        // 16-bit packing: 2^E = range / 65535
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        (min_val, binary_scale_factor, 16)
    }

    fn build_section5(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let (reference_value, binary_scale_factor, bits_per_value) = self.packing();
        let num_values = self.present_values().len() as u32;
        let (section_length, template): (u32, u16) = match self.packing {
            Packing::Simple => (21, 0),
            Packing::ComplexSpatialDiff => (49, 3),
        };

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(5); // Section number

        section.extend_from_slice(&num_values.to_be_bytes());
        section.extend_from_slice(&template.to_be_bytes());

        section.extend_from_slice(&reference_value.to_be_bytes());
        section.extend_from_slice(&sign_magnitude_i16(binary_scale_factor));
        section.extend_from_slice(&0u16.to_be_bytes()); // Decimal scale factor

        match self.packing {
            Packing::Simple => {
                section.push(bits_per_value);
                section.push(0); // Original field type (floating point)
            }
            Packing::ComplexSpatialDiff => {
                section.push(8); // Bits per group reference
                section.push(0); // Original field type (floating point)
                section.push(1); // Group splitting method (general)
                section.push(0); // No missing value management
                section.extend_from_slice(&u32::MAX.to_be_bytes()); // Primary missing substitute
                section.extend_from_slice(&u32::MAX.to_be_bytes()); // Secondary missing substitute
                section.extend_from_slice(&1u32.to_be_bytes()); // Number of groups
                section.push(0); // Reference for group widths
                section.push(8); // Bits for group widths
                section.extend_from_slice(&num_values.to_be_bytes()); // Reference for group lengths
                section.push(1); // Length increment
                section.extend_from_slice(&num_values.to_be_bytes()); // True length of last group
                section.push(8); // Bits for scaled group lengths
                section.push(1); // Order of spatial differencing
                section.push(2); // Octets per extra descriptor
            }
        }

        section
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut section = Vec::new();
        match &self.missing {
            Some(mask) => {
                let n = (self.ni * self.nj) as usize;
                let mut bits = vec![0u8; n.div_ceil(8)];
                for i in 0..n {
                    if !mask.get(i).copied().unwrap_or(false) {
                        bits[i / 8] |= 1 << (7 - (i % 8));
                    }
                }
                section.extend_from_slice(&(6 + bits.len() as u32).to_be_bytes());
                section.push(6);
                section.push(0); // Bitmap follows
                section.extend_from_slice(&bits);
            }
            None => {
                section.extend_from_slice(&6u32.to_be_bytes());
                section.push(6);
                section.push(255); // No bitmap
            }
        }
        section
    }

    fn build_section7(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let packed_data = match self.packing {
            Packing::Simple => self.pack_simple(),
            Packing::ComplexSpatialDiff => self.pack_complex(),
        };

        let section_length: u32 = 5 + packed_data.len() as u32;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(7); // Section number
        section.extend_from_slice(&packed_data);

        section
    }

    /// Scaled integers `X = (Y - R) / 2^E` of the present values.
    fn quantized(&self) -> Vec<u32> {
        let (reference, binary_scale_factor, bits_per_value) = self.packing();
        let present = self.present_values();
        if bits_per_value == 0 {
            return vec![0; present.len()];
        }
        let binary_scale = 2.0_f64.powi(binary_scale_factor as i32);
        present
            .iter()
            .map(|&val| {
                ((val as f64 - reference as f64) / binary_scale)
                    .round()
                    .clamp(0.0, 65535.0) as u32
            })
            .collect()
    }

    fn pack_simple(&self) -> Vec<u8> {
        let (_, _, bits_per_value) = self.packing();
        if bits_per_value == 0 {
            return Vec::new();
        }
        self.quantized()
            .into_iter()
            .flat_map(|x| (x as u16).to_be_bytes())
            .collect()
    }

    /// Template 5.3 payload: first value and minimum difference, then one
    /// group (reference, width, scaled length) and the packed differences.
    ///
    /// The first packed slot is a placeholder; decoders replace it with the
    /// first value before integrating the differences.
    fn pack_complex(&self) -> Vec<u8> {
        let x = self.quantized();
        let first = x.first().copied().unwrap_or(0) as i64;
        let diffs: Vec<i64> = x.windows(2).map(|w| w[1] as i64 - w[0] as i64).collect();
        let min_diff = diffs.iter().copied().min().unwrap_or(0);

        let mut packed_values = Vec::with_capacity(x.len());
        if !x.is_empty() {
            packed_values.push(0u32);
        }
        packed_values.extend(diffs.iter().map(|d| (d - min_diff) as u32));
        let max_packed = packed_values.iter().copied().max().unwrap_or(0);
        let width = (u32::BITS - max_packed.leading_zeros()) as u8;

        let mut data = Vec::new();
        data.extend_from_slice(&sign_magnitude_i16(first as i16));
        data.extend_from_slice(&sign_magnitude_i16(min_diff as i16));
        data.push(0); // Group reference
        data.push(width); // Group width
        data.push(0); // Scaled group length
        data.extend_from_slice(&pack_bits(&packed_values, width as usize));
        data
    }
}

/// Pack values MSB first at `width` bits each, padding the last octet.
fn pack_bits(values: &[u32], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; (values.len() * width).div_ceil(8)];
    let mut bit = 0;
    for &value in values {
        for i in (0..width).rev() {
            if (value >> i) & 1 == 1 {
                out[bit / 8] |= 1 << (7 - bit % 8);
            }
            bit += 1;
        }
    }
    out
}

/// Concatenate messages into one multi-message container.
pub fn concat_messages(messages: &[Vec<u8>]) -> Vec<u8> {
    messages.concat()
}

fn sign_magnitude_i32(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let raw = if value < 0 { magnitude | 0x8000_0000 } else { magnitude };
    raw.to_be_bytes()
}

fn sign_magnitude_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let raw = if value < 0 { magnitude | 0x8000 } else { magnitude };
    raw.to_be_bytes()
}
