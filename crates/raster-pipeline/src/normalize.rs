//! Linear mapping between physical values and 8-bit raster bytes.
//!
//! A raster encodes `v` as `clip(round(255 * (v - min) / (max - min)), 0, 255)`
//! and decodes a byte `b` as `b / 255 * (max - min) + min`. Missing cells
//! encode as 0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte written for every cell of a flat field under [`DegeneratePolicy::MidGray`].
pub const MID_GRAY: u8 = 127;

/// Minimum and maximum of a field, or of a family of fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Extrema over the finite values, `None` if there are none.
    pub fn of(values: &[f32]) -> Option<Self> {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<Extent>, &v| {
                let v = v as f64;
                Some(match acc {
                    None => Extent::new(v, v),
                    Some(e) => Extent::new(e.min.min(v), e.max.max(v)),
                })
            })
    }

    /// The smallest extent covering both.
    pub fn union(self, other: Extent) -> Extent {
        Extent::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Whether `other` lies within this extent.
    pub fn contains(&self, other: &Extent) -> bool {
        self.min <= other.min && other.max <= self.max
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.range() <= 0.0
    }

    /// Encode one physical value against this extent.
    ///
    /// A degenerate extent encodes every finite value as [`MID_GRAY`].
    pub fn encode(&self, value: f64) -> u8 {
        if !value.is_finite() {
            return 0;
        }
        if self.is_degenerate() {
            return MID_GRAY;
        }
        let scaled = (255.0 * (value - self.min) / self.range()).round();
        scaled.clamp(0.0, 255.0) as u8
    }

    /// Decode one byte to the physical value it stands for.
    pub fn decode(&self, byte: u8) -> f64 {
        byte as f64 / 255.0 * self.range() + self.min
    }

    /// Largest reconstruction error of a round trip through this extent.
    pub fn quantization_step(&self) -> f64 {
        self.range() / 255.0
    }
}

/// What to do with a field whose finite values are all equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Write a constant mid-gray raster and record `min == max`.
    #[default]
    MidGray,
    /// Fail with [`NormalizeError::DegenerateRange`].
    Error,
}

impl DegeneratePolicy {
    /// Parse from string (case-insensitive), defaulting to mid-gray.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" | "fail" => Self::Error,
            _ => Self::MidGray,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MidGray => "mid_gray",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for DegeneratePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("every finite value equals {value}")]
    DegenerateRange { value: f64 },

    #[error("field has no finite values")]
    NoFiniteValues,
}

/// Encode a field against its own extrema.
///
/// Returns the bytes together with the extent they were encoded against.
pub fn normalize(values: &[f32]) -> Result<(Vec<u8>, Extent), NormalizeError> {
    let extent = Extent::of(values).ok_or(NormalizeError::NoFiniteValues)?;
    if extent.is_degenerate() {
        return Err(NormalizeError::DegenerateRange { value: extent.min });
    }
    Ok((encode_with(values, extent), extent))
}

/// [`normalize`], with flat fields handled according to `policy`.
pub fn normalize_with_policy(
    values: &[f32],
    policy: DegeneratePolicy,
) -> Result<(Vec<u8>, Extent), NormalizeError> {
    match normalize(values) {
        Err(NormalizeError::DegenerateRange { value }) if policy == DegeneratePolicy::MidGray => {
            let extent = Extent::new(value, value);
            Ok((encode_with(values, extent), extent))
        }
        other => other,
    }
}

/// Encode every value against a fixed extent.
pub fn encode_with(values: &[f32], extent: Extent) -> Vec<u8> {
    values.iter().map(|&v| extent.encode(v as f64)).collect()
}

/// Decode bytes back to physical values.
pub fn denormalize(bytes: &[u8], extent: Extent) -> Vec<f64> {
    bytes.iter().map(|&b| extent.decode(b)).collect()
}
