//! Geographic bounding box used to cut subregions out of a model grid.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// `x` is longitude and `y` is latitude. Longitudes are kept in whatever
/// convention the caller uses (GFS grids are 0..360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create from the latitude/longitude ordering used by the request layer.
    pub fn from_lat_lon(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self::new(lon_min, lat_min, lon_max, lat_max)
    }

    /// Parse a "minx,miny,maxx,maxy" string (lon_min,lat_min,lon_max,lat_max).
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Reject boxes whose minimum corner exceeds the maximum corner.
    pub fn validate(&self) -> Result<(), BboxParseError> {
        if !(self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite())
        {
            return Err(BboxParseError::NotFinite);
        }
        if self.min_y > self.max_y {
            return Err(BboxParseError::Inverted {
                axis: "latitude",
                min: self.min_y,
                max: self.max_y,
            });
        }
        if self.min_x > self.max_x {
            return Err(BboxParseError::Inverted {
                axis: "longitude",
                min: self.min_x,
                max: self.max_x,
            });
        }
        Ok(())
    }

    pub fn lat_min(&self) -> f64 {
        self.min_y
    }

    pub fn lat_max(&self) -> f64 {
        self.max_y
    }

    pub fn lon_min(&self) -> f64 {
        self.min_x
    }

    pub fn lon_max(&self) -> f64 {
        self.max_x
    }

    /// Width of the bounding box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Inclusive containment test.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Shift negative longitudes into the 0..360 convention.
    ///
    /// Only applied when both edges are negative or the box does not wrap,
    /// so `(-130, -60)` becomes `(230, 300)`.
    pub fn to_positive_longitudes(&self) -> Self {
        if self.min_x >= 0.0 && self.max_x >= 0.0 {
            return *self;
        }
        let shift = |lon: f64| if lon < 0.0 { lon + 360.0 } else { lon };
        let (min_x, max_x) = (shift(self.min_x), shift(self.max_x));
        if min_x > max_x {
            // The box crosses the prime meridian; leave it alone.
            return *self;
        }
        Self::new(min_x, self.min_y, max_x, self.max_y)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),

    #[error("BBOX coordinates must be finite")]
    NotFinite,

    #[error("Inverted {axis} range: {min} > {max}")]
    Inverted {
        axis: &'static str,
        min: f64,
        max: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = BoundingBox::parse("237.2805,21.13812,312.25,64.75").unwrap();
        assert_eq!(bbox.lon_min(), 237.2805);
        assert_eq!(bbox.lat_min(), 21.13812);
        assert_eq!(bbox.lon_max(), 312.25);
        assert_eq!(bbox.lat_max(), 64.75);
    }

    #[test]
    fn test_from_lat_lon_ordering() {
        let bbox = BoundingBox::from_lat_lon(24.0, 49.0, 235.0, 293.0);
        assert_eq!(bbox, BoundingBox::new(235.0, 24.0, 293.0, 49.0));
    }

    #[test]
    fn test_inverted_latitude_rejected() {
        let err = BoundingBox::parse("0,50,10,40").unwrap_err();
        assert!(matches!(err, BboxParseError::Inverted { axis: "latitude", .. }));
    }

    #[test]
    fn test_positive_longitudes() {
        let bbox = BoundingBox::new(-130.0, 20.0, -60.0, 55.0).to_positive_longitudes();
        assert_eq!(bbox.min_x, 230.0);
        assert_eq!(bbox.max_x, 300.0);

        let crossing = BoundingBox::new(-10.0, 0.0, 10.0, 5.0);
        assert_eq!(crossing.to_positive_longitudes(), crossing);
    }
}
