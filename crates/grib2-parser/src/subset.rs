//! Geographic subregion extraction.

use gfs_common::BoundingBox;

use crate::sections::GridDefinition;
use crate::{Grib2Error, Result};

/// A rectangular cut of a decoded grid with per-cell coordinates.
///
/// All three arrays are row-major with `width * height` entries and keep the
/// source scan order (GFS scans north to south, so row 0 is the northern edge).
#[derive(Debug, Clone, PartialEq)]
pub struct SubGrid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
}

impl SubGrid {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.height && col < self.width {
            Some(self.values[row * self.width + col])
        } else {
            None
        }
    }
}

/// Extract every cell whose centre lies inside `bbox` (edges inclusive).
///
/// When the grid uses 0..360 longitudes and the box is given in -180..180,
/// the box is shifted first. An empty intersection is an error.
pub fn extract_subgrid(grid: &GridDefinition, values: &[f32], bbox: &BoundingBox) -> Result<SubGrid> {
    if values.len() != grid.num_points() {
        return Err(Grib2Error::InvalidFormat(format!(
            "Grid declares {} points but {} values were decoded",
            grid.num_points(),
            values.len()
        )));
    }

    let bbox = if grid.uses_positive_longitudes() {
        bbox.to_positive_longitudes()
    } else {
        *bbox
    };

    let lats = grid.latitudes();
    let lons = grid.longitudes();
    let ni = lons.len();

    let rows: Vec<usize> = (0..lats.len())
        .filter(|&j| lats[j] >= bbox.lat_min() && lats[j] <= bbox.lat_max())
        .collect();
    let cols: Vec<usize> = (0..ni)
        .filter(|&i| lons[i] >= bbox.lon_min() && lons[i] <= bbox.lon_max())
        .collect();

    if rows.is_empty() || cols.is_empty() {
        return Err(Grib2Error::EmptySubgrid {
            bbox: format!(
                "lat {}..{}, lon {}..{}",
                bbox.lat_min(),
                bbox.lat_max(),
                bbox.lon_min(),
                bbox.lon_max()
            ),
        });
    }

    let size = rows.len() * cols.len();
    let mut out_values = Vec::with_capacity(size);
    let mut out_lats = Vec::with_capacity(size);
    let mut out_lons = Vec::with_capacity(size);

    for &j in &rows {
        for &i in &cols {
            out_values.push(values[j * ni + i]);
            out_lats.push(lats[j]);
            out_lons.push(lons[i]);
        }
    }

    Ok(SubGrid {
        width: cols.len(),
        height: rows.len(),
        values: out_values,
        latitudes: out_lats,
        longitudes: out_lons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_5x4() -> GridDefinition {
        // 5 columns (230..234 E), 4 rows (45..42 N)
        GridDefinition {
            template: 0,
            grid_shape: 6,
            num_points_longitude: 5,
            num_points_latitude: 4,
            first_latitude: 45_000_000,
            first_longitude: 230_000_000,
            last_latitude: 42_000_000,
            last_longitude: 234_000_000,
            i_increment: 1_000_000,
            j_increment: 1_000_000,
            scanning_mode: 0,
        }
    }

    fn values() -> Vec<f32> {
        (0..20).map(|v| v as f32).collect()
    }

    #[test]
    fn test_extract_interior_box() {
        let bbox = BoundingBox::from_lat_lon(43.0, 44.0, 231.0, 233.0);
        let sub = extract_subgrid(&grid_5x4(), &values(), &bbox).unwrap();
        assert_eq!((sub.width, sub.height), (3, 2));
        // Row for 44N is j=1, columns 231..233 are i=1..3
        assert_eq!(sub.values, vec![6.0, 7.0, 8.0, 11.0, 12.0, 13.0]);
        assert_eq!(sub.latitudes[0], 44.0);
        assert_eq!(sub.longitudes[2], 233.0);
        assert_eq!(sub.get(1, 0), Some(11.0));
    }

    #[test]
    fn test_extract_negative_longitudes() {
        // -129..-127 is 231..233 in the grid's convention
        let bbox = BoundingBox::from_lat_lon(43.0, 44.0, -129.0, -127.0);
        let sub = extract_subgrid(&grid_5x4(), &values(), &bbox).unwrap();
        assert_eq!(sub.width, 3);
    }

    #[test]
    fn test_disjoint_box_is_error() {
        let bbox = BoundingBox::from_lat_lon(10.0, 20.0, 231.0, 233.0);
        assert!(matches!(
            extract_subgrid(&grid_5x4(), &values(), &bbox),
            Err(Grib2Error::EmptySubgrid { .. })
        ));
    }

    #[test]
    fn test_value_count_mismatch() {
        let bbox = BoundingBox::from_lat_lon(43.0, 44.0, 231.0, 233.0);
        assert!(extract_subgrid(&grid_5x4(), &[1.0, 2.0], &bbox).is_err());
    }
}
