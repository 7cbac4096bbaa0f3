//! Common test fixtures for GFS raster tests.

/// Bounding boxes as `(min_lon, min_lat, max_lon, max_lat)`.
pub mod bbox {
    /// Covers the whole default `Grib2Builder::new_gfs` grid
    pub const BUILDER_GRID: (f64, f64, f64, f64) = (-130.0, 36.0, -121.0, 45.0);

    /// Inner 5x5 block of the builder grid
    pub const BUILDER_INNER: (f64, f64, f64, f64) = (-128.0, 38.0, -124.0, 42.0);

    /// Nowhere near the builder grid
    pub const DISJOINT: (f64, f64, f64, f64) = (10.0, -40.0, 20.0, -30.0);
}

/// Cycle and forecast tokens used in file names.
pub mod cycle {
    pub const DATE: &str = "20241009";
    pub const RUN: &str = "00";
}

/// Source file names following the `{PARAM}_{LEVEL}_gfs.{DATE}_{RUN}_f{FFF}.grb2`
/// convention.
pub fn source_file_name(parameter: &str, level: &str, forecast_hour: u32) -> String {
    format!(
        "{}_{}_gfs.{}_{}_f{:03}.grb2",
        parameter,
        level,
        cycle::DATE,
        cycle::RUN,
        forecast_hour
    )
}

/// Raster stem matching [`source_file_name`] once written as PNG.
pub fn raster_stem(parameter: &str, level: &str, forecast_hour: u32) -> String {
    format!(
        "{}_{}_gfs_{}_{}_f{:03}",
        parameter,
        level,
        cycle::DATE,
        cycle::RUN,
        forecast_hour
    )
}
