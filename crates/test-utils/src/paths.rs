//! Temporary directory helpers.

use std::path::PathBuf;

/// Creates a temporary directory for test output.
///
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}

/// Creates a temporary directory with a specific prefix.
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Source and output directories for a pipeline run, cleaned up together.
pub struct DataDirs {
    root: tempfile::TempDir,
}

impl DataDirs {
    pub fn new() -> Self {
        let root = temp_test_dir_with_prefix("gfs_rasters_");
        std::fs::create_dir_all(root.path().join("grib")).expect("Failed to create grib dir");
        std::fs::create_dir_all(root.path().join("png")).expect("Failed to create png dir");
        Self { root }
    }

    /// Directory holding `.grb2` inputs.
    pub fn grib_dir(&self) -> PathBuf {
        self.root.path().join("grib")
    }

    /// Directory receiving `.png` and `.info` outputs.
    pub fn png_dir(&self) -> PathBuf {
        self.root.path().join("png")
    }

    /// Write `bytes` to `grib_dir/file_name` and return the path.
    pub fn write_grib(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.grib_dir().join(file_name);
        std::fs::write(&path, bytes).expect("Failed to write GRIB2 fixture");
        path
    }
}

impl Default for DataDirs {
    fn default() -> Self {
        Self::new()
    }
}
