//! `.info` sidecar records.
//!
//! A record is a list of `Key: value` lines. List values are written as a
//! bare `Key:` line followed by one indented line per item:
//!
//! ```text
//! Parameter: HGT
//! Level: 500_mb
//! Latitude bounds: 24.396308 to 49.384358
//! Min value: 5012.5
//! Contour Levels:
//!   0.1
//!   0.2
//! ```
//!
//! Writes are atomic and [`append`] rewrites existing keys in place, so a
//! record never holds the same key twice.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::fsutil::write_atomic;
use crate::normalize::Extent;

pub const PARAMETER: &str = "Parameter";
pub const LEVEL: &str = "Level";
pub const LATITUDE_BOUNDS: &str = "Latitude bounds";
pub const LONGITUDE_BOUNDS: &str = "Longitude bounds";
pub const SOURCE_FILE: &str = "Source GRIB file";
pub const MIN_VALUE: &str = "Min value";
pub const MAX_VALUE: &str = "Max value";
pub const GLOBAL_MIN: &str = "Global Min";
pub const GLOBAL_MAX: &str = "Global Max";
/// Extrema the raster bytes are currently encoded against, when not the local ones.
pub const RENORMALIZED: &str = "Renormalized";
/// Target extrema of a re-encoding that has been staged but not committed.
pub const RENORMALIZING: &str = "Renormalizing";

/// One value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// Ordered key/value record backing an `.info` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoRecord {
    entries: Vec<(String, Value)>,
}

impl InfoRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse record text. Unrecognized lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut record = Self::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with(char::is_whitespace) {
                if let Some((_, value)) = record.entries.last_mut() {
                    let item = line.trim().to_string();
                    match value {
                        Value::List(items) => items.push(item),
                        Value::Scalar(s) if s.is_empty() => *value = Value::List(vec![item]),
                        Value::Scalar(_) => {}
                    }
                }
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                record.set(key.trim(), value.trim());
            }
        }
        record
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            Value::List(items) => Some(items),
            Value::Scalar(_) => None,
        }
    }

    /// Insert `key`, or rewrite it in place if already present.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let at = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(at).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            match value {
                Value::Scalar(s) => {
                    out.push_str(key);
                    out.push_str(": ");
                    out.push_str(s);
                    out.push('\n');
                }
                Value::List(items) => {
                    out.push_str(key);
                    out.push_str(":\n");
                    for item in items {
                        out.push_str("  ");
                        out.push_str(item);
                        out.push('\n');
                    }
                }
            }
        }
        out
    }

    /// Parse a float-valued key. `Ok(None)` when the key is absent.
    pub fn get_f64(&self, path: &Path, key: &str) -> Result<Option<f64>> {
        match self.get_str(key) {
            None => Ok(None),
            Some(s) => s
                .parse::<f64>()
                .map(Some)
                .map_err(|_| PipelineError::metadata(path, format!("{key} is not a number: {s:?}"))),
        }
    }

    /// Parse a pair of floats separated by `sep` (`a to b`, `a b`).
    pub fn get_pair(&self, path: &Path, key: &str, sep: &str) -> Result<Option<(f64, f64)>> {
        let Some(s) = self.get_str(key) else {
            return Ok(None);
        };
        let bad = || PipelineError::metadata(path, format!("{key} is not a pair: {s:?}"));
        let (a, b) = if sep.trim().is_empty() {
            let mut parts = s.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(b), None) => (a, b),
                _ => return Err(bad()),
            }
        } else {
            s.split_once(sep).ok_or_else(bad)?
        };
        let a = a.trim().parse::<f64>().map_err(|_| bad())?;
        let b = b.trim().parse::<f64>().map_err(|_| bad())?;
        Ok(Some((a, b)))
    }
}

/// Create (or overwrite) the record at `path` with `fields`.
pub fn write(path: &Path, fields: &[(&str, Value)]) -> Result<()> {
    let mut record = InfoRecord::new();
    for (key, value) in fields {
        record.set(key, value.clone());
    }
    write_record(path, &record)
}

/// Update-or-insert `fields` into the record at `path`, creating it if missing.
pub fn append(path: &Path, fields: &[(&str, Value)]) -> Result<()> {
    let mut record = if path.exists() {
        read(path)?
    } else {
        InfoRecord::new()
    };
    for (key, value) in fields {
        record.set(key, value.clone());
    }
    write_record(path, &record)
}

pub fn read(path: &Path) -> Result<InfoRecord> {
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    Ok(InfoRecord::parse(&text))
}

pub fn write_record(path: &Path, record: &InfoRecord) -> Result<()> {
    write_atomic(path, record.render().as_bytes())
}

/// The sidecar path of a raster: same stem, `.info` extension.
pub fn info_path_for(raster: &Path) -> PathBuf {
    raster.with_extension(gfs_common::naming::INFO_EXTENSION)
}

/// Typed view of a raster's `.info` record.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    pub parameter: String,
    pub level: String,
    /// (south, north)
    pub latitude_bounds: (f64, f64),
    /// (west, east) in the source convention
    pub longitude_bounds: (f64, f64),
    pub source_file: String,
    /// Extrema of the decoded field. Never changes once written.
    pub local: Extent,
    pub global: Option<Extent>,
    /// Extent the bytes are encoded against after renormalization.
    pub renormalized: Option<Extent>,
}

impl RasterMetadata {
    /// Extent that decodes the raster bytes as they are on disk now.
    pub fn encoding(&self) -> Extent {
        self.renormalized.unwrap_or(self.local)
    }

    pub fn fields(&self) -> Vec<(&'static str, Value)> {
        let mut fields = vec![
            (PARAMETER, Value::from(self.parameter.as_str())),
            (LEVEL, Value::from(self.level.as_str())),
            (
                LATITUDE_BOUNDS,
                format!("{} to {}", self.latitude_bounds.0, self.latitude_bounds.1).into(),
            ),
            (
                LONGITUDE_BOUNDS,
                format!("{} to {}", self.longitude_bounds.0, self.longitude_bounds.1).into(),
            ),
            (SOURCE_FILE, Value::from(self.source_file.as_str())),
            (MIN_VALUE, self.local.min.to_string().into()),
            (MAX_VALUE, self.local.max.to_string().into()),
        ];
        if let Some(global) = self.global {
            fields.extend(global_fields(global));
        }
        if let Some(r) = self.renormalized {
            fields.push((RENORMALIZED, renormalized_value(r)));
        }
        fields
    }

    pub fn from_record(path: &Path, record: &InfoRecord) -> Result<Self> {
        let min = record.get_f64(path, MIN_VALUE)?.ok_or(PipelineError::MissingExtent {
            path: path.to_path_buf(),
            key: MIN_VALUE,
        })?;
        let max = record.get_f64(path, MAX_VALUE)?.ok_or(PipelineError::MissingExtent {
            path: path.to_path_buf(),
            key: MAX_VALUE,
        })?;

        let global = match (
            record.get_f64(path, GLOBAL_MIN)?,
            record.get_f64(path, GLOBAL_MAX)?,
        ) {
            (Some(lo), Some(hi)) => Some(Extent::new(lo, hi)),
            _ => None,
        };
        let renormalized = record
            .get_pair(path, RENORMALIZED, " ")?
            .map(|(lo, hi)| Extent::new(lo, hi));
        let text = |key: &str| record.get_str(key).unwrap_or_default().to_string();

        Ok(Self {
            parameter: text(PARAMETER),
            level: text(LEVEL),
            latitude_bounds: record.get_pair(path, LATITUDE_BOUNDS, " to ")?.unwrap_or_default(),
            longitude_bounds: record.get_pair(path, LONGITUDE_BOUNDS, " to ")?.unwrap_or_default(),
            source_file: text(SOURCE_FILE),
            local: Extent::new(min, max),
            global,
            renormalized,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_record(path, &read(path)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        write(path, &self.fields())
    }
}

/// `Global Min` / `Global Max` fields for an extent.
pub fn global_fields(global: Extent) -> [(&'static str, Value); 2] {
    [
        (GLOBAL_MIN, global.min.to_string().into()),
        (GLOBAL_MAX, global.max.to_string().into()),
    ]
}

/// `<min> <max>` marker value.
pub fn renormalized_value(extent: Extent) -> Value {
    format!("{} {}", extent.min, extent.max).into()
}
