//! Forecast cycle (model run) identification.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runs per day, oldest first.
pub const RUN_HOURS: [u8; 4] = [0, 6, 12, 18];

/// Directory prefix used by the upstream provider for cycle dates (`gfs.20241009`).
pub const DATE_PREFIX: &str = "gfs";

/// A forecast model run: initialization date plus run hour (00/06/12/18).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cycle {
    pub date: NaiveDate,
    pub run: u8,
}

impl Cycle {
    pub fn new(date: NaiveDate, run: u8) -> Result<Self, CycleParseError> {
        if !RUN_HOURS.contains(&run) {
            return Err(CycleParseError::InvalidRun(run.to_string()));
        }
        Ok(Self { date, run })
    }

    /// Parse a date token (`20241009` or `gfs.20241009`) and a run token (`06`).
    pub fn parse(date: &str, run: &str) -> Result<Self, CycleParseError> {
        let digits = date
            .strip_prefix(DATE_PREFIX)
            .map(|rest| rest.trim_start_matches(|c: char| c == '.' || c == '_'))
            .unwrap_or(date);
        let date = NaiveDate::parse_from_str(digits, "%Y%m%d")
            .map_err(|_| CycleParseError::InvalidDate(date.to_string()))?;
        let run: u8 = run
            .trim_end_matches('/')
            .parse()
            .map_err(|_| CycleParseError::InvalidRun(run.to_string()))?;
        Self::new(date, run)
    }

    /// The run immediately before this one.
    ///
    /// 18 → 12 → 06 → 00 → previous day's 18.
    pub fn previous(&self) -> Self {
        match RUN_HOURS.iter().position(|&r| r == self.run) {
            Some(0) | None => Self {
                date: self.date - Duration::days(1),
                run: RUN_HOURS[RUN_HOURS.len() - 1],
            },
            Some(idx) => Self {
                date: self.date,
                run: RUN_HOURS[idx - 1],
            },
        }
    }

    /// Upstream directory token, e.g. `gfs.20241009`.
    pub fn date_token(&self) -> String {
        format!("{}.{}", DATE_PREFIX, self.date.format("%Y%m%d"))
    }

    /// Two-digit run token, e.g. `06`.
    pub fn run_token(&self) -> String {
        format!("{:02}", self.run)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.date_token(), self.run_token())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CycleParseError {
    #[error("Invalid cycle date: {0}")]
    InvalidDate(String),

    #[error("Invalid cycle run: {0} (expected 00, 06, 12 or 18)")]
    InvalidRun(String),
}
