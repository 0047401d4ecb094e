pub mod exif;
pub mod guess;

use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

/// Where a resolved capture date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    Metadata,
    /// Filename convention, by name
    Filename(&'static str),
    Default,
}

/// Result of date resolution: bucketing date + where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResult {
    /// Capture time after the night-rollover adjustment
    pub date: NaiveDateTime,
    pub source: DateSource,
}

/// Capability that reads an embedded capture date from a file.
///
/// `Err` is a decode failure and `Ok(None)` a metadata block without a usable
/// date. Neither stops the file from being processed.
pub trait MetadataDecoder {
    fn capture_date(&self, path: &Path) -> anyhow::Result<Option<NaiveDateTime>>;
}

/// EXIF-backed decoder used for real runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDecoder;

impl MetadataDecoder for ExifDecoder {
    fn capture_date(&self, path: &Path) -> anyhow::Result<Option<NaiveDateTime>> {
        exif::read_exif_date_from_path(path)
    }
}

/// Date used when neither metadata nor filename yields one: 0000-01-01 at the boundary hour.
pub fn default_date(boundary_hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(0, 1, 1)
        .and_then(|d| d.and_hms_opt(boundary_hour.min(23), 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Captures before `boundary_hour` belong to the previous day's album.
pub fn apply_night_rollover(date: NaiveDateTime, boundary_hour: u32) -> NaiveDateTime {
    if date.hour() < boundary_hour {
        date - Duration::hours(boundary_hour.into())
    } else {
        date
    }
}

/// Pick the capture date in priority order (metadata, filename, default)
/// and apply the night rollover. Always produces a result.
pub fn resolve(
    metadata: Option<NaiveDateTime>,
    filename: Option<guess::FilenameDate>,
    boundary_hour: u32,
) -> DateResult {
    let (date, source) = match (metadata, filename) {
        (Some(date), _) => (date, DateSource::Metadata),
        (None, Some(f)) => (f.date, DateSource::Filename(f.convention)),
        (None, None) => (default_date(boundary_hour), DateSource::Default),
    };

    DateResult {
        date: apply_night_rollover(date, boundary_hour),
        source,
    }
}
