use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Epoch values at or above this magnitude are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A single checkpoint status update as delivered by the data feed.
///
/// Field names follow the collector backend (`checkpoint_name`, `city_name`,
/// `message_date`); the client-side spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReport {
    #[serde(default, alias = "checkpoint", deserialize_with = "lenient_string")]
    pub checkpoint_name: String,

    #[serde(default, alias = "city", deserialize_with = "lenient_string")]
    pub city_name: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub direction: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(
        default,
        alias = "message_date",
        alias = "updatedAt",
        skip_serializing_if = "Option::is_none"
    )]
    pub reported_at: Option<RawTimestamp>,
}

impl RawReport {
    pub fn new(checkpoint: &str, city: &str, direction: &str, status: &str) -> Self {
        Self {
            checkpoint_name: checkpoint.to_string(),
            city_name: city.to_string(),
            direction: direction.to_string(),
            status: status.to_string(),
            reported_at: None,
        }
    }

    pub fn at(mut self, ts: impl Into<RawTimestamp>) -> Self {
        self.reported_at = Some(ts.into());
        self
    }

    /// Parsed report time. Absent and unparsable values both yield `None`.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.reported_at.as_ref().and_then(RawTimestamp::parse)
    }
}

/// Timestamp exactly as it arrived: epoch number or free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Epoch(i64),
    Fractional(f64),
    Text(String),
}

impl RawTimestamp {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            RawTimestamp::Epoch(n) => from_epoch(*n),
            RawTimestamp::Fractional(f) => {
                if f.is_finite() {
                    from_epoch(f.trunc() as i64)
                } else {
                    None
                }
            }
            RawTimestamp::Text(s) => parse_timestamp(s),
        }
    }
}

impl From<&str> for RawTimestamp {
    fn from(s: &str) -> Self {
        RawTimestamp::Text(s.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(s: String) -> Self {
        RawTimestamp::Text(s)
    }
}

impl From<i64> for RawTimestamp {
    fn from(n: i64) -> Self {
        RawTimestamp::Epoch(n)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        RawTimestamp::Text(dt.to_rfc3339())
    }
}

/// Parse a textual timestamp.
///
/// Accepts RFC 3339, RFC 2822 (`Mon, 01 Jan 2024 11:00:00 GMT`), naive
/// `YYYY-MM-DD[T ]HH:MM:SS[.f]` (read as UTC) and all-digit epoch seconds or
/// milliseconds.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let digits = s.strip_prefix('-').unwrap_or(s);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_epoch);
    }
    None
}

/// Read a JSON array of reports from a file.
pub fn load_reports(path: &Path) -> Result<Vec<RawReport>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read reports {}", path.display()))?;
    parse_reports(&content).with_context(|| format!("{}: invalid report batch", path.display()))
}

pub fn parse_reports(content: &str) -> Result<Vec<RawReport>> {
    Ok(serde_json::from_str(content)?)
}

fn from_epoch(n: i64) -> Option<DateTime<Utc>> {
    if n.checked_abs()? >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
