use std::fmt;

use crate::types::ColorBand;

/// Why a report did not contribute to any slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// City or checkpoint name empty or a placeholder.
    Unnamed,
    /// Status empty or a placeholder such as `N/A`.
    NoStatus,
    /// Direction unknown and no slot could take it.
    Unroutable,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Unnamed => f.write_str("missing or placeholder name"),
            DropReason::NoStatus => f.write_str("missing or placeholder status"),
            DropReason::Unroutable => f.write_str("unknown direction with no free slot"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("empty pattern in {0} color rule")]
    EmptyPattern(ColorBand),
    #[error("empty direction alias")]
    EmptyAlias,
    #[error("direction alias '{0}' listed more than once")]
    AmbiguousAlias(String),
}

/// Structured check result for `ckpt check --json`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckReport {
    pub file: String,
    pub reports: usize,
    pub pass: bool,
    pub errors: Vec<CheckIssue>,
    pub warnings: Vec<CheckIssue>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckIssue {
    pub code: String,
    pub check: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl CheckIssue {
    pub fn new(code: &str, check: &str, message: String, path: Option<String>) -> Self {
        Self {
            code: code.to_string(),
            check: check.to_string(),
            message,
            path,
        }
    }
}
