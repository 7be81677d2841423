use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized travel direction of a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Entry,
    Exit,
    Both,
    Unknown,
}

/// One of the two directional slots of a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Entry,
    Exit,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Entry, Slot::Exit];

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Entry => "entry",
            Slot::Exit => "exit",
        }
    }

    /// Arabic label used in summary sentences.
    pub fn label_ar(self) -> &'static str {
        match self {
            Slot::Entry => "للدخول",
            Slot::Exit => "للخروج",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display color derived from a status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorBand {
    Green,
    Yellow,
    Orange,
    Red,
    #[default]
    Gray,
}

impl ColorBand {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorBand::Green => "green",
            ColorBand::Yellow => "yellow",
            ColorBand::Orange => "orange",
            ColorBand::Red => "red",
            ColorBand::Gray => "gray",
        }
    }

    /// Card header color used by the web client.
    pub fn hex(self) -> &'static str {
        match self {
            ColorBand::Green => "#198754",
            ColorBand::Yellow => "#ffc107",
            ColorBand::Orange => "#fd7e14",
            ColorBand::Red => "#dc3545",
            ColorBand::Gray => "#6c757d",
        }
    }
}

impl fmt::Display for ColorBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a report whose direction is not in the alias table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDirectionPolicy {
    /// Route to the entry slot if empty, else the exit slot if empty, else drop.
    #[default]
    FillEmptySlot,
    Drop,
}
