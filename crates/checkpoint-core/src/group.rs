use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ColorBand, Slot};

/// Identity of a checkpoint: (city, checkpoint).
///
/// Kept as two fields rather than a joined string, so names containing any
/// separator cannot collide. Ordering is city first, then checkpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub city_name: String,
    pub checkpoint_name: String,
}

impl GroupKey {
    pub fn new(city_name: &str, checkpoint_name: &str) -> Self {
        Self {
            city_name: city_name.trim().to_string(),
            checkpoint_name: checkpoint_name.trim().to_string(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.city_name, self.checkpoint_name)
    }
}

/// Winning status for one slot of a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: String,
    pub color_band: ColorBand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_at: Option<DateTime<Utc>>,
}

/// Reconciled view of one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointGroup {
    pub city_name: String,
    pub checkpoint_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<StatusEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<StatusEntry>,
}

impl CheckpointGroup {
    pub fn empty(key: &GroupKey) -> Self {
        Self {
            city_name: key.city_name.clone(),
            checkpoint_name: key.checkpoint_name.clone(),
            entry: None,
            exit: None,
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(&self.city_name, &self.checkpoint_name)
    }

    pub fn slot(&self, slot: Slot) -> Option<&StatusEntry> {
        match slot {
            Slot::Entry => self.entry.as_ref(),
            Slot::Exit => self.exit.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Option<StatusEntry> {
        match slot {
            Slot::Entry => &mut self.entry,
            Slot::Exit => &mut self.exit,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none() && self.exit.is_none()
    }

    /// Most recent timestamp across both slots.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.entry
            .iter()
            .chain(self.exit.iter())
            .filter_map(|e| e.reported_at)
            .max()
    }
}

/// Carry-over state between reconciliation cycles.
pub type StatusCache = BTreeMap<GroupKey, CheckpointGroup>;

/// Index groups by key. Later duplicates replace earlier ones.
pub fn index_groups<I>(groups: I) -> StatusCache
where
    I: IntoIterator<Item = CheckpointGroup>,
{
    groups.into_iter().map(|g| (g.key(), g)).collect()
}

/// Persisted form of the carry-over state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycle: u64,
    #[serde(default)]
    pub groups: Vec<CheckpointGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            cycle: 0,
            groups: Vec::new(),
            digest: None,
            updated_at: Utc::now(),
        }
    }

    pub fn cache(&self) -> StatusCache {
        index_groups(self.groups.iter().cloned())
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
