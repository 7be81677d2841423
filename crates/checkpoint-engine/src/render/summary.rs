use chrono::{DateTime, Utc};

use checkpoint_core::group::CheckpointGroup;
use checkpoint_core::timefmt::time_ago;
use checkpoint_core::types::Slot;

const BOTH_LABEL: &str = "بالاتجاهين";

/// One-line Arabic summaries of a checkpoint.
///
/// Identical statuses on both slots collapse into a single line, timed by the
/// newer of the two.
pub fn describe(group: &CheckpointGroup, now: DateTime<Utc>) -> Vec<String> {
    let name = &group.checkpoint_name;
    if let (Some(entry), Some(exit)) = (&group.entry, &group.exit) {
        if entry.status == exit.status {
            return vec![line(name, &entry.status, BOTH_LABEL, group.last_update(), now)];
        }
    }
    Slot::ALL
        .iter()
        .filter_map(|slot| group.slot(*slot).map(|e| (slot.label_ar(), e)))
        .map(|(label, e)| line(name, &e.status, label, e.reported_at, now))
        .collect()
}

fn line(name: &str, status: &str, label: &str, ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match ts {
        Some(ts) => format!("حاجز {name} {status} {label} {}", time_ago(ts, now)),
        None => format!("حاجز {name} {status} {label}"),
    }
}
