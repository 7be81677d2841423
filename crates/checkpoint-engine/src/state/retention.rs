use chrono::{DateTime, Duration, Utc};

use checkpoint_core::group::{GroupKey, StatusCache};
use checkpoint_core::types::Slot;

/// Remove slot entries older than `max_age`, then groups left empty.
///
/// Entries without a timestamp are kept. A `max_age` reaching past the
/// representable date range prunes nothing. Returns the removed slots in key order.
pub fn prune_stale(cache: &mut StatusCache, now: DateTime<Utc>, max_age: Duration) -> Vec<(GroupKey, Slot)> {
    let mut pruned = Vec::new();
    let Some(cutoff) = now.checked_sub_signed(max_age) else {
        tracing::debug!(max_age_hours = max_age.num_hours(), "age window exceeds date range");
        return pruned;
    };

    cache.retain(|key, group| {
        for slot in Slot::ALL {
            let stale = group
                .slot(slot)
                .and_then(|e| e.reported_at)
                .is_some_and(|ts| ts < cutoff);
            if stale {
                *group.slot_mut(slot) = None;
                pruned.push((key.clone(), slot));
            }
        }
        !group.is_empty()
    });

    if !pruned.is_empty() {
        tracing::info!(pruned = pruned.len(), cutoff = %cutoff, "stale entries pruned");
    }
    pruned
}
