use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};

use checkpoint_core::group::CheckpointGroup;
use checkpoint_core::policy::normalize_text;
use checkpoint_core::types::Slot;

const QUESTION_WORDS: &[&str] = &[
    "حاجز", "حالة", "وضع", "ما", "كيف", "هل", "في", "من", "إلى", "على", "مفتوح", "مغلق", "سالك",
    "الحال", "الوضع", "شو", "ايش",
];

const GREETING_WORDS: &[&str] = &["مرحبا", "أهلا", "اهلا", "السلام", "مساء", "صباح", "تحية"];

/// Words of a free-text question that can name a checkpoint.
pub fn query_terms(text: &str) -> Vec<String> {
    let cleaned: String = normalize_text(text)
        .chars()
        .filter(|c| !matches!(c, '؟' | '?' | '.' | ',' | '،' | '!'))
        .collect();
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 1)
        .filter(|w| !QUESTION_WORDS.contains(w) && !GREETING_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Groups whose checkpoint name matches the query, most recently updated first.
///
/// A match is containment in either direction after normalization. Groups
/// without any timestamp sort last; ties keep input order.
pub fn lookup<'a>(groups: &'a [CheckpointGroup], query: &str) -> Vec<&'a CheckpointGroup> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }
    let phrase = terms.join(" ");

    let mut hits: Vec<&CheckpointGroup> = groups
        .iter()
        .filter(|g| {
            let name = normalize_text(&g.checkpoint_name);
            !name.is_empty() && (name.contains(&phrase) || phrase.contains(&name))
        })
        .collect();
    hits.sort_by_key(|g| Reverse(g.last_update()));
    hits
}

/// Field filters over reconciled groups. Unset fields match everything.
///
/// Name filters are case-insensitive substring matches. `status`, `slot` and
/// `since` are checked together against each slot; a group passes when at
/// least one of its slots does.
#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub checkpoint: Option<String>,
    pub city: Option<String>,
    pub status: Option<String>,
    pub slot: Option<Slot>,
    /// Oldest acceptable report time; untimed slots never pass.
    pub since: Option<DateTime<Utc>>,
    /// Keep at most this many groups after sorting.
    pub top: Option<usize>,
}

impl GroupFilter {
    /// Only slots reported within `minutes` before `now`. A window reaching
    /// past the representable date range sets no bound.
    pub fn within_minutes(mut self, now: DateTime<Utc>, minutes: u64) -> Self {
        self.since = i64::try_from(minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .and_then(|window| now.checked_sub_signed(window));
        self
    }

    fn names_match(&self, group: &CheckpointGroup) -> bool {
        contains(&group.checkpoint_name, self.checkpoint.as_deref())
            && contains(&group.city_name, self.city.as_deref())
    }

    /// Latest report time among the slots that pass, or `None` inside `Some`
    /// when only untimed slots pass.
    fn matching_slots(&self, group: &CheckpointGroup) -> Option<Option<DateTime<Utc>>> {
        let mut matched = None;
        for slot in Slot::ALL {
            if self.slot.is_some_and(|s| s != slot) {
                continue;
            }
            let Some(entry) = group.slot(slot) else {
                continue;
            };
            if !contains(&entry.status, self.status.as_deref()) {
                continue;
            }
            if let Some(since) = self.since {
                if !entry.reported_at.is_some_and(|ts| ts >= since) {
                    continue;
                }
            }
            matched = Some(matched.flatten().max(entry.reported_at));
        }
        matched
    }
}

/// Groups passing `filter`, newest matching slot first, cut to `filter.top`.
///
/// Groups whose matching slots are all untimed sort last; ties keep input order.
pub fn filter_groups<'a, I>(groups: I, filter: &GroupFilter) -> Vec<&'a CheckpointGroup>
where
    I: IntoIterator<Item = &'a CheckpointGroup>,
{
    let mut hits: Vec<(&CheckpointGroup, Option<DateTime<Utc>>)> = groups
        .into_iter()
        .filter(|g| filter.names_match(g))
        .filter_map(|g| filter.matching_slots(g).map(|latest| (g, latest)))
        .collect();
    hits.sort_by_key(|(_, latest)| Reverse(*latest));
    if let Some(top) = filter.top {
        hits.truncate(top);
    }
    hits.into_iter().map(|(g, _)| g).collect()
}

fn contains(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => normalize_text(haystack).contains(&normalize_text(needle)),
        None => true,
    }
}
