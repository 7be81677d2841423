use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use checkpoint_core::errors::DropReason;
use checkpoint_core::group::{CheckpointGroup, GroupKey, StatusCache, StatusEntry};
use checkpoint_core::policy::ReconcilePolicy;
use checkpoint_core::report::RawReport;
use checkpoint_core::types::{Direction, Slot, UnknownDirectionPolicy};

use super::outcome::{CycleStats, ReconcileOutcome};

/// Deterministic status reconciler.
///
/// Algorithm:
/// 1. Seed every slot from `previous`
/// 2. Drop reports with an empty or placeholder city/checkpoint name or status
/// 3. Normalize the direction through the alias table; `Both` targets two slots,
///    `Unknown` takes the first empty slot (or is dropped, per policy)
/// 4. Per slot, the newest timestamp wins; a timed report beats an untimed one;
///    ties go to the later report in input order, except that a seeded value is
///    only replaced by something strictly newer
/// 5. Classify each winning status into a color band
/// 6. Emit groups ordered by (city, checkpoint)
pub struct Reconciler<'a> {
    policy: &'a ReconcilePolicy,
}

#[derive(Debug, Clone)]
struct Candidate {
    status: String,
    reported_at: Option<DateTime<Utc>>,
    /// Input position; `None` when carried over from `previous`.
    seq: Option<usize>,
}

impl Candidate {
    fn seeded(entry: &StatusEntry) -> Self {
        Self {
            status: entry.status.clone(),
            reported_at: entry.reported_at,
            seq: None,
        }
    }

    /// Challenger is always later in input order than the incumbent.
    fn beats(&self, incumbent: &Candidate) -> bool {
        match (self.reported_at, incumbent.reported_at) {
            (Some(c), Some(i)) if c != i => c > i,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            _ => incumbent.seq.is_some(),
        }
    }
}

#[derive(Debug, Default)]
struct Slots {
    entry: Option<Candidate>,
    exit: Option<Candidate>,
}

impl Slots {
    fn seeded(group: &CheckpointGroup) -> Self {
        Self {
            entry: group.entry.as_ref().map(Candidate::seeded),
            exit: group.exit.as_ref().map(Candidate::seeded),
        }
    }

    fn get(&self, slot: Slot) -> Option<&Candidate> {
        match slot {
            Slot::Entry => self.entry.as_ref(),
            Slot::Exit => self.exit.as_ref(),
        }
    }

    fn offer(&mut self, slot: Slot, challenger: &Candidate) {
        let current = match slot {
            Slot::Entry => &mut self.entry,
            Slot::Exit => &mut self.exit,
        };
        let replace = match current {
            Some(incumbent) => challenger.beats(incumbent),
            None => true,
        };
        if replace {
            *current = Some(challenger.clone());
        }
    }
}

impl<'a> Reconciler<'a> {
    pub fn new(policy: &'a ReconcilePolicy) -> Self {
        Self { policy }
    }

    pub fn reconcile(&self, reports: &[RawReport], previous: &StatusCache) -> Vec<CheckpointGroup> {
        self.run(reports, previous).groups
    }

    /// Reconcile one batch and report what happened to each input.
    pub fn run(&self, reports: &[RawReport], previous: &StatusCache) -> ReconcileOutcome {
        let mut stats = CycleStats {
            received: reports.len(),
            ..CycleStats::default()
        };

        let mut table: BTreeMap<GroupKey, Slots> = previous
            .iter()
            .map(|(key, group)| (key.clone(), Slots::seeded(group)))
            .collect();

        for (seq, report) in reports.iter().enumerate() {
            let key = match self.key_for(report) {
                Ok(key) => key,
                Err(reason) => {
                    tracing::debug!(seq, %reason, "report dropped");
                    stats.record_drop(reason);
                    continue;
                }
            };

            let direction = self.policy.direction_of(&report.direction);
            let targets = self.route(direction, table.get(&key));
            if targets.is_empty() {
                let reason = DropReason::Unroutable;
                tracing::debug!(seq, %key, direction = %report.direction, %reason, "report dropped");
                stats.record_drop(reason);
                continue;
            }

            let reported_at = report.timestamp();
            if reported_at.is_none() {
                stats.untimed += 1;
            }
            stats.accepted += 1;

            let candidate = Candidate {
                status: report.status.trim().to_string(),
                reported_at,
                seq: Some(seq),
            };
            let slots = table.entry(key).or_default();
            for slot in targets {
                slots.offer(*slot, &candidate);
            }
        }

        let groups = table
            .into_iter()
            .filter_map(|(key, slots)| {
                let mut group = CheckpointGroup::empty(&key);
                for slot in Slot::ALL {
                    if let Some(winner) = slots.get(slot) {
                        if winner.seq.is_none() {
                            stats.retained_slots += 1;
                        }
                        *group.slot_mut(slot) = Some(self.entry_for(winner));
                    }
                }
                (!group.is_empty()).then_some(group)
            })
            .collect();

        ReconcileOutcome { groups, stats }
    }

    fn key_for(&self, report: &RawReport) -> Result<GroupKey, DropReason> {
        if self.policy.is_placeholder(&report.checkpoint_name)
            || self.policy.is_placeholder(&report.city_name)
        {
            return Err(DropReason::Unnamed);
        }
        if self.policy.is_placeholder(&report.status) {
            return Err(DropReason::NoStatus);
        }
        Ok(GroupKey::new(&report.city_name, &report.checkpoint_name))
    }

    fn route(&self, direction: Direction, slots: Option<&Slots>) -> &'static [Slot] {
        match direction {
            Direction::Entry => &[Slot::Entry],
            Direction::Exit => &[Slot::Exit],
            Direction::Both => &[Slot::Entry, Slot::Exit],
            Direction::Unknown => match self.policy.unknown_direction {
                UnknownDirectionPolicy::Drop => &[],
                UnknownDirectionPolicy::FillEmptySlot => {
                    let filled = |slot: Slot| slots.is_some_and(|s| s.get(slot).is_some());
                    if !filled(Slot::Entry) {
                        &[Slot::Entry]
                    } else if !filled(Slot::Exit) {
                        &[Slot::Exit]
                    } else {
                        &[]
                    }
                }
            },
        }
    }

    fn entry_for(&self, winner: &Candidate) -> StatusEntry {
        StatusEntry {
            status: winner.status.clone(),
            color_band: self.policy.color_of(&winner.status),
            reported_at: winner.reported_at,
        }
    }
}

/// Reconcile with the built-in policy.
pub fn reconcile(reports: &[RawReport], previous: &StatusCache) -> Vec<CheckpointGroup> {
    let policy = ReconcilePolicy::default();
    Reconciler::new(&policy).reconcile(reports, previous)
}
