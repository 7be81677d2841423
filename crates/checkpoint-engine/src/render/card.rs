use chrono::{DateTime, Utc};
use serde::Serialize;

use checkpoint_core::group::{CheckpointGroup, StatusEntry};
use checkpoint_core::timefmt::{clock_time, time_ago};
use checkpoint_core::types::{ColorBand, Slot};

/// Display form of one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub status: String,
    pub color: ColorBand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ago: Option<String>,
}

impl SlotView {
    fn new(entry: &StatusEntry, now: DateTime<Utc>, offset_minutes: i32) -> Self {
        Self {
            status: entry.status.clone(),
            color: entry.color_band,
            clock: entry.reported_at.map(|ts| clock_time(ts, offset_minutes)),
            ago: entry.reported_at.map(|ts| time_ago(ts, now)),
        }
    }

    fn cell(&self) -> String {
        let mut cell = format!("{} [{}]", self.status, self.color);
        if let Some(clock) = &self.clock {
            cell.push(' ');
            cell.push_str(clock);
        }
        if let Some(ago) = &self.ago {
            cell.push_str(&format!(" ({ago})"));
        }
        cell
    }
}

/// One checkpoint as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointCard {
    pub city_name: String,
    pub checkpoint_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<SlotView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit: Option<SlotView>,
}

impl CheckpointCard {
    pub fn slot(&self, slot: Slot) -> Option<&SlotView> {
        match slot {
            Slot::Entry => self.entry.as_ref(),
            Slot::Exit => self.exit.as_ref(),
        }
    }
}

/// Build cards in group order.
pub fn cards(groups: &[CheckpointGroup], now: DateTime<Utc>, offset_minutes: i32) -> Vec<CheckpointCard> {
    groups
        .iter()
        .map(|g| CheckpointCard {
            city_name: g.city_name.clone(),
            checkpoint_name: g.checkpoint_name.clone(),
            entry: g.entry.as_ref().map(|e| SlotView::new(e, now, offset_minutes)),
            exit: g.exit.as_ref().map(|e| SlotView::new(e, now, offset_minutes)),
        })
        .collect()
}

/// Aligned text table, one row per card.
pub fn render_table(cards: &[CheckpointCard]) -> String {
    if cards.is_empty() {
        return "(no checkpoints)\n".to_string();
    }
    let rows: Vec<[String; 4]> = cards
        .iter()
        .map(|c| {
            let cell = |slot| c.slot(slot).map(SlotView::cell).unwrap_or_else(|| "-".into());
            [
                c.city_name.clone(),
                c.checkpoint_name.clone(),
                cell(Slot::Entry),
                cell(Slot::Exit),
            ]
        })
        .collect();

    let header = ["CITY", "CHECKPOINT", "ENTRY", "EXIT"];
    let width = |i: usize| {
        rows.iter()
            .map(|r| r[i].chars().count())
            .chain(std::iter::once(header[i].len()))
            .max()
            .unwrap_or(0)
    };
    let (w_city, w_cp, w_entry) = (width(0), width(1), width(2));

    let mut out = String::new();
    out.push_str(&format!(
        "{:<w_city$}  {:<w_cp$}  {:<w_entry$}  {}\n",
        header[0], header[1], header[2], header[3]
    ));
    out.push_str(&format!(
        "{:<w_city$}  {:<w_cp$}  {:<w_entry$}  ----\n",
        "-".repeat(w_city),
        "-".repeat(w_cp),
        "-".repeat(w_entry)
    ));
    for [city, cp, entry, exit] in &rows {
        out.push_str(&format!("{city:<w_city$}  {cp:<w_cp$}  {entry:<w_entry$}  {exit}\n"));
    }
    out
}
