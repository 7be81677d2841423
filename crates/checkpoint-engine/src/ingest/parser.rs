use serde::{Deserialize, Serialize};

use checkpoint_core::report::{RawReport, RawTimestamp};

use super::catalog::LocationCatalog;
use super::noise::is_noise;

const STATUS_INQUIRY: &str = "استفسار";
const DIRECTION_BOTH: &str = "الاتجاهين";
/// Left for the reconciler's unknown-direction policy to route.
const DIRECTION_UNSPECIFIED: &str = "غير محدد";

/// Keyword table for status, checked top to bottom.
const STATUS_VOCABULARY: &[(&str, &[&str])] = &[
    (STATUS_INQUIRY, &["شو وضع", "كيف", "ايش وضع", "كيف الوضع", "؟"]),
    ("إغلاق", &["مغلق", "مسكر", "اغلاق", "سكر", "مغلقة", "مسكرة", "❌"]),
    ("أزمة", &["ازمة", "أزمة", "كثافة سير", "واقف", "خانقة", "طويلة", "🔴"]),
    ("سالك", &["سالك", "سالكة", "فاتح", "مفتوح", "بحري", "نضيف", "✅"]),
    ("حاجز/تفتيش", &["حاجز", "تفتيش", "بفتش", "تواجد جيش", "جيش", "حاجز طيار", "وقف"]),
    ("حادث", &["حادث", "حريق", "عطلان", "عطلانه"]),
    ("فتح", &["فتح", "تم فتح"]),
];

const DIRECTION_VOCABULARY: &[(&str, &[&str])] = &[
    ("دخول", &["للداخل", "دخول", "داخل", "للدخول", "ل الداخل"]),
    ("خروج", &["للخارج", "خروج", "خارج", "للخروج", "ل الخارج"]),
    (DIRECTION_BOTH, &["بالاتجاهين", "الاتجاهين", "الجهتين", "باتجاهين"]),
];

/// Markers stripped from the cleaned text.
const EMOJI_MARKERS: &[char] = &['🔴', '❌', '✅', '\u{fe0f}', '🤍', '🤝', '⚠', '✋'];

/// A channel message as collected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_channel: Option<String>,
    #[serde(default, alias = "message_text", alias = "original_message")]
    pub text: String,
    #[serde(default, alias = "message_date", skip_serializing_if = "Option::is_none")]
    pub date: Option<RawTimestamp>,
}

impl IncomingMessage {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// A usable status report plus the cleaned message text.
    Report { report: RawReport, cleaned: String },
    Noise,
    /// Someone asking about a checkpoint rather than reporting one.
    Inquiry { checkpoint: Option<String> },
    /// No known checkpoint or no recognizable status.
    Unrecognized,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub messages: usize,
    pub reports: usize,
    pub noise: usize,
    pub inquiries: usize,
    pub unrecognized: usize,
}

/// Keyword parser turning free-text channel messages into reports.
pub struct MessageParser {
    catalog: LocationCatalog,
}

impl MessageParser {
    pub fn new(catalog: LocationCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    pub fn parse(&self, message: &IncomingMessage) -> ParseOutcome {
        let text = message.text.trim();
        if text.is_empty() {
            return ParseOutcome::Unrecognized;
        }
        if is_noise(text) {
            return ParseOutcome::Noise;
        }

        let lower = text.to_lowercase();
        let location = self.catalog.find(&lower);
        let status = first_match(STATUS_VOCABULARY, &lower);

        if status == Some(STATUS_INQUIRY) {
            return ParseOutcome::Inquiry {
                checkpoint: location.map(|l| l.checkpoint.clone()),
            };
        }
        let (Some(location), Some(status)) = (location, status) else {
            return ParseOutcome::Unrecognized;
        };

        let direction = first_match(DIRECTION_VOCABULARY, &lower).unwrap_or(DIRECTION_UNSPECIFIED);

        let mut report = RawReport::new(&location.checkpoint, &location.city, direction, status);
        report.reported_at = message.date.clone();
        ParseOutcome::Report {
            report,
            cleaned: clean_text(text),
        }
    }

    /// Parse a batch, keeping only reports, in input order.
    pub fn parse_all(&self, messages: &[IncomingMessage]) -> (Vec<RawReport>, ParseStats) {
        let mut stats = ParseStats {
            messages: messages.len(),
            ..ParseStats::default()
        };
        let mut reports = Vec::new();
        for (i, message) in messages.iter().enumerate() {
            match self.parse(message) {
                ParseOutcome::Report { report, .. } => {
                    stats.reports += 1;
                    reports.push(report);
                }
                ParseOutcome::Noise => {
                    tracing::debug!(index = i, "noise message skipped");
                    stats.noise += 1;
                }
                ParseOutcome::Inquiry { .. } => stats.inquiries += 1,
                ParseOutcome::Unrecognized => {
                    tracing::debug!(index = i, "unrecognized message skipped");
                    stats.unrecognized += 1;
                }
            }
        }
        (reports, stats)
    }
}

fn first_match(vocabulary: &[(&'static str, &[&str])], lower: &str) -> Option<&'static str> {
    vocabulary
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(label, _)| *label)
}

/// Strip emoji markers and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !EMOJI_MARKERS.contains(c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
