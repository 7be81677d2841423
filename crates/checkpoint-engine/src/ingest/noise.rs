/// Greeting and thanks fragments; noise only in short messages.
const PLEASANTRIES: &[&str] = &[
    "شكرا", "شكراً", "مرحبا", "أهلا", "السلام عليكم", "مساء الخير", "صباح الخير", "تحية",
    "بارك الله", "الله يعطيك", "يا جماعة", "ربنا يبارك", "🙏", "❤️",
];

/// Whole messages that carry nothing else.
const SHORT_PLEASANTRIES: &[&str] = &["شكرا", "مرحبا", "اهلا", "تسلم", "يعطيك العافية"];

/// General announcements rather than checkpoint reports.
const ANNOUNCEMENTS: &[&str] = &["مخارج", "مداخل", "عام", "عمومي", "اعلان", "تنبيه عام"];

const PLEASANTRY_MAX_CHARS: usize = 30;
const ANNOUNCEMENT_MAX_CHARS: usize = 50;

/// True for chatter that should never become a report.
pub fn is_noise(text: &str) -> bool {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    let len = trimmed.chars().count();

    if SHORT_PLEASANTRIES.contains(&lower.as_str()) {
        return true;
    }
    if len < PLEASANTRY_MAX_CHARS && PLEASANTRIES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    len < ANNOUNCEMENT_MAX_CHARS && ANNOUNCEMENTS.iter().any(|p| lower.contains(p))
}
