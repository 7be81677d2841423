use chrono::{DateTime, FixedOffset, Utc};

/// Arabic relative time label ("منذ ساعتين").
///
/// Timestamps in the future render as "الآن" rather than a negative span.
pub fn time_ago(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    if secs < 0 {
        return "الآن".to_string();
    }
    if secs < 60 {
        return "منذ لحظات".to_string();
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return counted(minutes, "دقيقة", "دقيقتين", "دقائق");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return counted(hours, "ساعة", "ساعتين", "ساعات");
    }
    counted(hours / 24, "يوم", "يومين", "أيام")
}

/// Arabic counting: singular, dual, plural for 3..=10, singular above.
fn counted(n: i64, one: &str, two: &str, few: &str) -> String {
    match n {
        1 => format!("منذ {one}"),
        2 => format!("منذ {two}"),
        3..=10 => format!("منذ {n} {few}"),
        _ => format!("منذ {n} {one}"),
    }
}

/// Wall-clock `HH:MM` at a fixed offset from UTC.
pub fn clock_time(ts: DateTime<Utc>, offset_minutes: i32) -> String {
    match FixedOffset::east_opt(offset_minutes.saturating_mul(60)) {
        Some(offset) => ts.with_timezone(&offset).format("%H:%M").to_string(),
        None => ts.format("%H:%M").to_string(),
    }
}
