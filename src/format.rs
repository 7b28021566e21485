//! Display helpers for the quota report
//!
//! Pure functions shared by the normalizer and the report renderer:
//! coarse duration formatting, fixed-width progress bars, email
//! shortening, and project-id extraction from the loosely typed
//! loadCodeAssist project reference.

/// Glyphs for the quota progress bar
const BAR_FILLED: char = '█';
const BAR_EMPTY: char = '░';

/// Progress bar width in cells
const BAR_WIDTH: usize = 10;

/// Format a millisecond duration as `"2d 3h"`, `"3h 15m"` or `"42m"`
///
/// The sign is ignored so callers can format both "time until" and
/// "time since" with the same function. Components are floored; there
/// is no seconds precision.
pub fn format_duration(ms: i64) -> String {
    let seconds = ms.unsigned_abs() / 1000;
    let days = seconds / (24 * 3600);
    let hours = (seconds % (24 * 3600)) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Shorten an email to its local part (`alice@example.com` -> `alice`)
///
/// Placeholder names without an `@` pass through unchanged.
pub fn short_email(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Render a 10-cell progress bar like `[█████░░░░░] 50%`
///
/// The percentage is assumed to be clamped to [0, 100] by the caller.
pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);

    let mut bar = String::with_capacity(BAR_WIDTH * 3);
    for _ in 0..filled {
        bar.push(BAR_FILLED);
    }
    for _ in 0..BAR_WIDTH - filled {
        bar.push(BAR_EMPTY);
    }
    format!("[{bar}] {percent:.0}%")
}

/// Extract a project id from a loadCodeAssist project reference
///
/// The field shows up either as a bare project-id string or as an
/// object carrying an `id`; anything else means no identifier is
/// available, which is not an error.
pub fn extract_project_id(project: &serde_json::Value) -> Option<String> {
    match project {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => match map.get("id") {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Some(id.clone()),
            _ => None,
        },
        _ => None,
    }
}
