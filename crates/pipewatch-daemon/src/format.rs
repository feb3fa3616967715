//! Human-readable rendering shared by notifications and `--status`.

use chrono::{DateTime, Local, Utc};
use pipewatch_types::Progress;

pub const NOT_AVAILABLE: &str = "N/A";

const STEP_DONE: &str = "\u{2705}";
const STEP_PENDING: &str = "\u{2B1C}";

/// `45s`, `3m 5s`, `2h 10m`. Negative spans render as `0s`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, seconds % 60);
    }
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Elapsed time from `started` to `ended`, or to `now` when the run has not ended.
pub fn format_elapsed(
    started: Option<DateTime<Utc>>,
    ended: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> String {
    match started {
        Some(start) => format_duration((ended.unwrap_or(now) - start).num_seconds()),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%d/%m %H:%M:%S").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

pub fn format_clock(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

/// One line per step, ticked when completed.
pub fn format_steps(progress: &Progress) -> String {
    progress
        .steps
        .iter()
        .map(|step| {
            let mark = if progress.is_completed(step) { STEP_DONE } else { STEP_PENDING };
            format!("{} {}", mark, escape_markdown(step))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn project_header(label: &str) -> String {
    format!("\u{1F3D7} *{}*", escape_markdown(label))
}

/// Backslash-escapes the characters Telegram's legacy Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inline code span. Escapes do not work inside one, so backticks are swapped out.
pub fn code_span(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_markdown_escaping() {
        assert_eq!(escape_markdown("bad_token *x* [y] `z`"), "bad\\_token \\*x\\* \\[y] \\`z\\`");
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(code_span("snake_case"), "`snake_case`");
        assert_eq!(code_span("a`b"), "`a'b`");
        assert_eq!(project_header("my_crm"), "\u{1F3D7} *my\\_crm*");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(185), "3m 5s");
        assert_eq!(format_duration(2 * 3600 + 10 * 60 + 59), "2h 10m");
        assert_eq!(format_duration(-3), "0s");
    }

    #[test]
    fn test_format_elapsed() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 10, 4, 30).unwrap();
        assert_eq!(format_elapsed(Some(start), Some(end), end), "4m 30s");
        assert_eq!(format_elapsed(Some(start), None, end), "4m 30s");
        assert_eq!(format_elapsed(None, Some(end), end), NOT_AVAILABLE);
    }

    #[test]
    fn test_format_timestamp_missing() {
        assert_eq!(format_timestamp(None), NOT_AVAILABLE);
    }

    #[test]
    fn test_format_steps() {
        let progress = Progress {
            steps: vec!["PM".into(), "DEV".into()],
            completed: vec!["PM".into()],
        };
        assert_eq!(format_steps(&progress), "\u{2705} PM\n\u{2B1C} DEV");
    }

    #[test]
    fn test_project_header() {
        assert_eq!(project_header("CRM"), "\u{1F3D7} *CRM*");
    }
}
