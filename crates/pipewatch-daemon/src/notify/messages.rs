use chrono::{DateTime, Utc};
use pipewatch_types::StatusRecord;
use std::time::Duration;

use crate::format::{
    code_span, escape_markdown, format_clock, format_elapsed, format_steps, format_timestamp,
    project_header,
};
use crate::queue::QueueReport;

/// Builds the Markdown texts sent for each supervisor event.
#[derive(Clone, Debug)]
pub struct MessageBuilder {
    project: String,
}

struct Lines(Vec<String>);

impl Lines {
    fn new(header: String) -> Self {
        Self(vec![header, String::new()])
    }

    fn line(mut self, text: impl Into<String>) -> Self {
        self.0.push(text.into());
        self
    }

    fn blank(self) -> Self {
        self.line(String::new())
    }

    fn maybe(self, text: Option<String>) -> Self {
        match text {
            Some(text) => self.line(text),
            None => self,
        }
    }

    fn progress(self, record: &StatusRecord) -> Self {
        self.blank()
            .line("*Progress:*")
            .line(format_steps(&record.progress))
    }

    fn finish(self) -> String {
        self.0.join("\n")
    }
}

fn error_line(record: &StatusRecord) -> Option<String> {
    record
        .error
        .as_ref()
        .map(|e| format!("\n\u{1F4AC} *Error:* {}", escape_markdown(e)))
}

fn exit_code(record: &StatusRecord) -> String {
    record
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

const RESUMING: &str = "\u{1F501} Restarting with `--resume`...";
const MANUAL: &str = "\u{274C} Restart limit reached. Manual intervention required.";

impl MessageBuilder {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    fn start(&self) -> Lines {
        Lines::new(project_header(&self.project))
    }

    pub fn completed(&self, record: &StatusRecord, now: DateTime<Utc>) -> String {
        self.start()
            .line("\u{2705} *Feature completed!*")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!(
                "\u{23F1} *Duration:* {}",
                format_elapsed(record.started_at, record.last_update, now)
            ))
            .line(format!(
                "\u{1F552} *Completed:* {}",
                format_timestamp(record.last_update)
            ))
            .progress(record)
            .finish()
    }

    pub fn failure_restarting(
        &self,
        record: &StatusRecord,
        attempt: u32,
        max: u32,
        now: DateTime<Utc>,
    ) -> String {
        self.start()
            .line("\u{26A0}\u{FE0F} *Pipeline failed*: restarting automatically")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Failed step:* {}", escape_markdown(record.step_name())))
            .line(format!("\u{1F4DF} *Exit code:* {}", exit_code(record)))
            .line(format!("\u{1F504} *Attempt:* {}/{}", attempt, max))
            .line(format!(
                "\u{23F1} *Duration so far:* {}",
                format_elapsed(record.started_at, record.last_update, now)
            ))
            .progress(record)
            .maybe(error_line(record))
            .blank()
            .line(RESUMING)
            .finish()
    }

    pub fn failure_manual(
        &self,
        record: &StatusRecord,
        attempts: u32,
        max: u32,
        now: DateTime<Utc>,
    ) -> String {
        self.start()
            .line("\u{274C} *Pipeline FAILED*: manual intervention required")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Failed step:* {}", escape_markdown(record.step_name())))
            .line(format!("\u{1F4DF} *Exit code:* {}", exit_code(record)))
            .line(format!("\u{1F504} *Attempts:* {}/{} (limit reached)", attempts, max))
            .line(format!(
                "\u{23F1} *Duration:* {}",
                format_elapsed(record.started_at, record.last_update, now)
            ))
            .line(format!("\u{1F552} *Time:* {}", format_timestamp(record.last_update)))
            .progress(record)
            .maybe(error_line(record))
            .finish()
    }

    pub fn token_exhausted(
        &self,
        record: &StatusRecord,
        backoff: Duration,
        level: usize,
        levels: usize,
        schedule_minutes: &[u64],
        now: DateTime<Utc>,
    ) -> String {
        let retry_at = chrono::Duration::from_std(backoff)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        let schedule: Vec<String> = schedule_minutes.iter().map(|m| m.to_string()).collect();

        self.start()
            .line("\u{23F3} *Tokens exhausted*: automatic backoff")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Interrupted step:* {}", escape_markdown(record.step_name())))
            .line(format!(
                "\u{1F504} *Backoff:* {} minutes (level {}/{})",
                backoff.as_secs() / 60,
                level,
                levels
            ))
            .line(format!("\u{23F0} *Next retry:* {}", format_clock(retry_at)))
            .progress(record)
            .blank()
            .line(format!("\u{1F4A1} _Backoff grows: {} min_", schedule.join(", ")))
            .finish()
    }

    pub fn tool_failure(
        &self,
        record: &StatusRecord,
        attempt: u32,
        max: u32,
        restarting: bool,
    ) -> String {
        self.start()
            .line("\u{1F527} *Tool failure*")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Failed step:* {}", escape_markdown(record.step_name())))
            .line(format!("\u{1F504} *Attempt:* {}/{}", attempt, max))
            .progress(record)
            .maybe(error_line(record))
            .blank()
            .line(if restarting { RESUMING } else { MANUAL })
            .finish()
    }

    pub fn fatal(&self, record: &StatusRecord, now: DateTime<Utc>) -> String {
        self.start()
            .line("\u{1F6A8}\u{1F6A8}\u{1F6A8} *FATAL ERROR* \u{1F6A8}\u{1F6A8}\u{1F6A8}")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Failed step:* {}", escape_markdown(record.step_name())))
            .line(format!("\u{1F4DF} *Exit code:* {} (FATAL)", exit_code(record)))
            .line(format!(
                "\u{23F1} *Duration:* {}",
                format_elapsed(record.started_at, record.last_update, now)
            ))
            .line(format!("\u{1F552} *Time:* {}", format_timestamp(record.last_update)))
            .progress(record)
            .maybe(error_line(record))
            .blank()
            .line("\u{26D4} *Pipeline STOPPED: no auto-restart*")
            .line("\u{1F4BE} Emergency git commit under way...")
            .line("\u{1F6E0} Manual intervention required")
            .finish()
    }

    pub fn stalled(
        &self,
        record: &StatusRecord,
        stall_timeout: Duration,
        restarting: bool,
        now: DateTime<Utc>,
    ) -> String {
        self.start()
            .line("\u{23F1} *Pipeline stalled*")
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(record.feature_name())))
            .line(format!("\u{1F6D1} *Stuck step:* {}", escape_markdown(record.step_name())))
            .line(format!(
                "\u{23F1} *Total duration:* {}",
                format_elapsed(record.started_at, None, now)
            ))
            .line(format!("\u{1F552} *Last update:* {}", format_timestamp(record.last_update)))
            .line(format!(
                "\u{1F6AB} *No update for:* {} min",
                stall_timeout.as_secs() / 60
            ))
            .maybe(record.pid.map(|pid| format!("\u{1F480} *PID:* {} (killing...)", pid)))
            .progress(record)
            .blank()
            .line(if restarting {
                "\u{1F501} Kill + restart with `--resume`..."
            } else {
                MANUAL
            })
            .finish()
    }

    pub fn queue_started(&self, items: &[String], now: DateTime<Utc>) -> String {
        let mut lines = self
            .start()
            .line("\u{1F680} *Pipeline queue started*")
            .blank()
            .line(format!("\u{1F4CB} *Queued features:* {}", items.len()));
        for (i, item) in items.iter().enumerate() {
            lines = lines.line(format!("  {}. {}", i + 1, code_span(item)));
        }
        lines
            .blank()
            .line(format!("\u{1F552} *Started:* {}", format_timestamp(Some(now))))
            .finish()
    }

    pub fn queue_item_started(&self, item: &str, index: usize, total: usize) -> String {
        self.start()
            .line(format!("\u{1F3AC} *Starting feature* ({}/{})", index + 1, total))
            .blank()
            .line(format!("\u{1F4CB} *Feature:* {}", code_span(item)))
            .line(format!("\u{1F4CA} *Queue progress:* {}/{} completed", index, total))
            .finish()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn queue_aborted(
        &self,
        item: &str,
        index: usize,
        total: usize,
        record: Option<&StatusRecord>,
        queue_started: DateTime<Utc>,
        remaining: &[String],
        now: DateTime<Utc>,
    ) -> String {
        let mut lines = self
            .start()
            .line("\u{274C} *Pipeline queue STOPPED*")
            .blank()
            .line(format!("\u{1F6D1} *Failed:* {} ({}/{})", code_span(item), index + 1, total))
            .line(format!(
                "\u{1F4DF} *Exit code:* {}",
                record.map(exit_code).unwrap_or_else(|| "unknown".to_string())
            ))
            .line(format!(
                "\u{23F1} *Queue duration:* {}",
                format_elapsed(Some(queue_started), None, now)
            ))
            .maybe(record.and_then(|r| r.error.as_ref()).map(|e| format!("\u{1F4AC} *Error:* {}", escape_markdown(e))))
            .blank()
            .line("*Remaining features not run:*");
        for item in remaining {
            lines = lines.line(format!("  \u{2B1C} {}", code_span(item)));
        }
        lines.finish()
    }

    pub fn queue_finished(
        &self,
        report: &QueueReport,
        queue_started: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> String {
        self.start()
            .line("\u{1F3C1} *Pipeline queue finished*")
            .blank()
            .line(format!(
                "\u{1F4CB} *Features completed:* {}/{}",
                report.completed.len(),
                report.total()
            ))
            .maybe(report.failed.as_ref().map(|f| format!("\u{1F6D1} *Failed:* {}", code_span(f))))
            .line(format!(
                "\u{23F1} *Total duration:* {}",
                format_elapsed(Some(queue_started), None, now)
            ))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pipewatch_types::PipelineStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn failed_record() -> StatusRecord {
        let mut record = StatusRecord::with_status(PipelineStatus::Failed);
        record.exit_code = Some(1);
        record.current_step = Some("DEV".into());
        record.feature = Some("contacts".into());
        record.error = Some("boom".into());
        record.started_at = Some(now() - chrono::Duration::minutes(3));
        record
    }

    #[test]
    fn test_failure_restarting_mentions_attempt() {
        let text = MessageBuilder::new("CRM").failure_restarting(&failed_record(), 2, 3, now());
        assert!(text.starts_with("\u{1F3D7} *CRM*"));
        assert!(text.contains("*Attempt:* 2/3"));
        assert!(text.contains("*Failed step:* DEV"));
        assert!(text.contains("*Error:* boom"));
        assert!(text.contains("*Duration so far:* 3m 0s"));
        assert!(text.contains("--resume"));
    }

    #[test]
    fn test_record_values_are_escaped() {
        let mut record = failed_record();
        record.error = Some("missing field `api_key` in *config*".into());
        record.current_step = Some("DR_IMPL".into());
        record.feature = Some("user_auth`v2".into());

        let text = MessageBuilder::new("CRM").failure_restarting(&record, 1, 3, now());
        assert!(text.contains("*Error:* missing field \\`api\\_key\\` in \\*config\\*"));
        assert!(text.contains("*Failed step:* DR\\_IMPL"));
        assert!(text.contains("*Feature:* `user_auth'v2`"));
    }

    #[test]
    fn test_manual_intervention_wording() {
        let text = MessageBuilder::new("CRM").failure_manual(&failed_record(), 3, 3, now());
        assert!(text.contains("manual intervention required"));
        assert!(text.contains("3/3 (limit reached)"));
    }

    #[test]
    fn test_token_exhausted_lists_schedule() {
        let text = MessageBuilder::new("CRM").token_exhausted(
            &failed_record(),
            Duration::from_secs(600),
            2,
            3,
            &[5, 10, 20],
            now(),
        );
        assert!(text.contains("10 minutes (level 2/3)"));
        assert!(text.contains("_Backoff grows: 5, 10, 20 min_"));
    }

    #[test]
    fn test_stalled_mentions_pid() {
        let mut record = StatusRecord::with_status(PipelineStatus::Running);
        record.pid = Some(4242);
        let text = MessageBuilder::new("CRM").stalled(&record, Duration::from_secs(1800), false, now());
        assert!(text.contains("*PID:* 4242 (killing...)"));
        assert!(text.contains("30 min"));
        assert!(text.contains("Manual intervention required"));
    }

    #[test]
    fn test_queue_aborted_lists_remaining() {
        let text = MessageBuilder::new("CRM").queue_aborted(
            "b",
            1,
            3,
            None,
            now(),
            &["c".to_string()],
            now(),
        );
        assert!(text.contains("`b` (2/3)"));
        assert!(text.contains("*Exit code:* unknown"));
        assert!(text.contains("\u{2B1C} `c`"));
    }
}
