use pipewatch_types::{SupervisorError, SupervisorResult};
use serde_yaml::Value;
use tracing::warn;

/// Keys honored from the project config file. Anything else in the file is ignored.
pub const RECOGNIZED_KEYS: [&str; 8] = [
    "poll_interval_seconds",
    "max_restarts",
    "stall_timeout_minutes",
    "backoff_minutes",
    "project_name",
    "bot_token",
    "chat_id",
    "pipeline_script",
];

/// Settings pulled out of the shared project config file.
///
/// The file belongs to the pipeline as a whole, so supervisor keys may sit under any
/// section (`supervisor:`, `telegram:`, ...). The first occurrence of each key in
/// document order wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSettings {
    pub poll_interval_seconds: Option<u64>,
    pub max_restarts: Option<u32>,
    pub stall_timeout_minutes: Option<u64>,
    pub backoff_minutes: Option<Vec<u64>>,
    pub project_name: Option<String>,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub pipeline_script: Option<String>,
}

impl FileSettings {
    pub fn parse(contents: &str) -> SupervisorResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = serde_yaml::from_str(contents)
            .map_err(|e| SupervisorError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(Self {
            poll_interval_seconds: lookup(&document, "poll_interval_seconds").and_then(|v| as_number("poll_interval_seconds", v)),
            max_restarts: lookup(&document, "max_restarts")
                .and_then(|v| as_number("max_restarts", v))
                .and_then(|n| u32::try_from(n).ok()),
            stall_timeout_minutes: lookup(&document, "stall_timeout_minutes").and_then(|v| as_number("stall_timeout_minutes", v)),
            backoff_minutes: lookup(&document, "backoff_minutes").and_then(as_number_list),
            project_name: lookup(&document, "project_name").and_then(as_text),
            bot_token: lookup(&document, "bot_token").and_then(as_text),
            chat_id: lookup(&document, "chat_id").and_then(as_text),
            pipeline_script: lookup(&document, "pipeline_script").and_then(as_text),
        })
    }
}

fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Mapping(map) => {
            for (k, v) in map {
                if k.as_str() == Some(key) && !v.is_null() {
                    return Some(v);
                }
                if let Some(found) = lookup(v, key) {
                    return Some(found);
                }
            }
            None
        }
        Value::Sequence(items) => items.iter().find_map(|item| lookup(item, key)),
        Value::Tagged(tagged) => lookup(&tagged.value, key),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    // Unexpanded `${VAR}` placeholders are left for the environment to fill.
    if text.is_empty() || (text.starts_with("${") && text.ends_with('}')) {
        None
    } else {
        Some(text)
    }
}

fn as_number(key: &str, value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if parsed.is_none() {
        warn!("Ignoring non-numeric value for '{}' in config file", key);
    }
    parsed
}

fn as_number_list(value: &Value) -> Option<Vec<u64>> {
    let values: Option<Vec<u64>> = match value {
        Value::Sequence(items) => items.iter().map(|v| as_number("backoff_minutes", v)).collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().parse().ok())
            .collect(),
        Value::Number(n) => n.as_u64().map(|n| vec![n]),
        _ => None,
    };
    values.filter(|list| !list.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_keys_are_found() {
        let yaml = r#"
project:
  name: crm
supervisor:
  poll_interval_seconds: 15
  max_restarts: "5"
  stall_timeout_minutes: 45
  backoff_minutes: [1, 2, 4]
  project_name: "CRM Builder"
telegram:
  bot_token: 123:abc
  chat_id: -100987
"#;
        let settings = FileSettings::parse(yaml).unwrap();
        assert_eq!(settings.poll_interval_seconds, Some(15));
        assert_eq!(settings.max_restarts, Some(5));
        assert_eq!(settings.stall_timeout_minutes, Some(45));
        assert_eq!(settings.backoff_minutes, Some(vec![1, 2, 4]));
        assert_eq!(settings.project_name.as_deref(), Some("CRM Builder"));
        assert_eq!(settings.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(settings.chat_id.as_deref(), Some("-100987"));
        assert_eq!(settings.pipeline_script, None);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let settings = FileSettings::parse("retries: 9\nmodel: opus\n").unwrap();
        assert_eq!(settings, FileSettings::default());
    }

    #[test]
    fn test_placeholders_and_garbage_skipped() {
        let yaml = "bot_token: ${TELEGRAM_BOT_TOKEN}\nmax_restarts: lots\n";
        let settings = FileSettings::parse(yaml).unwrap();
        assert_eq!(settings.bot_token, None);
        assert_eq!(settings.max_restarts, None);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let yaml = "a:\n  max_restarts: 2\nb:\n  max_restarts: 7\n";
        assert_eq!(FileSettings::parse(yaml).unwrap().max_restarts, Some(2));
    }

    #[test]
    fn test_empty_and_invalid_documents() {
        assert_eq!(FileSettings::parse("").unwrap(), FileSettings::default());
        assert!(FileSettings::parse("key: [unclosed").is_err());
    }
}
