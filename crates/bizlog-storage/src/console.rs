//! Console storage: records go to the `biz-log` tracing target.

use crate::LogStorage;
use bizlog_common_config::{RecordLevel, DEFAULT_STORAGE_NAME};
use bizlog_types::{BizLogError, LogRecord, ThrownError, LOG_TARGET};
use chrono::Local;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

/// Writes each record as one human-readable line through `tracing`.
#[derive(Debug, Clone)]
pub struct ConsoleStorage {
    name: String,
    level: RecordLevel,
}

impl ConsoleStorage {
    /// Console storage under the default name.
    pub fn new(level: RecordLevel) -> Self {
        Self::named(DEFAULT_STORAGE_NAME, level)
    }

    pub fn named(name: impl Into<String>, level: RecordLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn level(&self) -> RecordLevel {
        self.level
    }
}

impl Default for ConsoleStorage {
    fn default() -> Self {
        Self::new(RecordLevel::default())
    }
}

impl LogStorage for ConsoleStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn store(&self, record: &LogRecord) -> Result<(), BizLogError> {
        let line = format_record(record);
        match self.level {
            RecordLevel::Trace => trace!(target: LOG_TARGET, "{}", line),
            RecordLevel::Debug => debug!(target: LOG_TARGET, "{}", line),
            RecordLevel::Info => info!(target: LOG_TARGET, "{}", line),
            RecordLevel::Warn => warn!(target: LOG_TARGET, "{}", line),
            RecordLevel::Error => error!(target: LOG_TARGET, "{}", line),
        }
        Ok(())
    }

    fn handle_error(&self, thrown: &ThrownError) {
        error!(target: LOG_TARGET, "【操作日志】发生异常: {}", thrown.message);
    }
}

/// Render a record as a single console line.
pub fn format_record(record: &LogRecord) -> String {
    let description = match record.action.description() {
        "" => "未指定",
        d => d,
    };
    let content = match record.content.as_str() {
        "" => "无",
        c => c,
    };
    let time = record
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S");

    let mut line = format!(
        "【操作日志】 | 操作类型: {} | 操作内容: {} | 操作时间: {}",
        description, content, time
    );

    if !record.extra.is_empty() {
        let extra: Vec<String> = record
            .extra
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value_text(value)))
            .collect();
        line.push_str(" | 扩展信息: ");
        line.push_str(&extra.join(" , "));
    }
    line
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizlog_types::{Action, StdAction};
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    #[test]
    fn test_format_record_with_extras() {
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let record = LogRecord::builder(StdAction::Delete.into())
            .content("user 42 removed")
            .extra("operator", "ann")
            .extra("count", 3)
            .timestamp(timestamp)
            .build();

        let expected_time = timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        assert_eq!(
            format_record(&record),
            format!(
                "【操作日志】 | 操作类型: 删除 | 操作内容: user 42 removed | 操作时间: {} | 扩展信息: operator: ann , count: 3",
                expected_time
            )
        );
    }

    #[test]
    fn test_format_record_placeholders() {
        let record = LogRecord::new(Action::new("CUSTOM", ""), "");
        let line = format_record(&record);
        assert!(line.contains("操作类型: 未指定"));
        assert!(line.contains("操作内容: 无"));
        assert!(!line.contains("扩展信息"));
    }

    #[test_case(RecordLevel::Trace ; "trace")]
    #[test_case(RecordLevel::Debug ; "debug")]
    #[test_case(RecordLevel::Info ; "info")]
    #[test_case(RecordLevel::Warn ; "warn")]
    #[test_case(RecordLevel::Error ; "error")]
    fn test_console_stores_at_every_level(level: RecordLevel) {
        let storage = ConsoleStorage::named("ops-console", level);
        assert_eq!(storage.name(), "ops-console");
        assert_eq!(storage.level(), level);
        assert!(storage
            .store(&LogRecord::new(StdAction::Login.into(), "ann"))
            .is_ok());
    }

    #[test]
    fn test_console_stores_records_with_errors() {
        let storage = ConsoleStorage::default();
        let record = LogRecord::builder(StdAction::Update.into())
            .content("x")
            .thrown(Some(ThrownError::new("Timeout", "slow")))
            .build();

        assert_eq!(storage.name(), "console");
        assert!(storage.should_store_on_error(record.thrown.as_ref().unwrap()));
        assert!(storage.do_store(&record).is_ok());
    }
}
