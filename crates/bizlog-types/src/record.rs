//! The finalized log record.

use crate::{Action, RecordId, ThrownError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rendered business log record, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record identifier.
    pub id: RecordId,
    /// Resolved action.
    pub action: Action,
    /// Rendered content.
    pub content: String,
    /// Error raised by the audited operation, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thrown: Option<ThrownError>,
    /// Additional key/values; may be annotated by an error handler.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, Value>,
    /// When the record was assembled.
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Create a record with no error and no extras.
    pub fn new(action: Action, content: impl Into<String>) -> Self {
        Self::builder(action).content(content).build()
    }

    /// Create a new record builder.
    pub fn builder(action: Action) -> LogRecordBuilder {
        LogRecordBuilder::new(action)
    }

    /// Whether the audited operation failed.
    pub fn has_error(&self) -> bool {
        self.thrown.is_some()
    }
}

/// Builder for [`LogRecord`].
#[derive(Debug)]
pub struct LogRecordBuilder {
    action: Action,
    content: String,
    thrown: Option<ThrownError>,
    extra: IndexMap<String, Value>,
    timestamp: Option<DateTime<Utc>>,
}

impl LogRecordBuilder {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            content: String::new(),
            thrown: None,
            extra: IndexMap::new(),
            timestamp: None,
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn thrown(mut self, thrown: Option<ThrownError>) -> Self {
        self.thrown = thrown;
        self
    }

    /// Add an extra key/value.
    pub fn extra(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(json) = serde_json::to_value(value) {
            self.extra.insert(key.into(), json);
        }
        self
    }

    /// Add every key/value of a map.
    pub fn extras(mut self, extra: IndexMap<String, Value>) -> Self {
        self.extra.extend(extra);
        self
    }

    /// Override the timestamp (defaults to now).
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Build the record.
    pub fn build(self) -> LogRecord {
        LogRecord {
            id: RecordId::new(),
            action: self.action,
            content: self.content,
            thrown: self.thrown,
            extra: self.extra,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}
