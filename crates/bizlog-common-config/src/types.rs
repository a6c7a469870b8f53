//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name under which the console storage is registered.
pub const DEFAULT_STORAGE_NAME: &str = "console";

/// Name under which the file storage is registered when enabled.
pub const FILE_STORAGE_NAME: &str = "file";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BizLogConfig {
    /// Global switch; when off, interception becomes a pass-through.
    pub enabled: bool,
    /// Storage targets used when a caller names none.
    pub storage_names: Vec<String>,
    /// Asynchronous dispatch pool.
    pub async_pool: AsyncPoolConfig,
    /// Template parsing.
    pub parser: ParserConfig,
    /// Console storage.
    pub console: ConsoleConfig,
    /// File storage.
    pub file: FileConfig,
}

impl Default for BizLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_names: vec![DEFAULT_STORAGE_NAME.to_string()],
            async_pool: AsyncPoolConfig::default(),
            parser: ParserConfig::default(),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

/// Worker pool backing asynchronous dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncPoolConfig {
    /// Workers kept alive for the life of the pool.
    pub core_pool_size: usize,
    /// Upper bound on workers under load.
    pub max_pool_size: usize,
    /// Bounded queue length before extra workers (then the caller) take over.
    pub queue_capacity: usize,
    /// Worker thread name prefix.
    pub thread_name_prefix: String,
    /// Graceful shutdown wait (seconds).
    pub await_termination_secs: u64,
}

impl AsyncPoolConfig {
    /// Shutdown drain timeout.
    pub fn await_termination(&self) -> Duration {
        Duration::from_secs(self.await_termination_secs)
    }
}

impl Default for AsyncPoolConfig {
    fn default() -> Self {
        Self {
            core_pool_size: 4,
            max_pool_size: 8,
            queue_capacity: 200,
            thread_name_prefix: "biz-log-".to_string(),
            await_termination_secs: 30,
        }
    }
}

/// Template parser chain configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Return the raw template when a parser fails instead of raising.
    pub fallback_to_plain: bool,
    /// Expression parser.
    pub expression: ExpressionConfig,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fallback_to_plain: true,
            expression: ExpressionConfig::default(),
        }
    }
}

/// Expression parser and its compiled-expression cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Register the expression parser in the chain.
    pub enabled: bool,
    /// Maximum number of cached compiled templates.
    pub cache_size: usize,
    /// Expiry after last access (seconds).
    pub cache_ttl_secs: u64,
}

impl ExpressionConfig {
    /// Access-based expiry for cache entries.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_size: 100,
            cache_ttl_secs: 120,
        }
    }
}

/// Level at which the console storage emits records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl RecordLevel {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Console storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Emission level.
    pub level: RecordLevel,
}

/// File storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Register the file storage.
    pub enabled: bool,
    /// JSON-lines output path.
    pub path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("biz-log.jsonl"),
        }
    }
}
