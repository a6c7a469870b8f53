//! Configuration file loading and parsing.

use crate::env::{vars, EnvError, Environment};
use crate::types::BizLogConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config: {source}")]
    ReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    ParseError { line: Option<usize>, message: String },

    #[error("validation error: {message}")]
    ValidationError { message: String },

    #[error("environment variable not found: {var}")]
    EnvVarNotFound { var: String },

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Config file used when `BIZLOG_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "biz-log.yaml";

/// Configuration loader.
pub struct ConfigLoader {
    path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given YAML file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Loader for the file named by `BIZLOG_CONFIG_PATH`, read after any
    /// `.env` / `.env.local` files, or [`DEFAULT_CONFIG_PATH`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Environment::init()?;
        Ok(Self::new(Environment::get_or(
            vars::BIZLOG_CONFIG_PATH,
            DEFAULT_CONFIG_PATH,
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file, apply `BIZLOG_*` overrides and validate the result.
    pub fn load_with_env(&self) -> Result<BizLogConfig, ConfigError> {
        let mut config = self.load()?;
        config.apply_env()?;
        validate(&config)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load(&self) -> Result<BizLogConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(BizLogConfig::default());
        }
        self.load_required()
    }

    /// Load configuration, failing when the file is absent.
    pub fn load_required(&self) -> Result<BizLogConfig, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound {
                path: self.path.clone(),
            });
        }

        let contents = std::fs::read_to_string(&self.path)?;
        parse_str(&contents)
    }

    /// Save configuration to file.
    pub fn save(&self, config: &BizLogConfig) -> Result<(), ConfigError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::ParseError {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(&self.path, yaml)?;
        Ok(())
    }
}

/// Parse and validate configuration from YAML text.
pub fn parse_str(contents: &str) -> Result<BizLogConfig, ConfigError> {
    let expanded = expand_env_vars(contents)?;

    let config: BizLogConfig =
        serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

    validate(&config)?;
    Ok(config)
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").map_err(|e| {
        ConfigError::ValidationError {
            message: e.to_string(),
        }
    })?;

    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let default = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name.as_str()) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var: var_name.as_str().to_string(),
                    })
                }
            },
        };

        result.push_str(&content[last..full_match.start()]);
        result.push_str(&value);
        last = full_match.end();
    }

    result.push_str(&content[last..]);
    Ok(result)
}

/// Validate configuration values.
pub fn validate(config: &BizLogConfig) -> Result<(), ConfigError> {
    if config.storage_names.is_empty() || config.storage_names.iter().any(|n| n.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            message: "storage_names must list at least one non-empty name".to_string(),
        });
    }

    let pool = &config.async_pool;
    if pool.core_pool_size == 0 {
        return Err(ConfigError::ValidationError {
            message: "async_pool.core_pool_size must be greater than 0".to_string(),
        });
    }

    if pool.max_pool_size < pool.core_pool_size {
        return Err(ConfigError::ValidationError {
            message: format!(
                "async_pool.max_pool_size ({}) must be >= core_pool_size ({})",
                pool.max_pool_size, pool.core_pool_size
            ),
        });
    }

    if config.parser.expression.cache_size == 0 {
        return Err(ConfigError::ValidationError {
            message: "parser.expression.cache_size must be greater than 0".to_string(),
        });
    }

    Ok(())
}
