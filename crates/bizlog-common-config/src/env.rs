//! Environment variable handling.

use crate::types::BizLogConfig;
use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    pub const BIZLOG_CONFIG_PATH: &str = "BIZLOG_CONFIG_PATH";
    pub const BIZLOG_ENABLED: &str = "BIZLOG_ENABLED";
    pub const BIZLOG_STORAGE_NAMES: &str = "BIZLOG_STORAGE_NAMES";
    pub const BIZLOG_ASYNC_CORE_POOL_SIZE: &str = "BIZLOG_ASYNC_CORE_POOL_SIZE";
    pub const BIZLOG_ASYNC_MAX_POOL_SIZE: &str = "BIZLOG_ASYNC_MAX_POOL_SIZE";
    pub const BIZLOG_ASYNC_QUEUE_CAPACITY: &str = "BIZLOG_ASYNC_QUEUE_CAPACITY";
    pub const BIZLOG_PARSER_FALLBACK_TO_PLAIN: &str = "BIZLOG_PARSER_FALLBACK_TO_PLAIN";
    pub const BIZLOG_EXPRESSION_ENABLED: &str = "BIZLOG_EXPRESSION_ENABLED";
}

/// Environment access helpers.
pub struct Environment {
    _guard: (), // Prevent construction outside module
}

impl Environment {
    /// Initialize environment from .env files.
    pub fn init() -> Result<Self, EnvError> {
        // Later files override earlier ones
        let _ = dotenvy::from_filename(".env");
        let _ = dotenvy::from_filename(".env.local");

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get a variable with a default value.
    pub fn get_or(var: &str, default: &str) -> String {
        env::var(var).unwrap_or_else(|_| default.to_string())
    }

    /// Get a boolean variable; unrecognized spellings are an error.
    pub fn get_bool(var: &str) -> Result<Option<bool>, EnvError> {
        match env::var(var) {
            Ok(v) => match v.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(EnvError::InvalidValue {
                    var: var.to_string(),
                    message: format!("expected boolean, got '{}'", v),
                }),
            },
            Err(_) => Ok(None),
        }
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got '{}'", v),
            }),
            Err(_) => Ok(None),
        }
    }

    /// Get a comma-separated list, skipping blank entries.
    pub fn get_list(var: &str) -> Option<Vec<String>> {
        env::var(var).ok().map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

impl BizLogConfig {
    /// Override values from `BIZLOG_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), EnvError> {
        if let Some(enabled) = Environment::get_bool(vars::BIZLOG_ENABLED)? {
            self.enabled = enabled;
        }
        if let Some(names) = Environment::get_list(vars::BIZLOG_STORAGE_NAMES) {
            if names.is_empty() {
                return Err(EnvError::InvalidValue {
                    var: vars::BIZLOG_STORAGE_NAMES.to_string(),
                    message: "expected at least one storage name".to_string(),
                });
            }
            self.storage_names = names;
        }
        if let Some(core) = Environment::get_int(vars::BIZLOG_ASYNC_CORE_POOL_SIZE)? {
            self.async_pool.core_pool_size = core;
        }
        if let Some(max) = Environment::get_int(vars::BIZLOG_ASYNC_MAX_POOL_SIZE)? {
            self.async_pool.max_pool_size = max;
        }
        if let Some(capacity) = Environment::get_int(vars::BIZLOG_ASYNC_QUEUE_CAPACITY)? {
            self.async_pool.queue_capacity = capacity;
        }
        if let Some(fallback) = Environment::get_bool(vars::BIZLOG_PARSER_FALLBACK_TO_PLAIN)? {
            self.parser.fallback_to_plain = fallback;
        }
        if let Some(enabled) = Environment::get_bool(vars::BIZLOG_EXPRESSION_ENABLED)? {
            self.parser.expression.enabled = enabled;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_get_or_default() {
        let val = Environment::get_or("BIZLOG_NONEXISTENT_VAR_12345", "default");
        assert_eq!(val, "default");
    }

    #[test]
    #[serial]
    fn test_bool_parsing() {
        env::set_var("BIZLOG_TEST_BOOL", "true");
        assert_eq!(Environment::get_bool("BIZLOG_TEST_BOOL").unwrap(), Some(true));
        env::set_var("BIZLOG_TEST_BOOL", "0");
        assert_eq!(Environment::get_bool("BIZLOG_TEST_BOOL").unwrap(), Some(false));
        env::set_var("BIZLOG_TEST_BOOL", "maybe");
        assert!(Environment::get_bool("BIZLOG_TEST_BOOL").is_err());
        env::remove_var("BIZLOG_TEST_BOOL");
        assert_eq!(Environment::get_bool("BIZLOG_TEST_BOOL").unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_integer_parsing() {
        env::set_var("BIZLOG_TEST_INT", "42");
        let val: Result<Option<i32>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert_eq!(val.unwrap(), Some(42));

        env::set_var("BIZLOG_TEST_INT", "invalid");
        let val: Result<Option<i32>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert!(val.is_err());

        env::remove_var("BIZLOG_TEST_INT");
        let val: Result<Option<i32>, _> = Environment::get_int("BIZLOG_TEST_INT");
        assert_eq!(val.unwrap(), None);
    }

    #[test]
    #[serial]
    fn test_apply_env_overrides() {
        env::set_var(vars::BIZLOG_ENABLED, "false");
        env::set_var(vars::BIZLOG_STORAGE_NAMES, "console, file ,");
        env::set_var(vars::BIZLOG_ASYNC_CORE_POOL_SIZE, "2");
        env::set_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE, "3");
        env::set_var(vars::BIZLOG_ASYNC_QUEUE_CAPACITY, "16");
        env::set_var(vars::BIZLOG_PARSER_FALLBACK_TO_PLAIN, "no");
        env::set_var(vars::BIZLOG_EXPRESSION_ENABLED, "off");

        let mut config = BizLogConfig::default();
        let result = config.apply_env();

        for var in [
            vars::BIZLOG_ENABLED,
            vars::BIZLOG_STORAGE_NAMES,
            vars::BIZLOG_ASYNC_CORE_POOL_SIZE,
            vars::BIZLOG_ASYNC_MAX_POOL_SIZE,
            vars::BIZLOG_ASYNC_QUEUE_CAPACITY,
            vars::BIZLOG_PARSER_FALLBACK_TO_PLAIN,
            vars::BIZLOG_EXPRESSION_ENABLED,
        ] {
            env::remove_var(var);
        }

        result.unwrap();
        assert!(!config.enabled);
        assert_eq!(config.storage_names, vec!["console", "file"]);
        assert_eq!(config.async_pool.core_pool_size, 2);
        assert_eq!(config.async_pool.max_pool_size, 3);
        assert_eq!(config.async_pool.queue_capacity, 16);
        assert!(!config.parser.fallback_to_plain);
        assert!(!config.parser.expression.enabled);
    }

    #[test]
    #[serial]
    fn test_apply_env_rejects_bad_number() {
        env::set_var(vars::BIZLOG_ASYNC_QUEUE_CAPACITY, "lots");
        let mut config = BizLogConfig::default();
        let result = config.apply_env();
        env::remove_var(vars::BIZLOG_ASYNC_QUEUE_CAPACITY);

        match result {
            Err(EnvError::InvalidValue { var, .. }) => {
                assert_eq!(var, vars::BIZLOG_ASYNC_QUEUE_CAPACITY)
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_environment_init() {
        assert!(Environment::init().is_ok());
    }
}
