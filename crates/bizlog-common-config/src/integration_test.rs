use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use super::*;

#[test]
#[serial]
fn test_full_config_loading_workflow() {
    env::set_var("BIZLOG_IT_QUEUE", "64");
    env::set_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE, "12");

    let dir = tempdir().unwrap();
    let path = dir.path().join("biz-log.yaml");

    let config_content = r#"
enabled: true
storage_names: [console]
async_pool:
  core_pool_size: 6
  max_pool_size: 6
  queue_capacity: ${BIZLOG_IT_QUEUE}
  await_termination_secs: ${BIZLOG_IT_AWAIT:-5}
parser:
  expression:
    cache_ttl_secs: 30
"#;
    fs::write(&path, config_content).unwrap();

    let mut config = ConfigLoader::new(&path).load().unwrap();
    let env_result = config.apply_env();

    env::remove_var("BIZLOG_IT_QUEUE");
    env::remove_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE);

    env_result.unwrap();
    validate(&config).unwrap();

    assert_eq!(config.async_pool.core_pool_size, 6);
    assert_eq!(config.async_pool.max_pool_size, 12);
    assert_eq!(config.async_pool.queue_capacity, 64);
    assert_eq!(config.async_pool.await_termination(), std::time::Duration::from_secs(5));
    assert_eq!(config.parser.expression.cache_ttl(), std::time::Duration::from_secs(30));
    assert_eq!(config.storage_names, vec![DEFAULT_STORAGE_NAME]);
}

#[test]
fn test_env_override_can_break_validation() {
    let mut config = BizLogConfig::default();
    config.async_pool.max_pool_size = 2;
    config.async_pool.core_pool_size = 3;
    assert!(matches!(
        validate(&config),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
#[serial]
fn test_config_path_and_overrides_from_env() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.yaml");
    fs::write(&path, "storage_names: [console, file]\nasync_pool:\n  core_pool_size: 2\n  max_pool_size: 2\n").unwrap();

    env::set_var(vars::BIZLOG_CONFIG_PATH, &path);
    env::set_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE, "5");
    let loaded = ConfigLoader::from_env().and_then(|loader| {
        assert_eq!(loader.path(), path.as_path());
        loader.load_with_env()
    });
    env::set_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE, "1");
    let invalid = ConfigLoader::from_env().and_then(|loader| loader.load_with_env());
    env::remove_var(vars::BIZLOG_CONFIG_PATH);
    env::remove_var(vars::BIZLOG_ASYNC_MAX_POOL_SIZE);

    let config = loaded.unwrap();
    assert_eq!(config.storage_names, vec![DEFAULT_STORAGE_NAME, FILE_STORAGE_NAME]);
    assert_eq!(config.async_pool.core_pool_size, 2);
    assert_eq!(config.async_pool.max_pool_size, 5);
    assert!(matches!(invalid, Err(ConfigError::ValidationError { .. })));

    let fallback = ConfigLoader::from_env().unwrap();
    assert_eq!(fallback.path(), Path::new(DEFAULT_CONFIG_PATH));
}

#[test]
#[serial]
fn test_bad_env_override_surfaces_through_loader() {
    let dir = tempdir().unwrap();
    env::set_var(vars::BIZLOG_ENABLED, "sometimes");
    let result = ConfigLoader::new(dir.path().join("absent.yaml")).load_with_env();
    env::remove_var(vars::BIZLOG_ENABLED);

    assert!(matches!(result, Err(ConfigError::Env(EnvError::InvalidValue { .. }))));
}
