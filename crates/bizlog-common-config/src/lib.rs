//! Configuration types for the biz-log pipeline.
//!
//! The pipeline consumes a [`BizLogConfig`] as plain values. It can be built in
//! code, loaded from a YAML file with [`ConfigLoader`], and overridden from
//! `BIZLOG_*` environment variables with [`BizLogConfig::apply_env`].

pub mod types;
pub mod loader;
pub mod env;

#[cfg(test)]
mod integration_test;

pub use types::*;
pub use loader::*;
pub use env::*;
