//! Name-based routing of records to storages.

use crate::LogStorage;
use bizlog_common_log::spans::storage_span;
use bizlog_common_thread::catch_panic;
use bizlog_types::{BizLogError, LogRecord, LOG_TARGET};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{trace, warn};

/// Maps storage names to storages and fans records out to them.
///
/// The name table is fixed at construction.
pub struct StorageRouter {
    storages: HashMap<String, Arc<dyn LogStorage>>,
    default_names: Vec<String>,
}

impl StorageRouter {
    /// Build a router over `storages`, each registered under its own name.
    ///
    /// Fails on duplicate storage names and on default names with no storage.
    pub fn new(
        storages: Vec<Arc<dyn LogStorage>>,
        default_names: Vec<String>,
    ) -> Result<Self, BizLogError> {
        let mut table: HashMap<String, Arc<dyn LogStorage>> = HashMap::with_capacity(storages.len());
        for storage in storages {
            let name = storage.name().to_string();
            if table.insert(name.clone(), storage).is_some() {
                return Err(BizLogError::PipelineMisuse(format!(
                    "storage name registered twice: {}",
                    name
                )));
            }
        }

        if default_names.is_empty() {
            return Err(BizLogError::PipelineMisuse(
                "at least one default storage name is required".to_string(),
            ));
        }
        if let Some(missing) = default_names.iter().find(|n| !table.contains_key(n.as_str())) {
            return Err(BizLogError::PipelineMisuse(format!(
                "no storage registered under default name: {}",
                missing
            )));
        }

        Ok(Self {
            storages: table,
            default_names,
        })
    }

    pub fn default_names(&self) -> &[String] {
        &self.default_names
    }

    /// Registered storage names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.storages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LogStorage>> {
        self.storages.get(name)
    }

    /// Resolve requested names to storages.
    ///
    /// No names means the defaults. Duplicates are dropped, keeping first
    /// occurrence order. Any unknown name fails the whole resolution.
    pub fn resolve<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> Result<Vec<Arc<dyn LogStorage>>, BizLogError> {
        let requested: Vec<&str> = if names.is_empty() {
            self.default_names.iter().map(String::as_str).collect()
        } else {
            names.iter().map(|n| n.as_ref()).collect()
        };

        let mut resolved: Vec<Arc<dyn LogStorage>> = Vec::with_capacity(requested.len());
        let mut seen: Vec<&str> = Vec::with_capacity(requested.len());
        for name in requested {
            if seen.contains(&name) {
                continue;
            }
            let storage = self
                .storages
                .get(name)
                .ok_or_else(|| BizLogError::UnknownStorageTarget {
                    name: name.to_string(),
                })?;
            seen.push(name);
            resolved.push(Arc::clone(storage));
        }
        Ok(resolved)
    }

    /// Store a record in every requested storage.
    ///
    /// Names are validated before any storage runs. A failing (or panicking)
    /// storage does not stop the others; failures are reported together once
    /// all storages have run.
    pub fn store<S: AsRef<str>>(&self, record: &LogRecord, names: &[S]) -> Result<(), BizLogError> {
        let storages = self.resolve(names)?;

        let mut failures = Vec::new();
        for storage in &storages {
            let _span = storage_span(storage.name()).entered();
            let result = catch_panic(AssertUnwindSafe(|| storage.do_store(record)))
                .unwrap_or_else(|panic| {
                    Err(BizLogError::storage_write(
                        storage.name(),
                        format!("panicked: {}", panic),
                    ))
                });
            match result {
                Ok(()) => {
                    trace!(target: LOG_TARGET, storage = storage.name(), record = %record.id, "stored")
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, storage = storage.name(), error = %e, "storage failed");
                    failures.push((storage.name().to_string(), e));
                }
            }
        }

        combine(failures)
    }
}

/// A lone failure is returned as-is; several are folded into one
/// `StorageWrite` naming every failing storage.
fn combine(mut failures: Vec<(String, BizLogError)>) -> Result<(), BizLogError> {
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0).1),
        _ => {
            let (storages, messages): (Vec<String>, Vec<String>) = failures
                .into_iter()
                .map(|(name, e)| (name, e.to_string()))
                .unzip();
            Err(BizLogError::storage_write(
                storages.join(", "),
                messages.join("; "),
            ))
        }
    }
}

impl std::fmt::Debug for StorageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRouter")
            .field("storages", &self.names())
            .field("default_names", &self.default_names)
            .finish()
    }
}
