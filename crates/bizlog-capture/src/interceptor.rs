//! Explicit interception of audited operations.

use crate::manager::{BizLogManager, ACTION_CODE_KEY};
use bizlog_types::{codes, MethodSignature, ParseContext, ThrownError, LOG_TARGET};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{trace, warn};

/// Declares how one operation is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct BizLogDescriptor {
    /// Content template, rendered by the parser chain.
    pub template: String,
    pub action_code: String,
    pub asynchronous: bool,
    /// Target storages; empty means the configured defaults.
    pub storage_names: Vec<String>,
    /// Literal extras; values may themselves be templates.
    pub extras: IndexMap<String, String>,
}

impl BizLogDescriptor {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            action_code: codes::OTHER.to_string(),
            asynchronous: true,
            storage_names: Vec::new(),
            extras: IndexMap::new(),
        }
    }

    pub fn action(mut self, code: impl Into<String>) -> Self {
        self.action_code = code.into();
        self
    }

    pub fn asynchronous(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    pub fn storage(mut self, name: impl Into<String>) -> Self {
        self.storage_names.push(name.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Supplies ambient extras (operator, tenant, trace id) once per capture.
pub trait ExtraValueSupplier: Send + Sync {
    fn extra_values(&self) -> IndexMap<String, Value>;
}

impl<F> ExtraValueSupplier for F
where
    F: Fn() -> IndexMap<String, Value> + Send + Sync,
{
    fn extra_values(&self) -> IndexMap<String, Value> {
        self()
    }
}

/// Wraps operations so each call is recorded through the manager.
pub struct BizLogInterceptor {
    manager: Arc<BizLogManager>,
    supplier: Option<Arc<dyn ExtraValueSupplier>>,
    enabled: bool,
}

impl BizLogInterceptor {
    pub fn new(manager: Arc<BizLogManager>, enabled: bool) -> Self {
        Self {
            manager,
            supplier: None,
            enabled,
        }
    }

    pub fn with_supplier(mut self, supplier: Arc<dyn ExtraValueSupplier>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run `op` and record the call, successful or not.
    ///
    /// The result of `op` is returned unchanged. A failure to record is
    /// logged and never replaces it.
    pub fn intercept<T, E, F>(
        &self,
        descriptor: &BizLogDescriptor,
        method: MethodSignature,
        args: IndexMap<String, Value>,
        op: F,
    ) -> Result<T, E>
    where
        T: Serialize,
        E: std::error::Error,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.enabled {
            return op();
        }

        let outcome = op();
        let ctx = self.context(descriptor, method, args, &outcome);
        if let Err(e) = self.manager.record_template(
            &descriptor.template,
            &ctx,
            descriptor.asynchronous,
            descriptor.storage_names.as_slice(),
        ) {
            warn!(
                target: LOG_TARGET,
                method = %ctx.method(),
                action = %descriptor.action_code,
                error = %e,
                "failed to record business log"
            );
        } else {
            trace!(target: LOG_TARGET, method = %ctx.method(), "business log dispatched");
        }
        outcome
    }

    fn context<T: Serialize, E: std::error::Error>(
        &self,
        descriptor: &BizLogDescriptor,
        method: MethodSignature,
        args: IndexMap<String, Value>,
        outcome: &Result<T, E>,
    ) -> ParseContext {
        let (ret, thrown) = match outcome {
            Ok(value) => (serde_json::to_value(value).ok(), None),
            Err(e) => (None, Some(ThrownError::from_error(e))),
        };

        let mut builder = ParseContext::builder(method)
            .args(args)
            .ret_value(ret)
            .thrown(thrown)
            .extra(ACTION_CODE_KEY, descriptor.action_code.as_str());
        if let Some(supplier) = &self.supplier {
            for (key, value) in supplier.extra_values() {
                builder = builder.extra(key, value);
            }
        }
        for (key, value) in &descriptor.extras {
            builder = builder.extra(key.as_str(), value.as_str());
        }
        builder.build()
    }
}

impl std::fmt::Debug for BizLogInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BizLogInterceptor")
            .field("enabled", &self.enabled)
            .field("supplier", &self.supplier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = BizLogDescriptor::new("removed #{#id}")
            .action("DELETE")
            .asynchronous(false)
            .storage("console")
            .storage("file")
            .extra("operator", "#{#user}");

        assert_eq!(descriptor.action_code, "DELETE");
        assert!(!descriptor.asynchronous);
        assert_eq!(descriptor.storage_names, vec!["console", "file"]);
        assert_eq!(descriptor.extras["operator"], "#{#user}");
    }

    #[test]
    fn test_descriptor_defaults() {
        let descriptor = BizLogDescriptor::new("x");
        assert_eq!(descriptor.action_code, "OTHER");
        assert!(descriptor.asynchronous);
        assert!(descriptor.storage_names.is_empty());
    }

    #[test]
    fn test_closures_supply_extras() {
        let supplier = || {
            let mut extra = IndexMap::new();
            extra.insert("tenant".to_string(), Value::from("acme"));
            extra
        };
        assert_eq!(supplier.extra_values()["tenant"], "acme");
    }
}
