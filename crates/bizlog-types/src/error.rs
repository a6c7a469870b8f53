//! Pipeline error taxonomy.

use thiserror::Error;

/// Errors raised anywhere in the recording pipeline.
#[derive(Debug, Error)]
pub enum BizLogError {
    /// No action is registered under the code.
    #[error("action not registered: {code}")]
    NotRegistered { code: String },

    /// An expression template failed to compile or evaluate.
    #[error("failed to evaluate template '{template}': {message}")]
    TemplateEvaluation { template: String, message: String },

    /// A parser failed and fallback to plain text is disabled.
    #[error("template parser {parser} failed")]
    Parser {
        parser: String,
        #[source]
        source: Box<BizLogError>,
    },

    /// A requested storage name has no registered storage.
    #[error("unknown storage target: {name}")]
    UnknownStorageTarget { name: String },

    /// A storage write failed.
    #[error("storage {storage} failed to write record: {message}")]
    StorageWrite { storage: String, message: String },

    /// A failure was recorded by an error handler and raised again.
    #[error("{handler} handled a log failure: {source}")]
    Handled {
        handler: String,
        #[source]
        source: Box<BizLogError>,
    },

    /// Work could not be handed to the executor.
    #[error("executor error: {0}")]
    Executor(String),

    /// Disallowed use of the pipeline API.
    #[error("pipeline misuse: {0}")]
    PipelineMisuse(String),
}

impl BizLogError {
    /// Build a template evaluation error.
    pub fn evaluation(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateEvaluation {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Build a storage write error.
    pub fn storage_write(storage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageWrite {
            storage: storage.into(),
            message: message.into(),
        }
    }

    /// Innermost error, following `Parser` and `Handled` wrappers.
    pub fn root_cause(&self) -> &BizLogError {
        match self {
            Self::Parser { source, .. } | Self::Handled { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, BizLogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_nested_errors() {
        let err = BizLogError::Handled {
            handler: "DefaultErrorHandler".into(),
            source: Box::new(BizLogError::Parser {
                parser: "ExpressionParser".into(),
                source: Box::new(BizLogError::evaluation("#{x.y}", "null")),
            }),
        };
        assert!(matches!(
            err.root_cause(),
            BizLogError::TemplateEvaluation { .. }
        ));
        assert!(err.to_string().contains("DefaultErrorHandler"));
    }

    #[test]
    fn test_display_messages() {
        let err = BizLogError::NotRegistered { code: "NOPE".into() };
        assert_eq!(err.to_string(), "action not registered: NOPE");

        let err = BizLogError::storage_write("file", "disk full");
        assert_eq!(err.to_string(), "storage file failed to write record: disk full");
    }
}
