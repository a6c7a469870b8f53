//! Spans and timing for pipeline operations.

use crate::BIZ_LOG_TARGET;
use std::time::{Duration, Instant};
use tracing::{field, info_span, Span};

/// Span wrapping the dispatch of one record.
///
/// `mode` is `"sync"` or `"async"`. The `error` field starts empty and is
/// filled by [`record_failure`].
pub fn dispatch_span(action_code: &str, mode: &'static str) -> Span {
    info_span!(
        target: BIZ_LOG_TARGET,
        "dispatch",
        action = %action_code,
        mode = mode,
        error = field::Empty
    )
}

/// Span wrapping a single storage write.
pub fn storage_span(storage: &str) -> Span {
    info_span!(target: BIZ_LOG_TARGET, "storage", name = %storage)
}

/// Attach a failure to a dispatch span.
pub fn record_failure(span: &Span, error: &dyn std::error::Error) {
    span.record("error", field::display(error));
}

/// Measures one pipeline step and logs its duration at debug level.
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer, logging the elapsed time in microseconds.
    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        tracing::debug!(
            target: BIZ_LOG_TARGET,
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "pipeline step finished"
        );
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F: FnOnce()>(f: F) {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_timer_measures_elapsed() {
        let timer = Timer::start("unit");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        assert!(timer.finish() >= Duration::from_millis(5));
    }

    #[test]
    fn test_nested_spans_and_failure_recording() {
        with_subscriber(|| {
            let dispatch = dispatch_span("CREATE", "async");
            let _outer = dispatch.enter();
            {
                let storage = storage_span("console");
                let _inner = storage.enter();
                tracing::info!(target: BIZ_LOG_TARGET, "writing");
            }

            let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            record_failure(&dispatch, &error);
            assert!(!dispatch.is_disabled());
        });
    }

    #[test]
    fn test_spans_without_subscriber_are_inert() {
        let span = dispatch_span("DELETE", "sync");
        record_failure(&span, &std::fmt::Error);
        let _guard = span.enter();
    }
}
