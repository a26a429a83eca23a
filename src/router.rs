//! Level-oriented routing over a label-oriented sink
//!
//! An [`AppLogger`] is built once per producer. It precomputes one label set
//! per [`LogLevel`] (the base labels plus `level=<level>`) and forwards every
//! emission to the wrapped [`Logger`](crate::core::Logger). Sink failures are
//! absorbed: they are reported as diagnostics, counted, and handed to an
//! optional observer, but never returned to the producer.

use crate::core::{
    labels::{LEVEL_LABEL, SERVICE_NAME_LABEL},
    LabelSet, LogLevel, LoggerError, Metadata, SharedLogger, SinkMetrics,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked with every error the router swallows
pub type ErrorObserver = Arc<dyn Fn(&LoggerError) + Send + Sync>;

pub struct AppLogger {
    labels: LabelSet,
    levels: HashMap<LogLevel, LabelSet>,
    logger: SharedLogger,
    metrics: SinkMetrics,
    on_error: Option<ErrorObserver>,
}

impl AppLogger {
    pub fn new(labels: LabelSet, logger: SharedLogger) -> Self {
        let levels = LogLevel::ALL
            .iter()
            .map(|level| {
                let leveled = labels.merge(&LabelSet::from([(LEVEL_LABEL, level.as_str())]));
                (*level, leveled)
            })
            .collect();

        Self {
            labels,
            levels,
            logger,
            metrics: SinkMetrics::new(),
            on_error: None,
        }
    }

    /// Observe swallowed sink errors
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_generator::{AppLogger, LabelSet, LoggerError, LoggerFn, Metadata};
    /// use chrono::{DateTime, Utc};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let failing = LoggerFn::new(
    ///     "failing",
    ///     |_: &LabelSet, _: DateTime<Utc>, _: &str, _: &Metadata| Err(LoggerError::other("down")),
    /// );
    /// let seen = Arc::new(AtomicUsize::new(0));
    /// let seen_clone = Arc::clone(&seen);
    ///
    /// let app = AppLogger::new(LabelSet::new(), Arc::new(failing))
    ///     .with_error_observer(Arc::new(move |_err: &LoggerError| {
    ///         seen_clone.fetch_add(1, Ordering::Relaxed);
    ///     }));
    ///
    /// app.log("info", Utc::now(), "dropped on the floor");
    /// assert_eq!(seen.load(Ordering::Relaxed), 1);
    /// ```
    #[must_use]
    pub fn with_error_observer(mut self, observer: ErrorObserver) -> Self {
        self.on_error = Some(observer);
        self
    }

    /// Emit at `level`; unknown levels use the base labels unchanged
    pub fn log(&self, level: impl AsRef<str>, timestamp: DateTime<Utc>, message: &str) {
        let labels = self.labels_for(level.as_ref());
        let result = self.logger.handle(labels, timestamp, message);
        self.settle(result);
    }

    /// Emit at `level` with metadata attached
    pub fn log_with_metadata(
        &self,
        level: impl AsRef<str>,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) {
        let labels = self.labels_for(level.as_ref());
        let result = self
            .logger
            .handle_with_metadata(labels, timestamp, message, metadata);
        self.settle(result);
    }

    #[inline]
    pub fn debug(&self, timestamp: DateTime<Utc>, message: &str) {
        self.log(LogLevel::Debug, timestamp, message);
    }

    #[inline]
    pub fn info(&self, timestamp: DateTime<Utc>, message: &str) {
        self.log(LogLevel::Info, timestamp, message);
    }

    #[inline]
    pub fn warn(&self, timestamp: DateTime<Utc>, message: &str) {
        self.log(LogLevel::Warn, timestamp, message);
    }

    #[inline]
    pub fn error(&self, timestamp: DateTime<Utc>, message: &str) {
        self.log(LogLevel::Error, timestamp, message);
    }

    /// Label set used for `level`
    pub fn labels_for(&self, level: &str) -> &LabelSet {
        LogLevel::from_label(level)
            .and_then(|level| self.levels.get(&level))
            .unwrap_or(&self.labels)
    }

    /// Base labels, without any `level`
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Delivered/failed counters for this router
    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    fn settle(&self, result: crate::core::Result<()>) {
        match result {
            Ok(()) => {
                self.metrics.record_delivered();
            }
            Err(err) => {
                self.metrics.record_dropped();
                tracing::warn!(
                    sink = self.logger.name(),
                    service = self.labels.get(SERVICE_NAME_LABEL).unwrap_or("-"),
                    error = %err,
                    "Error logging message"
                );
                if let Some(ref observer) = self.on_error {
                    observer(&err);
                }
            }
        }
    }
}

impl std::fmt::Debug for AppLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppLogger")
            .field("labels", &self.labels)
            .field("sink", &self.logger.name())
            .finish()
    }
}
