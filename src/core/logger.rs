//! Logger trait implemented by every sink backend

use super::{
    error::Result,
    labels::{LabelSet, Metadata},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A sink that accepts labelled log records
///
/// Implementations are shared between many producer tasks, so both emission
/// methods take `&self` and must be safe to call concurrently without
/// interleaving partial records on the underlying transport.
///
/// Missing labels never cause an error; only a genuine transport or
/// formatting failure does.
pub trait Logger: Send + Sync {
    /// Emit one record without metadata
    fn handle(&self, labels: &LabelSet, timestamp: DateTime<Utc>, message: &str) -> Result<()> {
        self.handle_with_metadata(labels, timestamp, message, &Metadata::new())
    }

    /// Emit one record with metadata attached
    fn handle_with_metadata(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> Result<()>;

    /// Push out anything the sink buffers
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Shared handle to a sink, as handed to routers
pub type SharedLogger = Arc<dyn Logger>;

/// Adapter turning a closure into a [`Logger`]
///
/// # Example
///
/// ```
/// use rust_log_generator::{LabelSet, Logger, LoggerFn, Metadata};
/// use chrono::{DateTime, Utc};
///
/// let sink = LoggerFn::new(
///     "noop",
///     |_labels: &LabelSet, _ts: DateTime<Utc>, _msg: &str, _meta: &Metadata| Ok(()),
/// );
/// assert!(sink.handle(&LabelSet::new(), Utc::now(), "hello").is_ok());
/// ```
pub struct LoggerFn<F> {
    name: String,
    func: F,
}

impl<F> LoggerFn<F>
where
    F: Fn(&LabelSet, DateTime<Utc>, &str, &Metadata) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Logger for LoggerFn<F>
where
    F: Fn(&LabelSet, DateTime<Utc>, &str, &Metadata) -> Result<()> + Send + Sync,
{
    fn handle_with_metadata(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        (self.func)(labels, timestamp, message, metadata)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
