//! Core types and traits

pub mod error;
pub mod labels;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;

pub use error::{LoggerError, Result};
pub use labels::{LabelSet, Metadata, MetadataEntry};
pub use log_level::{LogLevel, Severity};
pub use logger::{Logger, LoggerFn, SharedLogger};
pub use metrics::SinkMetrics;
pub use overflow_policy::OverflowPolicy;
