//! # Rust Log Generator
//!
//! Synthetic log traffic for testing log-ingestion pipelines.
//!
//! Producers emit through a level-aware [`AppLogger`], which forwards every
//! record to a [`Logger`] sink:
//!
//! - **Syslog**: RFC 5424 messages over UDP or TCP
//! - **OpenTelemetry**: log records exported over OTLP/gRPC
//! - **Push**: batched JSON to a Loki-compatible endpoint
//! - **Console**: plain lines on stdout for dry runs
//!
//! The [`dispatch::Dispatcher`] starts one task per registered service and
//! cluster, and all of them stop on a shared cancellation token.
//!
//! ## Example
//!
//! ```
//! use rust_log_generator::prelude::*;
//! use rust_log_generator::sinks::ConsoleSink;
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(ConsoleSink::with_writer(Box::new(std::io::sink())));
//! let app = AppLogger::new(LabelSet::from([("service_name", "api")]), sink);
//!
//! app.info(Utc::now(), "GET /health 200");
//! assert_eq!(app.metrics().delivered_count(), 1);
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod generator;
pub mod router;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        LabelSet, LogLevel, Logger, LoggerError, LoggerFn, Metadata, OverflowPolicy, Result,
        Severity, SharedLogger, SinkMetrics,
    };
    pub use crate::dispatch::{DispatchOptions, Dispatcher, SinkFactory};
    pub use crate::router::AppLogger;
}

pub use core::{
    LabelSet, LogLevel, Logger, LoggerError, LoggerFn, Metadata, MetadataEntry, OverflowPolicy,
    Result, Severity, SharedLogger, SinkMetrics,
};
pub use router::{AppLogger, ErrorObserver};
