//! Sink implementations

pub mod console;
pub mod otel;
pub mod push;
pub mod syslog;
pub mod transport;

pub use console::ConsoleSink;
pub use otel::OtelSink;
pub use push::{PushConfig, PushSink, DEFAULT_SHUTDOWN_TIMEOUT};
pub use syslog::{Facility, SyslogSink, TimestampSource};
pub use transport::{connect, Network, Transport};
