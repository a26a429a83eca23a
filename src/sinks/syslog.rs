//! RFC 5424 syslog sink
//!
//! Formats every record as an RFC [5424] message and writes it to a
//! [`Transport`]:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG
//! ```
//!
//! `APP-NAME` comes from the `service_name` label, the severity part of `PRI`
//! from the `level` label, and the record's metadata becomes one
//! `[meta@1234 ...]` structured-data element.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424

use super::transport::Transport;
use crate::core::{
    labels::{LEVEL_LABEL, SERVICE_NAME_LABEL},
    LabelSet, Logger, Metadata, Result, Severity,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt::Write as _;

/// RFC 5424 NILVALUE
pub const NILVALUE: &str = "-";

/// SD-ID of the element carrying record metadata
pub const META_SD_ID: &str = "meta@1234";

const DEFAULT_LEVEL: &str = "info";
const DEFAULT_SERVICE: &str = "unknown_service";
const FALLBACK_HOSTNAME: &str = "unknown-host";
const SD_NAME_MAX: usize = 32;

/// Syslog facilities, already shifted into the high bits of `PRI`
///
/// The values duplicate the `LOG_*` constants of `<syslog.h>`, so
/// `Facility::Daemon as u8 == 24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facility {
    Kern = 0 << 3,
    #[default]
    User = 1 << 3,
    Mail = 2 << 3,
    Daemon = 3 << 3,
    Auth = 4 << 3,
    Syslog = 5 << 3,
    Lpr = 6 << 3,
    News = 7 << 3,
    Uucp = 8 << 3,
    Cron = 9 << 3,
    AuthPriv = 10 << 3,
    Ftp = 11 << 3,
    Local0 = 16 << 3,
    Local1 = 17 << 3,
    Local2 = 18 << 3,
    Local3 = 19 << 3,
    Local4 = 20 << 3,
    Local5 = 21 << 3,
    Local6 = 22 << 3,
    Local7 = 23 << 3,
}

impl Facility {
    pub fn priority(&self) -> u8 {
        *self as u8
    }
}

/// Which instant the TIMESTAMP header carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// Wall-clock time at which the message is formatted
    #[default]
    SendTime,
    /// The timestamp the producer passed in
    RecordTime,
}

/// Sink writing RFC 5424 messages to a connection
///
/// The transport sits behind a mutex, so concurrent producers each get their
/// message written whole.
///
/// # Example
///
/// ```no_run
/// use rust_log_generator::sinks::syslog::{Facility, SyslogSink};
/// use rust_log_generator::sinks::transport::{connect, Network};
///
/// let transport = connect(Network::Udp, "127.0.0.1:514").expect("syslog transport");
/// let sink = SyslogSink::new(transport, Facility::Daemon);
/// ```
pub struct SyslogSink {
    transport: Mutex<Box<dyn Transport>>,
    priority: u8,
    hostname: String,
    proc_id: String,
    timestamp_source: TimestampSource,
}

impl SyslogSink {
    /// Create a sink; the hostname is resolved once, here
    pub fn new(transport: Box<dyn Transport>, facility: Facility) -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| FALLBACK_HOSTNAME.to_string());

        Self {
            transport: Mutex::new(transport),
            priority: facility.priority(),
            hostname,
            proc_id: std::process::id().to_string(),
            timestamp_source: TimestampSource::default(),
        }
    }

    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    #[must_use]
    pub fn with_timestamp_source(mut self, source: TimestampSource) -> Self {
        self.timestamp_source = source;
        self
    }

    /// Render one record without sending it
    pub fn format(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> String {
        let level = labels.get(LEVEL_LABEL).unwrap_or(DEFAULT_LEVEL);
        let service_name = labels.get(SERVICE_NAME_LABEL).unwrap_or(DEFAULT_SERVICE);

        let severity = Severity::from_level(level);
        let facility = self.priority >> 3;

        let stamp = match self.timestamp_source {
            TimestampSource::SendTime => Utc::now(),
            TimestampSource::RecordTime => timestamp,
        };

        format_rfc5424(&Rfc5424Fields {
            facility,
            severity,
            timestamp: stamp,
            hostname: &self.hostname,
            app_name: service_name,
            proc_id: &self.proc_id,
            msg_id: NILVALUE,
            structured_data: &structured_data(metadata),
            message,
        })
    }
}

impl Logger for SyslogSink {
    fn handle_with_metadata(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let line = self.format(labels, timestamp, message, metadata);
        self.transport.lock().send(line.as_bytes())?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.transport.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "syslog"
    }
}

/// Header fields and payload of one RFC 5424 message
#[derive(Debug, Clone)]
pub struct Rfc5424Fields<'a> {
    /// Facility number (0-23), not yet shifted
    pub facility: u8,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub hostname: &'a str,
    pub app_name: &'a str,
    pub proc_id: &'a str,
    pub msg_id: &'a str,
    pub structured_data: &'a str,
    pub message: &'a str,
}

/// Compose an RFC 5424 message; empty header fields become NILVALUE
pub fn format_rfc5424(fields: &Rfc5424Fields<'_>) -> String {
    let priority = u32::from(fields.facility) * 8 + u32::from(fields.severity.code());

    format!(
        "<{}>1 {} {} {} {} {} {} {}",
        priority,
        fields.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        nil_if_empty(fields.hostname),
        nil_if_empty(fields.app_name),
        nil_if_empty(fields.proc_id),
        nil_if_empty(fields.msg_id),
        nil_if_empty(fields.structured_data),
        fields.message,
    )
}

/// `[meta@1234 name="value" ...]` in metadata order, or empty for no metadata
///
/// Names that are not valid SD-NAMEs have each offending character replaced
/// by `_` and are cut to 32 characters; values are escaped.
pub fn structured_data(metadata: &Metadata) -> String {
    if metadata.is_empty() {
        return String::new();
    }

    let mut sd = String::with_capacity(16 + metadata.len() * 24);
    sd.push('[');
    sd.push_str(META_SD_ID);
    for entry in metadata {
        let _ = write!(
            sd,
            " {}=\"{}\"",
            sanitize_param_name(&entry.name),
            escape_param_value(&entry.value)
        );
    }
    sd.push(']');
    sd
}

fn nil_if_empty(value: &str) -> &str {
    if value.is_empty() {
        NILVALUE
    } else {
        value
    }
}

// SD-NAME: 1 to 32 printable US-ASCII characters except '=', SP, ']' and '"'
fn sanitize_param_name(name: &str) -> Cow<'_, str> {
    let valid = |c: char| c.is_ascii_graphic() && !matches!(c, '=' | ']' | '"');
    if !name.is_empty() && name.len() <= SD_NAME_MAX && name.chars().all(valid) {
        return Cow::Borrowed(name);
    }
    let sanitized: String = name
        .chars()
        .take(SD_NAME_MAX)
        .map(|c| if valid(c) { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        Cow::Borrowed("_")
    } else {
        Cow::Owned(sanitized)
    }
}

// PARAM-VALUE must escape '"', '\' and ']' (RFC 5424 section 6.3.3)
fn escape_param_value(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\\', ']']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if matches!(c, '"' | '\\' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}
