//! OpenTelemetry log-record bridge
//!
//! Each [`OtelSink`] owns its own logger provider, so the service name and
//! the promoted labels (cluster, namespace, env) live on the resource instead
//! of on every record. The remaining labels and the metadata become record
//! attributes.

use crate::core::{
    labels::{CLUSTER_LABEL, ENV_LABEL, LEVEL_LABEL, NAMESPACE_LABEL, SERVICE_NAME_LABEL},
    LabelSet, Logger, LoggerError, Metadata, Result,
};
use chrono::{DateTime, Utc};
use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::logs::{BatchLogProcessor, SdkLogger, SdkLoggerProvider};
use opentelemetry_sdk::Resource;
use std::time::SystemTime;

/// Environment variable holding the collector endpoint
pub const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub const DEFAULT_OTLP_ENDPOINT: &str = "localhost:4317";

/// Instrumentation scope name of every record
pub const SCOPE_NAME: &str = "log-generator";

pub const SERVICE_VERSION: &str = "1.0.0";

/// Metadata entry whose first value becomes the `trace_id` attribute
pub const TRACE_ID_METADATA: &str = "traceID";

const TRACE_ID_ATTRIBUTE: &str = "trace_id";

// Carried on the resource, never as record attributes
const PROMOTED_LABELS: [&str; 4] = [CLUSTER_LABEL, NAMESPACE_LABEL, ENV_LABEL, SERVICE_NAME_LABEL];

/// Resource describing one service instance
///
/// Missing promoted labels are recorded as empty strings.
pub fn otel_resource(service_name: &str, labels: &LabelSet) -> Resource {
    let promoted = |name: &str| labels.get(name).unwrap_or_default().to_string();

    Resource::builder_empty()
        .with_service_name(service_name.to_string())
        .with_attributes([
            KeyValue::new("service.version", SERVICE_VERSION),
            KeyValue::new("k8s.namespace.name", promoted(NAMESPACE_LABEL)),
            KeyValue::new("k8s.cluster.name", promoted(CLUSTER_LABEL)),
            KeyValue::new("deployment.environment", promoted(ENV_LABEL)),
        ])
        .build()
}

/// Collector endpoint, with `http://` added when no scheme is given
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

/// Map a `level` label value to an OpenTelemetry severity
pub fn severity_for(level: Option<&str>) -> (Severity, &'static str) {
    match level {
        Some("error") => (Severity::Error, "ERROR"),
        Some("warn") => (Severity::Warn, "WARN"),
        Some("debug") => (Severity::Debug, "DEBUG"),
        _ => (Severity::Info, "INFO"),
    }
}

/// Sink emitting records through an OpenTelemetry logger provider
pub struct OtelSink {
    provider: SdkLoggerProvider,
    logger: SdkLogger,
}

impl OtelSink {
    /// Build a gRPC export pipeline for `service_name`
    ///
    /// Exporter construction is the only fallible step; connection problems
    /// show up later as export errors inside the SDK. Must be called from
    /// within a Tokio runtime.
    pub fn new(service_name: &str, labels: &LabelSet, endpoint: &str) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint);
        let exporter = opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|e| LoggerError::otel("building log exporter", e))?;

        let processor = BatchLogProcessor::builder(exporter).build();
        let provider = SdkLoggerProvider::builder()
            .with_resource(otel_resource(service_name, labels))
            .with_log_processor(processor)
            .build();

        tracing::debug!(service = service_name, endpoint = %endpoint, "OTel sink created");

        Ok(Self::from_provider(provider))
    }

    /// Wrap an already configured provider
    pub fn from_provider(provider: SdkLoggerProvider) -> Self {
        let logger = provider.logger(SCOPE_NAME);
        Self { provider, logger }
    }

    /// Flush and stop the pipeline; later records are discarded by the SDK
    ///
    /// Dropping the sink does the same.
    pub fn shutdown(&self) -> Result<()> {
        self.provider
            .shutdown()
            .map_err(|e| LoggerError::otel("shutting down logger provider", e))
    }
}

impl Drop for OtelSink {
    fn drop(&mut self) {
        match self.provider.shutdown() {
            Ok(()) | Err(OTelSdkError::AlreadyShutdown) => {}
            Err(e) => tracing::warn!(error = %e, "OTel sink shutdown failed"),
        }
    }
}

impl Logger for OtelSink {
    /// Emitting never fails from the caller's point of view: the SDK hands
    /// records to its processor and reports export errors on its own.
    fn handle_with_metadata(
        &self,
        labels: &LabelSet,
        timestamp: DateTime<Utc>,
        message: &str,
        metadata: &Metadata,
    ) -> Result<()> {
        let (severity, severity_text) = severity_for(labels.get(LEVEL_LABEL));

        let mut record = self.logger.create_log_record();
        record.set_timestamp(SystemTime::from(timestamp));
        record.set_observed_timestamp(SystemTime::now());
        record.set_severity_number(severity);
        record.set_severity_text(severity_text);
        record.set_body(AnyValue::from(message.to_string()));

        for (name, value) in labels.iter() {
            if PROMOTED_LABELS.contains(&name) {
                continue;
            }
            record.add_attribute(name.to_string(), value.to_string());
        }

        for entry in metadata {
            record.add_attribute(entry.name.clone(), entry.value.clone());
        }

        if let Some(trace_id) = metadata.first(TRACE_ID_METADATA) {
            record.add_attribute(TRACE_ID_ATTRIBUTE, trace_id.to_string());
        }

        self.logger.emit(record);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.provider
            .force_flush()
            .map_err(|e| LoggerError::otel("flushing logger provider", e))
    }

    fn name(&self) -> &str {
        "otel"
    }
}
