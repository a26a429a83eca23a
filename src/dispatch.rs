//! Fan-out of the registry onto running producer tasks
//!
//! Each (namespace, service, cluster) triple becomes one tokio task holding
//! its own [`AppLogger`]. Services whose name carries [`OTEL_MARKER`] get a
//! dedicated OpenTelemetry sink when OTel is enabled; everything else shares
//! the process-wide default sink.

use crate::core::{LabelSet, Metadata, Result, SharedLogger};
use crate::generator::{pool::DEFAULT_POOL_SIZE, IpPool, ProducerContext, Registry};
use crate::router::AppLogger;
use crate::sinks::OtelSink;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Substring marking services that emit through OpenTelemetry
pub const OTEL_MARKER: &str = "-otel";

/// Service whose metadata is cleared before it reaches its producer
pub const METADATA_OVERRIDE_SERVICE: &str = "nginx";

/// Builds the dedicated sink of an OTel-marked service
pub trait SinkFactory: Send + Sync {
    fn otel_sink(&self, service_name: &str, labels: &LabelSet) -> Result<SharedLogger>;
}

/// Factory exporting over OTLP/gRPC to one collector endpoint
#[derive(Debug, Clone)]
pub struct OtlpSinkFactory {
    endpoint: String,
}

impl OtlpSinkFactory {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl SinkFactory for OtlpSinkFactory {
    fn otel_sink(&self, service_name: &str, labels: &LabelSet) -> Result<SharedLogger> {
        let sink = OtelSink::new(service_name, labels, &self.endpoint)?;
        Ok(Arc::new(sink))
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Route `-otel` services to their own OpenTelemetry sink
    pub otel_enabled: bool,
    /// Seed for the IP pool and per-task RNGs; random when unset
    pub seed: Option<u64>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            otel_enabled: true,
            seed: None,
        }
    }
}

/// Identity of one started producer task
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey {
    pub namespace: String,
    pub service: String,
    pub cluster: String,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.namespace, self.service, self.cluster)
    }
}

pub struct StartedTask {
    pub key: TaskKey,
    /// Which sink the task's router wraps
    pub sink: String,
    pub handle: JoinHandle<()>,
}

pub struct Dispatcher {
    registry: Registry,
    default_sink: SharedLogger,
    otel_factory: Arc<dyn SinkFactory>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        registry: Registry,
        default_sink: SharedLogger,
        otel_factory: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            registry,
            default_sink,
            otel_factory,
            options: DispatchOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Spawn one task per registry entry and cluster
    ///
    /// Must be called inside a Tokio runtime. Entries whose OTel sink cannot
    /// be built are skipped with a warning. The order of the returned tasks
    /// is unspecified.
    pub fn start(&self, cancel: &CancellationToken) -> Vec<StartedTask> {
        let mut master = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = Arc::new(IpPool::generate(&mut master, DEFAULT_POOL_SIZE));
        let mut started = Vec::with_capacity(self.registry.task_count());

        for entry in self.registry.entries() {
            self.registry
                .for_all_clusters(&entry.namespace, &entry.service, |cluster, labels, metadata| {
                    let Some(sink) = self.select_sink(&entry.service, &labels) else {
                        return;
                    };
                    let metadata = override_metadata(&entry.service, metadata);
                    let key = TaskKey {
                        namespace: entry.namespace.clone(),
                        service: entry.service.clone(),
                        cluster: cluster.name.clone(),
                    };

                    let ctx = ProducerContext {
                        router: AppLogger::new(labels.clone(), Arc::clone(&sink)),
                        labels,
                        metadata,
                        cancel: cancel.clone(),
                        pool: Arc::clone(&pool),
                        rng: StdRng::seed_from_u64(master.gen()),
                    };

                    tracing::debug!(task = %key, sink = sink.name(), "Starting producer");
                    let handle = tokio::spawn((entry.producer)(ctx));
                    started.push(StartedTask {
                        key,
                        sink: sink.name().to_string(),
                        handle,
                    });
                });
        }

        started
    }

    /// Start every producer, then wait for cancellation
    ///
    /// Tasks are not joined; each one observes the same token and stops on
    /// its own.
    pub async fn run(self, cancel: CancellationToken) {
        let started = self.start(&cancel);
        tracing::info!(
            tasks = started.len(),
            otel = self.options.otel_enabled,
            "Log generators running"
        );

        cancel.cancelled().await;
        tracing::info!("Cancellation received, stopping generators");
    }

    /// Sink for one service instance, or `None` when it cannot be built
    fn select_sink(&self, service: &str, labels: &LabelSet) -> Option<SharedLogger> {
        if !(self.options.otel_enabled && service.contains(OTEL_MARKER)) {
            return Some(Arc::clone(&self.default_sink));
        }

        match self.otel_factory.otel_sink(service, labels) {
            Ok(sink) => Some(sink),
            Err(e) => {
                tracing::warn!(
                    service,
                    error = %e,
                    "Could not create OTel sink, skipping producer"
                );
                None
            }
        }
    }
}

fn override_metadata(service: &str, metadata: Metadata) -> Metadata {
    if service == METADATA_OVERRIDE_SERVICE {
        Metadata::new()
    } else {
        metadata
    }
}
