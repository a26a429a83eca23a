//! Synthetic producers and the registry describing which ones run
//!
//! A producer is an async function that owns a [`ProducerContext`] and emits
//! records through its router until the context's cancellation token fires.

pub mod apps;
pub mod pool;
pub mod registry;

pub use pool::IpPool;
pub use registry::{Cluster, Registry, ServiceEntry};

use crate::core::{LabelSet, Metadata};
use crate::router::AppLogger;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one producer task owns
pub struct ProducerContext {
    pub router: AppLogger,
    pub labels: LabelSet,
    pub metadata: Metadata,
    pub cancel: CancellationToken,
    pub pool: Arc<IpPool>,
    pub rng: StdRng,
}

pub type ProducerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Shareable producer function, started once per cluster
pub type Producer = Arc<dyn Fn(ProducerContext) -> ProducerFuture + Send + Sync>;

/// Box an async function into a [`Producer`]
pub fn producer<F, Fut>(f: F) -> Producer
where
    F: Fn(ProducerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)) as ProducerFuture)
}

/// Call `emit` roughly every `cadence` until cancelled
///
/// Each wait is `cadence` plus up to half of it again in random jitter, so
/// producers started together drift apart.
pub async fn emit_until_cancelled<F>(mut ctx: ProducerContext, cadence: Duration, mut emit: F)
where
    F: FnMut(&mut ProducerContext, DateTime<Utc>) + Send,
{
    let jitter_ms = (cadence.as_millis() / 2) as u64;

    loop {
        let jitter = Duration::from_millis(ctx.rng.gen_range(0..=jitter_ms));
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = tokio::time::sleep(cadence + jitter) => {}
        }
        emit(&mut ctx, Utc::now());
    }
}
