//! Built-in synthetic services
//!
//! Content is intentionally simple: enough variety in levels, formats and
//! metadata to exercise every sink, nothing more.

use super::{emit_until_cancelled, producer, ProducerContext, Registry};
use crate::core::LogLevel;
use crate::sinks::otel::TRACE_ID_METADATA;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::time::Duration;

const METHODS: [&str; 6] = ["GET", "GET", "GET", "POST", "PUT", "DELETE"];
const PATHS: [&str; 6] = [
    "/",
    "/api/products",
    "/api/cart",
    "/api/checkout",
    "/static/app.js",
    "/health",
];
const AGENTS: [&str; 3] = [
    "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0",
    "curl/8.5.0",
    "Go-http-client/2.0",
];
const QUERIES: [&str; 4] = [
    "SELECT * FROM orders WHERE customer_id = $1",
    "UPDATE carts SET updated_at = now() WHERE id = $1",
    "INSERT INTO payments (order_id, amount) VALUES ($1, $2)",
    "SELECT count(*) FROM products WHERE stock > 0",
];

/// Registry with the built-in services on the default clusters
pub fn default_registry() -> Registry {
    Registry::default()
        .with_service("gateway", "nginx", producer(nginx))
        .with_service("shop", "web-api", producer(web_api))
        .with_service("shop", "checkout-otel", producer(checkout_otel))
        .with_service("data", "postgres", producer(postgres))
        .with_service("mimir", "mimir-ingester", producer(mimir_ingester))
}

/// Access log lines in combined log format
pub async fn nginx(ctx: ProducerContext) {
    emit_until_cancelled(ctx, Duration::from_millis(300), |ctx, ts| {
        let ip = ctx.pool.pick(&mut ctx.rng);
        let status = random_status(&mut ctx.rng);
        let line = format!(
            "{} - - [{}] \"{} {} HTTP/1.1\" {} {} \"-\" \"{}\"",
            ip,
            ts.format("%d/%b/%Y:%H:%M:%S %z"),
            pick(&mut ctx.rng, &METHODS),
            pick(&mut ctx.rng, &PATHS),
            status,
            ctx.rng.gen_range(30..100_000),
            pick(&mut ctx.rng, &AGENTS),
        );
        ctx.router
            .log_with_metadata(level_for_status(status), ts, &line, &ctx.metadata);
    })
    .await;
}

/// JSON request logs
pub async fn web_api(ctx: ProducerContext) {
    emit_until_cancelled(ctx, Duration::from_millis(500), |ctx, ts| {
        let status = random_status(&mut ctx.rng);
        let line = json!({
            "ts": ts.to_rfc3339(),
            "client": ctx.pool.pick(&mut ctx.rng).to_string(),
            "method": pick(&mut ctx.rng, &METHODS),
            "path": pick(&mut ctx.rng, &PATHS),
            "status": status,
            "duration_ms": ctx.rng.gen_range(1..1_500),
        })
        .to_string();
        ctx.router
            .log_with_metadata(level_for_status(status), ts, &line, &ctx.metadata);
    })
    .await;
}

/// Checkout events, each carrying a trace id
pub async fn checkout_otel(ctx: ProducerContext) {
    emit_until_cancelled(ctx, Duration::from_millis(700), |ctx, ts| {
        let trace_id = random_trace_id(&mut ctx.rng);
        let order = ctx.rng.gen_range(10_000..99_999);
        let mut metadata = ctx.metadata.clone();
        metadata.push(TRACE_ID_METADATA, trace_id);

        let (level, line) = if ctx.rng.gen_bool(0.1) {
            (LogLevel::Error, format!("payment declined for order {}", order))
        } else {
            (
                LogLevel::Info,
                format!(
                    "order {} placed: {} items, total {:.2} EUR",
                    order,
                    ctx.rng.gen_range(1..8),
                    ctx.rng.gen_range(5.0..500.0)
                ),
            )
        };
        ctx.router.log_with_metadata(level, ts, &line, &metadata);
    })
    .await;
}

/// Statement logs with occasional slow queries
pub async fn postgres(ctx: ProducerContext) {
    emit_until_cancelled(ctx, Duration::from_millis(400), |ctx, ts| {
        let duration_ms: f64 = ctx.rng.gen_range(0.2..900.0);
        let level = if duration_ms > 500.0 {
            LogLevel::Warn
        } else if duration_ms < 1.0 {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        let line = format!(
            "duration: {:.3} ms  statement: {}",
            duration_ms,
            pick(&mut ctx.rng, &QUERIES)
        );
        ctx.router.log_with_metadata(level, ts, &line, &ctx.metadata);
    })
    .await;
}

/// An ingester stuck failing its flushes
pub async fn mimir_ingester(ctx: ProducerContext) {
    emit_until_cancelled(ctx, Duration::from_secs(1), |ctx, ts| {
        let series = ctx.rng.gen_range(100..5_000);
        if ctx.rng.gen_bool(0.8) {
            let line = format!(
                "level=error msg=\"failed to flush chunks\" series={} err=\"context deadline exceeded\"",
                series
            );
            ctx.router
                .log_with_metadata(LogLevel::Error, ts, &line, &ctx.metadata);
        } else {
            let line = format!("level=info msg=\"flushed chunks\" series={}", series);
            ctx.router
                .log_with_metadata(LogLevel::Info, ts, &line, &ctx.metadata);
        }
    })
    .await;
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn random_status<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    match rng.gen_range(0..100) {
        0..=79 => 200,
        80..=87 => 304,
        88..=94 => 404,
        95..=97 => 500,
        _ => 503,
    }
}

pub fn level_for_status(status: u16) -> LogLevel {
    match status {
        500.. => LogLevel::Error,
        400..=499 => LogLevel::Warn,
        _ => LogLevel::Info,
    }
}

pub fn random_trace_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:032x}", rng.gen::<u128>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LabelSet, LoggerFn, Metadata, Result};
    use crate::generator::IpPool;
    use crate::router::AppLogger;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    type Records = Arc<Mutex<Vec<(LabelSet, String, Metadata)>>>;

    fn context(cancel: &CancellationToken, records: &Records) -> ProducerContext {
        let records = Arc::clone(records);
        let sink = LoggerFn::new(
            "recording",
            move |labels: &LabelSet, _: DateTime<Utc>, msg: &str, meta: &Metadata| -> Result<()> {
                records.lock().push((labels.clone(), msg.to_string(), meta.clone()));
                Ok(())
            },
        );
        let mut rng = StdRng::seed_from_u64(42);
        ProducerContext {
            router: AppLogger::new(LabelSet::from([("service_name", "svc")]), Arc::new(sink)),
            labels: LabelSet::from([("service_name", "svc")]),
            metadata: Metadata::from([("pod", "svc-00001")]),
            cancel: cancel.clone(),
            pool: Arc::new(IpPool::generate(&mut rng, 5)),
            rng,
        }
    }

    #[test]
    fn test_default_registry_services() {
        let registry = default_registry();
        let services: Vec<&str> = registry.entries().iter().map(|e| e.service.as_str()).collect();

        assert!(services.contains(&"nginx"));
        assert!(services.iter().any(|s| s.contains("-otel")));
        assert_eq!(registry.task_count(), services.len() * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_builtin_producer_emits() {
        for entry in default_registry().entries() {
            let cancel = CancellationToken::new();
            let records: Records = Arc::new(Mutex::new(Vec::new()));
            let task = tokio::spawn((entry.producer)(context(&cancel, &records)));

            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
            task.await.unwrap();

            let records = records.lock();
            assert!(!records.is_empty(), "{} emitted nothing", entry.service);
            assert!(records.iter().all(|(labels, _, _)| labels.get("level").is_some()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkout_attaches_trace_id() {
        let cancel = CancellationToken::new();
        let records: Records = Arc::new(Mutex::new(Vec::new()));
        let task = tokio::spawn(checkout_otel(context(&cancel, &records)));

        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();
        task.await.unwrap();

        for (_, _, metadata) in records.lock().iter() {
            assert_eq!(metadata.first("pod"), Some("svc-00001"));
            assert_eq!(metadata.first(TRACE_ID_METADATA).map(str::len), Some(32));
        }
    }

    #[test]
    fn test_level_for_status() {
        assert_eq!(level_for_status(200), LogLevel::Info);
        assert_eq!(level_for_status(404), LogLevel::Warn);
        assert_eq!(level_for_status(503), LogLevel::Error);
    }
}
