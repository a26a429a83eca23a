use anyhow::{Context, Result};
use clap::Parser;
use rust_log_generator::config::{build_default_sink, Cli};
use rust_log_generator::dispatch::{Dispatcher, OtlpSinkFactory};
use rust_log_generator::generator::apps::default_registry;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let sink = build_default_sink(&cli).context("failed to create default sink")?;
    info!(sink = sink.name(), otel = cli.otel, "Starting log generator");

    let factory = Arc::new(OtlpSinkFactory::new(cli.otel_endpoint.clone()));
    let dispatcher = Dispatcher::new(default_registry(), Arc::clone(&sink), factory)
        .with_options(cli.dispatch_options());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => error!(error = %e, "Failed to listen for interrupt"),
        }
        signal_token.cancel();
    });

    dispatcher.run(cancel).await;

    // Flushing may block on the push worker
    let flushed = tokio::task::spawn_blocking(move || sink.flush())
        .await
        .context("flush task panicked")?;
    if let Err(e) = flushed {
        warn!(error = %e, "Failed to flush default sink");
    }

    Ok(())
}
