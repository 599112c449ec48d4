//! ZenPipe agent: publishes heartbeat spans through the export pipeline.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use zenpipe_common::{Record, current_timestamp_millis, init_tracing};
use zenpipe_sdk::{
    SdkConfig, TelemetryProvider, ZenohExportClient, adapter_from_config, build_pipeline,
};

/// ZenPipe telemetry agent.
#[derive(Parser, Debug)]
#[command(name = "zenpipe-agent")]
#[command(about = "Publish heartbeat telemetry through the ZenPipe export pipeline")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Key expression to publish on (overrides config).
    #[arg(long)]
    key_expr: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Seconds between two heartbeat spans.
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SdkConfig::load_from_file(path)?,
        None => SdkConfig::default(),
    };
    if let Some(key_expr) = args.key_expr {
        config.exporter.key_expr = Some(key_expr);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.interval_secs == 0 {
        anyhow::bail!("--interval-secs must be > 0");
    }

    init_tracing(&config.logging)?;

    info!("Starting ZenPipe agent");
    info!(
        service = %config.resource.service_name,
        mode = ?config.processor.mode,
        format = ?config.serialization,
        "Configuration loaded"
    );

    let session = Arc::new(zenpipe_common::connect(&config.zenoh).await?);
    let client = ZenohExportClient::from_config(session.clone(), &config)?;
    info!(key_expr = client.key_expr(), "Publishing export requests");

    let adapter = Arc::new(adapter_from_config(client, &config));
    let pipeline = build_pipeline(vec![adapter], &config)?;
    let provider = TelemetryProvider::new(pipeline, config.resource.to_resource());

    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    let mut sequence: i64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sequence += 1;
                let record = Record::span("agent.heartbeat")
                    .with_attribute("heartbeat.sequence", sequence)
                    .ended_at(current_timestamp_millis());
                if let Err(e) = provider.start(&record).and_then(|()| provider.end(&record)) {
                    warn!(error = %e, "Failed to record heartbeat");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            _ = terminate() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
        }
    }

    // A second signal during shutdown abandons pending exports.
    let result = provider
        .shutdown_interruptible(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    if let Err(e) = result {
        error!(error = %e, "Pipeline shutdown failed");
    }

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close Zenoh session");
    }

    info!(heartbeats = sequence, "Agent stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
