// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Vitrine: Prometheus metrics exposition endpoint
//
//  Pipeline:  gather → negotiate → encode → gzip → commit
//  HTTP:      axum on a multi-thread tokio runtime
//  Config:    YAML + VITRINE_* env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use clap::Parser;
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vitrine_admin::AdminState;
use vitrine_core::ExporterConfig;
use vitrine_exposition::{Gatherers, MetricsHandler};
use vitrine_observability::{HandlerMetrics, TracingErrorLog};

#[derive(Parser, Debug)]
#[command(name = "vitrine", version, about = "Vitrine: Prometheus metrics exposition endpoint")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/vitrine/vitrine.yaml")]
    config: PathBuf,

    /// Log level (overrides `logging.level` from the config file)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Config ──
    let config_found = cli.config.exists();
    let config = if config_found {
        ExporterConfig::load(&cli.config)?
    } else {
        ExporterConfig::default()
    };

    // ── Tracing ──
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    vitrine_observability::logging::init(level, config.logging.json)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Vitrine starting");
    if config_found {
        info!(path = %cli.config.display(), "Loaded config file");
    } else {
        info!(path = %cli.config.display(), "No config file found, using defaults");
    }

    // ── Registries ──
    let own = Registry::new();
    let metrics = if config.server.instrument {
        Some(HandlerMetrics::register(&own)?)
    } else {
        None
    };
    let gatherers = Gatherers::new()
        .with(own)
        .with(prometheus::default_registry().clone());

    // ── Handler ──
    let options = config.handler.to_options(Some(Arc::new(TracingErrorLog)));
    info!(
        error_handling = %options.error_handling,
        compression = !options.disable_compression,
        instrumented = metrics.is_some(),
        "Exposition handler configured"
    );
    let handler = MetricsHandler::new(gatherers, options);

    let mut state = AdminState::new(handler, config.server.metrics_path.clone());
    if let Some(metrics) = metrics {
        state = state.with_metrics(metrics);
    }

    // ── Serve until SIGTERM/SIGINT ──
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vitrine")
        .build()?;
    rt.block_on(vitrine_admin::start_admin(
        config.server.clone(),
        Arc::new(state),
        wait_for_shutdown_signal(),
    ))?;

    info!("Vitrine stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received, stopping...");
}
