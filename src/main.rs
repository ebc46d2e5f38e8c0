use clap::Parser;
use prometheus::Registry;
use std::process::ExitCode;
use std::sync::Arc;

use swupd_server::config::{self, Config};
use swupd_server::handler::{CompletionFileServer, InstrumentedServer, StaticFiles};
use swupd_server::metrics::{endpoint, ServerMetrics};
use swupd_server::server::{self, ServerLoopConfig, Shutdown};
use swupd_server::{logger, Result};

/// Serve update content and metrics about it
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Configuration file, extension optional
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match Config::load_from(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logger::init(&cfg.logging) {
        eprintln!("[ERROR] {e}");
        return ExitCode::FAILURE;
    }

    match run(cfg) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: Config) -> Result<()> {
    // Create the Tokio runtime, sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<()> {
    let app_addr = cfg.get_socket_addr()?;
    let metrics_addr = cfg.get_metrics_socket_addr()?;

    let app_listener = server::bind(app_addr)?;
    let metrics_listener = server::bind(metrics_addr)?;

    let registry = Registry::new();
    let metrics = Arc::new(ServerMetrics::new(&registry, &cfg.metrics)?);

    let shutdown = Shutdown::new();
    server::start_signal_handler(shutdown.clone())?;

    let files = StaticFiles::new(&cfg.files);
    let mut handler = InstrumentedServer::new(CompletionFileServer::new(files), metrics);
    if cfg.logging.access_log {
        handler = handler.with_access_log(cfg.logging.access_log_format.clone());
    }

    logger::log_server_start(&app_addr, &cfg);

    let metrics_server = tokio::spawn(endpoint::serve(
        metrics_listener,
        registry,
        shutdown.clone(),
    ));

    server::start_server_loop(
        app_listener,
        Arc::new(handler),
        ServerLoopConfig {
            performance: cfg.performance.clone(),
            shutdown,
        },
    )
    .await;

    if let Err(e) = metrics_server.await {
        logger::log_error(&format!("Metrics endpoint task failed: {e}"));
    }
    Ok(())
}
