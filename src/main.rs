use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

mod config;
mod handler;
mod http;
mod logger;
mod ratelimit;
mod server;
mod upstream;
mod validation;

use server::{SignalHandler, create_reusable_listener, drain_connections, start_server_loop, start_signal_handler};

/// Config file looked up when no path is given (extension optional)
const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;

    let grace = Duration::from_secs(cfg.performance.shutdown_grace);
    let state = Arc::new(config::AppState::from_config(cfg)?);
    let active_connections = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &state.config, state.rate_limiter.backend_name());

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals));

    start_server_loop(
        listener,
        state,
        Arc::clone(&active_connections),
        Arc::clone(&signals.shutdown),
    )
    .await;

    let remaining = drain_connections(&active_connections, grace).await;
    logger::log_shutdown_complete(remaining);
    Ok(())
}
