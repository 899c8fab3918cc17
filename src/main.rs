//! vigil - HTTP uptime monitor
//!
//! Probes a fixed set of target URLs, debounces their up/down state and
//! notifies configured channels on confirmed transitions.

mod config;
mod logging;
mod notify;
mod probe;
mod scheduler;
mod store;
mod web;

use config::ServerConfig;
use logging::ConsoleBuffer;
use notify::Dispatcher;
use probe::HttpProber;
use scheduler::Scheduler;
use store::TargetStore;
use web::Server;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    let console = ConsoleBuffer::default();
    logging::init(console.clone())?;

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting vigil on port {}...", cfg.http_port);

    let store = Arc::new(TargetStore::open(&cfg.config_path, cfg.max_targets));
    tracing::info!("Using target store at {}", store.path().display());
    tracing::info!(
        "Loaded {} of {} target slots",
        store.list().iter().filter(|t| t.is_persisted()).count(),
        store.capacity()
    );

    let prober = Arc::new(HttpProber::new(cfg.probe_timeout)?);
    let notifier = Arc::new(Dispatcher::new(cfg.notify_timeout, &cfg.telegram_api)?);

    // Start scheduler
    let scheduler = Arc::new(Scheduler::new(store.clone(), prober, notifier));
    scheduler.start().await;

    // Start web server
    let server = Server::new(cfg, store, scheduler, console);
    server.start().await?;

    Ok(())
}
