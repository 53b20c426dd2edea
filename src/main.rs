use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod dispatch;
mod http;
mod logger;
mod registry;
mod server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, honoring the configured worker count
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
    let listener = server::create_reusable_listener(addr)?;

    // The registry is built once here and never mutated afterwards;
    // misconfigured bindings abort startup instead of failing at dispatch
    let registry = registry::ServiceRegistry::from_bindings(&cfg.services)?;
    logger::log_server_start(&addr, &cfg, &registry.keys());

    let state = Arc::new(config::AppState::new(cfg, registry));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let signals = Arc::new(server::signal::SignalHandler::new());
    server::signal::start_signal_handler(Arc::clone(&signals));

    // LocalSet for spawn_local support
    let local = tokio::task::LocalSet::new();
    local
        .run_until(server::start_server_loop(
            listener,
            state,
            active_connections,
            Arc::clone(&signals.shutdown),
        ))
        .await;

    Ok(())
}
