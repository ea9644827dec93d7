use std::sync::Arc;

use chat_gateway::acceptor::AppState;
use chat_gateway::auth::InMemoryTokenValidator;
use chat_gateway::config::GatewayConfig;
use chat_gateway::connections::ConnectionRegistry;
use chat_gateway::gateway::Gateway;
use event_queue::{DurableQueue, EventQueue, InProcessQueue};
use room_registry::{InMemoryChannelDirectory, RoomRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let config = GatewayConfig::load_from_env().expect("invalid configuration");

    let queue: Arc<dyn EventQueue> = match config.durable_queue {
        Some(durable_config) => {
            info!("connecting to durable event queue...");
            Arc::new(
                DurableQueue::new(durable_config)
                    .await
                    .expect("failed to initialize durable queue"),
            )
        }
        None => {
            info!("no QUEUE_ADDR set, running with an in-process event queue only");
            Arc::new(InProcessQueue::new(256))
        }
    };

    // The channel directory and admin-role provider are external
    // collaborators owned by the REST CRUD service in a full deployment
    // (spec §1's out-of-scope list); this binary runs against in-memory
    // stand-ins until a real adapter is wired in.
    let channels = Arc::new(InMemoryChannelDirectory::new());
    let roles = Arc::new(chat_gateway::roles::InMemoryRoleProvider::new());
    let tokens = Arc::new(InMemoryTokenValidator::new());

    let gateway = Arc::new(Gateway::new(
        Arc::new(RoomRegistry::new()),
        channels,
        roles,
        queue,
        Arc::new(ConnectionRegistry::new()),
    ));

    let state = Arc::new(AppState { gateway, tokens });
    let router = chat_gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %config.bind_addr, "chat gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("chat gateway shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
