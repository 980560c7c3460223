//! Actant Gateway - deployable node hosting actors and their trust surface
//!
//! Serves the actor factory, /meta probes, and the full /trust tree for
//! every actor hosted under the configured root URL.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use http::Method;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use service::{Config, State};

/// Actant Gateway - deployable node hosting actors and their trust surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for HTTP requests
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Root URL actors are addressed under (must end with a slash)
    #[arg(long)]
    root: Option<String>,

    /// Actor type URN advertised to peers
    #[arg(long)]
    actor_type: Option<String>,

    /// Relationship label auto-accepted from peers
    #[arg(long)]
    default_relationship: Option<String>,

    /// Disable auto-acceptance of the default relationship
    #[arg(long)]
    manual_approval: bool,

    /// Timeout in seconds for outbound peer calls
    #[arg(long, default_value = "20")]
    peer_timeout: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    let log_level: tracing::Level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();

    tracing::info!("Starting Actant Gateway");

    // Create configuration
    let mut config = Config::default();
    config.log_level = log_level;
    if let Some(root) = args.root {
        config.core.root = root;
    } else {
        config.core.root = format!("http://localhost:{}/", args.port);
    }
    if let Some(actor_type) = args.actor_type {
        config.core.actor_type = actor_type;
    }
    if let Some(relationship) = args.default_relationship {
        config.core.default_relationship = relationship;
    }
    if args.manual_approval {
        config.core.auto_accept_default_relationship = false;
    }
    config.core.peer_timeout = Duration::from_secs(args.peer_timeout);

    // Create state
    let state = match State::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to create service state: {}", e);
            std::process::exit(1);
        }
    };

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let graceful_shutdown = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    };
    tokio::spawn(graceful_shutdown);

    // Build router
    let listen_addr = SocketAddr::from_str(&format!("0.0.0.0:{}", args.port))?;
    let router = build_router(state);

    tracing::info!("Gateway listening on {}", listen_addr);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    let mut server_rx = shutdown_rx.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = server_rx.changed().await;
        })
        .await?;

    tracing::info!("Gateway shutdown complete");
    Ok(())
}

/// Build the router with transport-level layers applied
fn build_router(state: State) -> axum::Router {
    let cors_layer = CorsLayer::new()
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers(vec![ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN])
        .allow_origin(Any)
        .allow_credentials(false);

    let trace_layer = TraceLayer::new_for_http();

    service::http::router(state).layer(cors_layer).layer(trace_layer)
}
