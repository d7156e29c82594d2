//! Voice Agent
//!
//! Joins one voice channel through the voice gateway and loops a fixed audio
//! clip while people are listening.
//!
//! # Servers
//!
//! A single HTTP server (default: 0.0.0.0:8090) carries:
//! - the ingress routes the gateway calls (`/v1/commands/*`, `/v1/events/*`)
//! - `/health`, `/ready` and `/metrics`
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Validate the audio asset
//! 3. Initialize Prometheus metrics recorder
//! 4. Create the gateway client and the player
//! 5. Spawn the agent actor
//! 6. Bind and start the HTTP server, mark ready
//! 7. Wait for shutdown signal, then disconnect before exiting

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_agent::actors::{AgentActor, AgentSettings};
use voice_agent::audio::AudioSource;
use voice_agent::config::Config;
use voice_agent::gateway::{ingress_router, GatewayClient, GatewayPlayer, IngressAuth, IngressState};
use voice_agent::observability::{health_router, metrics_router, HealthState};
use voice_agent::transport::{AudioPlayer, VoiceTransport};
use voice_agent::triggers::TriggerTable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Voice Agent");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        gateway_url = %config.gateway_url,
        endpoint = %config.endpoint,
        audio_file = %config.audio_file.display(),
        http_bind_address = %config.http_bind_address,
        reconnect_grace_ms = config.reconnect_grace_ms,
        error_retry_ms = config.error_retry_ms,
        settle_delay_ms = config.settle_delay_ms,
        auto_join = config.auto_join,
        "Configuration loaded successfully"
    );

    // The asset is checked once; a missing file is not retried.
    let audio = AudioSource::from_path(&config.audio_file).map_err(|e| {
        error!(error = %e, "Audio asset unavailable");
        e
    })?;

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    let prometheus_handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        format!("Failed to install Prometheus metrics recorder: {e}")
    })?;
    info!("Prometheus metrics recorder initialized");

    let health_state = Arc::new(HealthState::new());

    // Gateway client and the player shared across connections
    let gateway = Arc::new(GatewayClient::new(
        config.gateway_url.clone(),
        config.gateway_token.clone(),
    )?);
    let player = GatewayPlayer::create(Arc::clone(&gateway))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create player on voice gateway");
            e
        })?;
    info!(player_id = %player.player_id(), "Player created");

    // Spawn the agent actor
    let settings = AgentSettings {
        endpoint: config.endpoint,
        audio,
        timings: config.timings(),
        auto_join: config.auto_join,
    };
    let (agent, agent_task) = AgentActor::spawn(
        settings,
        gateway as Arc<dyn VoiceTransport>,
        Arc::new(player) as Arc<dyn AudioPlayer>,
        CancellationToken::new(),
    );
    info!("Agent actor started");

    // HTTP server: ingress, health and metrics
    let addr: SocketAddr = config.http_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.http_bind_address, "Invalid HTTP bind address");
        format!("Invalid HTTP bind address: {e}")
    })?;

    let ingress = ingress_router(
        IngressState {
            agent: agent.clone(),
            triggers: Arc::new(TriggerTable::default()),
        },
        Arc::new(IngressAuth::new(config.ingress_token.clone())),
    );
    let app = ingress
        .merge(health_router(Arc::clone(&health_state)))
        .merge(metrics_router(prometheus_handle))
        .layer(TraceLayer::new_for_http());

    // Bind listener BEFORE spawning to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(error = %e, addr = %addr, "Failed to bind HTTP server");
        format!("Failed to bind HTTP server to {addr}: {e}")
    })?;

    let server_token = CancellationToken::new();
    let server_shutdown = server_token.clone();
    let server_task = tokio::spawn(async move {
        info!(addr = %addr, "HTTP server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            server_shutdown.cancelled().await;
            info!("HTTP server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "HTTP server failed");
        }
    });

    health_state.set_ready();
    info!("Voice Agent running - press Ctrl+C to shutdown");

    shutdown_signal().await;
    info!("Shutdown signal received, initiating graceful shutdown...");

    // Mark as not ready immediately so the gateway stops forwarding events
    health_state.set_not_ready();

    // Leave the channel before the process goes away
    if let Err(e) = agent.shutdown().await {
        warn!(error = %e, "Agent shutdown error");
    }
    if let Err(e) = agent_task.await {
        warn!(error = %e, "Agent task ended abnormally");
    }

    server_token.cancel();
    if let Err(e) = server_task.await {
        warn!(error = %e, "HTTP server task ended abnormally");
    }

    info!("Voice Agent shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
