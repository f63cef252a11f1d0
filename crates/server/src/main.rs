use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creatorflow_core::{
    create_generative_client, load_config, validate_config, CallLifecycleManager,
    CampaignWorkflow, ConversationStore, CreatorPool, DisabledTelephony, GenerativeGateway,
    HttpTelephonyClient, SlidingWindowLimiter, SqliteConversationStore, TelephonyClient,
};

use creatorflow_server::api::{create_router, WsBroadcaster};
use creatorflow_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CREATORFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // Fingerprint the effective config
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);

    // One admission window shared by every stage and advisor
    let limiter = Arc::new(SlidingWindowLimiter::new(&config.rate_limit));
    info!(
        capacity = config.rate_limit.capacity,
        window_ms = config.rate_limit.window_ms,
        "Rate limiter initialized"
    );

    let gateway = match &config.generative {
        Some(gen_config) => {
            let client = create_generative_client(gen_config);
            if client.is_none() {
                warn!("Generative client could not be created, stages will use fallbacks");
            }
            GenerativeGateway::new(Arc::clone(&limiter), client)
                .with_generation_defaults(gen_config.max_tokens, gen_config.temperature)
        }
        None => {
            info!("No generative provider configured, stages will use fallbacks");
            GenerativeGateway::disabled(Arc::clone(&limiter))
        }
    };

    // Create SQLite conversation store
    let conversations: Arc<dyn ConversationStore> = Arc::new(
        SqliteConversationStore::new(&config.database.path)
            .context("Failed to create conversation store")?,
    );
    info!("Conversation store initialized");

    let pool = match &config.pipeline.creator_pool_path {
        Some(path) => CreatorPool::from_json_file(path)
            .with_context(|| format!("Failed to load creator pool from {:?}", path))?,
        None => CreatorPool::builtin(),
    };
    info!("Creator pool loaded ({} creators)", pool.len());

    let workflow = CampaignWorkflow::new(
        gateway.clone(),
        Arc::new(pool),
        Arc::clone(&conversations),
        &config.pipeline,
    );

    let telephony: Arc<dyn TelephonyClient> = match &config.telephony {
        Some(tel_config) => {
            info!("Initializing telephony client at {}", tel_config.api_base);
            Arc::new(HttpTelephonyClient::new(tel_config))
        }
        None => {
            info!("No telephony service configured, call placement disabled");
            Arc::new(DisabledTelephony)
        }
    };

    let calls = CallLifecycleManager::new(
        telephony,
        Arc::clone(&conversations),
        config.calls.clone(),
    );

    // Create WebSocket broadcaster for real-time call updates
    let ws_broadcaster = WsBroadcaster::default();
    info!("WebSocket broadcaster initialized");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        gateway,
        conversations,
        workflow,
        calls.clone(),
        ws_broadcaster,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop polling so no task outlives the runtime
    info!("Server shutting down...");
    calls.shutdown();
    info!("Call manager stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
