/// Server setup and initialization
///
/// Wires together all components: collaborator clients, the workflow gateway and
/// HTTP routes. Provides the main application factory for creating the Axum app.

use crate::{
    api::workflows::{create_workflow_routes, AppState},
    clients::{build_http_client, EngineClient, GcsObjectStorage, HttpIdentityService, HttpWorkspaceAccess},
    config::Config,
    service::{Collaborators, GatewaySettings, WorkflowGateway},
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Build the gateway with HTTP-backed collaborators from configuration
pub fn build_gateway(config: &Config) -> Result<WorkflowGateway> {
    tracing::info!("🌐 Building collaborator clients (timeout {}s)", config.http.timeout_secs);
    let http = build_http_client(config.http.timeout_secs)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    tracing::debug!("⚙️ Execution engine: {}", config.engine.base_url);
    tracing::debug!("🏢 Workspace service: {}", config.workspace_service.base_url);
    tracing::debug!("🪪 Identity service: {}", config.identity.base_url);
    tracing::debug!("🪣 Object storage: {}", config.storage.base_url);

    let collaborators = Collaborators {
        workspaces: Arc::new(HttpWorkspaceAccess::new(&config.workspace_service.base_url, http.clone())),
        identity: Arc::new(HttpIdentityService::new(
            &config.identity.base_url,
            config.identity.service_token.clone(),
            http.clone(),
        )),
        storage: Arc::new(GcsObjectStorage::new(
            &config.storage.base_url,
            config.storage.access_token.clone(),
            http.clone(),
        )),
        engine: Arc::new(EngineClient::new(&config.engine.base_url, http)),
    };

    Ok(WorkflowGateway::new(collaborators, GatewaySettings::from_config(config)))
}

/// Router over an already-built gateway
pub fn create_router(gateway: Arc<WorkflowGateway>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/healthz", get(health_check))
        // Workspace-scoped workflow API routes
        .merge(create_workflow_routes().with_state(AppState { gateway }))
}

/// Create the main Axum application with all routes
pub async fn create_app(config: Config) -> Result<Router> {
    // Scratch entries are created below this directory for every submission
    tracing::info!("📁 Ensuring scratch directory exists: {}", config.staging.scratch_dir.display());
    tokio::fs::create_dir_all(&config.staging.scratch_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create scratch directory: {}", e))?;

    tracing::info!("🏗️ Initializing workflow gateway");
    let gateway = Arc::new(build_gateway(&config)?);

    tracing::info!("✅ Application initialized successfully");
    Ok(create_router(gateway))
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting flowgate server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
