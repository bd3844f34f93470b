/// flowgate: workspace-scoped workflow gateway
///
/// Main entry point. Loads configuration from the environment and serves:
/// - Workflow API at /api/workspaces/{workspace_id}/workflows/*
/// - Health check at /healthz

use flowgate::{config::Config, server::start_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (FLOWGATE_* environment variables with local defaults)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
