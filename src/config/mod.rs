/// Configuration management for the flowgate gateway
///
/// Holds the addresses of every external collaborator plus the knobs used while
/// assembling submissions. The whole tree is passed explicitly to the components
/// that need it; nothing here is process-global.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Remote workflow execution engine
    pub engine: EngineConfig,
    /// Workspace access service
    pub workspace_service: WorkspaceServiceConfig,
    /// Identity service (caller email, service identities, key material)
    pub identity: IdentityConfig,
    /// Object storage holding workflow sources
    pub storage: StorageConfig,
    /// Local staging area for submission bundles
    pub staging: StagingConfig,
    /// Values injected into every submission
    pub submission: SubmissionConfig,
    /// Shared settings for outbound HTTP clients
    pub http: HttpConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the execution engine (e.g., "http://cromwell:8000")
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceServiceConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub base_url: String,
    /// Service token for admin-only lookups (service-account key material)
    pub service_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Object storage JSON API root (e.g., "https://storage.googleapis.com")
    pub base_url: String,
    /// Optional bearer token used for object reads
    pub access_token: Option<String>,
}

/// Staging area configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Root directory for scoped temporary files and directories.
    /// Every submission creates uniquely named entries below it and removes them on exit.
    pub scratch_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Written to the `default_runtime_attributes` option of every submission
    pub default_runtime_attributes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout for every collaborator client
    pub timeout_secs: u64,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn default_runtime_attributes() -> Value {
    json!({ "zones": "us-central1-a us-central1-b us-central1-c us-central1-f" })
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("FLOWGATE_HOST", "0.0.0.0"),
                port: env_or("FLOWGATE_PORT", "8080").parse().unwrap_or(8080),
            },
            engine: EngineConfig {
                base_url: env_or("FLOWGATE_ENGINE_URL", "http://localhost:8000"),
            },
            workspace_service: WorkspaceServiceConfig {
                base_url: env_or("FLOWGATE_WORKSPACE_URL", "http://localhost:8081"),
            },
            identity: IdentityConfig {
                base_url: env_or("FLOWGATE_IDENTITY_URL", "http://localhost:8082"),
                service_token: std::env::var("FLOWGATE_IDENTITY_TOKEN").ok(),
            },
            storage: StorageConfig {
                base_url: env_or("FLOWGATE_STORAGE_URL", "https://storage.googleapis.com"),
                access_token: std::env::var("FLOWGATE_STORAGE_TOKEN").ok(),
            },
            staging: StagingConfig {
                scratch_dir: std::env::var("FLOWGATE_SCRATCH_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| std::env::temp_dir()),
            },
            submission: SubmissionConfig {
                // Malformed JSON falls back to the built-in zones
                default_runtime_attributes: std::env::var("FLOWGATE_DEFAULT_RUNTIME_ATTRIBUTES")
                    .ok()
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_else(default_runtime_attributes),
            },
            http: HttpConfig {
                timeout_secs: env_or("FLOWGATE_HTTP_TIMEOUT_SECS", "60").parse().unwrap_or(60),
            },
        }
    }
}
