/// HTTP API Layer
///
/// This module provides the REST endpoints in front of the workflow gateway.
/// It handles:
/// - Bearer token extraction
/// - Workspace-scoped submit/status/labels/metadata/query routes
/// - Query-string parsing (including dropping caller label filters)

// Authorization header extraction
pub mod auth;

// Metadata/query filter parsing
pub mod params;

// Workflow endpoints
pub mod workflows;

// Re-export router builder
pub use workflows::{create_workflow_routes, AppState};
