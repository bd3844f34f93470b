/// Preset injection for workflow options and labels
///
/// The execution engine has no notion of workspaces, so tenancy is carried in
/// labels the gateway owns. These functions overwrite every reserved key in the
/// caller's sets with values computed by the gateway. They are the last mutation
/// applied before the sets are serialized into the submission bundle.

use crate::workflow::types::{LabelSet, ObjectLocator, OptionSet, WorkspaceId};
use serde_json::Value;

/// Label binding a workflow to its workspace
pub const WORKSPACE_ID_LABEL: &str = "workspace-id";
/// Label recording the submitting user
pub const USER_EMAIL_LABEL: &str = "user-email";
/// Label recording the storage location of the main source document
pub const SOURCE_URL_LABEL: &str = "source-url";

/// Execution root bucket; the one reserved option the caller must supply
pub const ROOT_BUCKET_OPTION: &str = "jes_gcs_root";
pub const SERVICE_ACCOUNT_KEY_OPTION: &str = "user_service_account_json";
pub const CALL_CACHE_PREFIXES_OPTION: &str = "call_cache_hit_path_prefixes";
pub const PROJECT_OPTION: &str = "google_project";
pub const COMPUTE_SERVICE_ACCOUNT_OPTION: &str = "google_compute_service_account";
pub const DEFAULT_RUNTIME_ATTRIBUTES_OPTION: &str = "default_runtime_attributes";

/// Values resolved from external collaborators before injection
#[derive(Debug, Clone)]
pub struct PresetContext {
    pub workspace_id: WorkspaceId,
    pub user_email: String,
    pub project_id: String,
    /// Service-account key material, forwarded verbatim to the engine
    pub service_account_key: String,
    pub compute_service_account: String,
    /// Set only when the source came from object storage
    pub source: Option<ObjectLocator>,
    pub default_runtime_attributes: Value,
}

/// Return the caller-supplied execution root bucket, if present and a non-empty string
pub fn root_bucket(options: &OptionSet) -> Option<&str> {
    options
        .get(ROOT_BUCKET_OPTION)
        .and_then(Value::as_str)
        .filter(|root| !root.is_empty())
}

/// Overwrite reserved option keys. `jes_gcs_root` is left as the caller gave it.
///
/// Callers validate the root bucket before reaching this point; a missing root
/// yields an empty call-cache prefix list rather than a panic.
pub fn finalize_options(mut options: OptionSet, ctx: &PresetContext) -> OptionSet {
    let prefixes: Vec<Value> = root_bucket(&options)
        .map(|root| vec![Value::String(root.to_string())])
        .unwrap_or_default();

    options.insert(
        SERVICE_ACCOUNT_KEY_OPTION.to_string(),
        Value::String(ctx.service_account_key.clone()),
    );
    options.insert(CALL_CACHE_PREFIXES_OPTION.to_string(), Value::Array(prefixes));
    options.insert(PROJECT_OPTION.to_string(), Value::String(ctx.project_id.clone()));
    options.insert(
        COMPUTE_SERVICE_ACCOUNT_OPTION.to_string(),
        Value::String(ctx.compute_service_account.clone()),
    );
    options.insert(
        DEFAULT_RUNTIME_ATTRIBUTES_OPTION.to_string(),
        ctx.default_runtime_attributes.clone(),
    );
    options
}

/// Overwrite reserved label keys; other caller labels pass through untouched
pub fn finalize_labels(mut labels: LabelSet, ctx: &PresetContext) -> LabelSet {
    labels.insert(WORKSPACE_ID_LABEL.to_string(), ctx.workspace_id.to_string());
    labels.insert(USER_EMAIL_LABEL.to_string(), ctx.user_email.clone());
    match &ctx.source {
        Some(locator) => {
            labels.insert(SOURCE_URL_LABEL.to_string(), locator.to_string());
        }
        // A caller cannot claim a storage origin the gateway did not fetch from
        None => {
            labels.remove(SOURCE_URL_LABEL);
        }
    }
    labels
}

/// Label filter that scopes an engine query to one workspace
pub fn workspace_label_filter(workspace_id: &WorkspaceId) -> String {
    format!("{}:{}", WORKSPACE_ID_LABEL, workspace_id)
}
