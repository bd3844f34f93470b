/// Workflow Domain Layer
///
/// Identifiers, label/option sets and request shapes, plus the preset injector
/// that owns the reserved label and option keys.

// Core type definitions
pub mod types;

// Reserved keys and preset injection
pub mod presets;

// Re-export commonly used types
pub use types::{
    BearerToken, CallerContext, LabelSet, MetadataFilters, ObjectLocator, OptionSet, QueryFilters,
    SubmitWorkflowRequest, WorkflowId, WorkflowIdAndStatus, WorkflowLabels, WorkflowQueryResponse,
    WorkflowQueryResult, WorkflowState, WorkspaceId,
};
