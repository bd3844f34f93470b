/// Submission Staging Layer
///
/// Local, request-scoped staging of submission bundles:
/// - Scoped scratch files and directories with guaranteed cleanup
/// - Dependency discovery, download and archiving for importing workflows

// Scoped temporary files/directories
pub mod scratch;

// Import detection and sibling download
pub mod dependencies;

pub use dependencies::{archive_dependencies, has_imports, DependencyError, DependencyResolver};
pub use scratch::{Scratch, ScratchArena, ScratchKind};
