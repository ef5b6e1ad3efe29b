// Core functionality
pub mod core;

// Project manifest (esmbox.json)
pub mod package;

// Re-export commonly used types
pub use core::{format_error_with_help, ErrorHelp, EsmError, EsmResult};
pub use package::manifest::{ManifestAction, ManifestUpdate, ProjectManifest};
