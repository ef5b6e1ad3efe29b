//! esmbox: npm packages as standalone, browser-ready ES modules
//!
//! This crate ties the pipeline together: registry lookup, archive fetch,
//! entry resolution, bundling (via `esmbox-bundle`) and asset copying, plus
//! the project manifest re-exported from `esmbox-core`. Serving lives in
//! `esmbox-serve`.

pub use esmbox_core::{format_error_with_help, ErrorHelp, EsmError, EsmResult};
pub use esmbox_core::package::manifest::{ManifestAction, ManifestUpdate, ProjectManifest};

/// Core module re-exported from esmbox-core.
pub mod core {
    pub use esmbox_core::*;
    pub use esmbox_core::core::*;

    /// Path module re-exported from esmbox-core.
    pub mod path {
        pub use esmbox_core::core::path::*;
    }
}

/// Configuration management.
pub mod config;

/// npm registry access (metadata documents and version selection).
pub mod registry;

/// Package conversion (fetch, entry resolution, bundling, assets).
pub mod package;
