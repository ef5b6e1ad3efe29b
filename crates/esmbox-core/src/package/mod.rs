pub mod manifest;

pub use manifest::{ManifestAction, ManifestUpdate, ProjectManifest};
