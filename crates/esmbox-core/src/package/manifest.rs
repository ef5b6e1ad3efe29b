use crate::core::path::manifest_file;
use crate::core::{EsmError, EsmResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// The project's record of converted packages (`esmbox.json`)
///
/// Only `packages` is owned by esmbox; any other top-level keys are kept
/// as they were found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Package name -> converted version
    #[serde(default)]
    pub packages: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Change to apply to a manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestAction {
    /// Set (or overwrite) the entry to this version
    Add(String),
    /// Delete the entry if present
    Remove,
}

/// Outcome of [`ProjectManifest::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestUpdate {
    /// No esmbox.json in the project, nothing was written
    Skipped,
    /// The manifest already matched, nothing was written
    Unchanged,
    /// The manifest was rewritten
    Updated,
}

impl ProjectManifest {
    /// Load esmbox.json from a project root, `None` when it does not exist
    pub fn load(project_root: &Path) -> EsmResult<Option<Self>> {
        let path = manifest_file(project_root);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let manifest: ProjectManifest = serde_json::from_str(&content)?;
        Ok(Some(manifest))
    }

    /// Create an empty esmbox.json unless one already exists
    pub fn init(project_root: &Path) -> EsmResult<Self> {
        if let Some(existing) = Self::load(project_root)? {
            return Ok(existing);
        }

        let manifest = Self::default();
        manifest.save(project_root)?;
        Ok(manifest)
    }

    /// Apply an action in memory, returning whether anything changed
    pub fn apply(&mut self, name: &str, action: &ManifestAction) -> bool {
        match action {
            ManifestAction::Add(version) => {
                let previous = self.packages.insert(name.to_string(), version.clone());
                previous.as_deref() != Some(version.as_str())
            }
            ManifestAction::Remove => self.packages.remove(name).is_some(),
        }
    }

    /// Read-modify-write the project's esmbox.json
    ///
    /// A missing manifest is not an error: there is nothing to update.
    pub fn update(
        project_root: &Path,
        name: &str,
        action: &ManifestAction,
    ) -> EsmResult<ManifestUpdate> {
        let Some(mut manifest) = Self::load(project_root)? else {
            tracing::debug!("no {} in {}, skipping", crate::core::path::MANIFEST_FILE, project_root.display());
            return Ok(ManifestUpdate::Skipped);
        };

        if !manifest.apply(name, action) {
            return Ok(ManifestUpdate::Unchanged);
        }

        manifest.save(project_root)?;
        tracing::debug!(package = name, ?action, "manifest updated");
        Ok(ManifestUpdate::Updated)
    }

    /// Save esmbox.json atomically (temp file in the same directory, then rename)
    pub fn save(&self, project_root: &Path) -> EsmResult<()> {
        let path = manifest_file(project_root);
        let mut content = serde_json::to_string_pretty(self)
            .map_err(|e| EsmError::ManifestWriteFailed(format!("Failed to serialize manifest: {}", e)))?;
        content.push('\n');

        let mut temp = NamedTempFile::new_in(project_root).map_err(|e| {
            EsmError::ManifestWriteFailed(format!("Failed to create temp file in {}: {}", project_root.display(), e))
        })?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| EsmError::ManifestWriteFailed(format!("Failed to write temp file: {}", e)))?;
        temp.persist(&path).map_err(|e| {
            EsmError::ManifestWriteFailed(format!("Failed to replace {}: {}", path.display(), e.error))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_update_without_manifest_is_noop() {
        let temp = TempDir::new().unwrap();
        let outcome =
            ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Add("1.0.0".to_string()))
                .unwrap();

        assert_eq!(outcome, ManifestUpdate::Skipped);
        assert!(!manifest_file(temp.path()).exists());
    }

    #[test]
    fn test_add_then_remove_is_idempotent() {
        let temp = TempDir::new().unwrap();
        ProjectManifest::init(temp.path()).unwrap();

        let added =
            ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Add("1.2.3".to_string()))
                .unwrap();
        assert_eq!(added, ManifestUpdate::Updated);
        let manifest = ProjectManifest::load(temp.path()).unwrap().unwrap();
        assert_eq!(manifest.packages.get("pkg").map(String::as_str), Some("1.2.3"));

        let removed = ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Remove).unwrap();
        assert_eq!(removed, ManifestUpdate::Updated);
        let manifest = ProjectManifest::load(temp.path()).unwrap().unwrap();
        assert!(!manifest.packages.contains_key("pkg"));

        let again = ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Remove).unwrap();
        assert_eq!(again, ManifestUpdate::Unchanged);
    }

    #[test]
    fn test_add_overwrites_previous_version() {
        let temp = TempDir::new().unwrap();
        ProjectManifest::init(temp.path()).unwrap();

        ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Add("1.0.0".to_string())).unwrap();
        ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Add("2.0.0".to_string())).unwrap();

        let manifest = ProjectManifest::load(temp.path()).unwrap().unwrap();
        assert_eq!(manifest.packages.len(), 1);
        assert_eq!(manifest.packages["pkg"], "2.0.0");
    }

    #[test]
    fn test_unknown_keys_survive_rewrite() {
        let temp = TempDir::new().unwrap();
        fs::write(
            manifest_file(temp.path()),
            r#"{"name": "my-site", "packages": {"a": "1.0.0"}}"#,
        )
        .unwrap();

        ProjectManifest::update(temp.path(), "b", &ManifestAction::Add("2.0.0".to_string())).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(manifest_file(temp.path())).unwrap()).unwrap();
        assert_eq!(raw["name"], "my-site");
        assert_eq!(raw["packages"]["a"], "1.0.0");
        assert_eq!(raw["packages"]["b"], "2.0.0");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        ProjectManifest::init(temp.path()).unwrap();
        ProjectManifest::update(temp.path(), "pkg", &ManifestAction::Add("1.0.0".to_string())).unwrap();

        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_init_keeps_existing_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(manifest_file(temp.path()), r#"{"packages": {"a": "1.0.0"}}"#).unwrap();

        let manifest = ProjectManifest::init(temp.path()).unwrap();
        assert_eq!(manifest.packages["a"], "1.0.0");
    }
}
