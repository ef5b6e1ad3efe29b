use crate::core::error::{EsmError, EsmResult};
use std::path::{Path, PathBuf};

/// Name of the project manifest sidecar file
pub const MANIFEST_FILE: &str = "esmbox.json";

/// Name of the emitted bundle inside each package output directory
pub const BUNDLE_FILE: &str = "bundle.js";

/// Get the esmbox home directory
///
/// Platform-specific locations:
/// - Windows: %APPDATA%\esmbox
/// - Linux: ~/.config/esmbox
/// - macOS: ~/Library/Application Support/esmbox
pub fn esmbox_home() -> EsmResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| EsmError::Path("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("esmbox"))
}

/// Get the config file path (`<esmbox_home>/config.yaml`)
pub fn config_file() -> EsmResult<PathBuf> {
    Ok(esmbox_home()?.join("config.yaml"))
}

/// Get the manifest path for a project (./esmbox.json)
pub fn manifest_file(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_FILE)
}

/// Resolve the output root, relative paths being taken from the project root
pub fn output_root(project_root: &Path, output_dir: &Path) -> PathBuf {
    if output_dir.is_absolute() {
        output_dir.to_path_buf()
    } else {
        project_root.join(output_dir)
    }
}

/// Directory holding one converted package: `<output_root>/<name>@<version>`
///
/// Scoped names keep their scope as a parent directory
/// (`@scope/name@1.0.0`).
pub fn package_output_dir(output_root: &Path, name: &str, version: &str) -> PathBuf {
    output_root.join(format!("{}@{}", name, version))
}

/// Find the project root by looking for esmbox.json
///
/// Walks up from `start`; when no ancestor holds a manifest, `start`
/// itself is the project root.
pub fn find_project_root(start: &Path) -> PathBuf {
    let mut current = Some(start);

    while let Some(dir) = current {
        if is_project_root(dir) {
            return dir.to_path_buf();
        }
        current = dir.parent();
    }

    start.to_path_buf()
}

/// Check if a directory holds an esmbox.json
pub fn is_project_root(dir: &Path) -> bool {
    manifest_file(dir).exists()
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> EsmResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_project_root() {
        let temp = TempDir::new().unwrap();
        let project_dir = temp.path().join("project");
        fs::create_dir_all(project_dir.join("subdir")).unwrap();
        fs::write(project_dir.join(MANIFEST_FILE), "{\"packages\":{}}").unwrap();

        let found = find_project_root(&project_dir.join("subdir"));
        assert_eq!(found, project_dir);
    }

    #[test]
    fn test_find_project_root_falls_back_to_start() {
        let temp = TempDir::new().unwrap();
        let found = find_project_root(temp.path());
        assert_eq!(found, temp.path());
    }

    #[test]
    fn test_package_output_dir_layout() {
        let root = Path::new("/srv/web_modules");
        assert_eq!(
            package_output_dir(root, "left-pad", "1.3.0"),
            PathBuf::from("/srv/web_modules/left-pad@1.3.0")
        );
        assert_eq!(
            package_output_dir(root, "@scope/pkg", "2.0.0"),
            PathBuf::from("/srv/web_modules/@scope/pkg@2.0.0")
        );
    }

    #[test]
    fn test_output_root_relative_and_absolute() {
        let project = Path::new("/work/app");
        assert_eq!(
            output_root(project, Path::new("web_modules")),
            PathBuf::from("/work/app/web_modules")
        );
        assert_eq!(
            output_root(project, Path::new("/var/esm")),
            PathBuf::from("/var/esm")
        );
    }

    #[test]
    fn test_ensure_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("test_dir");

        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
