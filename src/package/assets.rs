use crate::core::{EsmError, EsmResult};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions that count as assets (style sheets and images)
pub const ASSET_EXTENSIONS: &[&str] = &[
    "css", "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
];

/// Which assets travel with the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetMode {
    /// Only assets under the entry file's directory
    #[default]
    EntryScoped,
    /// Every allow-listed file in the package
    IncludeAll,
}

/// Assets copied and skipped, relative to the source root, sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetReport {
    pub copied: Vec<PathBuf>,
    /// Allow-listed files left behind by `EntryScoped` mode
    pub excluded: Vec<PathBuf>,
}

pub struct AssetSelector {
    mode: AssetMode,
}

pub fn is_asset(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ASSET_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

impl AssetSelector {
    pub fn new(mode: AssetMode) -> Self {
        Self { mode }
    }

    /// Copy assets from `source_root` into `dest`, keeping relative paths
    ///
    /// `boundary` is the directory entry-scoped mode keeps assets under.
    pub fn copy(&self, source_root: &Path, dest: &Path, boundary: &Path) -> EsmResult<AssetReport> {
        let mut report = AssetReport::default();

        for entry in WalkDir::new(source_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_asset(entry.path()) {
                continue;
            }

            let path = entry.path();
            let relative = path
                .strip_prefix(source_root)
                .map_err(|e| EsmError::Path(format!("{}: {}", path.display(), e)))?
                .to_path_buf();

            if self.mode == AssetMode::EntryScoped && !path.starts_with(boundary) {
                report.excluded.push(relative);
                continue;
            }

            let target = dest.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| EsmError::AssetCopyFailed {
                    path: relative.clone(),
                    source,
                })?;
            }
            fs::copy(path, &target).map_err(|source| EsmError::AssetCopyFailed {
                path: relative.clone(),
                source,
            })?;
            report.copied.push(relative);
        }

        if !report.excluded.is_empty() {
            tracing::warn!(
                count = report.excluded.len(),
                "assets outside the entry directory were not copied"
            );
        }

        Ok(report)
    }
}
