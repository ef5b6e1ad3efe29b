use crate::core::{EsmError, EsmResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Find the directory holding `package.json` inside an extracted archive
///
/// The directory itself wins; otherwise its immediate subdirectories are
/// checked in lexical order.
pub fn locate_root(dir: &Path) -> EsmResult<PathBuf> {
    if dir.join("package.json").is_file() {
        return Ok(dir.to_path_buf());
    }

    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    subdirs
        .into_iter()
        .find(|sub| sub.join("package.json").is_file())
        .ok_or_else(|| EsmError::RootNotFound(dir.to_path_buf()))
}
