pub mod add;
pub mod init;
pub mod install;
pub mod list;
pub mod remove;
pub mod serve;

use esmbox::config::Config;
use esmbox::core::path::{find_project_root, output_root};
use esmbox::core::{EsmError, EsmResult};
use std::env;
use std::path::{Path, PathBuf};

/// Project root and configuration, established once per invocation
pub struct Context {
    pub project_root: PathBuf,
    pub config: Config,
}

impl Context {
    pub fn load(project: Option<PathBuf>) -> EsmResult<Self> {
        let project_root = match project {
            Some(dir) => dir,
            None => {
                let current_dir = env::current_dir().map_err(|e| {
                    EsmError::Path(format!("Failed to get current directory: {}", e))
                })?;
                find_project_root(&current_dir)
            }
        };

        let config = Config::load()?;
        tracing::debug!(project = %project_root.display(), registry = %config.registry_url, "context loaded");

        Ok(Self {
            project_root,
            config,
        })
    }

    /// Output root, `dir` overriding the configured one
    pub fn output_root(&self, dir: Option<&Path>) -> PathBuf {
        let dir = dir.unwrap_or(self.config.output_dir.as_path());
        output_root(&self.project_root, dir)
    }
}
