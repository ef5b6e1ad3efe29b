use crate::core::path::{config_file, ensure_dir};
use crate::core::{EsmError, EsmResult};
use esmbox_bundle::BackendChoice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding `registry_url`
pub const REGISTRY_ENV: &str = "ESMBOX_REGISTRY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// npm-compatible registry base URL
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Where converted packages go, relative to the project root unless absolute
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Host `esmbox serve` binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// First port `esmbox serve` tries
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cap on bind attempts while ports are busy (unbounded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_port_attempts: Option<u32>,

    /// Bundler backend: auto, esbuild or native
    #[serde(default)]
    pub bundler: BackendChoice,

    /// Explicit esbuild executable (otherwise looked up on PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esbuild_path: Option<PathBuf>,
}

fn default_registry_url() -> String {
    "https://registry.npmjs.org".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("web_modules")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            output_dir: default_output_dir(),
            host: default_host(),
            port: default_port(),
            max_port_attempts: None,
            bundler: BackendChoice::default(),
            esbuild_path: None,
        }
    }
}

impl Config {
    /// Load config from the platform config directory, creating a default one
    /// if it doesn't exist, then apply environment overrides
    ///
    /// Config locations:
    /// - Windows: %APPDATA%\esmbox\config.yaml
    /// - Linux: ~/.config/esmbox/config.yaml
    /// - macOS: ~/Library/Application Support/esmbox/config.yaml
    pub fn load() -> EsmResult<Self> {
        let mut config = Self::load_from(&config_file()?)?;
        config.apply_env(std::env::var(REGISTRY_ENV).ok());
        Ok(config)
    }

    pub fn load_from(config_path: &Path) -> EsmResult<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(config_path)?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| EsmError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> EsmResult<()> {
        if let Some(config_dir) = config_path.parent() {
            ensure_dir(config_dir)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| EsmError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, content)?;
        Ok(())
    }

    fn apply_env(&mut self, registry: Option<String>) {
        if let Some(url) = registry.filter(|u| !u.trim().is_empty()) {
            self.registry_url = url;
        }
    }
}
