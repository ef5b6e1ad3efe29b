use crate::bundler::esbuild::EsbuildBackend;
use crate::bundler::native::NativeBackend;
use crate::bundler::resolver::is_typescript;
use esmbox_core::core::path::{ensure_dir, BUNDLE_FILE};
use esmbox_core::{EsmError, EsmResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Options shared by every bundle backend
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Minify output
    pub minify: bool,
    /// Allow TypeScript entry points (only meaningful for backends that transpile)
    pub transpile_typescript: bool,
}

/// Something that can turn an entry file into one ES module on disk
pub trait BundleBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bundle `entry` (inside `root`) and everything it imports into `output_file`
    fn bundle(
        &self,
        root: &Path,
        entry: &Path,
        output_file: &Path,
        options: &BundleOptions,
    ) -> EsmResult<()>;
}

/// Which backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// esbuild when it is installed, the native bundler otherwise
    #[default]
    Auto,
    Esbuild,
    Native,
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::Auto => write!(f, "auto"),
            BackendChoice::Esbuild => write!(f, "esbuild"),
            BackendChoice::Native => write!(f, "native"),
        }
    }
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendChoice::Auto),
            "esbuild" => Ok(BackendChoice::Esbuild),
            "native" => Ok(BackendChoice::Native),
            other => Err(format!(
                "unknown bundler '{}' (expected auto, esbuild or native)",
                other
            )),
        }
    }
}

impl BackendChoice {
    /// Build the backend this choice stands for
    pub fn backend(self, esbuild_path: Option<&Path>) -> EsmResult<Box<dyn BundleBackend>> {
        match self {
            BackendChoice::Native => Ok(Box::new(NativeBackend::new())),
            BackendChoice::Esbuild => EsbuildBackend::locate(esbuild_path)
                .map(|b| Box::new(b) as Box<dyn BundleBackend>)
                .ok_or_else(|| {
                    EsmError::BundleFailed(
                        "esbuild was requested but no esbuild executable was found".to_string(),
                    )
                }),
            BackendChoice::Auto => Ok(match EsbuildBackend::locate(esbuild_path) {
                Some(esbuild) => Box::new(esbuild),
                None => Box::new(NativeBackend::new()),
            }),
        }
    }
}

/// Bundle one package's entry point into `<out_dir>/bundle.js`
pub struct Bundler {
    /// Package root directory
    root: PathBuf,
    /// Entry point file
    entry: PathBuf,
    /// Output directory
    out_dir: PathBuf,
    options: BundleOptions,
    backend: Box<dyn BundleBackend>,
}

impl Bundler {
    pub fn new(
        root: PathBuf,
        entry: PathBuf,
        out_dir: PathBuf,
        options: BundleOptions,
        choice: BackendChoice,
        esbuild_path: Option<&Path>,
    ) -> EsmResult<Self> {
        let backend = choice.backend(esbuild_path)?;
        Ok(Self::with_backend(root, entry, out_dir, options, backend))
    }

    pub fn with_backend(
        root: PathBuf,
        entry: PathBuf,
        out_dir: PathBuf,
        options: BundleOptions,
        backend: Box<dyn BundleBackend>,
    ) -> Self {
        Self {
            root,
            entry,
            out_dir,
            options,
            backend,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run the backend, returning the path of the written bundle
    pub fn bundle(&self) -> EsmResult<PathBuf> {
        if !self.entry.is_file() {
            return Err(EsmError::BundleFailed(format!(
                "Entry file not found: {}",
                self.entry.display()
            )));
        }

        if is_typescript(&self.entry) && !self.options.transpile_typescript {
            return Err(EsmError::BundleFailed(format!(
                "TypeScript entry {} needs transpilation, which is disabled",
                self.entry.display()
            )));
        }

        ensure_dir(&self.out_dir)?;
        let output_file = self.out_dir.join(BUNDLE_FILE);

        tracing::info!(
            backend = self.backend.name(),
            entry = %self.entry.display(),
            "bundling"
        );
        self.backend
            .bundle(&self.root, &self.entry, &output_file, &self.options)?;

        if !output_file.is_file() {
            return Err(EsmError::BundleFailed(format!(
                "{} finished without writing {}",
                self.backend.name(),
                output_file.display()
            )));
        }

        Ok(output_file)
    }
}
