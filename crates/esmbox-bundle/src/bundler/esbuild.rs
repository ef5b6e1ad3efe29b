use crate::bundler::core::{BundleBackend, BundleOptions};
use esmbox_core::{EsmError, EsmResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Bundles through an external `esbuild` executable
#[derive(Debug, Clone)]
pub struct EsbuildBackend {
    executable: PathBuf,
}

impl EsbuildBackend {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Use an explicit path when given, otherwise look `esbuild` up on PATH
    pub fn locate(explicit: Option<&Path>) -> Option<Self> {
        match explicit {
            Some(path) if path.is_file() => Some(Self::new(path.to_path_buf())),
            Some(path) => which::which(path).ok().map(Self::new),
            None => which::which("esbuild").ok().map(Self::new),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command-line arguments for one bundle run
    pub fn arguments(entry: &Path, output_file: &Path, options: &BundleOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            entry.as_os_str().to_os_string(),
            "--bundle".into(),
            "--format=esm".into(),
            "--platform=browser".into(),
            "--log-level=warning".into(),
        ];

        let mut outfile = OsString::from("--outfile=");
        outfile.push(output_file.as_os_str());
        args.push(outfile);

        if options.minify {
            args.push("--minify".into());
        }

        args
    }
}

impl BundleBackend for EsbuildBackend {
    fn name(&self) -> &'static str {
        "esbuild"
    }

    fn bundle(
        &self,
        root: &Path,
        entry: &Path,
        output_file: &Path,
        options: &BundleOptions,
    ) -> EsmResult<()> {
        let args = Self::arguments(entry, output_file, options);
        tracing::debug!(executable = %self.executable.display(), ?args, "running esbuild");

        let output = Command::new(&self.executable)
            .args(&args)
            .current_dir(root)
            .output()
            .map_err(|e| {
                EsmError::BundleFailed(format!(
                    "Failed to run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EsmError::BundleFailed(format!(
                "esbuild exited with {}:\n{}",
                output.status,
                stderr.trim_end()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_include_esm_browser_bundle() {
        let options = BundleOptions::default();
        let args = EsbuildBackend::arguments(
            Path::new("/pkg/index.js"),
            Path::new("/out/bundle.js"),
            &options,
        );
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(args[0], "/pkg/index.js");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--format=esm".to_string()));
        assert!(args.contains(&"--platform=browser".to_string()));
        assert!(args.contains(&"--outfile=/out/bundle.js".to_string()));
        assert!(!args.contains(&"--minify".to_string()));
    }

    #[test]
    fn test_minify_flag() {
        let options = BundleOptions {
            minify: true,
            ..BundleOptions::default()
        };
        let args = EsbuildBackend::arguments(Path::new("a.js"), Path::new("b.js"), &options);
        assert!(args.iter().any(|a| a == "--minify"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_executable_reports_stderr() {
        let temp = tempfile::TempDir::new().unwrap();
        let backend = EsbuildBackend::new(PathBuf::from("false"));
        let err = backend
            .bundle(
                temp.path(),
                &temp.path().join("index.js"),
                &temp.path().join("bundle.js"),
                &BundleOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, EsmError::BundleFailed(_)));
    }

    #[test]
    fn test_missing_executable_is_bundle_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let backend = EsbuildBackend::new(temp.path().join("no-such-esbuild"));
        let err = backend
            .bundle(
                temp.path(),
                &temp.path().join("index.js"),
                &temp.path().join("bundle.js"),
                &BundleOptions::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("Failed to run"));
    }
}
