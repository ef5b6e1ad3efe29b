use crate::core::path::{ensure_dir, package_output_dir, BUNDLE_FILE};
use crate::core::{EsmError, EsmResult, ManifestAction, ManifestUpdate, ProjectManifest};
use crate::package::assets::{AssetMode, AssetReport, AssetSelector};
use crate::package::entry::{resolve_entry, EntryPolicy, EntryRule};
use crate::package::fetcher::ArchiveFetcher;
use crate::package::request::PackageRequest;
use crate::package::root::locate_root;
use crate::registry::RegistryClient;
use esmbox_bundle::{BackendChoice, BundleOptions, Bundler};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Knobs for one conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub asset_mode: AssetMode,
    pub entry_policy: EntryPolicy,
    pub minify: bool,
    pub backend: BackendChoice,
    pub esbuild_path: Option<PathBuf>,
}

/// Everything a successful conversion produced
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub name: String,
    pub version: String,
    /// `<output_root>/<name>@<version>`
    pub output_dir: PathBuf,
    /// `None` for packages without an entry point
    pub bundle_file: Option<PathBuf>,
    pub entry_rule: Option<EntryRule>,
    /// Relative to the package root, sorted
    pub copied_assets: Vec<PathBuf>,
    /// Only populated in entry-scoped mode
    pub excluded_assets: Vec<PathBuf>,
    pub manifest: ManifestUpdate,
}

/// Runs the conversion pipeline: resolve, fetch, locate root, resolve
/// entry, bundle, copy assets, record in the manifest
pub struct PackageConverter {
    project_root: PathBuf,
    output_root: PathBuf,
    registry: RegistryClient,
    fetcher: ArchiveFetcher,
    options: ConvertOptions,
}

impl PackageConverter {
    pub fn new(
        project_root: &Path,
        output_root: &Path,
        registry: RegistryClient,
        options: ConvertOptions,
    ) -> Self {
        let fetcher = ArchiveFetcher::new(registry.http().clone());
        Self {
            project_root: project_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            registry,
            fetcher,
            options,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Convert one package; every stage must finish before the next starts
    pub async fn convert(&self, request: &PackageRequest) -> EsmResult<ConversionOutput> {
        let resolved = self.registry.resolve(request).await?;

        let scratch = TempDir::new()?;
        self.fetcher.fetch(&resolved, scratch.path()).await?;

        let root = locate_root(scratch.path())?;
        let entry = resolve_entry(&root, self.options.entry_policy)?;
        if entry.chosen.is_none() {
            tracing::warn!(package = %resolved.name, "no entry point found, copying assets only");
        }

        let output_dir = package_output_dir(&self.output_root, &resolved.name, &resolved.version);
        let parent = output_dir.parent().unwrap_or(&self.output_root).to_path_buf();
        let parent_existed = parent.is_dir();
        ensure_dir(&parent)?;

        // Built beside the final directory, renamed into place once complete
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&parent)?;

        let built = {
            let options = self.options.clone();
            let chosen = entry.chosen.clone();
            let root = root.clone();
            let staging_dir = staging.path().to_path_buf();
            tokio::task::spawn_blocking(move || {
                build_outputs(&root, chosen.as_deref(), &staging_dir, &options)
            })
            .await
            .map_err(|e| EsmError::BundleFailed(format!("Bundle task failed: {}", e)))
            .and_then(|built| built)
            .and_then(|built| {
                swap_into_place(staging.path(), &output_dir)?;
                Ok(built)
            })
        };

        let (bundle_file, assets) = match built {
            Ok((bundle_file, assets)) => {
                let bundle_file = bundle_file.map(|_| output_dir.join(BUNDLE_FILE));
                (bundle_file, assets)
            }
            Err(e) => {
                drop(staging);
                if !parent_existed && parent != self.output_root {
                    // A scope directory created for this attempt only
                    let _ = fs::remove_dir(&parent);
                }
                return Err(e);
            }
        };

        let manifest = ProjectManifest::update(
            &self.project_root,
            &resolved.name,
            &ManifestAction::Add(resolved.version.clone()),
        )?;

        tracing::info!(
            package = %resolved.name,
            version = %resolved.version,
            assets = assets.copied.len(),
            "conversion complete"
        );

        Ok(ConversionOutput {
            name: resolved.name,
            version: resolved.version,
            output_dir,
            bundle_file,
            entry_rule: entry.rule,
            copied_assets: assets.copied,
            excluded_assets: assets.excluded,
            manifest,
        })
    }
}

/// Prefix of in-progress build directories; never a `<name>@<version>`
pub const STAGING_PREFIX: &str = ".esmbox-staging-";

/// Replace `target` with the finished `staging` directory
///
/// A previous output is moved aside first and restored if the final rename
/// fails.
fn swap_into_place(staging: &Path, target: &Path) -> EsmResult<()> {
    if !target.exists() {
        fs::rename(staging, target)?;
        return Ok(());
    }

    let parent = target.parent().unwrap_or(Path::new("."));
    let retired = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(parent)?;
    let previous = retired.path().join("previous");
    fs::rename(target, &previous)?;

    if let Err(e) = fs::rename(staging, target) {
        if let Err(restore) = fs::rename(&previous, target) {
            tracing::error!(
                target = %target.display(),
                error = %restore,
                "could not restore previous output"
            );
        }
        return Err(e.into());
    }

    Ok(())
}

/// Bundle (when there is an entry) then copy assets
fn build_outputs(
    root: &Path,
    entry: Option<&Path>,
    output_dir: &Path,
    options: &ConvertOptions,
) -> EsmResult<(Option<PathBuf>, AssetReport)> {
    let bundle_file = match entry {
        Some(entry) => {
            let bundler = Bundler::new(
                root.to_path_buf(),
                entry.to_path_buf(),
                output_dir.to_path_buf(),
                BundleOptions {
                    minify: options.minify,
                    transpile_typescript: true,
                },
                options.backend,
                options.esbuild_path.as_deref(),
            )?;
            Some(bundler.bundle()?)
        }
        None => None,
    };

    let boundary = entry.and_then(Path::parent).unwrap_or(root);
    let assets = AssetSelector::new(options.asset_mode).copy(root, output_dir, boundary)?;

    Ok((bundle_file, assets))
}

/// Delete every `<name>@<version>` directory for a package
pub fn remove_outputs(output_root: &Path, name: &str) -> EsmResult<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for (package, _version, dir) in list_outputs(output_root)? {
        if package == name {
            fs::remove_dir_all(&dir)?;
            removed.push(dir);
        }
    }

    // Drop a scope directory left empty
    if let Some((scope, _)) = name.split_once('/') {
        let scope_dir = output_root.join(scope);
        if scope_dir.is_dir() && fs::read_dir(&scope_dir)?.next().is_none() {
            fs::remove_dir(&scope_dir)?;
        }
    }

    Ok(removed)
}

/// Converted packages on disk as `(name, version, dir)`, sorted
pub fn list_outputs(output_root: &Path) -> EsmResult<Vec<(String, String, PathBuf)>> {
    let mut outputs = Vec::new();
    if !output_root.is_dir() {
        return Ok(outputs);
    }

    let mut dirs: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(output_root)?.flatten() {
        let path = entry.path();
        let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !path.is_dir() {
            continue;
        }
        if file_name.starts_with('@') {
            for inner in fs::read_dir(&path)?.flatten() {
                if let Some(inner_name) = inner.file_name().to_str() {
                    if inner.path().is_dir() {
                        dirs.push((format!("{}/{}", file_name, inner_name), inner.path()));
                    }
                }
            }
        } else {
            dirs.push((file_name, path));
        }
    }
    dirs.sort();

    for (label, dir) in dirs {
        // The version separator is the last '@' that isn't the scope marker
        if let Some(at) = label.rfind('@').filter(|&i| i > 0) {
            let (name, version) = (&label[..at], &label[at + 1..]);
            if !version.is_empty() {
                outputs.push((name.to_string(), version.to_string(), dir));
            }
        }
    }

    Ok(outputs)
}
