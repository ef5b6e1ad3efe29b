use crate::cli::Context;
use esmbox::core::{EsmResult, ManifestUpdate};
use esmbox::package::converter::{ConversionOutput, ConvertOptions, PackageConverter};
use esmbox::package::{AssetMode, EntryPolicy, PackageRequest};
use esmbox::registry::RegistryClient;
use esmbox_bundle::BackendChoice;
use std::path::PathBuf;

pub struct AddOptions {
    pub version: Option<String>,
    pub dir: Option<PathBuf>,
    pub all_assets: bool,
    pub minify: bool,
    pub strict_entry: bool,
    pub backend: Option<BackendChoice>,
}

pub async fn run(ctx: &Context, package: &str, options: AddOptions) -> EsmResult<()> {
    let request = PackageRequest::parse(package)?.with_version(options.version.clone());
    let output_root = ctx.output_root(options.dir.as_deref());

    let convert_options = ConvertOptions {
        asset_mode: if options.all_assets {
            AssetMode::IncludeAll
        } else {
            AssetMode::EntryScoped
        },
        entry_policy: if options.strict_entry {
            EntryPolicy::Strict
        } else {
            EntryPolicy::Permissive
        },
        minify: options.minify,
        backend: options.backend.unwrap_or(ctx.config.bundler),
        esbuild_path: ctx.config.esbuild_path.clone(),
    };

    println!("📦 Converting {}...", request);
    let converter = PackageConverter::new(
        &ctx.project_root,
        &output_root,
        RegistryClient::from_config(&ctx.config),
        convert_options,
    );
    let output = converter.convert(&request).await?;
    report(&output);

    Ok(())
}

pub fn report(output: &ConversionOutput) {
    match &output.bundle_file {
        Some(bundle) => println!("✓ Bundled {}@{} → {}", output.name, output.version, bundle.display()),
        None => println!(
            "⚠️  {}@{} has no entry point; copied assets only",
            output.name, output.version
        ),
    }

    if !output.copied_assets.is_empty() {
        println!("✓ Copied {} asset(s)", output.copied_assets.len());
    }
    if !output.excluded_assets.is_empty() {
        println!(
            "⚠️  {} asset(s) outside the entry directory were skipped (use --all-assets to include them):",
            output.excluded_assets.len()
        );
        for path in &output.excluded_assets {
            println!("   - {}", path.display());
        }
    }

    match output.manifest {
        ManifestUpdate::Updated => println!("✓ Recorded {}@{} in esmbox.json", output.name, output.version),
        ManifestUpdate::Unchanged => {}
        ManifestUpdate::Skipped => println!("   (no esmbox.json here; run 'esmbox init' to track packages)"),
    }
}
