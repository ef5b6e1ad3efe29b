use crate::cli::Context;
use esmbox::core::{EsmError, EsmResult};
use esmbox::package::converter::{ConvertOptions, PackageConverter};
use esmbox::package::{convert_all, manifest_requests};
use esmbox::registry::RegistryClient;
use esmbox_bundle::BackendChoice;
use std::path::PathBuf;

pub async fn run(
    ctx: &Context,
    dir: Option<PathBuf>,
    minify: bool,
    backend: Option<BackendChoice>,
) -> EsmResult<()> {
    let requests = manifest_requests(&ctx.project_root)?;
    if requests.is_empty() {
        println!("No packages in esmbox.json");
        return Ok(());
    }

    println!("📦 Converting {} package(s)...", requests.len());
    let options = ConvertOptions {
        minify,
        backend: backend.unwrap_or(ctx.config.bundler),
        esbuild_path: ctx.config.esbuild_path.clone(),
        ..ConvertOptions::default()
    };
    let converter = PackageConverter::new(
        &ctx.project_root,
        &ctx.output_root(dir.as_deref()),
        RegistryClient::from_config(&ctx.config),
        options,
    );

    let results = convert_all(&converter, requests).await;
    let total = results.len();
    let failures: Vec<_> = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.request, e)))
        .collect();

    if failures.is_empty() {
        println!("\n✓ Converted {} package(s) into {}", total, converter.output_root().display());
        return Ok(());
    }

    println!("\n⚠️  {} package(s) failed:", failures.len());
    for (request, error) in &failures {
        println!("  ✗ {}: {}", request, error);
    }

    Err(EsmError::BatchFailed {
        failed: failures.len(),
        total,
    })
}
