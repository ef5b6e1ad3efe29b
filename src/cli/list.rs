use crate::cli::Context;
use esmbox::core::path::{package_output_dir, BUNDLE_FILE};
use esmbox::core::{EsmResult, ProjectManifest};
use esmbox::package::list_outputs;
use std::path::PathBuf;

pub fn run(ctx: &Context, dir: Option<PathBuf>) -> EsmResult<()> {
    let output_root = ctx.output_root(dir.as_deref());
    let manifest = ProjectManifest::load(&ctx.project_root)?;

    match &manifest {
        Some(manifest) if !manifest.packages.is_empty() => {
            println!("📦 Packages in esmbox.json:");
            for (name, version) in &manifest.packages {
                let out = package_output_dir(&output_root, name, version);
                let status = if out.join(BUNDLE_FILE).is_file() {
                    "✓"
                } else if out.is_dir() {
                    "✓ (assets only)"
                } else {
                    "✗ not converted"
                };
                println!("  {}@{}  {}", name, version, status);
            }
        }
        Some(_) => println!("No packages in esmbox.json"),
        None => println!("No esmbox.json in {}", ctx.project_root.display()),
    }

    // Outputs on disk that the manifest doesn't mention
    let untracked: Vec<_> = list_outputs(&output_root)?
        .into_iter()
        .filter(|(name, version, _)| {
            manifest
                .as_ref()
                .and_then(|m| m.packages.get(name))
                .map_or(true, |v| v != version)
        })
        .collect();

    if !untracked.is_empty() {
        println!("\nUntracked in {}:", output_root.display());
        for (name, version, _) in untracked {
            println!("  {}@{}", name, version);
        }
    }

    Ok(())
}
