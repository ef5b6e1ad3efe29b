use crate::cli::Context;
use esmbox::core::{EsmError, EsmResult, ManifestAction, ManifestUpdate, ProjectManifest};
use esmbox::package::remove_outputs;
use std::path::PathBuf;

pub fn run(ctx: &Context, package: &str, dir: Option<PathBuf>) -> EsmResult<()> {
    let output_root = ctx.output_root(dir.as_deref());
    let removed = remove_outputs(&output_root, package)?;
    let manifest = ProjectManifest::update(&ctx.project_root, package, &ManifestAction::Remove)?;

    if removed.is_empty() && manifest != ManifestUpdate::Updated {
        return Err(EsmError::Config(format!(
            "Package '{}' is neither in esmbox.json nor in {}",
            package,
            output_root.display()
        )));
    }

    for dir in &removed {
        println!("✓ Removed {}", dir.display());
    }
    if manifest == ManifestUpdate::Updated {
        println!("✓ Removed {} from esmbox.json", package);
    }

    Ok(())
}
