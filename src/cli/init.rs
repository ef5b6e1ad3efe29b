use crate::cli::Context;
use esmbox::core::path::MANIFEST_FILE;
use esmbox::core::EsmResult;
use esmbox::package::manifest::ProjectManifest;

pub fn run(ctx: &Context) -> EsmResult<()> {
    if ProjectManifest::load(&ctx.project_root)?.is_some() {
        println!("✓ {} already exists in {}", MANIFEST_FILE, ctx.project_root.display());
        return Ok(());
    }

    ProjectManifest::init(&ctx.project_root)?;
    println!("✓ Created {} in {}", MANIFEST_FILE, ctx.project_root.display());
    println!("\nNext steps:");
    println!("  esmbox add <package>");
    println!("  esmbox serve");

    Ok(())
}
