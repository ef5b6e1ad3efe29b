use esmbox_bundle::bundler::resolver::{default_entry, is_typescript};
use esmbox_bundle::{BackendChoice, BundleOptions, Bundler};
use esmbox_core::{EsmError, EsmResult};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BundleRunOptions {
    pub root: Option<String>,
    pub entry: Option<String>,
    pub out: Option<String>,
    pub minify: bool,
    pub backend: BackendChoice,
    pub esbuild: Option<String>,
}

fn resolve_against(base: &Path, value: &str) -> PathBuf {
    let pb = PathBuf::from(value);
    if pb.is_absolute() {
        pb
    } else {
        base.join(pb)
    }
}

pub fn run_with_options(opts: BundleRunOptions) -> EsmResult<()> {
    let current_dir = env::current_dir()?;

    let root = match &opts.root {
        Some(r) => resolve_against(&current_dir, r),
        None => current_dir.clone(),
    };

    let entry_path = match &opts.entry {
        Some(e) => resolve_against(&root, e),
        None => default_entry(&root).ok_or_else(|| EsmError::EntryNotFound(root.clone()))?,
    };

    let out_dir = match &opts.out {
        Some(o) => resolve_against(&current_dir, o),
        None => root.join("dist"),
    };

    let options = BundleOptions {
        minify: opts.minify,
        transpile_typescript: is_typescript(&entry_path),
    };

    let esbuild_path = opts.esbuild.as_deref().map(Path::new);
    let bundler = Bundler::new(root, entry_path.clone(), out_dir, options, opts.backend, esbuild_path)?;

    println!("📦 Bundling {} ({})...", entry_path.display(), bundler.backend_name());
    let output = bundler.bundle()?;

    let size = std::fs::metadata(&output)?.len();
    println!("✓ Bundle created: {} ({} bytes)", output.display(), size);

    Ok(())
}
