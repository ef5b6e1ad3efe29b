use crate::cli::Context;
use esmbox::core::EsmResult;
use esmbox_serve::{bind, ServerConfig};
use std::path::PathBuf;

pub async fn run(
    ctx: &Context,
    dir: Option<PathBuf>,
    port: Option<u16>,
    host: Option<String>,
    entry: Option<PathBuf>,
) -> EsmResult<()> {
    let root = ctx.output_root(dir.as_deref());
    if !root.is_dir() {
        println!("⚠️  {} does not exist yet; run 'esmbox add <package>' first", root.display());
    }

    let config = ServerConfig {
        host: host.unwrap_or_else(|| ctx.config.host.clone()),
        port: port.unwrap_or(ctx.config.port),
        root,
        custom_entry: entry,
        max_port_attempts: ctx.config.max_port_attempts,
    };

    let server = bind(config).await?;
    println!("🌐 Serving on {}", server.url());
    println!("   Press Ctrl+C to stop");
    server.serve().await
}
