use clap::Parser;
use esmbox_core::format_error_with_help;
use esmbox_serve::{bind, ServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "esmbox-serve")]
#[command(about = "Serve a directory of converted packages over HTTP")]
struct Cli {
    /// Directory to serve (default: web_modules)
    #[arg(short, long, default_value = "web_modules")]
    dir: PathBuf,

    /// First port to try
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// File served at / instead of the package index
    #[arg(short, long)]
    entry: Option<PathBuf>,

    /// Stop after this many ports are found busy
    #[arg(long)]
    max_port_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        root: cli.dir,
        custom_entry: cli.entry,
        max_port_attempts: cli.max_port_attempts,
    };

    let result = async {
        let server = bind(config).await?;
        println!("🌐 Serving on {}", server.url());
        println!("   Press Ctrl+C to stop");
        server.serve().await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_error_with_help(&e));
            ExitCode::FAILURE
        }
    }
}
