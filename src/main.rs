use clap::{Parser, Subcommand};
use esmbox::core::format_error_with_help;
use esmbox_bundle::BackendChoice;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "esmbox")]
#[command(about = "npm packages as standalone ES modules, served locally")]
#[command(version)]
struct Cli {
    /// Project root (default: nearest directory with esmbox.json, else the current one)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty esmbox.json
    Init,
    /// Convert a package and record it in esmbox.json
    Add {
        /// Package name, optionally with @version or @tag
        package: String,
        /// Version or dist-tag (overrides one given in the package argument)
        #[arg(short, long)]
        version: Option<String>,
        /// Output directory (default: output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Copy every asset in the package, not only those under the entry's directory
        #[arg(long)]
        all_assets: bool,
        /// Minify the bundle
        #[arg(long)]
        minify: bool,
        /// Fail when the package has no entry point
        #[arg(long)]
        strict_entry: bool,
        /// Bundler backend: auto, esbuild or native (default: from config)
        #[arg(short, long)]
        backend: Option<BackendChoice>,
    },
    /// Convert every package listed in esmbox.json
    Install {
        /// Output directory (default: output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Minify the bundles
        #[arg(long)]
        minify: bool,
        /// Bundler backend: auto, esbuild or native (default: from config)
        #[arg(short, long)]
        backend: Option<BackendChoice>,
    },
    /// Delete a converted package and drop it from esmbox.json
    Remove {
        /// Package name
        package: String,
        /// Output directory (default: output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Serve converted packages over HTTP
    Serve {
        /// Directory to serve (default: output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// First port to try (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// File served at / instead of the package index
        #[arg(short, long)]
        entry: Option<PathBuf>,
    },
    /// List packages in esmbox.json and their converted outputs
    List {
        /// Output directory (default: output_dir from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli::Context::load(cli.project) {
        Ok(ctx) => match cli.command {
            Commands::Init => cli::init::run(&ctx),
            Commands::Add {
                package,
                version,
                dir,
                all_assets,
                minify,
                strict_entry,
                backend,
            } => {
                let options = cli::add::AddOptions {
                    version,
                    dir,
                    all_assets,
                    minify,
                    strict_entry,
                    backend,
                };
                cli::add::run(&ctx, &package, options).await
            }
            Commands::Install {
                dir,
                minify,
                backend,
            } => cli::install::run(&ctx, dir, minify, backend).await,
            Commands::Remove { package, dir } => cli::remove::run(&ctx, &package, dir),
            Commands::Serve {
                dir,
                port,
                host,
                entry,
            } => cli::serve::run(&ctx, dir, port, host, entry).await,
            Commands::List { dir } => cli::list::run(&ctx, dir),
        },
        Err(e) => Err(e),
    };

    // Display error with helpful suggestions
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n{}", format_error_with_help(&e));
            ExitCode::FAILURE
        }
    }
}
