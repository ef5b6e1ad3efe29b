use clap::{Parser, Subcommand};
use esmbox_bundle::BackendChoice;
use esmbox_core::format_error_with_help;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod bundle;

#[derive(Parser)]
#[command(name = "esmbox-bundle")]
#[command(about = "Bundle a local JavaScript package into a single ES module")]
struct Cli {
    #[command(subcommand)]
    command: BundleCommands,
}

#[derive(Subcommand)]
enum BundleCommands {
    /// Bundle a package directory into <out>/bundle.js
    Bundle {
        /// Package root (default: current directory)
        #[arg(short, long)]
        root: Option<String>,

        /// Entry point file (default: the package's module/main/index)
        #[arg(short, long)]
        entry: Option<String>,

        /// Output directory (default: dist)
        #[arg(short, long)]
        out: Option<String>,

        /// Minify output
        #[arg(short, long)]
        minify: bool,

        /// Bundler backend: auto, esbuild or native
        #[arg(long, default_value = "auto")]
        backend: BackendChoice,

        /// Path to the esbuild executable
        #[arg(long)]
        esbuild: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        BundleCommands::Bundle {
            root,
            entry,
            out,
            minify,
            backend,
            esbuild,
        } => bundle::run_with_options(bundle::BundleRunOptions {
            root,
            entry,
            out,
            minify,
            backend,
            esbuild,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_error_with_help(&e));
            ExitCode::FAILURE
        }
    }
}
