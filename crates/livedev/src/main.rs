//! livedev CLI - front-end dev pipeline.
//!
//! Provides commands for:
//! - `clean`: Remove the build output directory
//! - `copy`: Copy static assets into the output directory
//! - `build`: Clean, copy and compile
//! - `serve`: Serve the output directory with the live-reload endpoint
//! - `start`: Build, watch for changes and serve with live reload

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, ServeArgs, Step};
use output::Output;

/// livedev - build and serve a front-end bundle.
#[derive(Parser)]
#[command(name = "livedev", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove the build output directory.
    Clean(BuildArgs),
    /// Copy static assets into the output directory.
    Copy(BuildArgs),
    /// Clean, copy and compile.
    Build(BuildArgs),
    /// Serve the output directory.
    Serve(ServeArgs),
    /// Build, watch for changes and serve with live reload.
    Start(ServeArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Clean(args) | Self::Copy(args) | Self::Build(args) => args.common.verbose,
            Self::Serve(args) | Self::Start(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Clean(args) => args.execute(Step::Clean),
        Commands::Copy(args) => args.execute(Step::Copy),
        Commands::Build(args) => args.execute(Step::Build),
        Commands::Serve(args) => args.serve(),
        Commands::Start(args) => args.start(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
