//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod serve;

use std::path::{Path, PathBuf};

use clap::Args;
use livedev_build::{BuildMode, BuildPipeline, EsbuildBundler};
use livedev_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use build::{BuildArgs, Step};
pub(crate) use serve::ServeArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover livedev.toml).
    #[arg(short, long, env = "LIVEDEV_CONFIG")]
    config: Option<PathBuf>,

    /// Build output directory (overrides config).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Fingerprint assets as a production build (overrides NODE_ENV and config).
    #[arg(long)]
    production: bool,

    /// Enable verbose output (step timings and watcher activity).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with these arguments applied on top.
    pub(crate) fn load_config(&self, live_reload_enabled: Option<bool>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            out_dir: self.out_dir.clone(),
            live_reload_enabled,
            mode: self.production.then_some(BuildMode::Production),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(
            file = ?config.config_path,
            out_dir = %config.build_resolved.out_dir.display(),
            mode = ?config.build_resolved.mode,
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Create the esbuild-backed pipeline for a loaded configuration.
pub(crate) fn pipeline_for(config: &Config) -> BuildPipeline {
    BuildPipeline::from_config(
        config,
        Box::new(EsbuildBundler::new(config.bundle.esbuild.clone())),
    )
}

/// Ensure the `.livedev/` project directory exists with a `.gitignore`.
pub(crate) fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by livedev\n*\n");
    }

    Ok(())
}
