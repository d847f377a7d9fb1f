//! `livedev serve` and `livedev start` implementations.

use std::sync::Arc;

use clap::Args;
use livedev_config::Config;
use livedev_server::{
    LIVERELOAD_PATH, LiveReloadRegistry, run_dev_server, run_server,
    server_config_from_livedev_config,
};

use super::{CommonArgs, ensure_project_dir, pipeline_for};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve commands.
#[derive(Args)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Enable live reload (default: enabled).
    #[arg(long)]
    live_reload: Option<bool>,

    /// Disable live reload.
    #[arg(long, conflicts_with = "live_reload")]
    no_live_reload: bool,
}

impl ServeArgs {
    /// Serve the existing output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) fn serve(self) -> Result<(), CliError> {
        let config = self.load_config()?;
        print_startup(&config);

        let server_config = server_config_from_livedev_config(&config);
        runtime()?.block_on(run_server(&server_config, Arc::new(LiveReloadRegistry::new())))?;
        Ok(())
    }

    /// Build, watch and serve.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    /// Build failures are logged and do not stop the server.
    pub(crate) fn start(self) -> Result<(), CliError> {
        let config = self.load_config()?;
        ensure_project_dir(&config.build_resolved.project_dir)?;
        print_startup(&config);

        let pipeline = Arc::new(pipeline_for(&config));
        let server_config = server_config_from_livedev_config(&config);
        runtime()?.block_on(run_dev_server(&server_config, pipeline))?;
        Ok(())
    }

    fn load_config(&self) -> Result<Config, CliError> {
        self.common.load_config(self.resolve_live_reload_enabled())
    }

    /// Resolve `live_reload_enabled` from --live-reload/--no-live-reload flags.
    fn resolve_live_reload_enabled(&self) -> Option<bool> {
        self.no_live_reload.then_some(false).or(self.live_reload)
    }
}

/// Single-threaded runtime: handlers run one at a time on the event loop.
fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn print_startup(config: &Config) {
    let output = Output::new();
    output.highlight(&format!(
        "Serving on http://{}:{}",
        config.server.host, config.server.port
    ));
    output.info(&format!(
        "Output directory: {}",
        config.build_resolved.out_dir.display()
    ));
    if config.live_reload.enabled {
        output.info(&format!("Live reload: enabled ({LIVERELOAD_PATH})"));
    } else {
        output.info("Live reload: disabled");
    }
}
