//! `livedev clean`, `livedev copy` and `livedev build` implementations.

use clap::Args;
use livedev_build::{BuildMode, CompileReport};

use super::{CommonArgs, ensure_project_dir, pipeline_for};
use crate::error::CliError;
use crate::output::Output;

/// Build step selected by the subcommand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Clean,
    Copy,
    Build,
}

/// Arguments for the build commands.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl BuildArgs {
    /// Execute one build step, or the full build.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the step fails.
    pub(crate) fn execute(self, step: Step) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(None)?;
        let pipeline = pipeline_for(&config);
        let out_dir = pipeline.out_dir().display().to_string();

        match step {
            Step::Clean => {
                let elapsed = pipeline.clean()?;
                output.step(&format!("Cleaned {out_dir}"), elapsed);
            }
            Step::Copy => {
                let report = pipeline.copy()?;
                output.step(
                    &format!("Copied {} files to {out_dir}", report.files),
                    report.elapsed,
                );
            }
            Step::Build => {
                ensure_project_dir(&config.build_resolved.project_dir)?;
                output.info(&format!(
                    "Building {} ({})",
                    config.build_resolved.entry.display(),
                    mode_label(config.build_resolved.mode)
                ));

                let report = pipeline.build()?;
                output.step(&format!("Cleaned {out_dir}"), report.clean);
                output.step(
                    &format!("Copied {} files", report.copy.files),
                    report.copy.elapsed,
                );
                output.step(&compile_summary(&report.compile), report.compile.elapsed);
                output.success(&format!("Build complete: {out_dir}"));
            }
        }

        Ok(())
    }
}

fn mode_label(mode: BuildMode) -> &'static str {
    match mode {
        BuildMode::Development => "development",
        BuildMode::Production => "production",
    }
}

/// One-line compile result: module count, primary artifact and its hash.
fn compile_summary(report: &CompileReport) -> String {
    match &report.primary_output {
        Some(path) => format!(
            "Compiled {} modules into {} [{}]",
            report.modules,
            path.display(),
            report.asset_hash
        ),
        None => format!("Compiled {} modules", report.modules),
    }
}
