//! Build orchestration.
//!
//! Runs clean, copy and compile over one output directory. Every public step
//! takes the pipeline's run lock, so a full build and any watch-triggered
//! step never overlap.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use livedev_config::{BuildMode, Config};

use crate::bundler::{BundleOptions, Bundler};
use crate::error::BuildError;
use crate::hash::{DEV_HASH, asset_hash};

/// Step currently executing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildPhase {
    /// No step running.
    #[default]
    Idle,
    /// Removing the output directory.
    Cleaning,
    /// Copying static assets.
    Copying,
    /// Running the bundler.
    Compiling,
}

/// Result of the copy step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyReport {
    /// Number of files copied.
    pub files: usize,
    /// Time spent copying.
    pub elapsed: Duration,
}

/// Result of the compile step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileReport {
    /// Number of input modules the bundler consumed.
    pub modules: usize,
    /// Primary output artifact (first `.js` output), if any.
    pub primary_output: Option<PathBuf>,
    /// Fingerprint of the primary output.
    pub asset_hash: String,
    /// Time spent compiling.
    pub elapsed: Duration,
}

/// Result of a full clean, copy, compile run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildReport {
    /// Time spent cleaning.
    pub clean: Duration,
    /// Copy step result.
    pub copy: CopyReport,
    /// Compile step result.
    pub compile: CompileReport,
}

/// Clean, copy and compile steps over a single output directory.
pub struct BuildPipeline {
    out_dir: PathBuf,
    static_dir: PathBuf,
    options: BundleOptions,
    mode: BuildMode,
    bundler: Box<dyn Bundler>,
    run_lock: Mutex<()>,
    phase: Mutex<BuildPhase>,
}

impl BuildPipeline {
    /// Create a pipeline.
    ///
    /// # Arguments
    ///
    /// * `static_dir` - Directory whose top-level files are copied
    /// * `options` - Bundler options; `options.out_dir` is the output root
    /// * `mode` - Build mode used for fingerprinting
    /// * `bundler` - Compiler invoked by the compile step
    #[must_use]
    pub fn new(
        static_dir: PathBuf,
        options: BundleOptions,
        mode: BuildMode,
        bundler: Box<dyn Bundler>,
    ) -> Self {
        Self {
            out_dir: options.out_dir.clone(),
            static_dir,
            options,
            mode,
            bundler,
            run_lock: Mutex::new(()),
            phase: Mutex::new(BuildPhase::Idle),
        }
    }

    /// Create a pipeline from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config, bundler: Box<dyn Bundler>) -> Self {
        Self::new(
            config.build_resolved.static_dir.clone(),
            BundleOptions::from_config(config),
            config.build_resolved.mode,
            bundler,
        )
    }

    /// Output root produced by this pipeline.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Step currently executing.
    #[must_use]
    pub fn phase(&self) -> BuildPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run clean, copy and compile in order.
    ///
    /// # Errors
    ///
    /// Returns the first step error; later steps do not run.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let _guard = self.lock();
        let clean = self.run_clean()?;
        let copy = self.run_copy()?;
        let compile = self.run_compile()?;
        Ok(BuildReport {
            clean,
            copy,
            compile,
        })
    }

    /// Remove the output directory. A missing directory is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clean(&self) -> Result<Duration, BuildError> {
        let _guard = self.lock();
        self.run_clean()
    }

    /// Copy top-level static files into the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created or a file
    /// fails to copy.
    pub fn copy(&self) -> Result<CopyReport, BuildError> {
        let _guard = self.lock();
        self.run_copy()
    }

    /// Run the bundler.
    ///
    /// # Errors
    ///
    /// Returns the bundler's error, or an I/O error if the primary output
    /// cannot be read for fingerprinting.
    pub fn compile(&self) -> Result<CompileReport, BuildError> {
        let _guard = self.lock();
        self.run_compile()
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.run_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, phase: BuildPhase) -> PhaseGuard<'_> {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
        PhaseGuard { phase: &self.phase }
    }

    fn run_clean(&self) -> Result<Duration, BuildError> {
        let _phase = self.enter(BuildPhase::Cleaning);
        tracing::debug!(path = %self.out_dir.display(), "clean: start");
        let start = Instant::now();

        match fs::remove_dir_all(&self.out_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BuildError::io(&self.out_dir, e)),
        }

        let elapsed = start.elapsed();
        tracing::info!(
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "clean: removed output directory"
        );
        Ok(elapsed)
    }

    fn run_copy(&self) -> Result<CopyReport, BuildError> {
        let _phase = self.enter(BuildPhase::Copying);
        tracing::debug!(from = %self.static_dir.display(), "copy: start");
        let start = Instant::now();

        fs::create_dir_all(&self.out_dir).map_err(|e| BuildError::io(&self.out_dir, e))?;

        let entries = match fs::read_dir(&self.static_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.static_dir.display(),
                    "Static directory does not exist, nothing to copy"
                );
                return Ok(CopyReport {
                    files: 0,
                    elapsed: start.elapsed(),
                });
            }
            Err(e) => return Err(BuildError::io(&self.static_dir, e)),
        };

        let mut files = 0;
        for entry in entries {
            let entry = entry.map_err(|e| BuildError::io(&self.static_dir, e))?;
            let from = entry.path();
            // Only the top level is copied; nested directories are left alone.
            if !from.is_file() {
                continue;
            }
            let to = self.out_dir.join(entry.file_name());
            fs::copy(&from, &to).map_err(|e| BuildError::io(&from, e))?;
            files += 1;
        }

        let elapsed = start.elapsed();
        tracing::info!(
            files,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "copy: copied static files"
        );
        Ok(CopyReport { files, elapsed })
    }

    fn run_compile(&self) -> Result<CompileReport, BuildError> {
        let _phase = self.enter(BuildPhase::Compiling);
        tracing::debug!(entry = %self.options.entry.display(), "compile: start");
        let start = Instant::now();

        let metadata = self.bundler.bundle(&self.options)?;
        let primary_output = metadata.primary_output().map(Path::to_path_buf);

        let asset_hash = match (&primary_output, self.mode) {
            (Some(path), BuildMode::Production) => {
                let content = fs::read(path).map_err(|e| BuildError::io(path, e))?;
                asset_hash(&content, self.mode)
            }
            _ => DEV_HASH.to_owned(),
        };

        let elapsed = start.elapsed();
        tracing::info!(
            modules = metadata.inputs.len(),
            output = ?primary_output,
            hash = %asset_hash,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "compile: bundled modules"
        );
        Ok(CompileReport {
            modules: metadata.inputs.len(),
            primary_output,
            asset_hash,
            elapsed,
        })
    }
}

/// Resets the phase to idle when a step finishes, including on error.
struct PhaseGuard<'a> {
    phase: &'a Mutex<BuildPhase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = BuildPhase::Idle;
    }
}
