//! Build pipeline for livedev.
//!
//! A build is three strictly ordered steps over a single output directory:
//!
//! 1. **clean** - remove the output directory (missing is fine)
//! 2. **copy** - copy top-level static assets into it
//! 3. **compile** - hand the entry point to a [`Bundler`]
//!
//! [`BuildPipeline`] serializes every step behind a run lock so that
//! watch-triggered steps never interleave with each other or with a full build.
//!
//! The bundler itself is an external collaborator. [`EsbuildBundler`] drives
//! the `esbuild` executable; tests substitute their own [`Bundler`].

mod bundler;
mod error;
mod esbuild;
mod hash;
mod pipeline;

pub use bundler::{BundleMetadata, BundleOptions, Bundler};
pub use error::BuildError;
pub use esbuild::EsbuildBundler;
pub use hash::{DEV_HASH, asset_hash};
pub use livedev_config::BuildMode;
pub use pipeline::{BuildPhase, BuildPipeline, BuildReport, CompileReport, CopyReport};
