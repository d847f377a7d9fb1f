//! Bundler seam.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use livedev_config::Config;

use crate::error::BuildError;

/// Fixed bundling configuration handed to a [`Bundler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleOptions {
    /// Single entry point.
    pub entry: PathBuf,
    /// Directory receiving the bundled artifacts.
    pub out_dir: PathBuf,
    /// Inline imports into one output (always on for the dev pipeline).
    pub bundle: bool,
    /// Output naming template.
    pub entry_names: String,
    /// JSX factory function.
    pub jsx_factory: String,
    /// JSX fragment component.
    pub jsx_fragment: String,
    /// File extension (with leading dot) to loader name.
    pub loaders: BTreeMap<String, String>,
    /// Build-time constants; values are raw strings, encoded by the bundler.
    pub define: BTreeMap<String, String>,
    /// Where the bundler writes its input/output metadata.
    pub metafile: PathBuf,
}

impl BundleOptions {
    /// Build options from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            entry: config.build_resolved.entry.clone(),
            out_dir: config.build_resolved.out_dir.clone(),
            bundle: true,
            entry_names: "[name]".to_owned(),
            jsx_factory: config.bundle.jsx_factory.clone(),
            jsx_fragment: config.bundle.jsx_fragment.clone(),
            loaders: config.bundle.loaders.clone(),
            define: config.bundle.define.clone(),
            metafile: config.build_resolved.metafile_path(),
        }
    }
}

/// Inputs consumed and outputs produced by one bundler run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BundleMetadata {
    /// Every input module, in metafile order.
    pub inputs: Vec<String>,
    /// Every output artifact, in metafile order.
    pub outputs: Vec<String>,
}

impl BundleMetadata {
    /// The primary artifact: the first output ending in `.js`.
    #[must_use]
    pub fn primary_output(&self) -> Option<&Path> {
        self.outputs
            .iter()
            .find(|output| output.ends_with(".js"))
            .map(Path::new)
    }
}

/// Compiles an entry point into the output directory.
///
/// Implementations run synchronously to completion.
pub trait Bundler: Send + Sync {
    /// Run the bundler.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Compile`] when the sources fail to compile.
    fn bundle(&self, options: &BundleOptions) -> Result<BundleMetadata, BuildError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_primary_output_skips_non_js() {
        let metadata = BundleMetadata {
            inputs: vec!["src/entry.jsx".to_owned()],
            outputs: vec![
                "dist/entry.css".to_owned(),
                "dist/entry.js".to_owned(),
                "dist/other.js".to_owned(),
            ],
        };
        assert_eq!(metadata.primary_output(), Some(Path::new("dist/entry.js")));
    }

    #[test]
    fn test_primary_output_none_without_js() {
        let metadata = BundleMetadata {
            inputs: Vec::new(),
            outputs: vec!["dist/entry.css".to_owned()],
        };
        assert_eq!(metadata.primary_output(), None);
    }

    #[test]
    fn test_options_from_default_config() {
        let config = Config::default();
        let options = BundleOptions::from_config(&config);
        assert!(options.bundle);
        assert_eq!(options.entry_names, "[name]");
        assert_eq!(options.out_dir, config.build_resolved.out_dir);
        assert_eq!(options.metafile, config.build_resolved.metafile_path());
        assert!(options.loaders.contains_key(".svg"));
        assert!(options.define.contains_key("ZDB_URL"));
    }
}
