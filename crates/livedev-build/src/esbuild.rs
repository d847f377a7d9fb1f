//! `esbuild` executable adapter.

use std::fmt;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};

use crate::bundler::{BundleMetadata, BundleOptions, Bundler};
use crate::error::BuildError;

/// Runs the `esbuild` CLI and reads back its metafile.
#[derive(Clone, Debug)]
pub struct EsbuildBundler {
    program: String,
}

impl EsbuildBundler {
    /// Create an adapter for the given executable (name on `PATH` or a path).
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Subset of the esbuild metafile we care about.
#[derive(Deserialize)]
struct Metafile {
    inputs: OrderedKeys,
    outputs: OrderedKeys,
}

/// Keys of a JSON object, in document order. Values are skipped.
struct OrderedKeys(Vec<String>);

impl<'de> Deserialize<'de> for OrderedKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeysVisitor;

        impl<'de> Visitor<'de> for KeysVisitor {
            type Value = OrderedKeys;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by path")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut keys = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, IgnoredAny)) = map.next_entry::<String, IgnoredAny>()? {
                    keys.push(key);
                }
                Ok(OrderedKeys(keys))
            }
        }

        deserializer.deserialize_map(KeysVisitor)
    }
}

impl Bundler for EsbuildBundler {
    fn bundle(&self, options: &BundleOptions) -> Result<BundleMetadata, BuildError> {
        if let Some(parent) = options.metafile.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let output = Command::new(&self.program)
            .args(esbuild_args(options))
            .output()
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::Compile(stderr.trim().to_owned()));
        }

        read_metafile(&options.metafile)
    }
}

/// Command-line arguments equivalent to `options`.
fn esbuild_args(options: &BundleOptions) -> Vec<String> {
    let mut args = vec![options.entry.display().to_string()];
    if options.bundle {
        args.push("--bundle".to_owned());
    }
    args.push(format!("--outdir={}", options.out_dir.display()));
    args.push(format!("--entry-names={}", options.entry_names));
    args.push(format!("--metafile={}", options.metafile.display()));
    args.push(format!("--jsx-factory={}", options.jsx_factory));
    args.push(format!("--jsx-fragment={}", options.jsx_fragment));
    for (ext, loader) in &options.loaders {
        args.push(format!("--loader:{ext}={loader}"));
    }
    for (name, value) in &options.define {
        // Defines are substituted as expressions, so string values need quoting
        let literal = serde_json::Value::String(value.clone()).to_string();
        args.push(format!("--define:{name}={literal}"));
    }
    args.push("--log-level=warning".to_owned());
    args
}

fn read_metafile(path: &Path) -> Result<BundleMetadata, BuildError> {
    let content = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
    parse_metafile(&content).map_err(|source| BuildError::Metafile {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_metafile(content: &str) -> Result<BundleMetadata, serde_json::Error> {
    let metafile: Metafile = serde_json::from_str(content)?;
    Ok(BundleMetadata {
        inputs: metafile.inputs.0,
        outputs: metafile.outputs.0,
    })
}
