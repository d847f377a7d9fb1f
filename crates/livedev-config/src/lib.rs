//! Configuration management for livedev.
//!
//! Parses `livedev.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `bundle.esbuild`
//! - every value of `bundle.define`

mod expand;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override build output directory.
    pub out_dir: Option<PathBuf>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
    /// Override build mode.
    pub mode: Option<BuildMode>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "livedev.toml";

/// Environment variable consulted for the build mode.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Build paths (relative strings from TOML).
    build: BuildConfigRaw,
    /// Bundler configuration.
    pub bundle: BundleConfig,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Status code used when redirecting a directory request to its
    /// trailing-slash form.
    pub redirect_status: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            redirect_status: 301,
        }
    }
}

/// Build mode controlling asset fingerprinting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Fixed `dev` placeholder instead of content hashes.
    #[default]
    Development,
    /// Content hashes are computed.
    Production,
}

impl BuildMode {
    /// Read the build mode from `NODE_ENV`.
    ///
    /// Only the exact value `production` selects [`BuildMode::Production`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    out_dir: Option<String>,
    static_dir: Option<String>,
    source_dir: Option<String>,
    entry: Option<String>,
    mode: Option<BuildMode>,
}

/// Resolved build configuration with absolute paths.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Output root served by the dev server.
    pub out_dir: PathBuf,
    /// Static assets copied verbatim into the output root.
    pub static_dir: PathBuf,
    /// Source tree watched for recompilation.
    pub source_dir: PathBuf,
    /// Bundler entry point.
    pub entry: PathBuf,
    /// Project directory for livedev data (.livedev/).
    pub project_dir: PathBuf,
    /// Build mode.
    pub mode: BuildMode,
}

impl BuildConfig {
    /// Location of the bundler metafile (.livedev/metafile.json).
    #[must_use]
    pub fn metafile_path(&self) -> PathBuf {
        self.project_dir.join("metafile.json")
    }
}

/// Bundler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Path or name of the esbuild executable.
    pub esbuild: String,
    /// JSX factory function.
    pub jsx_factory: String,
    /// JSX fragment component.
    pub jsx_fragment: String,
    /// File extension to loader mapping (e.g. `".svg" = "dataurl"`).
    pub loaders: BTreeMap<String, String>,
    /// Build-time constants substituted as JSON string literals.
    pub define: BTreeMap<String, String>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            esbuild: "esbuild".to_owned(),
            jsx_factory: "h".to_owned(),
            jsx_fragment: "Fragment".to_owned(),
            loaders: BTreeMap::from([(".svg".to_owned(), "dataurl".to_owned())]),
            define: BTreeMap::from([(
                "ZDB_URL".to_owned(),
                "http://localhost:7878".to_owned(),
            )]),
        }
    }
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Whether watchers and the reload endpoint are enabled.
    pub enabled: bool,
    /// Window for coalescing filesystem events, in milliseconds.
    pub debounce_ms: u64,
    /// File patterns (relative to the watched directory) that trigger rebuilds.
    pub watch_patterns: Vec<String>,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 50,
            watch_patterns: vec!["**/*".to_owned()],
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`ZDB_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `livedev.toml` in current directory and parents.
    ///
    /// The build mode falls back to `NODE_ENV` when neither the file nor the
    /// CLI sets it.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if config.build.mode.is_none() {
            config.build_resolved.mode = BuildMode::from_env();
        }

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(out_dir) = &settings.out_dir {
            self.build_resolved.out_dir.clone_from(out_dir);
        }
        if let Some(live_reload_enabled) = settings.live_reload_enabled {
            self.live_reload.enabled = live_reload_enabled;
        }
        if let Some(mode) = settings.mode {
            self.build_resolved.mode = mode;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            server: ServerConfig::default(),
            build: BuildConfigRaw::default(),
            bundle: BundleConfig::default(),
            live_reload: LiveReloadConfig::default(),
            build_resolved: BuildConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        require_non_empty(&self.bundle.esbuild, "bundle.esbuild")?;
        for ext in self.bundle.loaders.keys() {
            if !ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "bundle.loaders key {ext:?} must start with '.'"
                )));
            }
        }
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        if !(300..400).contains(&self.server.redirect_status) {
            return Err(ConfigError::Validation(format!(
                "server.redirect_status must be a 3xx code, got {}",
                self.server.redirect_status
            )));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.bundle.esbuild = expand::expand_env(&self.bundle.esbuild, "bundle.esbuild")?;

        for (name, value) in &mut self.bundle.define {
            *value = expand::expand_env(value, &format!("bundle.define.{name}"))?;
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.build_resolved = BuildConfig {
            out_dir: resolve(self.build.out_dir.as_deref(), "dist"),
            static_dir: resolve(self.build.static_dir.as_deref(), "static"),
            source_dir: resolve(self.build.source_dir.as_deref(), "src"),
            entry: resolve(self.build.entry.as_deref(), "src/entry.jsx"),
            project_dir: config_dir.join(".livedev"),
            mode: self.build.mode.unwrap_or_default(),
        };
    }
}
