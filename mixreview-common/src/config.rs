//! Configuration loading and root folder resolution
//!
//! Resolution priority order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or malformed config file never stops startup; it is logged and the
//! next source in the chain is used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "MIXREVIEW_ROOT_FOLDER";

/// Environment variable holding the token signing secret
pub const SECRET_KEY_ENV: &str = "MIXREVIEW_SECRET_KEY";

/// Signing secret used when nothing else is configured. Development only.
pub const DEV_SECRET_KEY: &str = "dev-secret-change-in-production";

/// Default upload body limit in MiB
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 500;

/// Contents of `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_mb: Option<u64>,
    pub secret_key: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load from an explicit path, or from the platform config directory.
    ///
    /// Returns the empty config when no file exists or it cannot be parsed.
    pub fn load(explicit_path: Option<&Path>) -> Self {
        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            if explicit_path.is_some() {
                warn!("Config file not found: {} (using defaults)", path.display());
            }
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    info!("Loaded config file: {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{} ({}), using defaults", e, path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {} (using defaults)", path.display(), e);
                Self::default()
            }
        }
    }
}

/// `<config_dir>/mixreview/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mixreview").join("config.toml"))
}

/// Compiled fallbacks for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("mixreview"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mixreview"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("mixreview"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/mixreview"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("mixreview"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mixreview"))
    } else {
        PathBuf::from("./mixreview_data")
    }
}

/// Resolves the root folder from CLI, environment, TOML and compiled defaults
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml: TomlConfig,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml: TomlConfig) -> Self {
        Self { cli_arg, toml }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml.root_folder {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Derives every on-disk location from the root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join("mixreview.db")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join("uploads")
    }

    /// Create the root and uploads folders if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }
}

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    ConfigFile,
    DevelopmentDefault,
}

/// Resolve the token signing secret: environment, then TOML, then the dev default
pub fn resolve_secret_key(toml: &TomlConfig) -> (String, SecretSource) {
    if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
        if !secret.is_empty() {
            return (secret, SecretSource::Environment);
        }
    }

    if let Some(secret) = toml.secret_key.as_ref().filter(|s| !s.is_empty()) {
        return (secret.clone(), SecretSource::ConfigFile);
    }

    (DEV_SECRET_KEY.to_string(), SecretSource::DevelopmentDefault)
}
