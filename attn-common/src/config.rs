//! Configuration loading and root folder resolution
//!
//! Settings are layered with the following priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Command-line and environment values are handled by each binary's argument
//! parser; this module supplies the TOML layer and the compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "ATTN_ROOT_FOLDER";

/// Name of the SQLite database file inside the root folder
pub const DATABASE_FILE_NAME: &str = "attendance.db";

/// Compiled default values used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub sheet_name: String,
    pub photo_folder: String,
    pub lock_timeout_secs: u64,
    pub time_zone: String,
    pub body_limit_bytes: usize,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind: "127.0.0.1".to_string(),
            port: 5790,
            sheet_name: "Attendance".to_string(),
            photo_folder: "Attendance_Selfies".to_string(),
            lock_timeout_secs: 30,
            time_zone: "UTC".to_string(),
            body_limit_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "debug")
    pub level: Option<String>,
}

/// Contents of `attn-svc.toml`
///
/// Every field is optional; missing fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub sheet_name: Option<String>,
    pub photo_folder: Option<String>,
    pub public_base_url: Option<String>,
    pub lock_timeout_secs: Option<u64>,
    pub time_zone: Option<String>,
    pub body_limit_bytes: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Log level from `[logging]`, else the compiled default
    pub fn log_level(&self) -> String {
        self.logging
            .level
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    }
}

/// Load a TOML config file
///
/// A missing file is not an error: a warning is logged and an empty config is
/// returned so the service starts on defaults. A file that exists but does not
/// parse is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Default config file location (`<config dir>/attn/attn-svc.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("attn").join("attn-svc.toml"))
}

/// Resolves the root folder holding the database and photo folder
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_value }
    }

    /// Resolve using CLI > `ATTN_ROOT_FOLDER` > TOML > compiled default
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder layout on first run
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
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Folder holding photo assets; `folder` must be a single path segment
    pub fn photo_folder(&self, folder: &str) -> Result<PathBuf> {
        let trimmed = folder.trim();
        if trimmed.is_empty()
            || trimmed == "."
            || trimmed == ".."
            || trimmed.contains(&['/', '\\'][..])
        {
            return Err(Error::Config(format!(
                "photo folder must be a single folder name, got '{}'",
                folder
            )));
        }
        Ok(self.root_folder.join(trimmed))
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("attn"))
        .unwrap_or_else(|| PathBuf::from("./attn_data"))
}
