//! Service configuration
//!
//! Merges command-line/environment overrides (already combined by clap) with
//! the TOML file and compiled defaults into one validated [`ServiceConfig`].

use attn_common::config::{CompiledDefaults, RootFolderResolver, TomlConfig};
use attn_common::time::parse_time_zone;
use attn_common::{Error, Result};
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub sheet_name: Option<String>,
    pub photo_folder: Option<String>,
    pub public_base_url: Option<String>,
    pub lock_timeout_secs: Option<u64>,
    pub time_zone: Option<String>,
    pub body_limit_bytes: Option<usize>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub sheet_name: String,
    pub photo_folder: String,
    /// Base URL written into PhotoLink cells, no trailing slash
    pub public_base_url: String,
    pub lock_timeout: Duration,
    pub time_zone: Tz,
    pub body_limit_bytes: usize,
}

impl ServiceConfig {
    /// Resolve with priority CLI/env > TOML > compiled default
    pub fn resolve(overrides: ConfigOverrides, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder =
            RootFolderResolver::new(overrides.root_folder, toml.root_folder.clone()).resolve();
        let bind = overrides
            .bind
            .or_else(|| toml.bind.clone())
            .unwrap_or(defaults.bind);
        let port = overrides.port.or(toml.port).unwrap_or(defaults.port);

        let sheet_name = overrides
            .sheet_name
            .or_else(|| toml.sheet_name.clone())
            .unwrap_or(defaults.sheet_name)
            .trim()
            .to_string();
        if sheet_name.is_empty() {
            return Err(Error::Config("sheet_name must not be empty".to_string()));
        }

        let photo_folder = overrides
            .photo_folder
            .or_else(|| toml.photo_folder.clone())
            .unwrap_or(defaults.photo_folder);

        let public_base_url = overrides
            .public_base_url
            .or_else(|| toml.public_base_url.clone())
            .unwrap_or_else(|| format!("http://{}:{}", bind, port))
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(public_base_url.starts_with("http://") || public_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "public_base_url must be an http(s) URL, got '{}'",
                public_base_url
            )));
        }

        let lock_timeout_secs = overrides
            .lock_timeout_secs
            .or(toml.lock_timeout_secs)
            .unwrap_or(defaults.lock_timeout_secs);
        if lock_timeout_secs == 0 {
            return Err(Error::Config(
                "lock_timeout_secs must be at least 1".to_string(),
            ));
        }

        let time_zone = parse_time_zone(
            overrides
                .time_zone
                .as_deref()
                .or(toml.time_zone.as_deref())
                .unwrap_or(&defaults.time_zone),
        )?;

        let body_limit_bytes = overrides
            .body_limit_bytes
            .or(toml.body_limit_bytes)
            .unwrap_or(defaults.body_limit_bytes);

        Ok(Self {
            root_folder,
            bind,
            port,
            sheet_name,
            photo_folder,
            public_base_url,
            lock_timeout: Duration::from_secs(lock_timeout_secs),
            time_zone,
            body_limit_bytes,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid bind address '{}': {}", self.bind, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides_with_root() -> ConfigOverrides {
        ConfigOverrides {
            root_folder: Some(PathBuf::from("/tmp/attn-test")),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_apply() {
        let config = ServiceConfig::resolve(overrides_with_root(), &TomlConfig::default()).unwrap();
        assert_eq!(config.sheet_name, "Attendance");
        assert_eq!(config.photo_folder, "Attendance_Selfies");
        assert_eq!(config.lock_timeout, Duration::from_secs(30));
        assert_eq!(config.time_zone, chrono_tz::UTC);
        assert_eq!(config.public_base_url, "http://127.0.0.1:5790");
        assert_eq!(config.body_limit_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_overrides_beat_toml() {
        let toml = TomlConfig {
            sheet_name: Some("FromToml".into()),
            port: Some(6000),
            time_zone: Some("Asia/Kolkata".into()),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            sheet_name: Some("FromCli".into()),
            ..overrides_with_root()
        };

        let config = ServiceConfig::resolve(overrides, &toml).unwrap();
        assert_eq!(config.sheet_name, "FromCli");
        assert_eq!(config.port, 6000);
        assert_eq!(config.time_zone, chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn test_public_base_url_trailing_slash_trimmed() {
        let overrides = ConfigOverrides {
            public_base_url: Some("https://kiosk.example.org/".into()),
            ..overrides_with_root()
        };
        let config = ServiceConfig::resolve(overrides, &TomlConfig::default()).unwrap();
        assert_eq!(config.public_base_url, "https://kiosk.example.org");
    }

    #[test]
    fn test_rejects_invalid_values() {
        let zero_lock = ConfigOverrides {
            lock_timeout_secs: Some(0),
            ..overrides_with_root()
        };
        assert!(ServiceConfig::resolve(zero_lock, &TomlConfig::default()).is_err());

        let bad_zone = ConfigOverrides {
            time_zone: Some("Mars/Olympus".into()),
            ..overrides_with_root()
        };
        assert!(ServiceConfig::resolve(bad_zone, &TomlConfig::default()).is_err());

        let blank_sheet = ConfigOverrides {
            sheet_name: Some("  ".into()),
            ..overrides_with_root()
        };
        assert!(ServiceConfig::resolve(blank_sheet, &TomlConfig::default()).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServiceConfig::resolve(overrides_with_root(), &TomlConfig::default()).unwrap();
        assert_eq!(config.socket_addr().unwrap().port(), 5790);
    }
}
