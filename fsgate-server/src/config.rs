// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration management for the fsgate server.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual values. `validate` runs last, once everything is
//! merged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fsgate_core::BackendKind;
use fsgate_providers::StorageConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid STORAGE_BACKEND: {0}")]
    InvalidBackend(String),

    #[error("invalid {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("max_upload_size must be greater than 0")]
    ZeroUploadLimit,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("{setting} is required for {backend} backend")]
    MissingSetting {
        setting: &'static str,
        backend: BackendKind,
    },
}

/// Default upload limit: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// HTTP listener and request settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Largest accepted upload body in bytes.
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl ServerConfig {
    /// Tracing directive for `log_level`, accepting `warning` for `warn`.
    pub fn level_filter(&self) -> Option<&'static str> {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" | "warning" => Some("warn"),
            "error" => Some("error"),
            _ => None,
        }
    }
}

impl Config {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("PORT") {
            self.server.port = parse_number("PORT", v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            self.server.log_level = v.to_lowercase();
        }
        if let Some(v) = get("MAX_UPLOAD_SIZE") {
            self.server.max_upload_size = parse_number("MAX_UPLOAD_SIZE", v)?;
        }
        if let Some(v) = get("STORAGE_BACKEND") {
            self.storage.backend = v.parse().map_err(ConfigError::InvalidBackend)?;
        }

        let storage = &mut self.storage;
        if let Some(v) = get("LOCAL_ROOT_PATH") {
            storage.local.root_path = PathBuf::from(v);
        }

        if let Some(v) = get("SMB_HOST") {
            storage.smb.host = v;
        }
        if let Some(v) = get("SMB_PORT") {
            storage.smb.port = parse_number("SMB_PORT", v)?;
        }
        if let Some(v) = get("SMB_SHARE") {
            storage.smb.share = v;
        }
        if let Some(v) = get("SMB_USER") {
            storage.smb.user = v;
        }
        if let Some(v) = get("SMB_PASSWORD") {
            storage.smb.password = v;
        }

        if let Some(v) = get("FTP_HOST") {
            storage.ftp.host = v;
        }
        if let Some(v) = get("FTP_PORT") {
            storage.ftp.port = parse_number("FTP_PORT", v)?;
        }
        if let Some(v) = get("FTP_USER") {
            storage.ftp.user = v;
        }
        if let Some(v) = get("FTP_PASSWORD") {
            storage.ftp.password = v;
        }

        if let Some(v) = get("S3_BUCKET") {
            storage.s3.bucket = v;
        }
        if let Some(v) = get("S3_REGION") {
            storage.s3.region = v;
        }
        if let Some(v) = get("S3_PREFIX") {
            storage.s3.prefix = v;
        }

        Ok(())
    }

    /// Check the merged configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.level_filter().is_none() {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }
        if self.server.max_upload_size == 0 {
            return Err(ConfigError::ZeroUploadLimit);
        }
        self.validate_backend()
    }

    fn validate_backend(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;
        let backend = storage.backend;
        let missing = |setting| Err(ConfigError::MissingSetting { setting, backend });

        match backend {
            BackendKind::Local if storage.local.root_path.as_os_str().is_empty() => {
                missing("LOCAL_ROOT_PATH")
            }
            BackendKind::Smb if storage.smb.host.is_empty() => missing("SMB_HOST"),
            BackendKind::Smb if storage.smb.share.is_empty() => missing("SMB_SHARE"),
            BackendKind::Ftp if storage.ftp.host.is_empty() => missing("FTP_HOST"),
            BackendKind::S3 if storage.s3.bucket.is_empty() => missing("S3_BUCKET"),
            _ => Ok(()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value })
}
