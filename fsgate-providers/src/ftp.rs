// SPDX-License-Identifier: AGPL-3.0-or-later
//! FTP backend
//!
//! Extension point. No control connection is opened; operations confine
//! the path and then report unsupported.

use async_trait::async_trait;
use fsgate_core::{
    backend::{BackendKind, ByteStream, Storage},
    context::OpContext,
    entry::FileEntry,
    error::{StorageError, StorageResult},
};
use serde::{Deserialize, Serialize};

use crate::remote::{confine, join_under};

/// FTP backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtpConfig {
    pub host: String,
    /// Port (default: 21)
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 21,
            user: String::new(),
            password: String::new(),
        }
    }
}

/// FTP storage backend
pub struct FtpBackend {
    config: FtpConfig,
}

impl FtpBackend {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FtpConfig {
        &self.config
    }

    /// Absolute path on the FTP server for a caller path.
    pub fn remote_path(&self, path: &str) -> StorageResult<String> {
        let segments = confine(path)?;
        Ok(format!("/{}", join_under("", &segments)))
    }

    fn check(&self, ctx: &OpContext, path: &str, operation: &str) -> StorageResult<String> {
        ctx.check()?;
        let remote = self.remote_path(path)?;
        tracing::debug!(host = %self.config.host, %remote, operation, "ftp backend not implemented");
        Ok(remote)
    }
}

#[async_trait]
impl Storage for FtpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Ftp
    }

    async fn list(&self, ctx: &OpContext, path: &str) -> StorageResult<Vec<FileEntry>> {
        self.check(ctx, path, "list")?;
        Err(StorageError::unsupported("ftp", "list"))
    }

    async fn read(&self, ctx: &OpContext, path: &str) -> StorageResult<ByteStream> {
        self.check(ctx, path, "read")?;
        Err(StorageError::unsupported("ftp", "read"))
    }

    async fn write(&self, ctx: &OpContext, path: &str, _data: ByteStream) -> StorageResult<()> {
        self.check(ctx, path, "write")?;
        Err(StorageError::unsupported("ftp", "write"))
    }

    async fn delete(&self, ctx: &OpContext, path: &str) -> StorageResult<()> {
        self.check(ctx, path, "delete")?;
        Err(StorageError::unsupported("ftp", "delete"))
    }

    async fn stat(&self, ctx: &OpContext, path: &str) -> StorageResult<FileEntry> {
        self.check(ctx, path, "stat")?;
        Err(StorageError::unsupported("ftp", "stat"))
    }
}
