// SPDX-License-Identifier: AGPL-3.0-or-later
//! SMB/CIFS network share backend
//!
//! Extension point: paths are confined and translated to share paths, but
//! no SMB session is opened yet, so every operation reports unsupported.

use async_trait::async_trait;
use fsgate_core::{
    backend::{BackendKind, ByteStream, Storage},
    context::OpContext,
    entry::FileEntry,
    error::{StorageError, StorageResult},
};
use serde::{Deserialize, Serialize};

use crate::remote::confine;

/// SMB backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmbConfig {
    /// Server hostname or IP
    pub host: String,
    /// Port (default: 445)
    pub port: u16,
    /// Share name
    pub share: String,
    pub user: String,
    pub password: String,
}

impl Default for SmbConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 445,
            share: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// SMB share backend
pub struct ShareBackend {
    config: SmbConfig,
}

impl ShareBackend {
    pub fn new(config: SmbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SmbConfig {
        &self.config
    }

    /// UNC path for a caller path: `\\host\share\a\b`
    pub fn share_path(&self, path: &str) -> StorageResult<String> {
        let segments = confine(path)?;
        let mut unc = format!("\\\\{}\\{}", self.config.host, self.config.share);
        for seg in &segments {
            unc.push('\\');
            unc.push_str(seg);
        }
        Ok(unc)
    }

    fn unsupported(&self, ctx: &OpContext, path: &str, operation: &str) -> StorageError {
        if let Err(e) = ctx.check() {
            return e;
        }
        match self.share_path(path) {
            Ok(unc) => {
                tracing::debug!(%unc, operation, "smb backend not implemented");
                StorageError::unsupported("smb", operation)
            }
            Err(e) => e,
        }
    }
}

#[async_trait]
impl Storage for ShareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Smb
    }

    async fn list(&self, ctx: &OpContext, path: &str) -> StorageResult<Vec<FileEntry>> {
        Err(self.unsupported(ctx, path, "list"))
    }

    async fn read(&self, ctx: &OpContext, path: &str) -> StorageResult<ByteStream> {
        Err(self.unsupported(ctx, path, "read"))
    }

    async fn write(&self, ctx: &OpContext, path: &str, _data: ByteStream) -> StorageResult<()> {
        Err(self.unsupported(ctx, path, "write"))
    }

    async fn delete(&self, ctx: &OpContext, path: &str) -> StorageResult<()> {
        Err(self.unsupported(ctx, path, "delete"))
    }

    async fn stat(&self, ctx: &OpContext, path: &str) -> StorageResult<FileEntry> {
        Err(self.unsupported(ctx, path, "stat"))
    }
}
