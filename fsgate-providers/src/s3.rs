// SPDX-License-Identifier: AGPL-3.0-or-later
//! S3-compatible object store backend
//!
//! Extension point. Caller paths map to object keys under an optional
//! prefix; the request layer is not implemented yet.

use async_trait::async_trait;
use fsgate_core::{
    backend::{BackendKind, ByteStream, Storage},
    context::OpContext,
    entry::FileEntry,
    error::{StorageError, StorageResult},
};
use serde::{Deserialize, Serialize};

use crate::remote::{confine, join_under};

/// S3 backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    pub bucket: String,
    /// AWS region (default: us-east-1)
    pub region: String,
    /// Key prefix every object lives under
    pub prefix: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            prefix: String::new(),
        }
    }
}

/// Object store backend
pub struct ObjectStoreBackend {
    config: S3Config,
}

impl ObjectStoreBackend {
    pub fn new(config: S3Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Object key for a caller path.
    pub fn object_key(&self, path: &str) -> StorageResult<String> {
        let segments = confine(path)?;
        Ok(join_under(&self.config.prefix, &segments))
    }

    fn fail(&self, ctx: &OpContext, path: &str, operation: &str) -> StorageError {
        let key = match ctx.check().and_then(|_| self.object_key(path)) {
            Ok(key) => key,
            Err(e) => return e,
        };
        tracing::debug!(bucket = %self.config.bucket, %key, operation, "s3 backend not implemented");
        StorageError::unsupported("s3", operation)
    }
}

#[async_trait]
impl Storage for ObjectStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    async fn list(&self, ctx: &OpContext, path: &str) -> StorageResult<Vec<FileEntry>> {
        Err(self.fail(ctx, path, "list"))
    }

    async fn read(&self, ctx: &OpContext, path: &str) -> StorageResult<ByteStream> {
        Err(self.fail(ctx, path, "read"))
    }

    async fn write(&self, ctx: &OpContext, path: &str, _data: ByteStream) -> StorageResult<()> {
        Err(self.fail(ctx, path, "write"))
    }

    async fn delete(&self, ctx: &OpContext, path: &str) -> StorageResult<()> {
        Err(self.fail(ctx, path, "delete"))
    }

    async fn stat(&self, ctx: &OpContext, path: &str) -> StorageResult<FileEntry> {
        Err(self.fail(ctx, path, "stat"))
    }
}
