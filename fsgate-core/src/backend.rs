// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage backend trait

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;

use crate::{
    context::OpContext,
    entry::FileEntry,
    error::StorageResult,
};

/// Byte stream type
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Build a stream that yields a single chunk.
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
    let data = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a stream into one buffer.
pub async fn collect_stream(mut stream: ByteStream) -> StorageResult<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

/// Storage medium variants selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Smb,
    Ftp,
    S3,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [Self::Local, Self::Smb, Self::Ftp, Self::S3];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Smb => "smb",
            BackendKind::Ftp => "ftp",
            BackendKind::S3 => "s3",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("{s:?} (must be one of: local, smb, ftp, s3)"))
    }
}

/// Storage backend trait
///
/// Paths are caller-relative and slash-separated. An empty path or `/`
/// names the backend root. Implementations must keep every resolved path
/// inside their root regardless of what the caller passes.
#[async_trait]
pub trait Storage: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Entries of a directory, sorted by name.
    async fn list(&self, ctx: &OpContext, path: &str) -> StorageResult<Vec<FileEntry>>;

    /// Open a file for reading. Dropping the stream releases the handle.
    async fn read(&self, ctx: &OpContext, path: &str) -> StorageResult<ByteStream>;

    /// Create or fully replace a file, creating missing parent directories.
    async fn write(&self, ctx: &OpContext, path: &str, data: ByteStream) -> StorageResult<()>;

    async fn delete(&self, ctx: &OpContext, path: &str) -> StorageResult<()>;

    async fn stat(&self, ctx: &OpContext, path: &str) -> StorageResult<FileEntry>;
}
