// SPDX-License-Identifier: AGPL-3.0-or-later
//! Storage providers for fsgate
//!
//! The local filesystem backend is complete. SMB, FTP and S3 are extension
//! points that confine paths and implement the trait shape but report every
//! operation as unsupported.

mod ftp;
mod local;
pub mod remote;
mod s3;
mod smb;

pub use ftp::{FtpBackend, FtpConfig};
pub use local::{LocalBackend, LocalConfig};
pub use s3::{ObjectStoreBackend, S3Config};
pub use smb::{ShareBackend, SmbConfig};

use fsgate_core::{BackendKind, Storage, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Backend selection plus the settings of every variant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub local: LocalConfig,
    pub smb: SmbConfig,
    pub ftp: FtpConfig,
    pub s3: S3Config,
}

/// Build the backend named by `config.backend`.
pub fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    let backend: Arc<dyn Storage> = match config.backend {
        BackendKind::Local => Arc::new(LocalBackend::from_config(&config.local)?),
        BackendKind::Smb => Arc::new(ShareBackend::new(config.smb.clone())),
        BackendKind::Ftp => Arc::new(FtpBackend::new(config.ftp.clone())),
        BackendKind::S3 => Arc::new(ObjectStoreBackend::new(config.s3.clone())),
    };

    if backend.kind() != BackendKind::Local {
        tracing::warn!(backend = %backend.kind(), "backend is not implemented; operations will fail");
    }
    Ok(backend)
}
