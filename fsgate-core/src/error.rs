// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for fsgate
//!
//! Every backend reports failures through [`StorageError`], so callers can
//! branch on [`ErrorKind`] without knowing which medium served the request.

use std::io;
use thiserror::Error;

/// Result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed underlying cause carried by [`StorageError::Unknown`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome category of a failed storage call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Unknown,
}

/// Storage error
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("storage failure: {0}")]
    Unknown(#[source] BoxError),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            StorageError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn unknown(cause: impl Into<BoxError>) -> Self {
        StorageError::Unknown(cause.into())
    }

    /// Map an OS-level failure on `path` into the taxonomy.
    pub fn from_io(err: io::Error, path: impl Into<String>) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.into()),
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.into()),
            _ => StorageError::Unknown(Box::new(err)),
        }
    }

    /// Error returned by backends that do not implement an operation yet.
    pub fn unsupported(backend: &str, operation: &str) -> Self {
        StorageError::unknown(format!("{operation} is not supported by the {backend} backend"))
    }

    /// Error returned when the caller cancelled before a syscall was issued.
    pub fn cancelled() -> Self {
        StorageError::Unknown(Box::new(io::Error::new(
            io::ErrorKind::Interrupted,
            "operation cancelled",
        )))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }
}
