// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-call operation context

use crate::error::{StorageError, StorageResult};
use tokio_util::sync::CancellationToken;

/// Context passed to every storage call.
///
/// Cancellation is advisory: backends check it before issuing a syscall and
/// never interrupt one that is already running.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: CancellationToken,
}

impl OpContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with a cancellation error if the caller has given up.
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            Err(StorageError::cancelled())
        } else {
            Ok(())
        }
    }
}
