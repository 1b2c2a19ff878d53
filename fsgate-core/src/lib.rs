// SPDX-License-Identifier: AGPL-3.0-or-later
//! fsgate core
//!
//! Storage capability trait, path guard, entry type and error taxonomy shared
//! by every backend and by the HTTP layer.

pub mod backend;
pub mod context;
pub mod entry;
pub mod error;
pub mod guard;

pub use backend::{collect_stream, stream_from_bytes, BackendKind, ByteStream, Storage};
pub use context::OpContext;
pub use entry::FileEntry;
pub use error::{ErrorKind, StorageError, StorageResult};
pub use guard::GuardError;
