// SPDX-License-Identifier: AGPL-3.0-or-later
//! File system entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file or directory as reported by List and Stat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    /// Slash-separated, relative to the storage root (`.` for the root)
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub mod_time: DateTime<Utc>,
}
