// SPDX-License-Identifier: AGPL-3.0-or-later
//! Path confinement shared by the remote backends
//!
//! Remote media have no local root to compare against, so containment is
//! checked on the segment list itself: a `..` that would climb above the
//! first segment is refused.

use fsgate_core::error::{StorageError, StorageResult};

/// Split a caller path into clean segments that stay under the remote root.
pub fn confine(path: &str) -> StorageResult<Vec<String>> {
    let mut segments: Vec<String> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(StorageError::PermissionDenied(path.to_string()));
                }
            }
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}

/// Join confined segments under `base`, which may be empty.
pub fn join_under(base: &str, segments: &[String]) -> String {
    let base = base.trim_matches('/');
    match (base.is_empty(), segments.is_empty()) {
        (true, _) => segments.join("/"),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, segments.join("/")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confine_normalizes() {
        assert_eq!(confine("/a//b/./c/").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(confine("a/b/../c").unwrap(), vec!["a", "c"]);
        assert!(confine("").unwrap().is_empty());
    }

    #[test]
    fn test_confine_blocks_escape() {
        for path in ["..", "../x", "/../../etc/passwd", "sub/../../etc/passwd"] {
            assert!(confine(path).unwrap_err().is_permission_denied(), "{path}");
        }
    }

    #[test]
    fn test_join_under() {
        let segs = vec!["a".to_string(), "b.txt".to_string()];
        assert_eq!(join_under("", &segs), "a/b.txt");
        assert_eq!(join_under("/tenant/", &segs), "tenant/a/b.txt");
        assert_eq!(join_under("tenant", &[]), "tenant");
    }
}
