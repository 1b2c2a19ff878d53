// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request-boundary path guard
//!
//! Validates a caller-supplied `path` value before it reaches any backend:
//! the value is percent-decoded once, rejected if the decoded form carries a
//! traversal token or a NUL byte, and otherwise lexically normalized.
//!
//! This is the first of two independent checks. Backends re-check
//! containment against their own root and never rely on this one.

use std::borrow::Cow;
use thiserror::Error;

/// Reasons the guard rejects a path
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    #[error("invalid path encoding")]
    InvalidEncoding,

    #[error("invalid path")]
    Traversal,

    #[error("invalid path")]
    NullByte,
}

/// Validate and normalize a raw path value.
///
/// An empty value passes through unchanged and names the root.
pub fn sanitize(raw: &str) -> Result<String, GuardError> {
    if raw.is_empty() {
        return Ok(String::new());
    }

    // Checks run on the decoded value so that `%252e%252e` cannot slip
    // through once the query layer has already decoded one level.
    let decoded = percent_decode(raw)?;

    if decoded.contains("..") {
        return Err(GuardError::Traversal);
    }
    if decoded.contains('\0') {
        return Err(GuardError::NullByte);
    }

    Ok(clean(&decoded))
}

fn percent_decode(raw: &str) -> Result<Cow<'_, str>, GuardError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(GuardError::InvalidEncoding);
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    urlencoding::decode(raw).map_err(|_| GuardError::InvalidEncoding)
}

/// Lexically normalize a slash-separated path.
///
/// Collapses repeated separators, drops `.` segments and a trailing
/// separator, and folds `..` into its parent. `..` at the start of a rooted
/// path is dropped; at the start of a relative path it is kept. An empty
/// result becomes `.`.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut out: Vec<&str> = Vec::new();

    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|s| *s != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }

    let joined = out.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
