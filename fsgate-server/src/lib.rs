// SPDX-License-Identifier: AGPL-3.0-or-later
//! fsgate HTTP service
//!
//! Exposes list, stat, read, write and delete over a pluggable storage
//! backend. Every `path` query parameter passes the path guard before a
//! handler sees it.

pub mod config;
pub mod middleware;
pub mod response;
pub mod routes;

pub use config::{Config, ConfigError};
pub use routes::{router, AppState};
