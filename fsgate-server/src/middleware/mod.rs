// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request pipeline stages

pub mod logging;
pub mod path_guard;
pub mod request_id;

pub use logging::log_requests;
pub use path_guard::path_guard;
pub use request_id::{request_id, RequestId, REQUEST_ID_HEADER};
