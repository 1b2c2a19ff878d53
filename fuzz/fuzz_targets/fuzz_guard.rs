// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for request path sanitizing

#![no_main]

use fsgate_core::guard;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let cleaned = guard::clean(input);
    assert_eq!(guard::clean(&cleaned), cleaned);

    if input.is_empty() {
        return;
    }
    if let Ok(accepted) = guard::sanitize(input) {
        assert!(!accepted.contains('\0'));
        assert!(!accepted.split('/').any(|seg| seg == ".."));
        assert_eq!(guard::clean(&accepted), accepted);
    }
});
