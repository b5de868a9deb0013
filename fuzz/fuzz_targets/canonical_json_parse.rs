//! Fuzz target for canonical JSON parsing.
//!
//! Arbitrary bytes go through the canonical reader and, when they parse,
//! through dataset validation, checking for panics, crashes, or hangs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use polymask::ir::io_json::from_json_str;
use polymask::validation::{validate_dataset, ValidateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(dataset) = from_json_str(text) {
        let _ = validate_dataset(&dataset, &ValidateOptions::default());
    }
});
