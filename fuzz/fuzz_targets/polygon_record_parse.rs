//! Fuzz target for web polygon records.
//!
//! Feeds arbitrary text through record validation and the SVG points
//! scanner.

#![no_main]

use libfuzzer_sys::fuzz_target;
use polymask::codec::polygon::{parse_svg_points, validate_record};

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    let text = String::from_utf8_lossy(data);

    let _ = parse_svg_points(&text);
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
        let _ = validate_record(&value, "fuzz");
    }
});
