//! Fuzz target for settings files.
//!
//! Run with:
//!   cargo +nightly fuzz run settings_yaml_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use trashcan::Settings;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }
    if let Ok(yaml) = std::str::from_utf8(data) {
        let _ = Settings::from_yaml_str(yaml);
    }
});
