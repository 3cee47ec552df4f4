//! Fuzz target for settings documents.

#![no_main]

use jt_config::{validate_settings, DocumentFormat, Settings};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for format in [DocumentFormat::Json, DocumentFormat::Yaml, DocumentFormat::Toml] {
        if let Ok(settings) = Settings::from_str_format(text, format) {
            let _ = validate_settings(&settings);
        }
    }
});
