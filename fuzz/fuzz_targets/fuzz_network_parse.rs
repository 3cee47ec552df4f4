//! Fuzz target for network documents.
//!
//! Parsing and validation must reject bad input with an error, never a
//! panic. Anything that validates must also compile.

#![no_main]

use jt_config::{validate_network, DocumentFormat, Network};
use jt_core::InferenceEngine;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for format in [DocumentFormat::Json, DocumentFormat::Yaml, DocumentFormat::Toml] {
        let Ok(network) = Network::from_str_format(text, format) else {
            continue;
        };
        if validate_network(&network).is_ok() && network.len() <= 12 {
            let _ = InferenceEngine::new(network);
        }
    }
});
