//! Fuzz target for lva.json configuration parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lva_config::{validate_config, LvaConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<LvaConfig>(data) {
        let _ = validate_config(&config);
    }
});
