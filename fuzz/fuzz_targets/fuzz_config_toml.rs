//! Fuzz target for lva.toml configuration parsing and validation.
//!
//! Parsing and validating arbitrary input must return errors, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lva_config::{validate_config, LvaConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = toml::from_str::<LvaConfig>(text) {
        let _ = validate_config(&config);
    }
});
