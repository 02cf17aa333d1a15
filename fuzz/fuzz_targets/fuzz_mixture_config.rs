//! Fuzz target for mixture configuration parsing.
//!
//! Anything that parses must also pass validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mixvb_core::MixtureConfig;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = MixtureConfig::from_slice(Path::new("fuzz.json"), data) {
        assert!(config.validate().is_ok());
    }
});
