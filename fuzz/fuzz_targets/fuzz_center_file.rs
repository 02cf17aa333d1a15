//! Fuzz target for center-file parsing.
//!
//! Arbitrary bytes must produce centers or an error, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use mixvb_core::parse_centers;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let Some((&k, rest)) = data.split_first() else {
        return;
    };
    let k = usize::from(k % 8);
    for dimension in 1..=3 {
        if let Ok(centers) = parse_centers(Path::new("fuzz.json"), rest, k, dimension) {
            assert_eq!(centers.len(), k);
            assert!(centers.iter().all(|c| c.len() == dimension));
        }
    }
});
