#![no_main]

use libfuzzer_sys::fuzz_target;
use remolino::io::parse_channel_csv;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed tables must come back as errors, never panics
        if let Ok(set) = parse_channel_csv(input) {
            assert!(set.channels().iter().all(|c| c.len() == set.len()));
        }
    }
});
