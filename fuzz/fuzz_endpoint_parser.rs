//! Fuzz target for endpoint URL parsing.
//!
//! Run with: cargo +nightly fuzz run fuzz_endpoint_parser

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        if let Ok(endpoint) = supctl_core::Endpoint::parse(url) {
            let _ = endpoint.host_header();
            let _ = endpoint.rpc_path();
        }
    }
});
