//! Fuzz target for the XML-RPC response and call decoders.
//!
//! Run with: cargo +nightly fuzz run fuzz_response_decoder
//!
//! Whatever the daemon (or a proxy in front of it) sends back, decoding must
//! return an error rather than panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use supctl_core::ProcessInfo;
use supctl_core::xmlrpc::{self, FromValue, MethodResponse};

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(MethodResponse::Success(value)) = xmlrpc::decode_response(body) {
        let _ = Vec::<ProcessInfo>::from_value(value.clone());
        let _ = String::from_value(value.clone());
        let _ = bool::from_value(value);
    }
    let _ = xmlrpc::decode_call(body);
});
