#![no_main]

use acumulus::web::{HttpResponse, decode, normalize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let response = HttpResponse {
            status: 200,
            content_type: None,
            body: s.to_string(),
        };
        // Errors are fine, panics are bugs.
        if let Ok(value) = decode(&response) {
            let _ = normalize(value).status();
        }
    }
});
