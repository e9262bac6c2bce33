#![no_main]

use acumulus::collect::{Token, Variables};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let item = serde_json::json!({"name": "Thee", "sku": "TH-01", "options": [{"value": "groot"}]});
        let vars = Variables::new().with("item", &item);
        if let Ok(token) = Token::parse(s) {
            let _ = token.evaluate(&vars);
        }
    }
});
