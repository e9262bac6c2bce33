#![no_main]

use acumulus::web::xml::{value_to_xml, xml_to_value};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(value) = xml_to_value(s) {
            if let Ok(xml) = value_to_xml("myxml", &value, false) {
                let _ = xml_to_value(&xml);
            }
        }
    }
});
