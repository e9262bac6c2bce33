#![no_main]

use acumulus::collect::{Collector, DocumentSource, NoHooks};
use acumulus::complete::{Completor, VatRateTable};
use acumulus::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let config = Config::default();
        if let Ok(source) = DocumentSource::from_json_str(s) {
            if let Ok((mut invoice, _)) = Collector::new(&config).collect(&source, &NoHooks) {
                let rates = VatRateTable::dutch_defaults();
                let _ = Completor::new(&config, &rates).complete(&mut invoice);
            }
        }
    }
});
