#![no_main]
use catalog_delta::{Factory, Overview, Report};
use libfuzzer_sys::fuzz_target;

/// Fuzz the overview wire format, then merge and report on what parses.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(overview) = Overview::from_json(s) {
            let _ = Report::new(&overview).to_text();
            if let Ok(factory) = Factory::from_overview(&overview) {
                let _ = factory.create_overview().to_json();
            }
        }
    }
});
