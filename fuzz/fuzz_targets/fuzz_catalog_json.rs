#![no_main]
use catalog_delta::{Catalog, DeltaContext, DeltaEngine};
use libfuzzer_sys::fuzz_target;

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz catalog parsing and self comparison.
///
/// Also wraps the input as the resource list of a minimal catalog so that
/// mutations reach resource validation and indexing.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let engine = DeltaEngine::new();
        let context = DeltaContext::new("fuzz");

        if let Ok(catalog) = Catalog::from_json_str(s) {
            let _ = engine.compare(&catalog, &catalog, &context);
        }

        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped =
                format!(r#"{{"environment":"production","version":1,"edges":[],"resources":[{s}]}}"#);
            if let Ok(catalog) = Catalog::from_json_str(&wrapped) {
                let _ = engine.compare(&catalog, &catalog, &context);
            }
        }
    }
});
