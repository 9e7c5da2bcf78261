#![no_main]
use catalog_delta::{DeltaEngine, Exclude, ExclusionFilter};
use libfuzzer_sys::fuzz_target;

/// Fuzz exclusion rule parsing and matching.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(rules) = Exclude::parse_json(s) {
            if let Ok(filter) = ExclusionFilter::new(&rules) {
                let _ = filter.excludes_resource("File", "/etc/motd");
                let _ = filter.excluded_attributes("File", "/etc/motd");
                let _ = filter.excludes_edge("Class[Main]", s);
            }
            let _ = DeltaEngine::new().with_excludes(&rules);
        }
    }
});
