#![no_main]
use libfuzzer_sys::fuzz_target;
use rangesynth_engine::catalog::Catalog;
use rangesynth_engine::model::Pattern;
use rangesynth_engine::pattern::build_ranges;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Entries that pass validation must lay out without panicking.
        if let Ok(catalog) = Catalog::from_json_str(s) {
            for target in catalog.iter() {
                for pattern in Pattern::ALL {
                    let _ = build_ranges(target, pattern, u32::MAX);
                }
            }
        }
    }
});
