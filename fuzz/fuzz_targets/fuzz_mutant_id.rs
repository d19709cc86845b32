#![no_main]
use libfuzzer_sys::fuzz_target;
use rangesynth_engine::propagate::MutantId;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // A parsed identifier must print back to the same name.
        if let Ok(id) = MutantId::parse(s) {
            assert_eq!(id.to_string(), s);
        }
    }
});
