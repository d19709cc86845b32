#![no_main]
use libfuzzer_sys::fuzz_target;
use rangesynth_engine::annotation::{parse_binding, AnnotationDocument};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_binding(s);
        if let Ok(doc) = AnnotationDocument::from_json_str(s) {
            let _ = doc.intervals();
            let _ = doc.shifted(i64::MAX).shifted(i64::MIN);
        }
    }
});
