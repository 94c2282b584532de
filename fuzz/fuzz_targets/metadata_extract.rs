#![no_main]
use libfuzzer_sys::fuzz_target;
use maiware::metadata::{
    detect_packer, detect_pe_type, extract_imports, extract_key_strings, extract_sections,
};

fuzz_target!(|data: &[u8]| {
    let sections = extract_sections(data).unwrap_or_default();
    let _ = detect_packer(&sections, 7.5);
    let _ = extract_imports(data, 5, 20);
    let strings = extract_key_strings(data, 10);
    assert!(strings.len() <= 10);
    let _ = detect_pe_type(data);
    let _ = maiware::features::pe_features(data);
});
