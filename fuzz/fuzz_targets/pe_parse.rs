#![no_main]
use libfuzzer_sys::fuzz_target;
use maiware::formats::pe::PeParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(pe) = PeParser::new(data) {
        for section in pe.sections() {
            let entropy = section.entropy(data);
            assert!((0.0..=8.0).contains(&entropy));
        }
        let _ = pe.imports();
        let _ = pe.resources();
        let _ = pe.rva_to_offset(pe.optional_header().address_of_entry_point);
    }
});
