//! Structural metadata on synthetic PE images.

use maiware::config::MetadataConfig;
use maiware::metadata::{
    detect_packer, detect_pe_type, extract_imports, extract_key_strings, extract_metadata,
    extract_sections, PackerVerdict, SectionInfo,
};
use maiware::AnalysisTarget;

use crate::common::{uniform_bytes, write_sample, PeBuilder};

fn section(name: &str, entropy: f64) -> SectionInfo {
    SectionInfo {
        name: name.to_string(),
        entropy,
        size: 0x200,
    }
}

#[test]
fn test_import_cap_across_modules() {
    let modules = ["KERNEL32.dll", "USER32.dll", "ADVAPI32.dll", "WS2_32.dll"];
    let mut builder = PeBuilder::new().section(".text", vec![0xC3; 0x200]);
    let names: Vec<Vec<String>> = modules
        .iter()
        .map(|m| (0..10).map(|i| format!("{}_Func{}", &m[..4], i)).collect())
        .collect();
    for (module, funcs) in modules.iter().zip(&names) {
        let funcs: Vec<&str> = funcs.iter().map(String::as_str).collect();
        builder = builder.import(module, &funcs);
    }
    let data = builder.build();

    let imports = extract_imports(&data, 5, 20).unwrap();
    assert_eq!(imports.len(), 20);

    let expected: Vec<String> = names
        .iter()
        .flat_map(|funcs| funcs.iter().take(5).cloned())
        .collect();
    assert_eq!(imports, expected);

    for module in &modules {
        let per = imports.iter().filter(|i| i.starts_with(&module[..4])).count();
        assert!(per <= 5, "{module}: {per}");
    }
}

#[test]
fn test_import_total_cap_cuts_late_modules() {
    let funcs = ["A", "B", "C", "D", "E", "F"];
    let data = PeBuilder::new()
        .pe64()
        .import("one.dll", &funcs)
        .import("two.dll", &funcs)
        .build();
    let imports = extract_imports(&data, 5, 7).unwrap();
    assert_eq!(imports, vec!["A", "B", "C", "D", "E", "A", "B"]);
}

#[test]
fn test_sections_in_disk_order_with_rounded_entropy() {
    let data = PeBuilder::new()
        .section(".text", vec![0u8; 0x200])
        .section(".rsrc", uniform_bytes(0x400))
        .section(".data", vec![0x41; 0x100])
        .build();
    let sections = extract_sections(&data).unwrap();

    let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![".text", ".rsrc", ".data"]);
    assert_eq!(sections[0].entropy, 0.0);
    assert_eq!(sections[1].entropy, 8.0);
    assert_eq!(sections[1].size, 0x400);
    for s in &sections {
        assert!((0.0..=8.0).contains(&s.entropy));
        assert_eq!(s.entropy, (s.entropy * 100.0).round() / 100.0);
    }
}

#[test]
fn test_pe_type_labels() {
    assert_eq!(detect_pe_type(&PeBuilder::new().build()), "PE32 Executable");
    assert_eq!(
        detect_pe_type(&PeBuilder::new().pe64().build()),
        "PE64 Executable (PE32+)"
    );
    assert_eq!(detect_pe_type(&PeBuilder::new().dll().build()), "PE32 DLL");
    assert_eq!(detect_pe_type(b"not a PE at all"), "PE Executable");
}

#[test]
fn test_packer_signature_wins_over_entropy() {
    let sections = [section("UPX0", 7.9), section("UPX1", 7.95), section(".rsrc", 7.6)];
    assert_eq!(
        detect_packer(&sections, 7.5).unwrap(),
        PackerVerdict::Named("UPX")
    );
    assert_eq!(detect_packer(&sections, 7.5).unwrap().to_string(), "UPX");
}

#[test]
fn test_packer_entropy_rules() {
    let two = [section(".text", 7.6), section(".data", 7.9), section(".rdata", 3.0)];
    assert_eq!(
        detect_packer(&two, 7.5).unwrap().to_string(),
        "Possibly Packed (High Entropy)"
    );

    let one = [section(".text", 7.6), section(".data", 4.0)];
    assert_eq!(
        detect_packer(&one, 7.5).unwrap().to_string(),
        "Suspicious (Partial Packing)"
    );

    let none = [section(".text", 6.1), section(".data", 7.5)];
    assert_eq!(detect_packer(&none, 7.5).unwrap().to_string(), "None Detected");
}

#[test]
fn test_string_length_boundary() {
    let mut data = Vec::new();
    data.extend_from_slice(b"\x00www\x00");
    data.extend_from_slice(b"\x01cmd\x01");
    data.extend_from_slice(b"\x02temp\x02");
    data.extend_from_slice(b"\x03nothing here\x03");
    data.extend_from_slice(b"\x04SHELL32.DLL\x04");

    let strings = extract_key_strings(&data, 10);
    assert_eq!(strings, vec!["temp", "SHELL32.DLL"]);
}

#[test]
fn test_string_scan_stops_at_max() {
    let mut data = Vec::new();
    for i in 0..50 {
        data.extend_from_slice(format!("http://host{i}.invalid\0").as_bytes());
    }
    let strings = extract_key_strings(&data, 10);
    assert_eq!(strings.len(), 10);
    assert_eq!(strings[0], "http://host0.invalid");
    assert_eq!(strings[9], "http://host9.invalid");
}

#[test]
fn test_extract_metadata_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data = PeBuilder::new()
        .section(".text", vec![0x90; 0x200])
        .section(".packed", uniform_bytes(0x200))
        .import("KERNEL32.dll", &["CreateProcessA", "WinExec"])
        .overlay(b"\0cmd.exe /c del %TEMP%\\x\0")
        .build();
    let path = write_sample(dir.path(), "sample.exe", &data);
    let target = AnalysisTarget::open(&path).unwrap();

    let meta = extract_metadata(&target, &MetadataConfig::default(), false);
    assert_eq!(meta.file_type, "PE32 Executable");
    assert_eq!(meta.packer, PackerVerdict::PartialPacking);
    assert_eq!(meta.sections.len(), 3);
    assert_eq!(meta.imports, vec!["CreateProcessA", "WinExec"]);
    assert!(meta.strings.iter().any(|s| s.contains("cmd.exe")));
}

#[test]
fn test_extract_metadata_on_truncated_image() {
    let dir = tempfile::tempdir().unwrap();
    let full = PeBuilder::new().section(".text", vec![0x90; 0x200]).build();
    let path = write_sample(dir.path(), "cut.exe", &full[..0x90]);
    let target = AnalysisTarget::open(&path).unwrap();

    let meta = extract_metadata(&target, &MetadataConfig::default(), true);
    assert!(meta.sections.is_empty());
    assert!(meta.imports.is_empty());
    assert_eq!(meta.packer, PackerVerdict::NoneDetected);
}
