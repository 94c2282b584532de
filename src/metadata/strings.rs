//! Keyword-filtered printable ASCII strings.

use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;

/// Minimum printable run length considered a string.
pub const MIN_STRING_LEN: usize = 4;

/// Substrings that make a string worth reporting.
pub const KEYWORDS: [&str; 11] = [
    "http", "www", ".exe", ".dll", "cmd", "shell", "download", "install", "registry", "temp",
    "system",
];

static KEYWORD_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(KEYWORDS)
        .expect("valid keyword automaton")
});

#[inline]
fn is_printable(b: u8) -> bool {
    (0x20..=0x7e).contains(&b)
}

/// First `max` maximal printable runs (0x20..=0x7E, length >= 4) that
/// contain a keyword, case-insensitively.
///
/// The scan stops as soon as `max` strings are found. A run is only emitted
/// once a non-printable byte ends it, so a run still open at end of file is
/// dropped.
pub fn extract_key_strings(data: &[u8], max: usize) -> Vec<String> {
    let terminated = match data.iter().rposition(|&b| !is_printable(b)) {
        Some(end) => &data[..end],
        None => return Vec::new(),
    };
    terminated
        .split(|&b| !is_printable(b))
        .filter(|run| run.len() >= MIN_STRING_LEN)
        .filter(|run| KEYWORD_MATCHER.is_match(*run))
        .take(max)
        .map(|run| String::from_utf8_lossy(run).into_owned())
        .collect()
}
