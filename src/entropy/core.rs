//! Core entropy calculation primitives.

/// Calculates the Shannon entropy of a byte slice.
///
/// Returns a value between 0.0 and 8.0, where:
/// - 0.0 represents no randomness (e.g., all bytes are the same)
/// - 8.0 represents maximum randomness (uniform distribution)
#[inline]
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut histogram = [0usize; 256];
    for &byte in data {
        histogram[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &histogram {
        if count == 0 {
            continue;
        }
        let p = (count as f64) / len;
        entropy -= p * p.log2();
    }

    // Rounding noise can push a uniform distribution a hair past the bound.
    entropy.clamp(0.0, 8.0)
}

/// Rounds a value to two decimal places, the precision reported for
/// section and file entropy.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shannon entropy rounded to two decimals.
#[inline]
pub fn rounded_entropy(data: &[u8]) -> f64 {
    round2(shannon_entropy(data))
}
