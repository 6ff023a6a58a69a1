//! ISBN checksum validation.

use crate::consts::ISBN_SEPARATORS;

/// Returns `true` if `value` is a checksum-valid ISBN-10 or ISBN-13.
///
/// Hyphens and whitespace are ignored, and a trailing `X` (check digit 10)
/// is accepted for ISBN-10.
///
/// ```
/// use libris_epub::is_valid_isbn;
/// assert!(is_valid_isbn("978-0-306-40615-7"));
/// assert!(is_valid_isbn("0-8044-2957-X"));
/// assert!(!is_valid_isbn("978-0-306-40615-8"));
/// ```
pub fn is_valid(value: impl AsRef<str>) -> bool {
    let compact = ISBN_SEPARATORS.replace_all(value.as_ref(), "");
    match compact.len() {
        10 => is_valid_10(compact.as_bytes()),
        13 => is_valid_13(compact.as_bytes()),
        _ => false,
    }
}

fn is_valid_10(digits: &[u8]) -> bool {
    let mut sum = 0u32;
    for (i, &b) in digits.iter().enumerate() {
        let value = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'X' | b'x' if i == 9 => 10,
            _ => return false,
        };
        // Weights run 10 down to 1.
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn is_valid_13(digits: &[u8]) -> bool {
    let mut sum = 0u32;
    for (i, &b) in digits.iter().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let weight = if i % 2 == 0 { 1 } else { 3 };
        sum += u32::from(b - b'0') * weight;
    }
    sum % 10 == 0
}
