// Helpers shared by the tables and the decoders. Code tables are keyed by
// 16-bit code units, so anything outside the BMP has no table slot.

use crate::error::ConvError;

pub const REPLACEMENT: char = '\u{FFFD}';

/// The BMP code unit for `c`, or None for supplementary-plane characters.
#[inline]
pub fn bmp_unit(c: char) -> Option<u16> {
    let n: u32 = c as u32;
    try_from::TryInto::<u16>::try_into(n).ok()
}

/// Turn a table entry back into a char. Surrogate values are not chars.
#[inline]
pub fn unit_char(u: u16) -> Option<char> {
    ::std::char::from_u32(u32::from(u))
}

#[inline]
pub fn is_high_surrogate(u: u16) -> bool {
    (0xD800..=0xDBFF).contains(&u)
}

#[inline]
pub fn is_low_surrogate(u: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&u)
}

pub fn combine_surrogates(high: u16, low: u16) -> Option<char> {
    let hi = u32::from(high - 0xD800);
    let lo = u32::from(low - 0xDC00);
    ::std::char::from_u32(0x1_0000 + (hi << 10) + lo)
}

/// Validate a caller-supplied offset/length pair and return the slice it
/// names.
pub fn checked_range(bytes: &[u8], offset: usize, length: usize) -> Result<&[u8], ConvError> {
    match offset.checked_add(length) {
        Some(end) if end <= bytes.len() => Ok(&bytes[offset..end]),
        _ => Err(ConvError::Bounds {
            offset,
            length,
            available: bytes.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_units() {
        assert_eq!(bmp_unit('A'), Some(0x41));
        assert_eq!(bmp_unit('\u{20AC}'), Some(0x20AC));
        assert_eq!(bmp_unit('\u{FFFF}'), Some(0xFFFF));
        assert_eq!(bmp_unit('\u{1F600}'), None);
    }

    #[test]
    fn surrogates_combine() {
        assert_eq!(combine_surrogates(0xD83D, 0xDE00), Some('\u{1F600}'));
        assert!(is_high_surrogate(0xD83D));
        assert!(is_low_surrogate(0xDE00));
        assert_eq!(unit_char(0xD800), None);
    }

    #[test]
    fn range_checks() {
        let b = [1u8, 2, 3];
        assert_eq!(checked_range(&b, 1, 2).unwrap(), &[2, 3]);
        assert!(checked_range(&b, 2, 2).is_err());
        assert!(checked_range(&b, usize::max_value(), 2).is_err());
    }
}
