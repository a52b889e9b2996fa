//! Arabic letter shaping and digit shaping.
//!
//! Shaping maps each base letter to the presentation form (isolated, final,
//! initial or medial) its neighbours call for, and deshaping maps any
//! presentation form back to its base letter. Both work one character to
//! one character, so index maps survive them unchanged; the lam-alef
//! ligatures, which would change the length, are left alone.
//!
//! Joining context is always taken in logical order.

use super::classes;
use super::flags::Numerals;

const TATWEEL: char = '\u{0640}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

const ARABIC_INDIC_ZERO: u32 = 0x0660;
const EXTENDED_ARABIC_INDIC_ZERO: u32 = 0x06F0;

// (base letter, first presentation form, number of forms). Forms run
// isolated, final, initial, medial; one form means non-joining, two means
// right-joining only, four means dual-joining.
const FORMS_B: &[(u16, u16, u8)] = &[
    (0x0621, 0xFE80, 1),
    (0x0622, 0xFE81, 2),
    (0x0623, 0xFE83, 2),
    (0x0624, 0xFE85, 2),
    (0x0625, 0xFE87, 2),
    (0x0626, 0xFE89, 4),
    (0x0627, 0xFE8D, 2),
    (0x0628, 0xFE8F, 4),
    (0x0629, 0xFE93, 2),
    (0x062A, 0xFE95, 4),
    (0x062B, 0xFE99, 4),
    (0x062C, 0xFE9D, 4),
    (0x062D, 0xFEA1, 4),
    (0x062E, 0xFEA5, 4),
    (0x062F, 0xFEA9, 2),
    (0x0630, 0xFEAB, 2),
    (0x0631, 0xFEAD, 2),
    (0x0632, 0xFEAF, 2),
    (0x0633, 0xFEB1, 4),
    (0x0634, 0xFEB5, 4),
    (0x0635, 0xFEB9, 4),
    (0x0636, 0xFEBD, 4),
    (0x0637, 0xFEC1, 4),
    (0x0638, 0xFEC5, 4),
    (0x0639, 0xFEC9, 4),
    (0x063A, 0xFECD, 4),
    (0x0641, 0xFED1, 4),
    (0x0642, 0xFED5, 4),
    (0x0643, 0xFED9, 4),
    (0x0644, 0xFEDD, 4),
    (0x0645, 0xFEE1, 4),
    (0x0646, 0xFEE5, 4),
    (0x0647, 0xFEE9, 4),
    (0x0648, 0xFEED, 2),
    (0x0649, 0xFEEF, 2),
    (0x064A, 0xFEF1, 4),
];

// The last form is yeh medial; the lam-alef ligatures start right after.
const LAST_FORM: u32 = 0xFEF4;
const LAM_ALEF_FIRST: u32 = 0xFEF5;
const_assert_eq!(assert_forms_end; LAST_FORM + 1, LAM_ALEF_FIRST);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    None,
    Right,
    Dual,
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Isolated = 0,
    Final = 1,
    Initial = 2,
    Medial = 3,
}

fn forms_of(c: char) -> Option<(u16, u8)> {
    let n = c as u32;
    if n < 0x0621 || n > 0x064A {
        return None;
    }
    FORMS_B
        .binary_search_by_key(&(n as u16), |&(base, _, _)| base)
        .ok()
        .map(|i| (FORMS_B[i].1, FORMS_B[i].2))
}

fn joining(c: char) -> Joining {
    if c == TATWEEL || c == ZERO_WIDTH_JOINER {
        return Joining::Dual;
    }
    match c as u32 {
        0x064B..=0x065F | 0x0670 => return Joining::Transparent,
        _ => {}
    }
    match forms_of(c) {
        Some((_, 4)) => Joining::Dual,
        Some((_, 2)) => Joining::Right,
        _ => Joining::None,
    }
}

/// Nearest non-transparent character in the given direction.
fn neighbour<I: Iterator<Item = char>>(it: I) -> Joining {
    for c in it {
        match joining(c) {
            Joining::Transparent => continue,
            j => return j,
        }
    }
    Joining::None
}

/// Replace base Arabic letters with their contextual presentation forms.
pub(crate) fn shape(text: &mut [char]) {
    // Context comes from the unshaped text.
    let base = text.to_vec();
    for (i, &c) in base.iter().enumerate() {
        let (first, count) = match forms_of(c) {
            Some(f) => f,
            None => continue,
        };
        let own = joining(c);
        let prev = neighbour(base[..i].iter().rev().cloned());
        let next = neighbour(base[i + 1..].iter().cloned());
        // A letter joins backwards if the previous letter can join forwards.
        let joins_prev = prev == Joining::Dual && own != Joining::None;
        let joins_next = own == Joining::Dual && (next == Joining::Dual || next == Joining::Right);
        let form = match (joins_prev, joins_next) {
            (true, true) => Form::Medial,
            (true, false) => Form::Final,
            (false, true) => Form::Initial,
            (false, false) => Form::Isolated,
        };
        let offset = form as u16;
        if offset < u16::from(count) {
            if let Some(s) = std::char::from_u32(u32::from(first + offset)) {
                text[i] = s;
            }
        }
    }
}

fn base_of(c: char) -> Option<char> {
    let n = c as u32;
    if n < 0xFE80 || n > LAST_FORM {
        return None;
    }
    let n = n as u16;
    FORMS_B
        .iter()
        .find(|&&(_, first, count)| n >= first && n < first + u16::from(count))
        .and_then(|&(base, _, _)| std::char::from_u32(u32::from(base)))
}

/// Replace presentation forms with their base letters.
pub(crate) fn deshape(text: &mut [char]) {
    for c in text.iter_mut() {
        if let Some(b) = base_of(*c) {
            *c = b;
        }
    }
}

fn digit_value(c: char) -> Option<u32> {
    let n = c as u32;
    match n {
        0x30..=0x39 => Some(n - 0x30),
        0x0660..=0x0669 => Some(n - ARABIC_INDIC_ZERO),
        0x06F0..=0x06F9 => Some(n - EXTENDED_ARABIC_INDIC_ZERO),
        _ => None,
    }
}

fn european(d: u32) -> char {
    std::char::from_digit(d, 10).unwrap_or('0')
}

fn national(d: u32) -> char {
    std::char::from_u32(ARABIC_INDIC_ZERO + d).unwrap_or('\u{0660}')
}

/// Rewrite digits in logical-order `text` to the requested numeral style.
/// With `word_break`, the contextual style only looks back to the start of
/// the current word.
pub(crate) fn shape_numerals(text: &mut [char], numerals: Numerals, word_break: bool) {
    let mut arabic_context = false;
    for c in text.iter_mut() {
        if let Some(d) = digit_value(*c) {
            *c = match numerals {
                Numerals::Any => continue,
                Numerals::Nominal => european(d),
                Numerals::National => national(d),
                Numerals::Contextual if arabic_context => national(d),
                Numerals::Contextual => european(d),
            };
            continue;
        }
        if word_break && c.is_whitespace() {
            arabic_context = false;
        } else if let Some(rtl) = classes::strong_direction(*c) {
            arabic_context = rtl && classes::is_arabic_letter(*c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shaped(s: &str) -> String {
        let mut v: Vec<char> = s.chars().collect();
        shape(&mut v);
        v.into_iter().collect()
    }

    #[test]
    fn forms_follow_context() {
        // beh beh beh: initial, medial, final
        assert_eq!(shaped("\u{628}\u{628}\u{628}"), "\u{FE91}\u{FE92}\u{FE90}");
        assert_eq!(shaped("\u{628}"), "\u{FE8F}");
        // alef does not join forwards, so the beh after it is isolated.
        assert_eq!(shaped("\u{628}\u{627}\u{628}"), "\u{FE91}\u{FE8E}\u{FE8F}");
        // hamza never joins.
        assert_eq!(shaped("\u{628}\u{621}"), "\u{FE8F}\u{FE80}");
        // harakat are skipped when looking for neighbours.
        assert_eq!(shaped("\u{628}\u{64E}\u{628}"), "\u{FE91}\u{64E}\u{FE90}");
        assert_eq!(shaped("abc"), "abc");
    }

    #[test]
    fn deshape_inverts_shape() {
        let base = "\u{633}\u{644}\u{627}\u{645} \u{639}\u{644}\u{64A}\u{643}\u{645}";
        let mut v: Vec<char> = base.chars().collect();
        shape(&mut v);
        assert!(v.iter().any(|&c| c as u32 >= 0xFE80));
        deshape(&mut v);
        assert_eq!(v.into_iter().collect::<String>(), base);
    }

    #[test]
    fn numerals() {
        let mut v: Vec<char> = "a1 \u{628}2 3".chars().collect();
        shape_numerals(&mut v, Numerals::Contextual, false);
        assert_eq!(v.iter().collect::<String>(), "a1 \u{628}\u{662} \u{663}");

        let mut v: Vec<char> = "a1 \u{628}2 3".chars().collect();
        shape_numerals(&mut v, Numerals::Contextual, true);
        assert_eq!(v.iter().collect::<String>(), "a1 \u{628}\u{662} 3");

        shape_numerals(&mut v, Numerals::Nominal, false);
        assert_eq!(v.iter().collect::<String>(), "a1 \u{628}2 3");

        shape_numerals(&mut v, Numerals::National, false);
        assert_eq!(v.iter().collect::<String>(), "a\u{661} \u{628}\u{662} \u{663}");
    }
}
