// Character classification for the transform engine: a bidi class source
// carrying the two class-level options, symmetric swapping, and the
// direction markers.

use unicode_bidi::data_source::BidiDataSource;
use unicode_bidi::BidiClass;

use super::{ALM, LRM, RLM};

/// Bidi classes from the Unicode tables, adjusted by the transform options.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClassSource {
    /// European digits resolve like Arabic numbers, so digits keep their
    /// place next to Arabic text in both directions.
    pub round_trip: bool,
    /// Number separators and terminators are plain neutrals.
    pub win_compatible: bool,
}

impl BidiDataSource for ClassSource {
    fn bidi_class(&self, c: char) -> BidiClass {
        let class = unicode_bidi::bidi_class(c);
        match class {
            BidiClass::EN if self.round_trip => BidiClass::AN,
            BidiClass::ES | BidiClass::ET | BidiClass::CS if self.win_compatible => BidiClass::ON,
            _ => class,
        }
    }
}

/// Direction of `c` if it is strong: Some(false) for L, Some(true) for R/AL.
pub(crate) fn strong_direction(c: char) -> Option<bool> {
    match unicode_bidi::bidi_class(c) {
        BidiClass::L => Some(false),
        BidiClass::R | BidiClass::AL => Some(true),
        _ => None,
    }
}

/// Paragraph level from the first strong character, `fallback` if none.
pub(crate) fn first_strong_level<I>(chars: I, fallback: u8) -> u8
where
    I: IntoIterator<Item = char>,
{
    chars
        .into_iter()
        .filter_map(strong_direction)
        .next()
        .map_or(fallback, |rtl| if rtl { 1 } else { 0 })
}

pub(crate) fn is_arabic_letter(c: char) -> bool {
    unicode_bidi::bidi_class(c) == BidiClass::AL
}

pub(crate) fn is_nsm(c: char) -> bool {
    unicode_bidi::bidi_class(c) == BidiClass::NSM
}

pub(crate) fn is_paragraph_separator(c: char) -> bool {
    unicode_bidi::bidi_class(c) == BidiClass::B
}

pub(crate) fn is_marker(c: char) -> bool {
    c == LRM || c == RLM || c == ALM
}

/// The mirror image glyph for `c`, if it has one.
pub(crate) fn mirrored(c: char) -> Option<char> {
    let m = match c {
        '(' => ')',
        ')' => '(',
        '<' => '>',
        '>' => '<',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '\u{AB}' => '\u{BB}',
        '\u{BB}' => '\u{AB}',
        '\u{2039}' => '\u{203A}',
        '\u{203A}' => '\u{2039}',
        '\u{2045}' => '\u{2046}',
        '\u{2046}' => '\u{2045}',
        '\u{207D}' => '\u{207E}',
        '\u{207E}' => '\u{207D}',
        '\u{208D}' => '\u{208E}',
        '\u{208E}' => '\u{208D}',
        '\u{2264}' => '\u{2265}',
        '\u{2265}' => '\u{2264}',
        '\u{2266}' => '\u{2267}',
        '\u{2267}' => '\u{2266}',
        '\u{2268}' => '\u{2269}',
        '\u{2269}' => '\u{2268}',
        '\u{226A}' => '\u{226B}',
        '\u{226B}' => '\u{226A}',
        '\u{226E}' => '\u{226F}',
        '\u{226F}' => '\u{226E}',
        '\u{2282}' => '\u{2283}',
        '\u{2283}' => '\u{2282}',
        '\u{2286}' => '\u{2287}',
        '\u{2287}' => '\u{2286}',
        '\u{2329}' => '\u{232A}',
        '\u{232A}' => '\u{2329}',
        '\u{3008}' => '\u{3009}',
        '\u{3009}' => '\u{3008}',
        '\u{300A}' => '\u{300B}',
        '\u{300B}' => '\u{300A}',
        '\u{300C}' => '\u{300D}',
        '\u{300D}' => '\u{300C}',
        '\u{300E}' => '\u{300F}',
        '\u{300F}' => '\u{300E}',
        '\u{3010}' => '\u{3011}',
        '\u{3011}' => '\u{3010}',
        _ => return None,
    };
    Some(m)
}
