//! String types and their flag sets.

use std::fmt;
use std::sync::OnceLock;

use crate::ccsid::CharacterSetId;
use crate::error::ConvError;

/// A CDRA string type code. Valid codes are 4..=11, plus the two sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringType(i32);

impl StringType {
    /// Layout conversion disabled.
    pub const NONE: StringType = StringType(-1);
    /// Whatever the CCSID's default is.
    pub const DEFAULT: StringType = StringType(0);
    pub const ST4: StringType = StringType(4);
    pub const ST5: StringType = StringType(5);
    pub const ST6: StringType = StringType(6);
    pub const ST7: StringType = StringType(7);
    pub const ST8: StringType = StringType(8);
    pub const ST9: StringType = StringType(9);
    pub const ST10: StringType = StringType(10);
    pub const ST11: StringType = StringType(11);

    /// Accept DEFAULT, NONE, or 4..=11.
    pub fn new(code: i32) -> Result<Self, ConvError> {
        match code {
            -1 | 0 | 4..=11 => Ok(StringType(code)),
            _ => Err(ConvError::InvalidArgument {
                name: "string type",
                value: i64::from(code),
            }),
        }
    }

    pub fn code(self) -> i32 {
        self.0
    }

    /// One of ST4..ST11, as opposed to a sentinel.
    pub fn is_concrete(self) -> bool {
        self.0 >= 4 && self.0 <= 11
    }
}

impl Default for StringType {
    fn default() -> Self {
        StringType::DEFAULT
    }
}

impl fmt::Display for StringType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            -1 => f.write_str("NONE"),
            0 => f.write_str("DEFAULT"),
            n => write!(f, "ST{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingType {
    /// Logical order; the display order is implied by the bidi algorithm.
    Implicit,
    /// Stored in display order.
    Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Ltr,
    Rtl,
    /// Direction of the first strong character, LTR if there is none.
    ContextualLtr,
    /// Direction of the first strong character, RTL if there is none.
    ContextualRtl,
}

impl Orientation {
    pub fn is_contextual(self) -> bool {
        match self {
            Orientation::ContextualLtr | Orientation::ContextualRtl => true,
            _ => false,
        }
    }

    /// Paragraph level used when the text itself gives no direction.
    pub fn fallback_level(self) -> u8 {
        match self {
            Orientation::Ltr | Orientation::ContextualLtr => 0,
            Orientation::Rtl | Orientation::ContextualRtl => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
    /// Base Arabic letters.
    Nominal,
    /// Presentation forms chosen by joining context.
    Shaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numerals {
    /// European digits.
    Nominal,
    /// Arabic-Indic digits.
    National,
    /// Arabic-Indic after Arabic letters, European otherwise.
    Contextual,
    /// Leave digits as found.
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swap {
    /// Mirrored glyphs are implied at RTL levels.
    Yes,
    /// Characters are stored as the glyphs shown.
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidiFlagSet {
    pub ordering: OrderingType,
    pub orientation: Orientation,
    pub text_shape: TextShape,
    pub numerals: Numerals,
    pub swap: Swap,
}

impl BidiFlagSet {
    pub const fn new(
        ordering: OrderingType,
        orientation: Orientation,
        text_shape: TextShape,
        numerals: Numerals,
        swap: Swap,
    ) -> Self {
        Self {
            ordering: ordering,
            orientation: orientation,
            text_shape: text_shape,
            numerals: numerals,
            swap: swap,
        }
    }

    pub fn is_visual(self: &Self) -> bool {
        self.ordering == OrderingType::Visual
    }
}

impl Default for BidiFlagSet {
    fn default() -> Self {
        string_type_flags(StringType::ST10.0)
    }
}

// The CDRA string type definitions.
fn string_type_flags(code: i32) -> BidiFlagSet {
    use self::Numerals::Nominal as Digits;
    use self::OrderingType::*;
    use self::Orientation::*;
    use self::Swap::*;
    use self::TextShape::*;
    match code {
        4 => BidiFlagSet::new(Visual, Ltr, Shaped, Digits, No),
        5 => BidiFlagSet::new(Implicit, Ltr, Nominal, Digits, Yes),
        6 => BidiFlagSet::new(Implicit, Rtl, Nominal, Digits, Yes),
        7 => BidiFlagSet::new(Visual, ContextualLtr, Shaped, Digits, No),
        8 => BidiFlagSet::new(Visual, Rtl, Shaped, Digits, No),
        9 => BidiFlagSet::new(Visual, Rtl, Shaped, Digits, Yes),
        11 => BidiFlagSet::new(Implicit, ContextualRtl, Nominal, Digits, Yes),
        _ => BidiFlagSet::new(Implicit, ContextualLtr, Nominal, Digits, Yes),
    }
}

const N_STRING_TYPES: usize = 12;

fn flag_table() -> &'static [Option<BidiFlagSet>; N_STRING_TYPES] {
    static TABLE: OnceLock<[Option<BidiFlagSet>; N_STRING_TYPES]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [None; N_STRING_TYPES];
        for (code, slot) in t.iter_mut().enumerate().skip(4) {
            *slot = Some(string_type_flags(code as i32));
        }
        debug!("flags: built string type table");
        t
    })
}

/// The flag set for a string type. DEFAULT yields the ST10 flags; NONE and
/// anything outside 4..=11 is rejected.
pub fn flags_for(st: StringType) -> Result<BidiFlagSet, ConvError> {
    let code = if st == StringType::DEFAULT {
        StringType::ST10.0
    } else {
        st.0
    };
    if code < 0 || code as usize >= N_STRING_TYPES {
        return Err(ConvError::InvalidArgument {
            name: "string type",
            value: i64::from(st.0),
        });
    }
    flag_table()[code as usize].ok_or(ConvError::InvalidArgument {
        name: "string type",
        value: i64::from(st.0),
    })
}

// Host default string type per CCSID. Sorted by CCSID.
const CCSID_STRING_TYPES: &[(u16, i32)] = &[
    (420, 4),
    (424, 4),
    (425, 5),
    (856, 5),
    (862, 4),
    (864, 5),
    (867, 4),
    (916, 5),
    (1046, 5),
    (1089, 5),
    (1255, 5),
    (1256, 5),
    (5351, 5),
    (5352, 5),
    (8612, 4),
    (8616, 10),
    (9238, 5),
    (12708, 7),
    (12712, 10),
    (16804, 4),
    (17248, 5),
    (62208, 4),
    (62209, 10),
    (62210, 4),
    (62211, 5),
    (62213, 5),
    (62215, 4),
    (62218, 4),
    (62220, 6),
    (62221, 6),
    (62222, 6),
    (62223, 6),
    (62224, 6),
    (62225, 6),
    (62226, 6),
    (62227, 6),
    (62228, 6),
    (62229, 6),
    (62230, 6),
    (62231, 6),
    (62232, 6),
    (62233, 6),
    (62234, 4),
    (62235, 6),
    (62236, 6),
    (62237, 8),
    (62238, 6),
    (62239, 6),
    (62240, 6),
    (62241, 6),
    (62242, 6),
    (62243, 6),
    (62244, 6),
    (62245, 10),
    (62250, 6),
    (62251, 6),
    (62252, 6),
    (62253, 6),
];

fn lookup(ccsid: CharacterSetId) -> Option<i32> {
    CCSID_STRING_TYPES
        .binary_search_by_key(&ccsid.value(), |&(c, _)| c)
        .ok()
        .map(|i| CCSID_STRING_TYPES[i].1)
}

/// The string type host data in `ccsid` is stored as. CCSIDs with no bidi
/// layout get DEFAULT.
pub fn default_string_type(ccsid: CharacterSetId) -> StringType {
    lookup(ccsid).map_or(StringType::DEFAULT, StringType)
}

pub(crate) fn is_bidi_ccsid(ccsid: CharacterSetId) -> bool {
    lookup(ccsid).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ccsid_table_is_sorted() {
        assert!(CCSID_STRING_TYPES.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(CCSID_STRING_TYPES.iter().all(|&(_, st)| st >= 4 && st <= 11));
    }

    #[test]
    fn arabic_hosts_are_visual_ltr() {
        assert_eq!(default_string_type(CharacterSetId::ARABIC), StringType::ST4);
        assert_eq!(default_string_type(CharacterSetId::from_u16(12708)), StringType::ST7);
        assert_eq!(default_string_type(CharacterSetId::CP037), StringType::DEFAULT);
        assert!(is_bidi_ccsid(CharacterSetId::HEBREW));
        assert!(!is_bidi_ccsid(CharacterSetId::CP500));
    }

    #[test]
    fn flag_lookup_is_total_on_concrete_types() {
        for code in 4..=11 {
            let st = StringType::new(code).unwrap();
            assert_eq!(flags_for(st).unwrap(), flags_for(st).unwrap());
        }
        let st4 = flags_for(StringType::ST4).unwrap();
        assert_eq!(st4.ordering, OrderingType::Visual);
        assert_eq!(st4.orientation, Orientation::Ltr);
        assert_eq!(st4.text_shape, TextShape::Shaped);
        assert_eq!(st4.swap, Swap::No);
        assert_eq!(flags_for(StringType::ST9).unwrap().swap, Swap::Yes);
        assert_eq!(
            flags_for(StringType::DEFAULT).unwrap(),
            flags_for(StringType::ST10).unwrap()
        );
    }

    #[test]
    fn rejects_codes_outside_range() {
        assert!(flags_for(StringType::NONE).is_err());
        for &code in &[1, 2, 3, 12, 100, -2] {
            match StringType::new(code) {
                Err(ConvError::InvalidArgument { value, .. }) => assert_eq!(value, i64::from(code)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(flags_for(StringType(3)).is_err());
    }
}
