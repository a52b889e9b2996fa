//! Single-byte and double-byte code tables.
//!
//! A table is two parallel arrays. `to_unicode` is indexed by host byte (256
//! entries) or host byte pair (65536 entries) and holds a BMP code unit.
//! `from_unicode` is indexed by BMP code unit and holds a host byte or pair.
//! Both directions are best effort: a host code with no Unicode counterpart
//! decodes to the table's substitution character, and a character with no
//! host counterpart encodes to the table's substitution code. That lossy
//! encode is how host conversion has always behaved, and callers rely on
//! encode never failing.
//!
//! Tables are built once and never mutated afterwards; the registry hands
//! out shared references to them.

use num_integer::Integer;

use crate::ccsid::CharacterSetId;
use crate::error::{ConvError, FaultMode, MalformedReason};
use crate::util;

/// Marker stored in `to_unicode` for host codes that have no mapping.
pub const UNMAPPED: u16 = 0xFFFF;

// Scratch value used while inverting; never survives construction.
const NO_CODE: u16 = 0xFFFF;

const SBCS_TABLE_SIZE: usize = 0x100;
const DBCS_TABLE_SIZE: usize = 0x1_0000;
const_assert_eq!(assert_dbcs_size; DBCS_TABLE_SIZE, SBCS_TABLE_SIZE * SBCS_TABLE_SIZE);

pub const EBCDIC_SUB_BYTE: u16 = 0x3F;
pub const DBCS_SUB_PAIR: u16 = 0xFEFE;
pub const SBCS_SUB_CHAR: char = '\u{1A}';

/// How a resolved codec consumes bytes. Decided once when the table is
/// built; decoders dispatch on this instead of inspecting concrete types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    SingleByte,
    DoubleByte,
    MixedByte,
    NativeUnicode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Single,
    Double,
}

pub struct CodeTable {
    ccsid: CharacterSetId,
    width: Width,
    to_unicode: Box<[u16]>,
    from_unicode: Box<[u16]>,
    sub_code: u16,
    sub_char: char,
}

impl CodeTable {
    /// Build a single-byte table from its host-to-Unicode array.
    pub fn single_byte(ccsid: CharacterSetId, to_unicode: &[u16; 256], sub_byte: u8) -> Self {
        Self::build(
            ccsid,
            Width::Single,
            to_unicode.to_vec().into_boxed_slice(),
            u16::from(sub_byte),
            SBCS_SUB_CHAR,
        )
    }

    /// Build a double-byte table from a 65536-entry host-to-Unicode array.
    pub fn double_byte(ccsid: CharacterSetId, to_unicode: Box<[u16]>, sub_pair: u16) -> Self {
        assert_eq!(to_unicode.len(), DBCS_TABLE_SIZE);
        Self::build(ccsid, Width::Double, to_unicode, sub_pair, util::REPLACEMENT)
    }

    fn build(
        ccsid: CharacterSetId,
        width: Width,
        to_unicode: Box<[u16]>,
        sub_code: u16,
        sub_char: char,
    ) -> Self {
        assert!((sub_code as usize) < to_unicode.len());
        // Invert. The first host code to claim a character keeps it, which is
        // what round-trips for tables with one-way duplicate mappings.
        let mut from_unicode = vec![NO_CODE; DBCS_TABLE_SIZE];
        let mut mapped = 0usize;
        for (code, &unit) in to_unicode.iter().enumerate() {
            if unit == UNMAPPED {
                continue;
            }
            let slot = &mut from_unicode[unit as usize];
            if *slot == NO_CODE {
                *slot = code as u16;
                mapped += 1;
            }
        }
        for slot in from_unicode.iter_mut() {
            if *slot == NO_CODE {
                *slot = sub_code;
            }
        }
        debug!(
            "CodeTable: built {:?} table for {} with {} mapped characters",
            width, ccsid, mapped
        );
        Self {
            ccsid: ccsid,
            width: width,
            to_unicode: to_unicode,
            from_unicode: from_unicode.into_boxed_slice(),
            sub_code: sub_code,
            sub_char: sub_char,
        }
    }

    pub fn ccsid(self: &Self) -> CharacterSetId {
        self.ccsid
    }

    pub fn kind(self: &Self) -> TableKind {
        match self.width {
            Width::Single => TableKind::SingleByte,
            Width::Double => TableKind::DoubleByte,
        }
    }

    /// Bytes per host code: 1 or 2.
    pub fn unit_width(self: &Self) -> usize {
        match self.width {
            Width::Single => 1,
            Width::Double => 2,
        }
    }

    /// The byte (single-byte tables) or pair written for unmappable text.
    pub fn sub_code(self: &Self) -> u16 {
        self.sub_code
    }

    /// The character produced for host codes without a mapping.
    pub fn sub_char(self: &Self) -> char {
        self.sub_char
    }

    /// Look up one host code. Indexing past the table is a caller bug.
    #[inline]
    pub fn decode_unit(self: &Self, code: u16) -> char {
        let unit = self.to_unicode[code as usize];
        let c = if unit == UNMAPPED {
            self.sub_char
        } else {
            util::unit_char(unit).unwrap_or(self.sub_char)
        };
        trace!("CodeTable: 0x{:x} => 0x{:x}", code, c as u32);
        c
    }

    /// The host code for `c`, or None when the table has no mapping for it.
    ///
    /// A character that legitimately maps to the substitution code (for
    /// example U+001A in EBCDIC tables) is still reported as mapped.
    #[inline]
    pub fn encode_char(self: &Self, c: char) -> Option<u16> {
        let unit = util::bmp_unit(c)?;
        if unit == UNMAPPED {
            return None;
        }
        let code = self.from_unicode[unit as usize];
        if code == self.sub_code && self.to_unicode[code as usize] != unit {
            None
        } else {
            Some(code)
        }
    }

    /// Like `encode_char` but degrades to the substitution code.
    #[inline]
    pub fn encode_char_or_sub(self: &Self, c: char) -> u16 {
        self.encode_char(c).unwrap_or(self.sub_code)
    }

    pub(crate) fn push_code(self: &Self, code: u16, out: &mut Vec<u8>) {
        match self.width {
            Width::Single => out.push(code as u8),
            Width::Double => {
                out.push((code >> 8) as u8);
                out.push(code as u8);
            }
        }
    }

    /// Decode `length` bytes of `bytes` starting at `offset`.
    ///
    /// A double-byte table given an odd byte count has a dangling half
    /// character at the end: that is an error in strict mode and silently
    /// dropped in tolerant mode.
    pub fn decode(
        self: &Self,
        bytes: &[u8],
        offset: usize,
        length: usize,
        mode: FaultMode,
    ) -> Result<String, ConvError> {
        let slice = util::checked_range(bytes, offset, length)?;
        match self.width {
            Width::Single => Ok(slice.iter().map(|&b| self.decode_unit(u16::from(b))).collect()),
            Width::Double => {
                if length.is_odd() {
                    if !mode.is_tolerant() {
                        return Err(ConvError::malformed(
                            offset + length - 1,
                            MalformedReason::TruncatedDoubleByte,
                        ));
                    }
                    warn!(
                        "CodeTable: dropping dangling byte at offset {} for {}",
                        offset + length - 1,
                        self.ccsid
                    );
                }
                Ok(slice
                    .chunks_exact(2)
                    .map(|p| self.decode_unit(u16::from(p[0]) << 8 | u16::from(p[1])))
                    .collect())
            }
        }
    }

    /// Encode text, substituting for anything the table cannot represent.
    pub fn encode(self: &Self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * self.unit_width());
        for c in text.chars() {
            self.push_code(self.encode_char_or_sub(c), &mut out);
        }
        out
    }
}

/// Assemble a table from explicit mappings. Double-byte and mixed tables
/// come from host mapping data rather than from built-in arrays, so this is
/// how they get into the registry.
pub struct CodeTableBuilder {
    ccsid: CharacterSetId,
    width: Width,
    to_unicode: Vec<u16>,
    sub_code: u16,
}

impl CodeTableBuilder {
    pub fn single_byte(ccsid: CharacterSetId) -> Self {
        Self {
            ccsid: ccsid,
            width: Width::Single,
            to_unicode: vec![UNMAPPED; SBCS_TABLE_SIZE],
            sub_code: EBCDIC_SUB_BYTE,
        }
    }

    pub fn double_byte(ccsid: CharacterSetId) -> Self {
        Self {
            ccsid: ccsid,
            width: Width::Double,
            to_unicode: vec![UNMAPPED; DBCS_TABLE_SIZE],
            sub_code: DBCS_SUB_PAIR,
        }
    }

    /// Start from an existing single-byte array, e.g. to patch a few slots.
    pub fn from_single_byte(ccsid: CharacterSetId, base: &[u16; 256]) -> Self {
        let mut b = Self::single_byte(ccsid);
        b.to_unicode.copy_from_slice(&base[..]);
        b
    }

    pub fn substitution(mut self, code: u16) -> Self {
        self.sub_code = code;
        self
    }

    /// Map one host code to one character. Supplementary-plane characters
    /// have no table slot and are ignored.
    pub fn map(mut self, code: u16, c: char) -> Self {
        assert!((code as usize) < self.to_unicode.len());
        match util::bmp_unit(c) {
            Some(unit) => self.to_unicode[code as usize] = unit,
            None => warn!(
                "CodeTableBuilder: U+{:X} is outside the BMP, not mapped for {}",
                c as u32, self.ccsid
            ),
        }
        self
    }

    pub fn build(self) -> CodeTable {
        match self.width {
            Width::Single => CodeTable::build(
                self.ccsid,
                Width::Single,
                self.to_unicode.into_boxed_slice(),
                self.sub_code,
                SBCS_SUB_CHAR,
            ),
            Width::Double => CodeTable::double_byte(
                self.ccsid,
                self.to_unicode.into_boxed_slice(),
                self.sub_code,
            ),
        }
    }
}
