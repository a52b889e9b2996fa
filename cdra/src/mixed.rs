//! Mixed-byte tables: a single-byte table and a double-byte table sharing one
//! byte stream, separated by shift-out (enter double-byte) and shift-in
//! (leave double-byte) control bytes.
//!
//! Decoding is stateful in the obvious way: the meaning of a byte depends on
//! every shift that came before it. Encoding deliberately is not. Each
//! character picks its table from its own value alone (Latin-1 range and the
//! euro sign try the single-byte table first, everything else the
//! double-byte table first), and shift bytes are emitted only where the
//! chosen table changes. The same string therefore always encodes to the
//! same bytes, no matter what was written before it.

use crate::ccsid::CharacterSetId;
use crate::error::{ConvError, FaultMode, MalformedReason};
use crate::iter::EncodedChunk;
use crate::table::{CodeTable, TableKind};
use crate::util;

pub const SHIFT_OUT: u8 = 0x0E;
pub const SHIFT_IN: u8 = 0x0F;
const_assert_eq!(assert_shift_pair; SHIFT_OUT + 1, SHIFT_IN);

const EURO_SIGN: char = '\u{20AC}';

pub struct MixedByteTable {
    ccsid: CharacterSetId,
    single: CodeTable,
    double: CodeTable,
    shift_out: u8,
    shift_in: u8,
}

/// Decoder-side shift state: which table the next byte belongs to, plus the
/// first byte of a double-byte pair whose second byte has not arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftState {
    single_byte_mode: bool,
    lead: Option<u8>,
}

impl Default for ShiftState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiftState {
    pub fn new() -> Self {
        Self {
            single_byte_mode: true,
            lead: None,
        }
    }

    pub fn in_single_byte_mode(self: &Self) -> bool {
        self.single_byte_mode
    }

    /// True while half of a double-byte character is buffered.
    pub fn has_partial(self: &Self) -> bool {
        self.lead.is_some()
    }
}

impl MixedByteTable {
    pub fn new(ccsid: CharacterSetId, single: CodeTable, double: CodeTable) -> Self {
        assert_eq!(single.kind(), TableKind::SingleByte);
        assert_eq!(double.kind(), TableKind::DoubleByte);
        Self {
            ccsid: ccsid,
            single: single,
            double: double,
            shift_out: SHIFT_OUT,
            shift_in: SHIFT_IN,
        }
    }

    /// Override the shift bytes for encodings that do not use 0x0E/0x0F.
    pub fn with_shift_bytes(mut self, shift_out: u8, shift_in: u8) -> Self {
        assert!(shift_out != shift_in);
        self.shift_out = shift_out;
        self.shift_in = shift_in;
        self
    }

    pub fn ccsid(self: &Self) -> CharacterSetId {
        self.ccsid
    }

    pub fn kind(self: &Self) -> TableKind {
        TableKind::MixedByte
    }

    pub fn single(self: &Self) -> &CodeTable {
        &self.single
    }

    pub fn double(self: &Self) -> &CodeTable {
        &self.double
    }

    pub fn shift_out(self: &Self) -> u8 {
        self.shift_out
    }

    pub fn shift_in(self: &Self) -> u8 {
        self.shift_in
    }

    /// Feed one byte through the shift state machine, returning the
    /// character it completes, if any. Shift bytes produce nothing.
    ///
    /// Only a shift-out seen in single-byte mode and a shift-in seen at the
    /// start of a double-byte unit are treated as shifts; anywhere else the
    /// byte is ordinary data for the current table.
    #[inline]
    pub fn step(self: &Self, state: &mut ShiftState, b: u8) -> Option<char> {
        if let Some(lead) = state.lead.take() {
            return Some(self.double.decode_unit(u16::from(lead) << 8 | u16::from(b)));
        }
        if state.single_byte_mode {
            if b == self.shift_out {
                trace!("MixedByteTable: shift out");
                state.single_byte_mode = false;
                None
            } else {
                Some(self.single.decode_unit(u16::from(b)))
            }
        } else if b == self.shift_in {
            trace!("MixedByteTable: shift in");
            state.single_byte_mode = true;
            None
        } else {
            state.lead = Some(b);
            None
        }
    }

    /// Decode `length` bytes starting at `offset`, beginning in single-byte
    /// mode. A double-byte character cut off by the end of the range is an
    /// error in strict mode and dropped in tolerant mode.
    pub fn decode(
        self: &Self,
        bytes: &[u8],
        offset: usize,
        length: usize,
        mode: FaultMode,
    ) -> Result<String, ConvError> {
        let slice = util::checked_range(bytes, offset, length)?;
        let mut state = ShiftState::new();
        let mut out = String::with_capacity(length);
        for &b in slice {
            if let Some(c) = self.step(&mut state, b) {
                out.push(c);
            }
        }
        if state.has_partial() {
            let at = offset + length - 1;
            if !mode.is_tolerant() {
                return Err(ConvError::malformed(at, MalformedReason::TruncatedDoubleByte));
            }
            warn!(
                "MixedByteTable: dropping truncated double-byte character at offset {} for {}",
                at, self.ccsid
            );
        }
        Ok(out)
    }

    // Single-byte code for `c`. Shift-out in single-byte mode always reads
    // back as a shift, so a character mapped there counts as unmapped.
    // Shift-in is only a shift in double-byte mode and stays usable.
    fn single_code(self: &Self, c: char) -> Option<u16> {
        self.single
            .encode_char(c)
            .filter(|&b| b != u16::from(self.shift_out))
    }

    /// Pick the table for `c` and its code there. Returns true for the
    /// single-byte table.
    fn choose(self: &Self, c: char) -> (bool, u16) {
        let single_first = (c as u32) < 0x100 || c == EURO_SIGN;
        if single_first {
            match self.single_code(c) {
                Some(b) => (true, b),
                None => match self.double.encode_char(c) {
                    Some(p) => (false, p),
                    None => (true, self.single.sub_code()),
                },
            }
        } else {
            match self.double.encode_char(c) {
                Some(p) => (false, p),
                None => match self.single_code(c) {
                    Some(b) => (true, b),
                    None => (false, self.double.sub_code()),
                },
            }
        }
    }

    pub fn encoder(self: &Self) -> ShiftEncoder<'_> {
        ShiftEncoder {
            table: self,
            double_mode: false,
        }
    }

    pub fn encode(self: &Self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + 2);
        let mut enc = self.encoder();
        for c in text.chars() {
            out.extend_from_slice(enc.encode_char(c).as_slice());
        }
        if let Some(tail) = enc.finish() {
            out.extend_from_slice(tail.as_slice());
        }
        out
    }

    /// Number of bytes `encode` would produce, shifts included.
    pub fn encoded_length(self: &Self, text: &str) -> usize {
        let mut enc = self.encoder();
        let body: usize = text.chars().map(|c| enc.encode_char(c).count).sum();
        body + enc.finish().map_or(0, |t| t.count)
    }
}

/// Encoder-side state: only whether the output is currently shifted out.
pub struct ShiftEncoder<'t> {
    table: &'t MixedByteTable,
    double_mode: bool,
}

impl<'t> ShiftEncoder<'t> {
    /// Encode one character, prefixed by a shift byte when its table differs
    /// from the previous character's.
    pub fn encode_char(self: &mut Self, c: char) -> EncodedChunk {
        let (single, code) = self.table.choose(c);
        let mut chunk = EncodedChunk::empty();
        if single {
            if self.double_mode {
                chunk.push(self.table.shift_in);
                self.double_mode = false;
            }
            chunk.push(code as u8);
        } else {
            if !self.double_mode {
                chunk.push(self.table.shift_out);
                self.double_mode = true;
            }
            chunk.push((code >> 8) as u8);
            chunk.push(code as u8);
        }
        trace!(
            "ShiftEncoder: char 0x{:x} => {:?}",
            c as u32,
            chunk.as_slice()
        );
        chunk
    }

    /// Close an open double-byte region.
    pub fn finish(self: &mut Self) -> Option<EncodedChunk> {
        if self.double_mode {
            self.double_mode = false;
            Some(EncodedChunk::new_single(self.table.shift_in))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CodeTableBuilder;

    fn sample() -> MixedByteTable {
        let single = CodeTableBuilder::single_byte(CharacterSetId::from_u16(290))
            .map(0x41, 'A')
            .map(0x42, 'B')
            .map(0x0F, '\u{0F}')
            .build();
        let double = CodeTableBuilder::double_byte(CharacterSetId::from_u16(300))
            .map(0x4243, 'X')
            .map(0x4545, '\u{20AC}')
            .map(0x4E00, '\u{4E00}')
            .build();
        MixedByteTable::new(CharacterSetId::from_u16(930), single, double)
    }

    #[test]
    fn decodes_shifted_pair() {
        let t = sample();
        let bytes = [0x41, 0x0E, 0x42, 0x43, 0x0F];
        assert_eq!(t.decode(&bytes, 0, bytes.len(), FaultMode::Strict).unwrap(), "AX");
    }

    #[test]
    fn euro_falls_back_to_double_byte() {
        let t = sample();
        assert_eq!(t.encode("A\u{20AC}"), vec![0x41, 0x0E, 0x45, 0x45, 0x0F]);
        assert_eq!(t.encoded_length("A\u{20AC}"), 5);
    }

    #[test]
    fn shifts_only_on_table_change() {
        let t = sample();
        assert_eq!(
            t.encode("AX\u{4E00}B"),
            vec![0x41, 0x0E, 0x42, 0x43, 0x4E, 0x00, 0x0F, 0x42]
        );
        assert_eq!(t.encode("AB"), vec![0x41, 0x42]);
        assert_eq!(t.encode(""), Vec::<u8>::new());
    }

    #[test]
    fn encoding_is_context_free() {
        let t = sample();
        let alone = t.encode("X");
        let after = t.encode("AX");
        assert_eq!(&after[1..], &alone[..]);
    }

    #[test]
    fn unmappable_uses_preferred_substitution() {
        let t = sample();
        // 'z' prefers single-byte; CJK prefers double-byte.
        assert_eq!(t.encode("z"), vec![0x3F]);
        assert_eq!(t.encode("\u{4E01}"), vec![0x0E, 0xFE, 0xFE, 0x0F]);
    }

    #[test]
    fn shift_in_in_single_mode_is_data() {
        let t = sample();
        let bytes = [0x0F, 0x41];
        assert_eq!(t.decode(&bytes, 0, 2, FaultMode::Strict).unwrap(), "\u{0F}A");
    }

    #[test]
    fn shift_out_character_is_substituted() {
        let single = CodeTableBuilder::from_single_byte(
            CharacterSetId::from_u16(290),
            &crate::tables::CP037_TO_UNICODE,
        )
        .build();
        let double = CodeTableBuilder::double_byte(CharacterSetId::from_u16(300))
            .map(0x4101, '\u{4E01}')
            .build();
        let t = MixedByteTable::new(CharacterSetId::from_u16(930), single, double);
        assert_eq!(t.encode("\u{0E}A"), vec![0x3F, 0xC1]);
        assert_eq!(t.decode(&[0x3F, 0xC1], 0, 2, FaultMode::Strict).unwrap(), "\u{1A}A");

        let bytes = t.encode("X\u{4E01}\u{0E}");
        assert_eq!(bytes, vec![0xE7, 0x0E, 0x41, 0x01, 0x0F, 0x3F]);
        let back = t.decode(&bytes, 0, bytes.len(), FaultMode::Strict).unwrap();
        assert_eq!(back, "X\u{4E01}\u{1A}");
        assert_eq!(t.encoded_length("X\u{4E01}\u{0E}"), bytes.len());

        // Shift-in is plain data in single-byte mode and survives.
        let bytes = t.encode("\u{0F}A");
        assert_eq!(t.decode(&bytes, 0, bytes.len(), FaultMode::Strict).unwrap(), "\u{0F}A");
    }

    #[test]
    fn truncated_pair() {
        let t = sample();
        let bytes = [0x41, 0x0E, 0x42, 0x43, 0x42];
        let err = t.decode(&bytes, 0, bytes.len(), FaultMode::Strict).unwrap_err();
        match err {
            ConvError::Malformed { offset: 4, reason: MalformedReason::TruncatedDoubleByte } => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(t.decode(&bytes, 0, bytes.len(), FaultMode::Tolerant).unwrap(), "AX");
    }

    #[test]
    fn balanced_input_ends_single_byte() {
        let t = sample();
        let mut state = ShiftState::new();
        for &b in &[0x0E, 0x42, 0x43, 0x0F, 0x41] {
            t.step(&mut state, b);
        }
        assert!(state.in_single_byte_mode());
        assert!(!state.has_partial());
    }
}
