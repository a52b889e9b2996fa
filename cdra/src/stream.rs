//! Incremental decoding.
//!
//! Host encodings are not one byte per character, so a reader sitting on a
//! socket or file has to hold on to half a pair (or a pending shift state,
//! or half a surrogate) between reads. `Fill` is that carried state, one
//! variant per table kind, chosen once when the decoder is set up.
//! `IncrementalDecoder` is the push-style wrapper (hand it whatever bytes you
//! have), and `StreamingDecoder` the pull-style one over an `io::Read`.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use crate::ccsid::CharacterSetId;
use crate::error::{ConvError, FaultMode, MalformedReason};
use crate::mixed::ShiftState;
use crate::registry::{CodecRegistry, ConvTable};
use crate::table::TableKind;
use crate::util;

const DEFAULT_CHUNK_SIZE: usize = 4096;

/// What one byte completed: usually zero or one character, two when a
/// tolerated unpaired surrogate is flushed ahead of the character after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decoded {
    Nothing,
    One(char),
    Two(char, char),
}

impl Decoded {
    fn from_option(c: Option<char>) -> Self {
        match c {
            Some(c) => Decoded::One(c),
            None => Decoded::Nothing,
        }
    }

    fn count(self) -> usize {
        match self {
            Decoded::Nothing => 0,
            Decoded::One(_) => 1,
            Decoded::Two(_, _) => 2,
        }
    }

    fn emit<E: Extend<char>>(self, out: &mut E) {
        match self {
            Decoded::Nothing => {}
            Decoded::One(a) => out.extend(Some(a)),
            Decoded::Two(a, b) => out.extend([a, b].iter().cloned()),
        }
    }
}

/// Decoder state carried between fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fill {
    SingleByte,
    DoubleByte { lead: Option<u8> },
    MixedByte(ShiftState),
    NativeUnicode {
        lead: Option<u8>,
        // A high surrogate and the offset of its first byte.
        high: Option<(u16, usize)>,
    },
}

impl Fill {
    pub(crate) fn for_kind(kind: TableKind) -> Self {
        match kind {
            TableKind::SingleByte => Fill::SingleByte,
            TableKind::DoubleByte => Fill::DoubleByte { lead: None },
            TableKind::MixedByte => Fill::MixedByte(ShiftState::new()),
            TableKind::NativeUnicode => Fill::NativeUnicode {
                lead: None,
                high: None,
            },
        }
    }

    fn kind(self: &Self) -> TableKind {
        match self {
            Fill::SingleByte => TableKind::SingleByte,
            Fill::DoubleByte { .. } => TableKind::DoubleByte,
            Fill::MixedByte(_) => TableKind::MixedByte,
            Fill::NativeUnicode { .. } => TableKind::NativeUnicode,
        }
    }

    /// True while part of a character is buffered.
    pub(crate) fn has_partial(self: &Self) -> bool {
        match self {
            Fill::SingleByte => false,
            Fill::DoubleByte { lead } => lead.is_some(),
            Fill::MixedByte(state) => state.has_partial(),
            Fill::NativeUnicode { lead, high } => lead.is_some() || high.is_some(),
        }
    }

    /// Feed one byte found at stream offset `at`.
    pub(crate) fn push(
        self: &mut Self,
        table: &ConvTable,
        b: u8,
        at: usize,
        mode: FaultMode,
    ) -> Result<Decoded, ConvError> {
        match self {
            Fill::SingleByte => Ok(Decoded::One(table.decode_unit(u16::from(b)))),
            Fill::DoubleByte { lead } => match lead.take() {
                None => {
                    *lead = Some(b);
                    Ok(Decoded::Nothing)
                }
                Some(first) => Ok(Decoded::One(
                    table.decode_unit(u16::from(first) << 8 | u16::from(b)),
                )),
            },
            Fill::MixedByte(state) => match table.as_mixed() {
                Some(m) => Ok(Decoded::from_option(m.step(state, b))),
                None => Ok(Decoded::One(table.decode_unit(u16::from(b)))),
            },
            Fill::NativeUnicode { lead, high } => {
                let first = match lead.take() {
                    None => {
                        *lead = Some(b);
                        return Ok(Decoded::Nothing);
                    }
                    Some(first) => first,
                };
                let unit = u16::from(first) << 8 | u16::from(b);
                let unit_at = at - 1;
                Self::push_unit(high, unit, unit_at, mode)
            }
        }
    }

    fn push_unit(
        high: &mut Option<(u16, usize)>,
        unit: u16,
        unit_at: usize,
        mode: FaultMode,
    ) -> Result<Decoded, ConvError> {
        if let Some((h, h_at)) = high.take() {
            if util::is_low_surrogate(unit) {
                let c = util::combine_surrogates(h, unit).unwrap_or(util::REPLACEMENT);
                return Ok(Decoded::One(c));
            }
            // The pending high surrogate has no partner.
            if !mode.is_tolerant() {
                return Err(ConvError::malformed(h_at, MalformedReason::UnpairedSurrogate));
            }
            warn!("Fill: unpaired high surrogate at offset {}", h_at);
            if util::is_high_surrogate(unit) {
                *high = Some((unit, unit_at));
                return Ok(Decoded::One(util::REPLACEMENT));
            }
            return match Self::lone_unit(unit, unit_at, mode)? {
                Some(c) => Ok(Decoded::Two(util::REPLACEMENT, c)),
                None => Ok(Decoded::One(util::REPLACEMENT)),
            };
        }
        if util::is_high_surrogate(unit) {
            *high = Some((unit, unit_at));
            return Ok(Decoded::Nothing);
        }
        Ok(Decoded::from_option(Self::lone_unit(unit, unit_at, mode)?))
    }

    // A unit that is not a high surrogate and not completing one.
    fn lone_unit(unit: u16, unit_at: usize, mode: FaultMode) -> Result<Option<char>, ConvError> {
        match util::unit_char(unit) {
            Some(c) => Ok(Some(c)),
            None if mode.is_tolerant() => {
                warn!("Fill: unpaired low surrogate at offset {}", unit_at);
                Ok(Some(util::REPLACEMENT))
            }
            None => Err(ConvError::malformed(unit_at, MalformedReason::UnpairedSurrogate)),
        }
    }

    /// Feed a run of bytes whose first byte sits at stream offset `base`.
    /// Returns the number of characters appended to `out`.
    pub(crate) fn decode<E: Extend<char>>(
        self: &mut Self,
        table: &ConvTable,
        bytes: &[u8],
        base: usize,
        mode: FaultMode,
        out: &mut E,
    ) -> Result<usize, ConvError> {
        let mut produced = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let d = self.push(table, b, base + i, mode)?;
            produced += d.count();
            d.emit(out);
        }
        Ok(produced)
    }

    /// The input ended after `end` bytes. Flush or report whatever is still
    /// buffered and return to the initial state.
    pub(crate) fn finish(self: &mut Self, end: usize, mode: FaultMode) -> Result<Option<char>, ConvError> {
        let fresh = Fill::for_kind(self.kind());
        // Reset first; the buffered state is judged from the old value.
        let old = ::std::mem::replace(self, fresh);
        let mut flushed = None;
        let (dangling, reason) = match old {
            Fill::SingleByte => (false, MalformedReason::TruncatedDoubleByte),
            Fill::DoubleByte { lead } => (lead.is_some(), MalformedReason::TruncatedDoubleByte),
            Fill::MixedByte(state) => {
                if !state.in_single_byte_mode() {
                    debug!("Fill: input ended in double-byte mode at offset {}", end);
                }
                (state.has_partial(), MalformedReason::TruncatedDoubleByte)
            }
            Fill::NativeUnicode { lead, high } => {
                if let Some((_, h_at)) = high {
                    if !mode.is_tolerant() {
                        return Err(ConvError::malformed(h_at, MalformedReason::UnpairedSurrogate));
                    }
                    warn!("Fill: unpaired high surrogate at offset {}", h_at);
                    flushed = Some(util::REPLACEMENT);
                }
                (lead.is_some(), MalformedReason::OddUnicodeLength)
            }
        };
        if dangling {
            if !mode.is_tolerant() {
                return Err(ConvError::malformed(end - 1, reason));
            }
            warn!("Fill: dropping dangling byte at offset {} ({})", end - 1, reason);
        }
        Ok(flushed)
    }
}

/// Push-style decoder: feed it byte slices as they arrive.
pub struct IncrementalDecoder {
    table: Arc<ConvTable>,
    mode: FaultMode,
    fill: Fill,
    consumed: usize,
}

impl IncrementalDecoder {
    pub fn new(table: Arc<ConvTable>, mode: FaultMode) -> Self {
        let fill = Fill::for_kind(table.kind());
        debug!(
            "IncrementalDecoder: {} using {:?} fill",
            table.ccsid(),
            fill.kind()
        );
        Self {
            table: table,
            mode: mode,
            fill: fill,
            consumed: 0,
        }
    }

    pub fn for_ccsid(ccsid: CharacterSetId, mode: FaultMode) -> Result<Self, ConvError> {
        Ok(Self::new(CodecRegistry::get(ccsid)?, mode))
    }

    pub fn table(self: &Self) -> &Arc<ConvTable> {
        &self.table
    }

    /// Decode `bytes`, appending complete characters to `out`. Returns how
    /// many characters were appended; a trailing partial character is kept
    /// for the next call.
    pub fn decode<E: Extend<char>>(self: &mut Self, bytes: &[u8], out: &mut E) -> Result<usize, ConvError> {
        let base = self.consumed;
        self.consumed += bytes.len();
        self.fill.decode(&self.table, bytes, base, self.mode, out)
    }

    /// Signal end of input. Reports (strict) or drops (tolerant) anything
    /// left half-decoded, and resets the decoder for a fresh stream.
    pub fn finish<E: Extend<char>>(self: &mut Self, out: &mut E) -> Result<usize, ConvError> {
        let end = self.consumed;
        self.consumed = 0;
        match self.fill.finish(end, self.mode)? {
            Some(c) => {
                out.extend(Some(c));
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub fn has_partial(self: &Self) -> bool {
        self.fill.has_partial()
    }

    pub fn in_double_byte_mode(self: &Self) -> bool {
        match &self.fill {
            Fill::MixedByte(state) => !state.in_single_byte_mode(),
            _ => false,
        }
    }

    pub fn bytes_consumed(self: &Self) -> usize {
        self.consumed
    }
}

/// Pull-style decoder over a byte source.
pub struct StreamingDecoder<R> {
    source: R,
    decoder: IncrementalDecoder,
    buf: Vec<u8>,
    pending: VecDeque<char>,
    total: usize,
    eof: bool,
    failed: bool,
}

impl<R: io::Read> StreamingDecoder<R> {
    pub fn new(source: R, ccsid: CharacterSetId, mode: FaultMode) -> Result<Self, ConvError> {
        Ok(Self::with_table(source, CodecRegistry::get(ccsid)?, mode))
    }

    pub fn with_table(source: R, table: Arc<ConvTable>, mode: FaultMode) -> Self {
        Self {
            source: source,
            decoder: IncrementalDecoder::new(table, mode),
            buf: vec![0; DEFAULT_CHUNK_SIZE],
            pending: VecDeque::new(),
            total: 0,
            eof: false,
            failed: false,
        }
    }

    /// Read from the source in chunks of `n` bytes rather than the default.
    pub fn with_chunk_size(mut self, n: usize) -> Self {
        assert!(n > 0);
        self.buf = vec![0; n];
        self
    }

    // Pull one chunk from the source through the decoder.
    fn fill(self: &mut Self) -> Result<(), ConvError> {
        let n = loop {
            match self.source.read(&mut self.buf) {
                Ok(n) => break n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ConvError::Io(e)),
            }
        };
        if n == 0 {
            trace!("StreamingDecoder: end of source after {} bytes", self.total);
            self.eof = true;
            self.decoder.finish(&mut self.pending)?;
            return Ok(());
        }
        self.total += n;
        let produced = self.decoder.decode(&self.buf[..n], &mut self.pending)?;
        trace!("StreamingDecoder: {} bytes => {} chars", n, produced);
        Ok(())
    }

    /// Append up to `max` characters to `out`. Returns the number appended;
    /// zero means the source is exhausted (or `max` was zero).
    pub fn read_chars(self: &mut Self, out: &mut String, max: usize) -> Result<usize, ConvError> {
        while self.pending.len() < max && !self.eof {
            self.fill()?;
        }
        let n = max.min(self.pending.len());
        out.extend(self.pending.drain(..n));
        Ok(n)
    }

    pub fn read_char(self: &mut Self) -> Result<Option<char>, ConvError> {
        while self.pending.is_empty() && !self.eof {
            self.fill()?;
        }
        Ok(self.pending.pop_front())
    }

    /// Whether decoded characters are waiting, so a read would not block on
    /// the source.
    pub fn has_buffered(self: &Self) -> bool {
        !self.pending.is_empty()
    }

    pub fn in_double_byte_mode(self: &Self) -> bool {
        self.decoder.in_double_byte_mode()
    }

    pub fn bytes_consumed(self: &Self) -> usize {
        self.total
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: io::Read> Iterator for StreamingDecoder<R> {
    type Item = Result<char, ConvError>;
    fn next(self: &mut Self) -> Option<Result<char, ConvError>> {
        if self.failed {
            return None;
        }
        match self.read_char() {
            Ok(Some(c)) => Some(Ok(c)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixed::MixedByteTable;
    use crate::table::CodeTableBuilder;

    fn dbcs() -> Arc<ConvTable> {
        let t = CodeTableBuilder::double_byte(CharacterSetId::from_u16(300))
            .map(0x4243, 'X')
            .map(0x4E00, '\u{4E00}')
            .build();
        Arc::new(ConvTable::Double(t))
    }

    #[test]
    fn one_byte_at_a_time() {
        let _ = env_logger::try_init();
        let mut d = IncrementalDecoder::new(dbcs(), FaultMode::Strict);
        let mut out = String::new();
        assert_eq!(d.decode(&[0x42], &mut out).unwrap(), 0);
        assert!(d.has_partial());
        assert_eq!(out, "");
        assert_eq!(d.decode(&[0x43], &mut out).unwrap(), 1);
        assert_eq!(out, "X");
        assert_eq!(d.decode(&[0x4E], &mut out).unwrap(), 0);
        assert_eq!(d.decode(&[0x00], &mut out).unwrap(), 1);
        assert_eq!(out, "X\u{4E00}");
        assert_eq!(d.finish(&mut out).unwrap(), 0);
    }

    #[test]
    fn dangling_byte_at_end() {
        let mut d = IncrementalDecoder::new(dbcs(), FaultMode::Strict);
        let mut out = String::new();
        d.decode(&[0x42, 0x43, 0x42], &mut out).unwrap();
        match d.finish(&mut out) {
            Err(ConvError::Malformed { offset: 2, reason: MalformedReason::TruncatedDoubleByte }) => {}
            other => panic!("unexpected {:?}", other),
        }

        let mut d = IncrementalDecoder::new(dbcs(), FaultMode::Tolerant);
        let mut out = String::new();
        d.decode(&[0x42, 0x43, 0x42], &mut out).unwrap();
        assert_eq!(d.finish(&mut out).unwrap(), 0);
        assert_eq!(out, "X");
    }

    #[test]
    fn failed_finish_still_resets() {
        let mut d = IncrementalDecoder::new(dbcs(), FaultMode::Strict);
        let mut out = String::new();
        d.decode(&[0x42], &mut out).unwrap();
        assert!(d.finish(&mut out).is_err());
        assert!(!d.has_partial());
        assert_eq!(d.decode(&[0x42, 0x43], &mut out).unwrap(), 1);
        assert_eq!(out, "X");

        let unicode = CodecRegistry::get(CharacterSetId::UTF16).unwrap();
        let mut d = IncrementalDecoder::new(unicode, FaultMode::Strict);
        let mut out = String::new();
        d.decode(&[0xD8, 0x3D], &mut out).unwrap();
        assert!(d.finish(&mut out).unwrap_err().is_malformed());
        assert!(!d.has_partial());
        assert_eq!(d.decode(&[0x00, 0x41], &mut out).unwrap(), 1);
        assert_eq!(out, "A");
        assert_eq!(d.finish(&mut out).unwrap(), 0);
    }

    #[test]
    fn mixed_shift_state_survives_reads() {
        let single = CodeTableBuilder::single_byte(CharacterSetId::from_u16(290))
            .map(0x41, 'A')
            .build();
        let double = CodeTableBuilder::double_byte(CharacterSetId::from_u16(300))
            .map(0x4243, 'X')
            .build();
        let table = Arc::new(ConvTable::Mixed(MixedByteTable::new(
            CharacterSetId::from_u16(930),
            single,
            double,
        )));
        let bytes: &[u8] = &[0x41, 0x0E, 0x42, 0x43, 0x42, 0x43, 0x0F, 0x41];
        let mut s = StreamingDecoder::with_table(bytes, table, FaultMode::Strict).with_chunk_size(3);
        let mut out = String::new();
        assert_eq!(s.read_chars(&mut out, 2).unwrap(), 2);
        assert_eq!(out, "AX");
        assert!(s.in_double_byte_mode());
        assert_eq!(s.read_chars(&mut out, 10).unwrap(), 2);
        assert_eq!(out, "AXXA");
        assert!(!s.in_double_byte_mode());
        assert_eq!(s.read_chars(&mut out, 10).unwrap(), 0);
        assert_eq!(s.bytes_consumed(), 8);
    }

    #[test]
    fn utf16_surrogates_across_reads() {
        let bytes: &[u8] = &[0x00, 0x41, 0xD8, 0x3D, 0xDE, 0x00, 0x00];
        let s = StreamingDecoder::new(bytes, CharacterSetId::UTF16, FaultMode::Tolerant)
            .unwrap()
            .with_chunk_size(1);
        let chars: Result<String, ConvError> = s.collect();
        assert_eq!(chars.unwrap(), "A\u{1F600}");

        let bytes: &[u8] = &[0xD8, 0x3D, 0x00, 0x41];
        let mut s = StreamingDecoder::new(bytes, CharacterSetId::UTF16, FaultMode::Strict).unwrap();
        match s.next() {
            Some(Err(ConvError::Malformed { offset: 0, reason: MalformedReason::UnpairedSurrogate })) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(s.next().is_none());

        let s = StreamingDecoder::new(bytes, CharacterSetId::UTF16, FaultMode::Tolerant).unwrap();
        let chars: Result<String, ConvError> = s.collect();
        assert_eq!(chars.unwrap(), "\u{FFFD}A");
    }

    #[test]
    fn unknown_ccsid() {
        let bytes: &[u8] = &[];
        match StreamingDecoder::new(bytes, CharacterSetId::from_u16(1), FaultMode::Strict) {
            Err(ConvError::UnsupportedCharset(1)) => {}
            _ => panic!("expected unsupported charset"),
        }
    }
}
