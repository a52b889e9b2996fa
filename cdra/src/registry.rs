//! CCSID lookup.
//!
//! `ConvTable` is a resolved codec: one of the table shapes plus the two
//! specialised codecs (7-bit ASCII and UTF-16 passthrough). `CodecRegistry`
//! maps CCSIDs to shared, immutable `ConvTable`s, building built-in ones on
//! first use.
//!
//! The cache is process-wide. Building happens outside the lock, so two
//! threads asking for the same CCSID at once may both build it; whichever
//! inserts last wins and both get a complete table.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::ccsid::CharacterSetId;
use crate::error::{ConvError, FaultMode};
use crate::iter::EncodedChunk;
use crate::mixed::MixedByteTable;
use crate::stream::Fill;
use crate::table::{CodeTable, TableKind, SBCS_SUB_CHAR};
use crate::tables;
use crate::util;

const ASCII_SUB_BYTE: u8 = 0x1A;

/// 7-bit ASCII. Bytes above 0x7F have no mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsciiCodec {
    ccsid: CharacterSetId,
}

impl AsciiCodec {
    pub fn new(ccsid: CharacterSetId) -> Self {
        Self { ccsid: ccsid }
    }

    #[inline]
    pub fn decode_byte(self: &Self, b: u8) -> char {
        if b < 0x80 {
            char::from(b)
        } else {
            SBCS_SUB_CHAR
        }
    }

    #[inline]
    pub fn encode_char(self: &Self, c: char) -> u8 {
        if (c as u32) < 0x80 {
            c as u8
        } else {
            ASCII_SUB_BYTE
        }
    }
}

/// Big-endian UTF-16 passed straight through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeCodec {
    ccsid: CharacterSetId,
}

impl UnicodeCodec {
    pub fn new(ccsid: CharacterSetId) -> Self {
        Self { ccsid: ccsid }
    }

    fn encode_char(self: &Self, c: char, chunk: &mut EncodedChunk) {
        let mut units = [0u16; 2];
        for u in c.encode_utf16(&mut units).iter() {
            chunk.push((u >> 8) as u8);
            chunk.push(*u as u8);
        }
    }
}

pub enum ConvTable {
    Single(CodeTable),
    Double(CodeTable),
    Mixed(MixedByteTable),
    Ascii(AsciiCodec),
    Unicode(UnicodeCodec),
}

impl ConvTable {
    /// Wrap a single- or double-byte table in the matching variant.
    pub fn from_code_table(t: CodeTable) -> Self {
        match t.kind() {
            TableKind::DoubleByte => ConvTable::Double(t),
            _ => ConvTable::Single(t),
        }
    }

    pub fn ccsid(self: &Self) -> CharacterSetId {
        match self {
            ConvTable::Single(t) | ConvTable::Double(t) => t.ccsid(),
            ConvTable::Mixed(m) => m.ccsid(),
            ConvTable::Ascii(a) => a.ccsid,
            ConvTable::Unicode(u) => u.ccsid,
        }
    }

    pub fn kind(self: &Self) -> TableKind {
        match self {
            ConvTable::Single(_) | ConvTable::Ascii(_) => TableKind::SingleByte,
            ConvTable::Double(_) => TableKind::DoubleByte,
            ConvTable::Mixed(_) => TableKind::MixedByte,
            ConvTable::Unicode(_) => TableKind::NativeUnicode,
        }
    }

    pub fn as_mixed(self: &Self) -> Option<&MixedByteTable> {
        match self {
            ConvTable::Mixed(m) => Some(m),
            _ => None,
        }
    }

    /// Look up one already-delimited host code. Mixed tables take codes
    /// above 0xFF from their double-byte half.
    pub(crate) fn decode_unit(self: &Self, code: u16) -> char {
        match self {
            ConvTable::Single(t) | ConvTable::Double(t) => t.decode_unit(code),
            ConvTable::Mixed(m) if code > 0xFF => m.double().decode_unit(code),
            ConvTable::Mixed(m) => m.single().decode_unit(code),
            ConvTable::Ascii(a) => a.decode_byte(code as u8),
            ConvTable::Unicode(_) => util::unit_char(code).unwrap_or(util::REPLACEMENT),
        }
    }

    /// Decode `length` bytes starting at `offset`.
    pub fn decode(
        self: &Self,
        bytes: &[u8],
        offset: usize,
        length: usize,
        mode: FaultMode,
    ) -> Result<String, ConvError> {
        match self {
            ConvTable::Single(t) | ConvTable::Double(t) => t.decode(bytes, offset, length, mode),
            ConvTable::Mixed(m) => m.decode(bytes, offset, length, mode),
            ConvTable::Ascii(a) => {
                let slice = util::checked_range(bytes, offset, length)?;
                Ok(slice.iter().map(|&b| a.decode_byte(b)).collect())
            }
            ConvTable::Unicode(_) => {
                let slice = util::checked_range(bytes, offset, length)?;
                let mut fill = Fill::for_kind(TableKind::NativeUnicode);
                let mut out = String::with_capacity(length / 2);
                fill.decode(self, slice, offset, mode, &mut out)?;
                if let Some(c) = fill.finish(offset + length, mode)? {
                    out.push(c);
                }
                Ok(out)
            }
        }
    }

    pub fn decode_all(self: &Self, bytes: &[u8], mode: FaultMode) -> Result<String, ConvError> {
        self.decode(bytes, 0, bytes.len(), mode)
    }

    /// Encode one character with no shift context: a mixed-byte character
    /// comes back wrapped in its own shift bytes when it needs them.
    pub(crate) fn encode_stateless(self: &Self, c: char) -> EncodedChunk {
        let mut chunk = EncodedChunk::empty();
        match self {
            ConvTable::Single(t) => chunk.push(t.encode_char_or_sub(c) as u8),
            ConvTable::Double(t) => {
                let code = t.encode_char_or_sub(c);
                chunk.push((code >> 8) as u8);
                chunk.push(code as u8);
            }
            ConvTable::Mixed(m) => {
                let mut enc = m.encoder();
                chunk = enc.encode_char(c);
                if let Some(tail) = enc.finish() {
                    for &b in tail.as_slice() {
                        chunk.push(b);
                    }
                }
            }
            ConvTable::Ascii(a) => chunk.push(a.encode_char(c)),
            ConvTable::Unicode(u) => u.encode_char(c, &mut chunk),
        }
        chunk
    }

    /// Encode text. Never fails: anything the table cannot represent
    /// becomes its substitution code.
    pub fn encode(self: &Self, text: &str) -> Vec<u8> {
        match self {
            ConvTable::Single(t) | ConvTable::Double(t) => t.encode(text),
            ConvTable::Mixed(m) => m.encode(text),
            ConvTable::Ascii(a) => text.chars().map(|c| a.encode_char(c)).collect(),
            ConvTable::Unicode(_) => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for u in text.encode_utf16() {
                    out.push((u >> 8) as u8);
                    out.push(u as u8);
                }
                out
            }
        }
    }

    /// Bytes `encode` would produce for `text`.
    pub fn encoded_length(self: &Self, text: &str) -> usize {
        match self {
            ConvTable::Single(_) | ConvTable::Ascii(_) => text.chars().count(),
            ConvTable::Double(_) => text.chars().count() * 2,
            ConvTable::Mixed(m) => m.encoded_length(text),
            ConvTable::Unicode(_) => text.encode_utf16().count() * 2,
        }
    }
}

type Cache = RwLock<HashMap<u16, Arc<ConvTable>>>;

fn cache() -> &'static Cache {
    static CACHE: OnceLock<Cache> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

const BUILTIN_CCSIDS: &[u16] = &[37, 367, 500, 819, 1047, 1140, 1200, 13488, 61952];

fn latin1_identity() -> [u16; 256] {
    let mut a = [0u16; 256];
    for (i, slot) in a.iter_mut().enumerate() {
        *slot = i as u16;
    }
    a
}

fn build_builtin(ccsid: CharacterSetId) -> Option<ConvTable> {
    let sbcs = |t: &[u16; 256], sub: u8| Some(ConvTable::Single(CodeTable::single_byte(ccsid, t, sub)));
    match ccsid.value() {
        37 => sbcs(&tables::CP037_TO_UNICODE, 0x3F),
        500 => sbcs(&tables::CP500_TO_UNICODE, 0x3F),
        1047 => sbcs(&tables::CP1047_TO_UNICODE, 0x3F),
        1140 => sbcs(&tables::CP1140_TO_UNICODE, 0x3F),
        819 => sbcs(&latin1_identity(), ASCII_SUB_BYTE),
        367 => Some(ConvTable::Ascii(AsciiCodec::new(ccsid))),
        1200 | 13488 | 61952 => Some(ConvTable::Unicode(UnicodeCodec::new(ccsid))),
        _ => None,
    }
}

/// The process-wide CCSID to codec map.
pub struct CodecRegistry;

impl CodecRegistry {
    /// The codec for `ccsid`, building and caching a built-in one if needed.
    pub fn get(ccsid: CharacterSetId) -> Result<Arc<ConvTable>, ConvError> {
        {
            let map = cache().read().unwrap_or_else(PoisonError::into_inner);
            if let Some(t) = map.get(&ccsid.value()) {
                return Ok(Arc::clone(t));
            }
        }
        let built = match build_builtin(ccsid) {
            Some(t) => Arc::new(t),
            None => return Err(ConvError::UnsupportedCharset(ccsid.value())),
        };
        debug!("CodecRegistry: built {:?} codec for {}", built.kind(), ccsid);
        let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
        map.insert(ccsid.value(), Arc::clone(&built));
        Ok(built)
    }

    /// Install an externally built table under its own CCSID, replacing any
    /// earlier one. Returns the shared handle.
    pub fn register(table: ConvTable) -> Arc<ConvTable> {
        let ccsid = table.ccsid();
        let table = Arc::new(table);
        debug!("CodecRegistry: registered {:?} codec for {}", table.kind(), ccsid);
        let mut map = cache().write().unwrap_or_else(PoisonError::into_inner);
        map.insert(ccsid.value(), Arc::clone(&table));
        table
    }

    pub fn is_supported(ccsid: CharacterSetId) -> bool {
        BUILTIN_CCSIDS.contains(&ccsid.value())
            || cache()
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&ccsid.value())
    }

    pub fn builtin_ccsids() -> &'static [u16] {
        BUILTIN_CCSIDS
    }
}
