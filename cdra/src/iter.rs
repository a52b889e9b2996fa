/*
* Iterators for moving text in and out of the conversion tables.
*
* Nothing here knows about any particular table; it is sequence adaptors
* and the flow of data between callers and the per-character encoders and
* per-byte decoders in the other modules.
*/

#![allow(clippy::stutter)]

use std::io;

use crate::error::{ConvError, FaultMode};
use crate::mixed::ShiftEncoder;
use crate::registry::ConvTable;
use crate::stream::{Decoded, Fill};

// As with any stateful coder there are two levels of encoding iterator: one
// that returns chunks of encoded bytes (one chunk per input character, plus
// a possible closing chunk), and one that drains the chunks into a flat byte
// stream.

/// Bytes produced for one character. The widest case is a shift byte plus a
/// pair, or a UTF-16 surrogate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedChunk {
    pub bytes: [u8; 4],
    pub count: usize,
}

impl EncodedChunk {
    pub fn empty() -> Self {
        Self {
            bytes: [0; 4],
            count: 0,
        }
    }
    pub fn new_single(lead: u8) -> Self {
        Self {
            bytes: [lead, 0, 0, 0],
            count: 1,
        }
    }
    pub fn push(self: &mut Self, b: u8) {
        assert!(self.count < 4);
        self.bytes[self.count] = b;
        self.count += 1;
    }
    pub fn as_slice(self: &Self) -> &[u8] {
        &self.bytes[0..self.count]
    }
}

pub struct EncodedChunkIter<'t, IT>
where
    IT: Iterator<Item = char>,
{
    input: IT,
    table: &'t ConvTable,
    shift: Option<ShiftEncoder<'t>>,
    done: bool,
}

impl<'t, IT> EncodedChunkIter<'t, IT>
where
    IT: Iterator<Item = char>,
{
    pub fn new(table: &'t ConvTable, input: IT) -> Self {
        let shift = match table {
            ConvTable::Mixed(m) => Some(m.encoder()),
            _ => None,
        };
        Self {
            input: input,
            table: table,
            shift: shift,
            done: false,
        }
    }
}

impl<'t, IT> Iterator for EncodedChunkIter<'t, IT>
where
    IT: Iterator<Item = char>,
{
    type Item = EncodedChunk;
    fn next(self: &mut Self) -> Option<EncodedChunk> {
        match self.input.next() {
            Some(ch) => Some(match self.shift.as_mut() {
                Some(enc) => enc.encode_char(ch),
                None => self.table.encode_stateless(ch),
            }),
            None => {
                // A mixed-byte encoder may owe a closing shift-in.
                if self.done {
                    return None;
                }
                self.done = true;
                self.shift.as_mut().and_then(|enc| enc.finish())
            }
        }
    }
}

/// Flattens encoded chunks into bytes. Empty chunks are skipped.
pub struct DrainEncodedChunkIter<IT>
where
    IT: Iterator<Item = EncodedChunk>,
{
    chunks: IT,
    current: EncodedChunk,
    pos: usize,
}

impl<IT> DrainEncodedChunkIter<IT>
where
    IT: Iterator<Item = EncodedChunk>,
{
    pub fn new(chunks: IT) -> Self {
        Self {
            chunks: chunks,
            current: EncodedChunk::empty(),
            pos: 0,
        }
    }
}

impl<IT> Iterator for DrainEncodedChunkIter<IT>
where
    IT: Iterator<Item = EncodedChunk>,
{
    type Item = u8;
    fn next(self: &mut Self) -> Option<u8> {
        while self.pos == self.current.count {
            self.current = self.chunks.next()?;
            self.pos = 0;
        }
        let b = self.current.bytes[self.pos];
        self.pos += 1;
        Some(b)
    }
}

pub type EncodeIter<'t, IT> = DrainEncodedChunkIter<EncodedChunkIter<'t, IT>>;

impl ConvTable {
    /// Lazily encode a character sequence.
    pub fn encode_iter<IT>(self: &Self, input: IT) -> EncodeIter<'_, IT>
    where
        IT: Iterator<Item = char>,
    {
        DrainEncodedChunkIter::new(EncodedChunkIter::new(self, input))
    }

    /// Lazily decode a byte slice. See `DecodeIter` for error handling.
    pub fn decode_iter<'a>(self: &'a Self, bytes: &'a [u8]) -> DecodeIter<'a> {
        DecodeIter::new(self, bytes)
    }
}

/// Encode `s` straight into a writer, returning the bytes written.
pub fn write_encoded<W>(table: &ConvTable, s: &str, out: &mut W) -> io::Result<usize>
where
    W: io::Write,
{
    let mut total = 0;
    for chunk in EncodedChunkIter::new(table, s.chars()) {
        out.write_all(chunk.as_slice())?;
        total += chunk.count;
    }
    Ok(total)
}

// The easy way to decode is to call .decode_iter() on the bytes and collect
// the characters. That stops at the first fault though; use DecodeResultIter
// to see the faults themselves.

pub struct DecodeIter<'a> {
    inner: DecodeResultIter<'a>,
}

impl<'a> DecodeIter<'a> {
    pub fn new(table: &'a ConvTable, s: &'a [u8]) -> DecodeIter<'a> {
        DecodeIter {
            inner: DecodeResultIter::new(table, s, FaultMode::Strict),
        }
    }
}

impl<'a> Iterator for DecodeIter<'a> {
    type Item = char;
    fn next(self: &mut Self) -> Option<char> {
        match self.inner.next() {
            None | Some(Err(_)) => None,
            Some(Ok(c)) => Some(c),
        }
    }
}

pub struct DecodeResultIter<'a> {
    table: &'a ConvTable,
    fill: Fill,
    mode: FaultMode,
    slice: &'a [u8],
    pos: usize,
    queued: Option<char>,
    finished: bool,
}

impl<'a> DecodeResultIter<'a> {
    pub fn new(table: &'a ConvTable, s: &'a [u8], mode: FaultMode) -> DecodeResultIter<'a> {
        DecodeResultIter {
            table: table,
            fill: Fill::for_kind(table.kind()),
            mode: mode,
            slice: s,
            pos: 0,
            queued: None,
            finished: false,
        }
    }
}

impl<'a> Iterator for DecodeResultIter<'a> {
    type Item = Result<char, ConvError>;
    fn next(self: &mut Self) -> Option<Result<char, ConvError>> {
        if let Some(c) = self.queued.take() {
            return Some(Ok(c));
        }
        loop {
            if self.finished {
                return None;
            }
            if self.pos == self.slice.len() {
                self.finished = true;
                return match self.fill.finish(self.pos, self.mode) {
                    Ok(None) => None,
                    Ok(Some(c)) => Some(Ok(c)),
                    Err(e) => Some(Err(e)),
                };
            }
            let b = self.slice[self.pos];
            let at = self.pos;
            self.pos += 1;
            match self.fill.push(self.table, b, at, self.mode) {
                Ok(Decoded::Nothing) => {}
                Ok(Decoded::One(c)) => return Some(Ok(c)),
                Ok(Decoded::Two(c, next)) => {
                    self.queued = Some(next);
                    return Some(Ok(c));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
