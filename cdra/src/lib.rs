//! Host text conversion for CCSID-tagged data.
//!
//! The crate has two halves. The first is a table-driven codec layer:
//! single-byte and double-byte code tables, mixed-byte tables that switch
//! between the two with shift-out / shift-in control bytes, a process-wide
//! registry keyed by CCSID, and a streaming decoder that carries partial
//! multi-byte units across reads.
//!
//! The second half is the CDRA bidi layout layer: string types (ST4..ST11)
//! decomposed into flag sets, a transform engine that converts between
//! implicit (logical) and visual orderings with shaping, swapping, marker
//! handling and index maps, and a host/client facade bound to one CCSID.
//!
//! ```
//! use cdra::{CharacterSetId, CodecRegistry, FaultMode};
//!
//! let table = CodecRegistry::get(CharacterSetId::CP037).unwrap();
//! let bytes = table.encode("HELLO");
//! assert_eq!(bytes, vec![0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
//! assert_eq!(table.decode(&bytes, 0, bytes.len(), FaultMode::Strict).unwrap(), "HELLO");
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

mod ccsid;
mod error;
mod iter;
mod mixed;
mod registry;
mod stream;
mod table;
mod tables;
mod util;

pub mod bidi;

pub use crate::ccsid::CharacterSetId;
pub use crate::error::{ConvError, FaultMode, MalformedReason};
pub use crate::iter::{
    write_encoded, DecodeIter, DecodeResultIter, DrainEncodedChunkIter, EncodeIter, EncodedChunk,
    EncodedChunkIter,
};
pub use crate::mixed::{MixedByteTable, ShiftEncoder, ShiftState, SHIFT_IN, SHIFT_OUT};
pub use crate::registry::{AsciiCodec, CodecRegistry, ConvTable, UnicodeCodec};
pub use crate::stream::{IncrementalDecoder, StreamingDecoder};
pub use crate::table::{CodeTable, CodeTableBuilder, TableKind, UNMAPPED};

pub use crate::bidi::{
    AS400BidiTransform, BidiConversionProperties, BidiFlagSet, BidiTransform, Numerals,
    OrderingType, Orientation, StringType, Swap, TextShape,
};

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvError>;
