use std::fmt;
use std::io;

use thiserror::Error;

/// How decoders react to truncated or malformed multi-byte input.
///
/// This is threaded through every decode call rather than kept as a global
/// switch, so two callers sharing a table can disagree about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Surface the fault as [`ConvError::Malformed`].
    Strict,
    /// Drop the offending unit (or substitute U+FFFD for an unpaired
    /// surrogate) and keep going.
    Tolerant,
}

impl Default for FaultMode {
    fn default() -> Self {
        FaultMode::Strict
    }
}

impl FaultMode {
    pub fn is_tolerant(self) -> bool {
        self == FaultMode::Tolerant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// The input ended after the first byte of a double-byte pair.
    TruncatedDoubleByte,
    /// UTF-16 data with an odd number of bytes.
    OddUnicodeLength,
    /// A surrogate code unit without its partner.
    UnpairedSurrogate,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MalformedReason::TruncatedDoubleByte => "truncated double-byte character",
            MalformedReason::OddUnicodeLength => "odd-length UTF-16 data",
            MalformedReason::UnpairedSurrogate => "unpaired surrogate",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ConvError {
    #[error("CCSID {0} has no registered conversion table")]
    UnsupportedCharset(u16),

    #[error("malformed input at byte {offset}: {reason}")]
    Malformed {
        offset: usize,
        reason: MalformedReason,
    },

    #[error("invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: i64 },

    #[error("range {offset}+{length} exceeds buffer of {available} bytes")]
    Bounds {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("byte source failed: {0}")]
    Io(#[from] io::Error),
}

impl ConvError {
    pub(crate) fn malformed(offset: usize, reason: MalformedReason) -> Self {
        ConvError::Malformed { offset, reason }
    }

    pub fn is_malformed(&self) -> bool {
        match self {
            ConvError::Malformed { .. } => true,
            _ => false,
        }
    }
}
