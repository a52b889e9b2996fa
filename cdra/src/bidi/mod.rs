//! CDRA bidi layout.
//!
//! Host bidi text is tagged with a string type that says how it is stored:
//! in logical (implicit) or display (visual) order, with which base
//! direction, whether Arabic letters are stored as shaped presentation forms,
//! which digits are used, and whether mirrored glyphs are implied. Converting
//! between two string types is a reorder plus a handful of per-character
//! rewrites, all done by `engine::transform`.

mod classes;
mod engine;
mod flags;
mod shaping;
mod transform;

pub use self::engine::{transform, BidiTransform};
pub use self::flags::{
    default_string_type, flags_for, BidiFlagSet, Numerals, OrderingType, Orientation, StringType,
    Swap, TextShape,
};
pub use self::transform::{AS400BidiTransform, BidiConversionProperties};

/// Left-to-right mark.
pub const LRM: char = '\u{200E}';
/// Right-to-left mark.
pub const RLM: char = '\u{200F}';
/// Arabic letter mark.
pub const ALM: char = '\u{061C}';
