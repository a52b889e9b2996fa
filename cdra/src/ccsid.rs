use std::fmt;

use crate::error::ConvError;

/// A coded character set identifier: the 16-bit number the host uses to name
/// a character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharacterSetId(u16);

impl CharacterSetId {
    pub const CP037: CharacterSetId = CharacterSetId(37);
    pub const ASCII: CharacterSetId = CharacterSetId(367);
    pub const ARABIC: CharacterSetId = CharacterSetId(420);
    pub const HEBREW: CharacterSetId = CharacterSetId(424);
    pub const CP500: CharacterSetId = CharacterSetId(500);
    pub const LATIN1: CharacterSetId = CharacterSetId(819);
    pub const CP1047: CharacterSetId = CharacterSetId(1047);
    pub const CP1140: CharacterSetId = CharacterSetId(1140);
    pub const UTF16: CharacterSetId = CharacterSetId(1200);
    pub const UCS2: CharacterSetId = CharacterSetId(13488);
    pub const UTF16_HOST: CharacterSetId = CharacterSetId(61952);

    pub const fn from_u16(n: u16) -> Self {
        CharacterSetId(n)
    }

    /// Accept any integer, rejecting values outside 0..=65535.
    pub fn new(n: i64) -> Result<Self, ConvError> {
        if n < 0 || n > i64::from(u16::max_value()) {
            return Err(ConvError::InvalidArgument {
                name: "ccsid",
                value: n,
            });
        }
        Ok(CharacterSetId(n as u16))
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl From<u16> for CharacterSetId {
    fn from(n: u16) -> Self {
        CharacterSetId(n)
    }
}

impl fmt::Display for CharacterSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CCSID {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(CharacterSetId::new(-1).is_err());
        assert!(CharacterSetId::new(65536).is_err());
        assert_eq!(CharacterSetId::new(65535).unwrap().value(), 65535);
        assert_eq!(CharacterSetId::new(37).unwrap(), CharacterSetId::CP037);
    }
}
