use std::fmt;

use strum::{Display, EnumIter};

/// A metadata token as it appears in an instruction operand.
///
/// Tokens consist of a 32-bit value where:
/// - The high byte (bits 24-31) indicates the table (or the user string heap)
/// - The low 24 bits (bits 0-23) indicate the row index within that table
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token pointing at `row` of `table`.
    #[must_use]
    pub const fn from_parts(table: TokenTable, row: u32) -> Self {
        Token(((table as u32) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table byte from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The table this token points into, if it is one the rewriter deals with.
    #[must_use]
    pub fn kind(&self) -> Option<TokenTable> {
        TokenTable::from_byte(self.table())
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// The metadata tables (and the user string heap) an instruction operand may point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum TokenTable {
    /// `TypeRef` table
    TypeRef = 0x01,
    /// `TypeDef` table
    TypeDef = 0x02,
    /// `Field` table
    Field = 0x04,
    /// `MethodDef` table
    MethodDef = 0x06,
    /// `MemberRef` table
    MemberRef = 0x0A,
    /// `StandAloneSig` table
    StandAloneSig = 0x11,
    /// `TypeSpec` table
    TypeSpec = 0x1B,
    /// `MethodSpec` table
    MethodSpec = 0x2B,
    /// The `#US` heap, used by `ldstr`
    UserString = 0x70,
}

impl TokenTable {
    /// Maps a token's high byte to a table.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(TokenTable::TypeRef),
            0x02 => Some(TokenTable::TypeDef),
            0x04 => Some(TokenTable::Field),
            0x06 => Some(TokenTable::MethodDef),
            0x0A => Some(TokenTable::MemberRef),
            0x11 => Some(TokenTable::StandAloneSig),
            0x1B => Some(TokenTable::TypeSpec),
            0x2B => Some(TokenTable::MethodSpec),
            0x70 => Some(TokenTable::UserString),
            _ => None,
        }
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_token_parts() {
        let token = Token::new(0x0A000012);
        assert_eq!(token.table(), 0x0A);
        assert_eq!(token.row(), 0x12);
        assert_eq!(token.kind(), Some(TokenTable::MemberRef));
        assert!(!token.is_null());
        assert!(Token::new(0).is_null());
    }

    #[test]
    fn test_token_from_parts() {
        let token = Token::from_parts(TokenTable::UserString, 0x1F);
        assert_eq!(token.value(), 0x7000001F);

        // rows are truncated to 24 bits
        let token = Token::from_parts(TokenTable::TypeRef, 0x0100_0002);
        assert_eq!(token.value(), 0x01000002);
    }

    #[test]
    fn test_token_table_roundtrip() {
        for table in TokenTable::iter() {
            assert_eq!(TokenTable::from_byte(table as u8), Some(table));
        }
        assert_eq!(TokenTable::from_byte(0x20), None);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token(0x06000001)), "0x06000001");
        let debug_str = format!("{:?}", Token(0x06000001));
        assert!(debug_str.contains("table: 0x06"));
        assert!(debug_str.contains("row: 1"));
    }
}
