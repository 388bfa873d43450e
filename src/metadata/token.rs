//! Metadata tokens.
//!
//! A token is a 32-bit value whose upper byte names a metadata table and whose lower three
//! bytes are the one-based row in that table. Instruction operands carry tokens that are only
//! meaningful inside the module the instruction stream came from.
//!
//! # Examples
//!
//! ```rust
//! use dotswap::metadata::token::{Token, TABLE_METHOD_DEF};
//!
//! let token = Token::new(0x0600_0001);
//! assert_eq!(token.table(), TABLE_METHOD_DEF);
//! assert_eq!(token.row(), 1);
//! ```

use std::fmt;

/// `TypeRef` table
pub const TABLE_TYPE_REF: u8 = 0x01;
/// `TypeDef` table
pub const TABLE_TYPE_DEF: u8 = 0x02;
/// `Field` table
pub const TABLE_FIELD: u8 = 0x04;
/// `MethodDef` table
pub const TABLE_METHOD_DEF: u8 = 0x06;
/// `MemberRef` table
pub const TABLE_MEMBER_REF: u8 = 0x0A;
/// `StandAloneSig` table
pub const TABLE_STANDALONE_SIG: u8 = 0x11;
/// `TypeSpec` table
pub const TABLE_TYPE_SPEC: u8 = 0x1B;
/// `MethodSpec` table
pub const TABLE_METHOD_SPEC: u8 = 0x2B;
/// Pseudo-table of the `#US` user string heap
pub const TABLE_USER_STRING: u8 = 0x70;

/// A metadata token.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table id and a row.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns the table id.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the row (or heap offset for user strings).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns `true` for the null token.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for `ldstr` user string tokens.
    #[must_use]
    pub fn is_user_string(&self) -> bool {
        self.table() == TABLE_USER_STRING
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
