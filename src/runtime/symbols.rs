//! Resolved symbols and the per-replacement symbol table.
//!
//! A replacement body cannot use the tokens of its disk module: they index tables the running
//! process never loaded. Every token operand is therefore rewritten to a slot token of a
//! [`SymbolTable`] that travels with the replacement, and the emitter hands the table to the
//! runtime together with the code.

use crate::{
    metadata::token::{Token, TABLE_FIELD, TABLE_METHOD_DEF, TABLE_TYPE_DEF, TABLE_USER_STRING},
    runtime::handles::{FieldHandle, MethodHandle, TypeHandle},
    Result,
};

/// A symbol resolved against the running process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiveSymbol {
    /// A live field
    Field(FieldHandle),
    /// A live method, fully instantiated
    Method(MethodHandle),
    /// A live type
    Type(TypeHandle),
    /// A string literal
    String(String),
}

impl LiveSymbol {
    /// Returns the table tag used for slot tokens of this kind of symbol.
    #[must_use]
    pub fn table(&self) -> u8 {
        match self {
            LiveSymbol::Field(_) => TABLE_FIELD,
            LiveSymbol::Method(_) => TABLE_METHOD_DEF,
            LiveSymbol::Type(_) => TABLE_TYPE_DEF,
            LiveSymbol::String(_) => TABLE_USER_STRING,
        }
    }
}

/// Largest row a token can address.
const MAX_SLOT: usize = 0x00FF_FFFF;

/// The symbols referenced by one replacement body.
///
/// Slots are numbered from 1 in insertion order. The slot token of a symbol carries the
/// symbol kind in its table byte, so `ldstr` keeps a user-string token and `call` a method
/// token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<LiveSymbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Adds a symbol to a fresh slot and returns the slot token.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the table is full.
    pub fn add(&mut self, symbol: LiveSymbol) -> Result<Token> {
        if self.entries.len() >= MAX_SLOT {
            return Err(malformed_error!("Symbol table exceeds {} slots", MAX_SLOT));
        }

        let table = symbol.table();
        self.entries.push(symbol);
        Ok(Token::from_parts(table, self.entries.len() as u32))
    }

    /// Returns the symbol behind a slot token.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<&LiveSymbol> {
        let index = (token.row() as usize).checked_sub(1)?;
        self.entries
            .get(index)
            .filter(|symbol| symbol.table() == token.table())
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no slot is used.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the symbols in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &LiveSymbol> {
        self.entries.iter()
    }
}
