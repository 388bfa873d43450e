//! Exception handling clauses of method bodies (ECMA-335 II.25.4.6).
//!
//! A method body lists its protected blocks as a flat table: one [`ExceptionHandler`] per
//! try/handler pair. Several entries share a try block when one `try` has more than one
//! handler, which is what [`crate::hotswap::build_regions`] folds back together.

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::metadata::token::Token;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// Flags of an exception handling clause.
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause
        const FILTER = 0x0001;
        /// A finally clause
        const FINALLY = 0x0002;
        /// Fault clause (finally that is called on exception only)
        const FAULT = 0x0004;
    }
}

/// The kind of an exception handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum HandlerKind {
    /// Catches exceptions of one type
    Catch,
    /// Always runs when the protected block is left
    Finally,
    /// Runs only when the protected block is left through an exception
    Fault,
    /// Runs a filter block to decide whether to handle the exception
    Filter,
}

/// A single exception handling clause as stored in a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Clause flags
    pub flags: ExceptionHandlerFlags,
    /// Offset of the protected block, relative to the start of the code
    pub try_offset: u32,
    /// Length of the protected block in bytes
    pub try_length: u32,
    /// Offset of the handler block
    pub handler_offset: u32,
    /// Length of the handler block in bytes
    pub handler_length: u32,
    /// Class token for typed clauses, filter block offset for filter clauses, zero otherwise
    pub filter_offset: u32,
}

impl ExceptionHandler {
    /// Returns the kind of this clause.
    ///
    /// Unknown flag combinations are reported as [`HandlerKind::Catch`], the zero value.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        if self.flags.contains(ExceptionHandlerFlags::FILTER) {
            HandlerKind::Filter
        } else if self.flags.contains(ExceptionHandlerFlags::FINALLY) {
            HandlerKind::Finally
        } else if self.flags.contains(ExceptionHandlerFlags::FAULT) {
            HandlerKind::Fault
        } else {
            HandlerKind::Catch
        }
    }

    /// Returns the end offset of the protected block.
    #[must_use]
    pub fn try_end(&self) -> u32 {
        self.try_offset.saturating_add(self.try_length)
    }

    /// Returns the caught type token of a typed clause.
    #[must_use]
    pub fn catch_type_token(&self) -> Option<Token> {
        match self.kind() {
            HandlerKind::Catch => Some(Token::new(self.filter_offset)),
            _ => None,
        }
    }

    /// Returns the filter block offset of a filter clause.
    #[must_use]
    pub fn filter_start(&self) -> Option<u32> {
        match self.kind() {
            HandlerKind::Filter => Some(self.filter_offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(flags: ExceptionHandlerFlags, filter_offset: u32) -> ExceptionHandler {
        ExceptionHandler {
            flags,
            try_offset: 2,
            try_length: 8,
            handler_offset: 10,
            handler_length: 4,
            filter_offset,
        }
    }

    #[test]
    fn kinds() {
        let catch = clause(ExceptionHandlerFlags::EXCEPTION, 0x0100_0005);
        assert_eq!(catch.kind(), HandlerKind::Catch);
        assert_eq!(catch.catch_type_token(), Some(Token::new(0x0100_0005)));
        assert_eq!(catch.filter_start(), None);
        assert_eq!(catch.try_end(), 10);

        let filter = clause(ExceptionHandlerFlags::FILTER, 0x20);
        assert_eq!(filter.kind(), HandlerKind::Filter);
        assert_eq!(filter.filter_start(), Some(0x20));
        assert_eq!(filter.catch_type_token(), None);

        assert_eq!(
            clause(ExceptionHandlerFlags::FINALLY, 0).kind(),
            HandlerKind::Finally
        );
        assert_eq!(clause(ExceptionHandlerFlags::FAULT, 0).kind(), HandlerKind::Fault);
        assert_eq!(HandlerKind::Finally.to_string(), "Finally");
    }
}
