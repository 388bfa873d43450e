//! Method bodies: headers, instruction streams, locals and exception clauses.
//!
//! # Key Components
//!
//! - [`MethodBody`] - A parsed method body, including its decoded instructions
//! - [`ExceptionHandler`] - A single exception handling clause
//! - [`HandlerKind`] - Catch, finally, fault or filter
//! - [`MethodBodyFlags`] / [`SectionFlags`] - Header and data section flags

mod body;
mod exceptions;
mod types;

pub use body::{write_exception_section, write_fat_header, MethodBody, FAT_HEADER_SIZE};
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags, HandlerKind};
pub use types::{MethodBodyFlags, SectionFlags};
