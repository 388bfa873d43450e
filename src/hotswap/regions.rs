//! Grouping of exception clauses into protected regions.
//!
//! Method bodies list every try/handler pair as its own clause, even when several handlers
//! protect the same try block. A method builder wants the opposite shape: one region per try
//! block carrying all of its handlers, or it ends up opening duplicate overlapping blocks.

use crate::{
    metadata::{
        method::{ExceptionHandler, HandlerKind},
        token::Token,
    },
    runtime::{ExceptionRegion, LiveSymbol, RegionHandler},
    Result,
};

/// Groups exception clauses by try start.
///
/// Regions come out in order of first appearance, handlers in declaration order. Offsets are
/// copied unchanged. `resolve_catch` is called once per catch clause with its class token.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if clauses sharing a try start disagree on the try
/// length or a catch clause has no class token, and forwards errors of `resolve_catch`.
///
/// # Examples
///
/// ```rust
/// use dotswap::hotswap::build_regions;
/// use dotswap::metadata::method::{ExceptionHandler, ExceptionHandlerFlags, HandlerKind};
/// use dotswap::runtime::{LiveSymbol, TypeHandle};
///
/// let clause = |flags, handler_offset, filter_offset| ExceptionHandler {
///     flags,
///     try_offset: 0,
///     try_length: 10,
///     handler_offset,
///     handler_length: 4,
///     filter_offset,
/// };
/// let handlers = [
///     clause(ExceptionHandlerFlags::EXCEPTION, 10, 0x0100_0001),
///     clause(ExceptionHandlerFlags::FINALLY, 14, 0),
/// ];
///
/// let regions = build_regions(&handlers, |_| Ok(LiveSymbol::Type(TypeHandle(1))))?;
/// assert_eq!(regions.len(), 1);
/// assert_eq!(regions[0].handlers[0].kind, HandlerKind::Catch);
/// assert_eq!(regions[0].handlers[1].kind, HandlerKind::Finally);
/// # Ok::<(), dotswap::Error>(())
/// ```
pub fn build_regions<F>(
    handlers: &[ExceptionHandler],
    mut resolve_catch: F,
) -> Result<Vec<ExceptionRegion>>
where
    F: FnMut(Token) -> Result<LiveSymbol>,
{
    let mut regions: Vec<ExceptionRegion> = Vec::new();

    for clause in handlers {
        let try_length = clause.try_end() - clause.try_offset;
        let kind = clause.kind();
        let catch_type = match kind {
            HandlerKind::Catch => {
                let token = clause
                    .catch_type_token()
                    .filter(|token| !token.is_null())
                    .ok_or_else(|| {
                        malformed_error!(
                            "Catch clause at IL_{:04X} has no class token",
                            clause.handler_offset
                        )
                    })?;
                Some(resolve_catch(token)?)
            }
            _ => None,
        };

        let handler = RegionHandler {
            kind,
            handler_start: clause.handler_offset,
            handler_length: clause.handler_length,
            catch_type,
            filter_start: clause.filter_start(),
        };

        match regions
            .iter_mut()
            .find(|region| region.try_start == clause.try_offset)
        {
            Some(region) => {
                if region.try_length != try_length {
                    return Err(malformed_error!(
                        "Clauses of the try block at IL_{:04X} disagree on its length ({} vs {})",
                        clause.try_offset,
                        region.try_length,
                        try_length
                    ));
                }
                region.handlers.push(handler);
            }
            None => regions.push(ExceptionRegion {
                try_start: clause.try_offset,
                try_length,
                handlers: vec![handler],
            }),
        }
    }

    Ok(regions)
}
