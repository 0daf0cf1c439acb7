//! Exception handler regions of a method body.
//!
//! Regions are stored as instruction index ranges rather than byte ranges so they stay
//! attached to the same instructions while a rewrite inserts or replaces code. Byte offsets
//! are derived again when the body is encoded.

use bitflags::bitflags;

use crate::symbols::TypeRef;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause.
        const FILTER = 0x0001;
        /// A finally clause.
        const FINALLY = 0x0002;
        /// A fault clause (finally that executes only on exception).
        const FAULT = 0x0004;
    }
}

/// A try region and its handler, as instruction index ranges.
///
/// Ranges are half-open: `try_end` and `handler_end` index the first instruction after the
/// region and may equal the number of instructions in the body.
///
/// # Layout in IL
///
/// ```text
/// try {
///     // instructions[try_start..try_end]
/// }
/// catch (catch_type) {
///     // instructions[handler_start..handler_end]
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// The kind of clause
    pub flags: ExceptionHandlerFlags,
    /// First instruction of the protected region
    pub try_start: usize,
    /// First instruction after the protected region
    pub try_end: usize,
    /// First instruction of the handler
    pub handler_start: usize,
    /// First instruction after the handler
    pub handler_end: usize,
    /// The caught exception type, for typed clauses
    pub catch_type: Option<TypeRef>,
    /// First instruction of the filter, for filter clauses
    pub filter_start: Option<usize>,
}

impl ExceptionHandler {
    /// Creates a typed `catch` clause.
    #[must_use]
    pub fn catch(try_range: std::ops::Range<usize>, handler_range: std::ops::Range<usize>, catch_type: TypeRef) -> Self {
        ExceptionHandler {
            flags: ExceptionHandlerFlags::EXCEPTION,
            try_start: try_range.start,
            try_end: try_range.end,
            handler_start: handler_range.start,
            handler_end: handler_range.end,
            catch_type: Some(catch_type),
            filter_start: None,
        }
    }

    /// Creates a `finally` clause.
    #[must_use]
    pub fn finally(try_range: std::ops::Range<usize>, handler_range: std::ops::Range<usize>) -> Self {
        ExceptionHandler {
            flags: ExceptionHandlerFlags::FINALLY,
            try_start: try_range.start,
            try_end: try_range.end,
            handler_start: handler_range.start,
            handler_end: handler_range.end,
            catch_type: None,
            filter_start: None,
        }
    }

    /// Applies `remap_start` to every region start and `remap_end` to every exclusive end.
    pub(crate) fn remap(&mut self, remap_start: impl Fn(usize) -> usize, remap_end: impl Fn(usize) -> usize) {
        self.try_start = remap_start(self.try_start);
        self.handler_start = remap_start(self.handler_start);
        self.filter_start = self.filter_start.map(&remap_start);
        self.try_end = remap_end(self.try_end);
        self.handler_end = remap_end(self.handler_end);
    }
}
