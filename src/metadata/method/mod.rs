//! Method bodies: headers, instruction streams and exception handler regions.
//!
//! - [`MethodBody`] - decoded body with in-place editing, layout and encoding
//! - [`ExceptionHandler`] - try/handler regions as instruction index ranges
//! - [`MethodBodyFlags`] and [`SectionFlags`] - header and data section flags
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Common Intermediate Language Physical Layout

mod body;
mod exceptions;
mod types;

pub use body::MethodBody;
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use types::*;
