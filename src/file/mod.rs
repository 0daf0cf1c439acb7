//! Low-level byte access used by the method body codec.
//!
//! - [`io`] - little-endian primitive reading and writing
//! - [`parser`] - a cursor over a borrowed byte slice

pub mod io;
pub mod parser;
