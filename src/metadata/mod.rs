//! Metadata tokens and their resolution to symbol descriptors.
//!
//! - [`token`] - the 32-bit table/row tokens used by instruction operands
//! - [`method`] - method bodies with exception regions, decoded and encoded
//! - [`scope`] - resolver and emitter traits translating tokens to descriptors and back

pub mod method;
pub mod scope;
/// Metadata tokens and the tables they index
pub mod token;
