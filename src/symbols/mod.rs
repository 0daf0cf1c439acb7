//! Symbol descriptors and the matcher comparing them against the live host API.
//!
//! # Key Components
//!
//! - [`crate::symbols::TypeRef`], [`crate::symbols::FieldRef`], [`crate::symbols::MethodRef`] - compiled-side descriptors
//! - [`crate::symbols::matcher`] - exact structural comparison and signature matching
//! - [`crate::symbols::heuristic`] - placeholder-tolerant comparison

pub mod heuristic;
pub mod matcher;
mod types;

pub use matcher::MatchConfidence;
pub use types::{FieldRef, GenericOwner, GenericParam, MethodRef, NamedType, Symbol, SymbolKind, TypeRef};
