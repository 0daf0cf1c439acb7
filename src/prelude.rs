//! # cilcompat Prelude
//!
//! The types needed to set up a rewriter, build or decode method bodies, and read the
//! resulting reports, in one glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilcompat operations
pub use crate::Error;

/// The result type used throughout cilcompat
pub use crate::Result;

// ================================================================================================
// Rewriting
// ================================================================================================

/// The pipeline and its configuration
pub use crate::rewriter::{RawMethod, RewriteConfig, Rewriter};

/// Reports produced by the pipeline
pub use crate::rewriter::{HeuristicMatch, Incompatibility, MethodReport, RewriteReport};

/// The rule contract and the stock rules
pub use crate::rewriter::rules::{
    BrokenReferenceRule, ConstantFieldRule, OptionalParameterRule, ReplaceReferencesRule, RewriteContext, RewriteRule,
    RuleOutcome,
};

// ================================================================================================
// Symbols and Host API
// ================================================================================================

/// Compiled-side descriptors
pub use crate::symbols::{FieldRef, MatchConfidence, MethodRef, Symbol, TypeRef};

/// The live host API
pub use crate::host::{HostApi, HostField, HostMethod, HostType, HostTypeDef, HostValue};

// ================================================================================================
// Facades
// ================================================================================================

/// Facade contract and registry
pub use crate::facades::{FacadeRegistry, FacadeType, RewriteFacade};

// ================================================================================================
// Instructions and Method Bodies
// ================================================================================================

/// Instruction model
pub use crate::assembly::{FlowType, Instruction, OpCode, Operand};

/// Method bodies and exception regions
pub use crate::metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBody};

/// Token resolution
pub use crate::metadata::scope::{ReferenceScope, SymbolEmitter, SymbolResolver};

/// Metadata tokens
pub use crate::metadata::token::Token;
