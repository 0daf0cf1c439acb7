//! Rewrite rules: per-instruction policies that adapt references to the current host API.
//!
//! The pipeline offers every instruction of a body to each rule in turn; the first rule that
//! does not answer [`RuleOutcome::Unchanged`] claims the instruction. Rules edit the body
//! through [`MethodBody`]'s editing operations only, so branch targets and exception regions
//! stay attached; the pipeline relays the body out once all rules are done.
//!
//! - [`ReplaceReferencesRule`] - renamed types and members, and redirection to facades
//! - [`ConstantFieldRule`] - reads of fields that became literals
//! - [`OptionalParameterRule`] - calls to methods that gained optional parameters
//! - [`BrokenReferenceRule`] - reports host references nothing could repair

mod broken;
mod constant;
mod optional;
mod replace;

pub use broken::BrokenReferenceRule;
pub use constant::ConstantFieldRule;
pub use optional::OptionalParameterRule;
pub use replace::ReplaceReferencesRule;

use crate::{
    facades::FacadeRegistry,
    host::HostApi,
    metadata::method::MethodBody,
    rewriter::RewriteConfig,
    symbols::MatchConfidence,
    Result,
};

/// Shared, read-only state every rule consults.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    /// The live host API
    pub host: &'a HostApi,
    /// Registered facades
    pub facades: &'a FacadeRegistry,
    /// Pipeline configuration
    pub config: &'a RewriteConfig,
}

impl RewriteContext<'_> {
    /// Returns `true` if a match of the given confidence may be acted on.
    #[must_use]
    pub fn accepts(&self, confidence: MatchConfidence) -> bool {
        confidence == MatchConfidence::Exact || self.config.allow_heuristic_matches
    }
}

/// What a rule did with one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The rule does not apply
    Unchanged,
    /// The rule rewrote the instruction
    Rewritten {
        /// Number of instructions now occupying the site, injected ones included
        span: usize,
        /// Weakest match the rewrite relied on
        confidence: MatchConfidence,
    },
    /// The reference is broken and the rule cannot adapt it
    Incompatible(String),
}

impl RuleOutcome {
    /// A one-instruction rewrite backed by exact matches.
    #[must_use]
    pub fn rewritten() -> Self {
        RuleOutcome::Rewritten {
            span: 1,
            confidence: MatchConfidence::Exact,
        }
    }
}

/// A policy deciding whether and how to rewrite an instruction.
pub trait RewriteRule: Send + Sync {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Inspects the instruction at `index` and rewrites it if the rule applies.
    ///
    /// Edits must keep `body` structurally valid; the instruction at `index` and any
    /// instructions the rule injects before it form the reported span.
    ///
    /// # Errors
    /// Returns [`crate::Error::StructuralDefect`] if the body cannot be edited.
    fn handle_instruction(&self, ctx: &RewriteContext<'_>, body: &mut MethodBody, index: usize) -> Result<RuleOutcome>;
}
