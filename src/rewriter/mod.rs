//! The rewrite engine.
//!
//! A [`Rewriter`] combines the live host API, the facade registry and an ordered list of
//! [`rules::RewriteRule`]s. It rewrites decoded method bodies in place, relays out the ones
//! that changed, and summarizes what happened in a [`RewriteReport`].
//!
//! # Key Components
//!
//! - [`Rewriter`] - drives the rules over one body, many bodies, or a binary's raw bodies
//! - [`RewriteConfig`] - scheduling and trust settings
//! - [`RewriteReport`] / [`MethodReport`] - rewrites, widened branches, broken references
//! - [`rules`] - the stock rules and the rule contract

mod config;
mod pipeline;
mod report;
pub mod rules;

pub use config::RewriteConfig;
pub use pipeline::{RawMethod, Rewriter};
pub use report::{HeuristicMatch, Incompatibility, MethodReport, RewriteReport};
pub use rules::{RewriteContext, RewriteRule, RuleOutcome};
