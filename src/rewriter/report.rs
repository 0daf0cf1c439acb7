//! Results of rewriting a mod binary.

use std::fmt;

use crate::symbols::MatchConfidence;

/// A reference no rule could adapt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incompatibility {
    /// Method containing the reference
    pub method: String,
    /// Index of the offending instruction at the time it was inspected
    pub index: usize,
    /// Rule that reported it
    pub rule: &'static str,
    /// What is wrong
    pub reason: String,
}

impl fmt::Display for Incompatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} ({}): {}", self.method, self.index, self.rule, self.reason)
    }
}

/// A rewrite made on the strength of a heuristic match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicMatch {
    /// Method containing the rewritten instruction
    pub method: String,
    /// Index of the rewritten instruction
    pub index: usize,
    /// Rule that performed the rewrite
    pub rule: &'static str,
}

/// Outcome of rewriting one method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodReport {
    /// Method name
    pub method: String,
    /// Number of instructions rules rewrote
    pub rewrites: usize,
    /// Number of short branches widened by the final layout
    pub widened: usize,
    /// References left broken
    pub incompatibilities: Vec<Incompatibility>,
    /// Rewrites that relied on [`MatchConfidence::Heuristic`] matches
    pub heuristic_matches: Vec<HeuristicMatch>,
}

impl MethodReport {
    /// Creates an empty report for `method`.
    #[must_use]
    pub fn new(method: &str) -> Self {
        MethodReport {
            method: method.to_string(),
            ..Self::default()
        }
    }

    /// Returns `true` if any rule changed the body.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.rewrites > 0
    }

    /// Returns `true` if no broken reference remains.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.incompatibilities.is_empty()
    }

    pub(crate) fn record_rewrite(&mut self, index: usize, rule: &'static str, confidence: MatchConfidence) {
        self.rewrites += 1;
        if confidence == MatchConfidence::Heuristic {
            self.heuristic_matches.push(HeuristicMatch {
                method: self.method.clone(),
                index,
                rule,
            });
        }
    }

    pub(crate) fn record_incompatibility(&mut self, index: usize, rule: &'static str, reason: String) {
        self.incompatibilities.push(Incompatibility {
            method: self.method.clone(),
            index,
            rule,
            reason,
        });
    }
}

/// Outcome of rewriting every method body of a binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteReport {
    /// Per-method reports, in input order
    pub methods: Vec<MethodReport>,
}

impl RewriteReport {
    /// Total number of rewritten instructions.
    #[must_use]
    pub fn rewrites(&self) -> usize {
        self.methods.iter().map(|method| method.rewrites).sum()
    }

    /// Total number of widened branches.
    #[must_use]
    pub fn widened(&self) -> usize {
        self.methods.iter().map(|method| method.widened).sum()
    }

    /// Number of methods a rule changed.
    #[must_use]
    pub fn modified_methods(&self) -> usize {
        self.methods.iter().filter(|method| method.is_modified()).count()
    }

    /// All references left broken.
    pub fn incompatibilities(&self) -> impl Iterator<Item = &Incompatibility> {
        self.methods.iter().flat_map(|method| &method.incompatibilities)
    }

    /// All rewrites made on heuristic matches.
    pub fn heuristic_matches(&self) -> impl Iterator<Item = &HeuristicMatch> {
        self.methods.iter().flat_map(|method| &method.heuristic_matches)
    }

    /// Returns `true` if no broken reference remains.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.methods.iter().all(MethodReport::is_compatible)
    }
}

impl fmt::Display for RewriteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rewrites in {} of {} methods, {} branches widened",
            self.rewrites(),
            self.modified_methods(),
            self.methods.len(),
            self.widened()
        )?;
        for incompatibility in self.incompatibilities() {
            write!(f, "\n  {incompatibility}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals() {
        let mut first = MethodReport::new("Mod.Entry::Load");
        first.record_rewrite(3, "replace-references", MatchConfidence::Exact);
        first.record_rewrite(9, "replace-references", MatchConfidence::Heuristic);
        first.widened = 1;

        let mut second = MethodReport::new("Mod.Entry::Save");
        second.record_incompatibility(0, "broken-references", "no field Farm::oldField".to_string());

        let report = RewriteReport {
            methods: vec![first, second, MethodReport::new("Mod.Entry::.ctor")],
        };
        assert_eq!(report.rewrites(), 2);
        assert_eq!(report.widened(), 1);
        assert_eq!(report.modified_methods(), 1);
        assert!(!report.is_compatible());
        assert_eq!(report.heuristic_matches().count(), 1);
        assert_eq!(report.heuristic_matches().next().unwrap().index, 9);

        let text = report.to_string();
        assert!(text.starts_with("2 rewrites in 1 of 3 methods, 1 branches widened"));
        assert!(text.contains("Mod.Entry::Save #0 (broken-references): no field Farm::oldField"));
    }
}
