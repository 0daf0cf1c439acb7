//! Rewrite configuration
//!
//! Controls how the pipeline schedules method bodies and how much it trusts the weaker
//! matches and unrepaired references it encounters.

/// Configuration of a [`crate::rewriter::Rewriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct RewriteConfig {
    /// Rewrite the method bodies of one binary in parallel
    pub parallel: bool,

    /// Let rules act on matches that only hold under the placeholder heuristic
    /// Such rewrites are listed in the report either way
    pub allow_heuristic_matches: bool,

    /// Fail the binary with [`crate::Error::Incompatible`] if any reference stays broken
    pub reject_on_incompatible: bool,

    /// Check every body for structural defects before any rule runs
    pub validate_before_rewrite: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            allow_heuristic_matches: false,
            reject_on_incompatible: true,
            validate_before_rewrite: true,
        }
    }
}

impl RewriteConfig {
    /// Creates a configuration that rejects anything it cannot prove.
    ///
    /// Heuristic matches are never acted on and every body is validated first. Alias of
    /// [`RewriteConfig::default`].
    #[must_use]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Creates a configuration that rewrites as much as it can and only reports the rest
    ///
    /// Heuristic matches are acted on; incompatibilities end up in the report instead of
    /// failing the binary.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            parallel: true,
            allow_heuristic_matches: true,
            reject_on_incompatible: false,
            validate_before_rewrite: false,
        }
    }

    /// Creates the default configuration on a single thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_config_presets() {
        let strict = RewriteConfig::strict();
        assert!(strict.parallel);
        assert!(!strict.allow_heuristic_matches);
        assert!(strict.reject_on_incompatible);
        assert!(strict.validate_before_rewrite);

        let lenient = RewriteConfig::lenient();
        assert!(lenient.allow_heuristic_matches);
        assert!(!lenient.reject_on_incompatible);
        assert!(!lenient.validate_before_rewrite);

        let sequential = RewriteConfig::sequential();
        assert!(!sequential.parallel);
        assert_eq!(
            RewriteConfig {
                parallel: true,
                ..sequential
            },
            RewriteConfig::default()
        );
    }

    #[test]
    fn test_default_config() {
        assert_eq!(RewriteConfig::default(), RewriteConfig::strict());
        assert_ne!(RewriteConfig::default(), RewriteConfig::lenient());
    }
}
