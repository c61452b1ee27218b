//! Method classification: decides whether a data-access call may read from a replica.
//!
//! The classifier is built once at startup from the host's declared method
//! rules and is immutable afterwards. Only read-only declarations produce a
//! [`MethodRule`]; every other method name falls through to the write
//! endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::RoutingContext;
use crate::error::ClassifierError;
use crate::pattern::{MethodPattern, PatternKind};

// ---------------------------------------------------------------------------
// Declarations and rules
// ---------------------------------------------------------------------------

/// Unit-of-work boundary the host must apply to a read-only method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// Join an in-flight unit of work if there is one.
    Supports,
    /// Suspend any in-flight unit of work and run outside it.
    NotSupported,
}

/// A method rule as declared by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDeclaration {
    /// Glob-style method name pattern.
    pub pattern: String,
    /// Whether the host declared the matched methods read-only.
    #[serde(default)]
    pub read_only: bool,
}

impl MethodDeclaration {
    /// Declares a read-only method pattern.
    pub fn read_only(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            read_only: true,
        }
    }

    /// Declares a read-write method pattern.
    pub fn read_write(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            read_only: false,
        }
    }
}

/// A read-only method rule stored in the classifier.
#[derive(Debug, Clone)]
pub struct MethodRule {
    pattern: MethodPattern,
    forced_read: bool,
    propagation: Propagation,
}

impl MethodRule {
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether matched calls read from a replica even while a write is in progress.
    #[must_use]
    pub fn forced_read(&self) -> bool {
        self.forced_read
    }

    /// Boundary the host must configure for matched calls.
    #[must_use]
    pub fn propagation(&self) -> Propagation {
        self.propagation
    }
}

// ---------------------------------------------------------------------------
// MethodClassifier
// ---------------------------------------------------------------------------

/// Immutable mapping from method patterns to read-only rules.
///
/// Exact names are looked up in a hash map; wildcard patterns are kept
/// sorted from most to least specific so that the first match is the best
/// match.
#[derive(Debug, Clone, Default)]
pub struct MethodClassifier {
    exact: HashMap<String, MethodRule>,
    wildcards: Vec<MethodRule>,
    force_choice_read_when_write: bool,
}

impl MethodClassifier {
    /// Builds the classifier from the host's declared rules.
    ///
    /// With `force_choice_read_when_write` set, every read-only rule is
    /// forced to a replica and its boundary is `NotSupported`; otherwise
    /// rules are not forced and join an in-flight write via `Supports`.
    /// A pattern declared more than once keeps its last declaration.
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError` carrying the offending pattern if any
    /// declaration cannot be compiled.
    pub fn build<I>(
        declarations: I,
        force_choice_read_when_write: bool,
    ) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = MethodDeclaration>,
    {
        let mut by_pattern: HashMap<String, MethodRule> = HashMap::new();

        for declaration in declarations {
            let pattern =
                MethodPattern::parse(&declaration.pattern).map_err(|source| ClassifierError {
                    pattern: declaration.pattern.clone(),
                    source,
                })?;

            if !declaration.read_only {
                by_pattern.remove(pattern.as_str());
                continue;
            }

            let (forced_read, propagation) = if force_choice_read_when_write {
                (true, Propagation::NotSupported)
            } else {
                (false, Propagation::Supports)
            };

            debug!(
                pattern = pattern.as_str(),
                forced_read, "processed read/write method rule"
            );

            by_pattern.insert(
                pattern.as_str().to_string(),
                MethodRule {
                    pattern,
                    forced_read,
                    propagation,
                },
            );
        }

        let mut exact = HashMap::new();
        let mut wildcards = Vec::new();
        for (text, rule) in by_pattern {
            if rule.pattern.kind() == PatternKind::Exact {
                exact.insert(text, rule);
            } else {
                wildcards.push(rule);
            }
        }
        wildcards.sort_by(|a, b| a.pattern.specificity_cmp(&b.pattern));

        Ok(Self {
            exact,
            wildcards,
            force_choice_read_when_write,
        })
    }

    /// Returns the most specific rule matching `method`, if any.
    #[must_use]
    pub fn best_match(&self, method: &str) -> Option<&MethodRule> {
        self.exact
            .get(method)
            .or_else(|| self.wildcards.iter().find(|rule| rule.pattern.matches(method)))
    }

    /// Decides whether a call to `method` should be routed to a read endpoint.
    ///
    /// 1. a forced-read rule always reads
    /// 2. otherwise a call inside a write stays on the write endpoint
    /// 3. otherwise any matching read-only rule reads
    /// 4. unclassified methods write
    #[must_use]
    pub fn is_read_decision(&self, method: &str, ctx: &RoutingContext) -> bool {
        let rule = self.best_match(method);

        if rule.is_some_and(MethodRule::forced_read) {
            return true;
        }
        if ctx.is_write() {
            return false;
        }
        rule.is_some()
    }

    /// Returns the boundary configured for `pattern`, if it is a read-only rule.
    #[must_use]
    pub fn boundary_for(&self, pattern: &str) -> Option<Propagation> {
        self.exact
            .get(pattern)
            .or_else(|| self.wildcards.iter().find(|rule| rule.pattern() == pattern))
            .map(MethodRule::propagation)
    }

    /// Iterates over all rules: exact rules first, then wildcards by specificity.
    pub fn rules(&self) -> impl Iterator<Item = &MethodRule> {
        let mut exact: Vec<&MethodRule> = self.exact.values().collect();
        exact.sort_by(|a, b| a.pattern().cmp(b.pattern()));
        exact.into_iter().chain(self.wildcards.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.wildcards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn force_choice_read_when_write(&self) -> bool {
        self.force_choice_read_when_write
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::PatternError;

    fn classifier(patterns: &[&str], force: bool) -> MethodClassifier {
        MethodClassifier::build(
            patterns.iter().map(|p| MethodDeclaration::read_only(*p)),
            force,
        )
        .unwrap()
    }

    fn ctx_in(mode: &str) -> RoutingContext {
        let ctx = RoutingContext::new();
        match mode {
            "write" => ctx.mark_write(),
            "read" => ctx.mark_read(),
            _ => {}
        }
        ctx
    }

    #[test]
    fn build_sets_forced_flag_and_boundary_from_global_switch() {
        let relaxed = classifier(&["find*", "get*"], false);
        assert!(relaxed.rules().all(|r| !r.forced_read()));
        assert_eq!(relaxed.boundary_for("find*"), Some(Propagation::Supports));

        let forced = classifier(&["find*", "get*"], true);
        assert!(forced.rules().all(MethodRule::forced_read));
        assert_eq!(forced.boundary_for("get*"), Some(Propagation::NotSupported));
        assert!(forced.force_choice_read_when_write());
    }

    #[test]
    fn build_skips_read_write_declarations() {
        let classifier = MethodClassifier::build(
            vec![
                MethodDeclaration::read_only("find*"),
                MethodDeclaration::read_write("save*"),
            ],
            false,
        )
        .unwrap();
        assert_eq!(classifier.len(), 1);
        assert!(classifier.best_match("saveUser").is_none());
        assert_eq!(classifier.boundary_for("save*"), None);
    }

    #[test]
    fn later_declaration_of_same_pattern_wins() {
        let classifier = MethodClassifier::build(
            vec![
                MethodDeclaration::read_only("find*"),
                MethodDeclaration::read_write("find*"),
            ],
            false,
        )
        .unwrap();
        assert!(classifier.is_empty());
    }

    #[test]
    fn build_wraps_pattern_errors_with_the_pattern() {
        let err = MethodClassifier::build(
            vec![
                MethodDeclaration::read_only("find*"),
                MethodDeclaration::read_only("bad pattern"),
            ],
            false,
        )
        .unwrap_err();
        assert_eq!(err.pattern, "bad pattern");
        assert!(matches!(err.source, PatternError::InvalidCharacter { ch: ' ' }));
        assert!(err.to_string().contains("bad pattern"));
    }

    #[test]
    fn best_match_prefers_most_specific_pattern() {
        let classifier = classifier(&["*", "find*", "findById", "*ById"], false);
        assert_eq!(classifier.best_match("findById").unwrap().pattern(), "findById");
        assert_eq!(classifier.best_match("findAll").unwrap().pattern(), "find*");
        assert_eq!(classifier.best_match("loadById").unwrap().pattern(), "*ById");
        assert_eq!(classifier.best_match("count").unwrap().pattern(), "*");
    }

    #[test]
    fn best_match_is_independent_of_declaration_order() {
        let forward = classifier(&["find*", "*ById", "f*"], false);
        let backward = classifier(&["f*", "*ById", "find*"], false);
        for method in ["findById", "fooById", "fetch", "findAll"] {
            assert_eq!(
                forward.best_match(method).map(MethodRule::pattern),
                backward.best_match(method).map(MethodRule::pattern),
                "method {method}"
            );
        }
    }

    #[test]
    fn write_dominates_non_forced_read() {
        let classifier = classifier(&["find*"], false);
        assert!(!classifier.is_read_decision("findById", &ctx_in("write")));
        assert!(classifier.is_read_decision("findById", &ctx_in("unset")));
        assert!(classifier.is_read_decision("findById", &ctx_in("read")));
    }

    #[test]
    fn forced_read_ignores_context() {
        let classifier = classifier(&["find*"], true);
        for mode in ["unset", "write", "read"] {
            assert!(classifier.is_read_decision("findById", &ctx_in(mode)));
        }
    }

    #[test]
    fn unmatched_method_defaults_to_write() {
        let classifier = classifier(&["find*"], true);
        for mode in ["unset", "write", "read"] {
            assert!(!classifier.is_read_decision("deleteById", &ctx_in(mode)));
        }
    }

    #[test]
    fn rules_iterates_exact_then_wildcards() {
        let classifier = classifier(&["*", "zeta", "alpha", "find*"], false);
        let order: Vec<&str> = classifier.rules().map(MethodRule::pattern).collect();
        assert_eq!(order, vec!["alpha", "zeta", "find*", "*"]);
    }

    proptest! {
        #[test]
        fn prop_unmatched_names_always_write(name in "[a-z]{1,12}", mode in 0u8..3) {
            let classifier = classifier(&["Find*", "*ById"], mode == 0);
            let ctx = RoutingContext::new();
            match mode {
                1 => ctx.mark_write(),
                2 => ctx.mark_read(),
                _ => {}
            }
            prop_assert!(!classifier.is_read_decision(&name, &ctx));
        }

        #[test]
        fn prop_forced_rules_always_read(suffix in "[A-Za-z]{0,12}", mode in 0u8..3) {
            let classifier = classifier(&["find*"], true);
            let ctx = RoutingContext::new();
            match mode {
                1 => ctx.mark_write(),
                2 => ctx.mark_read(),
                _ => {}
            }
            let method = format!("find{suffix}");
            prop_assert!(classifier.is_read_decision(&method, &ctx));
        }
    }
}
