//! Glob-style method name patterns.
//!
//! A pattern is a method name in which `*` stands for any (possibly empty)
//! run of characters: `findById`, `find*`, `*ById`, `get*By*`, `*`.
//!
//! When several patterns match the same method name, the most specific one
//! wins. [`MethodPattern::specificity_cmp`] defines a total order so that
//! overlap resolution never depends on map iteration order:
//!
//! 1. exact names before wildcard patterns before the catch-all `*`
//! 2. among wildcard patterns, more literal characters first
//! 3. then fewer wildcards first
//! 4. then lexicographic order of the pattern text

use std::cmp::Ordering;

use regex::Regex;

use crate::error::PatternError;

/// Shape of a method pattern, in decreasing order of specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternKind {
    /// No wildcard: matches exactly one method name.
    Exact,
    /// At least one wildcard and at least one literal character.
    Wildcard,
    /// Only wildcards: matches every method name.
    CatchAll,
}

/// A compiled method name pattern.
#[derive(Debug, Clone)]
pub struct MethodPattern {
    text: String,
    kind: PatternKind,
    literal_len: usize,
    wildcards: usize,
    regex: Option<Regex>,
}

impl MethodPattern {
    /// Parses and compiles a pattern.
    ///
    /// Runs of consecutive `*` collapse into one.
    ///
    /// # Errors
    ///
    /// Returns `PatternError::Empty` for an empty pattern and
    /// `PatternError::InvalidCharacter` if it contains whitespace or control
    /// characters.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if let Some(ch) = pattern
            .chars()
            .find(|c| c.is_whitespace() || c.is_control())
        {
            return Err(PatternError::InvalidCharacter { ch });
        }

        let text = collapse_wildcards(pattern);
        let wildcards = text.matches('*').count();
        let literal_len = text.chars().filter(|&c| c != '*').count();

        let (kind, regex) = if wildcards == 0 {
            (PatternKind::Exact, None)
        } else if literal_len == 0 {
            (PatternKind::CatchAll, None)
        } else {
            let body = text
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let regex = Regex::new(&format!("^(?s:{body})$"))?;
            (PatternKind::Wildcard, Some(regex))
        };

        Ok(Self {
            text,
            kind,
            literal_len,
            wildcards,
            regex,
        })
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Returns true if `method` matches this pattern.
    #[must_use]
    pub fn matches(&self, method: &str) -> bool {
        match self.kind {
            PatternKind::Exact => self.text == method,
            PatternKind::CatchAll => true,
            PatternKind::Wildcard => self
                .regex
                .as_ref()
                .is_some_and(|regex| regex.is_match(method)),
        }
    }

    /// Orders patterns from most to least specific.
    ///
    /// `Ordering::Less` means `self` is more specific than `other`.
    #[must_use]
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| other.literal_len.cmp(&self.literal_len))
            .then_with(|| self.wildcards.cmp(&other.wildcards))
            .then_with(|| self.text.cmp(&other.text))
    }
}

fn collapse_wildcards(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if ch == '*' && out.ends_with('*') {
            continue;
        }
        out.push(ch);
    }
    out
}
