//! Initialization-time errors.
//!
//! Nothing in this crate fails at routing time: every error below is raised
//! while the endpoint pool or the method classifier is being built, before
//! any traffic is routed.

/// Invalid endpoint pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("write endpoint is required")]
    MissingWriteEndpoint,
    #[error("at least one read endpoint is required")]
    NoReadEndpoints,
    #[error("duplicate read endpoint name: {name}")]
    DuplicateReadEndpoint { name: String },
}

/// A method pattern that cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("method pattern is empty")]
    Empty,
    #[error("method pattern contains invalid character {ch:?}")]
    InvalidCharacter { ch: char },
    #[error("method pattern failed to compile")]
    Regex(#[from] regex::Error),
}

/// Failure while building the method classifier from declared rules.
///
/// Wraps the original cause together with the pattern that produced it.
#[derive(Debug, thiserror::Error)]
#[error("failed to process read/write method rule `{pattern}`")]
pub struct ClassifierError {
    pub pattern: String,
    #[source]
    pub source: PatternError,
}
