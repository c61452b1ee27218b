//! Router configuration: endpoints, method rules, and routing switches.
//!
//! Loaded once at startup and never reloaded. Read endpoints are a list so
//! that selection order is the order in which they appear in the file.

use std::path::Path;

use anyhow::Context as _;
use rwsplit_core::{MethodDeclaration, NestingPolicy};
use serde::{Deserialize, Serialize};

/// Default connection cap per endpoint.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Top-level router configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// The single write endpoint. Required; `None` fails at bootstrap.
    pub write: Option<EndpointConfig>,
    /// Read endpoints in selection order. Must not be empty.
    pub reads: Vec<NamedEndpointConfig>,
    /// Route read-only methods to a replica even inside a write.
    pub force_choice_read_when_write: bool,
    /// Host-declared method rules.
    pub methods: Vec<MethodDeclaration>,
    /// What a nested call leaves in the routing context on exit.
    pub nesting: NestingPolicy,
}

impl RouterConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this schema.
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid router configuration")
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// Descriptor for one physical endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Connection URL, e.g. `postgres://user@primary/app`.
    pub url: String,
    /// Upper bound on pooled connections to this endpoint.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

/// A read endpoint with its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEndpointConfig {
    pub name: String,
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
}
