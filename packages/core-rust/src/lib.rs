//! `rwsplit` core: read/write routing decisions for one write endpoint and many read replicas.
//!
//! - [`context`]: per-call routing state (`Unset` / `Write` / `Read`)
//! - [`pattern`]: glob-style method name patterns with deterministic specificity
//! - [`classify`]: immutable method classifier and the read/write decision
//! - [`pool`]: endpoint pool with lock-free round-robin read selection
//! - [`interceptor`]: before/after hooks bracketing a data-access call

pub mod classify;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod pattern;
pub mod pool;

pub use classify::{MethodClassifier, MethodDeclaration, MethodRule, Propagation};
pub use context::{RouteMode, RoutingContext};
pub use error::{ClassifierError, ConfigError, PatternError};
pub use interceptor::{CallEntry, CallGuard, NestingPolicy, RoutingInterceptor};
pub use pattern::{MethodPattern, PatternKind};
pub use pool::{EndpointPool, EndpointPoolBuilder, EndpointRole, Selection, DEFAULT_COUNTER_START};
