//! `rwsplit` service layer: task-local call scopes, tower routing middleware,
//! and connection acquisition across one write endpoint and many read replicas.
//!
//! 1. **Bootstrap** (`bootstrap`): config -> endpoint pool + classifier + interceptor
//! 2. **Scopes** (`scope`): task-local routing context per logical call
//! 3. **Middleware** (`middleware`): Tower layers (routing, metrics)
//! 4. **Data source** (`datasource`): endpoint selection and connection acquisition

pub mod bootstrap;
pub mod config;
pub mod datasource;
pub mod middleware;
pub mod operation;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod scope;
pub mod telemetry;

pub use bootstrap::{InitError, ReadWriteRouter};
pub use config::{EndpointConfig, NamedEndpointConfig, RouterConfig};
pub use datasource::{CredentialedEndpoint, Endpoint, RoutingDataSource};
pub use middleware::{build_data_access_pipeline, MetricsLayer, RoutingLayer};
pub use operation::DataCall;
#[cfg(feature = "postgres")]
pub use postgres::{PgEndpoint, PgEndpointConnection};
pub use telemetry::{init_tracing, LogFormat};
