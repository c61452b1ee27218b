//! Tower middleware layers for data-access calls.
//!
//! - [`routing`]: Call scope and read/write marking around each call
//! - [`metrics`]: Call timing and counting via `tracing` spans and `metrics`
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod metrics;
pub mod pipeline;
pub mod routing;

pub use self::metrics::{MetricsLayer, MetricsService};
pub use pipeline::build_data_access_pipeline;
pub use routing::{RoutingLayer, RoutingService};
