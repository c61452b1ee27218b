//! Pipeline composition: wraps a data-access service with routing and metrics.

use std::sync::Arc;

use rwsplit_core::RoutingInterceptor;
use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use super::routing::{RoutingLayer, RoutingService};

/// Build the data-access pipeline around `inner`.
///
/// Layer order (outermost to innermost):
/// 1. `RoutingLayer` -- opens the call scope and marks read/write
/// 2. `MetricsLayer` -- records timing and outcome with the chosen route
///
/// The returned service implements `tower::Service<DataCall<R>>` for any
/// request payload `inner` accepts.
#[must_use]
pub fn build_data_access_pipeline<S>(
    inner: S,
    interceptor: Arc<RoutingInterceptor>,
) -> RoutingService<MetricsService<S>> {
    ServiceBuilder::new()
        .layer(RoutingLayer::new(interceptor))
        .layer(MetricsLayer)
        .service(inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
