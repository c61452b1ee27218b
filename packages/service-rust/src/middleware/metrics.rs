//! Metrics middleware for data-access calls.
//!
//! Records call duration and outcome in a `tracing` span and bumps a
//! `metrics` counter per method and route. Placed inside the routing layer
//! so the span carries the routing mode chosen for the call.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::operation::DataCall;
use crate::scope;

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments data-access calls with timing and counting.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S, R> Service<DataCall<R>> for MetricsService<S>
where
    S: Service<DataCall<R>> + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: DataCall<R>) -> Self::Future {
        let method = call.method.clone();
        let route = scope::current_mode().as_str();

        let span = info_span!(
            "data_call",
            method = %method,
            route = route,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;
                let duration_ms = start.elapsed().as_millis();

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(_) => "error",
                };

                #[allow(clippy::cast_possible_truncation)]
                let duration_u64 = duration_ms as u64;
                tracing::Span::current().record("duration_ms", duration_u64);
                tracing::Span::current().record("outcome", outcome);

                metrics::counter!(
                    "rwsplit_data_calls_total",
                    "route" => route,
                    "outcome" => outcome
                )
                .increment(1);

                tracing::debug!(
                    method = %method,
                    route = route,
                    duration_ms = duration_u64,
                    outcome = outcome,
                    "data call complete"
                );

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
