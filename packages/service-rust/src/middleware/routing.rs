//! Routing middleware for data-access calls.
//!
//! Wraps a data-access service so that every call runs inside a call scope
//! whose routing context is marked read or write before the inner service is
//! invoked and reset after it finishes, on success, error, or cancellation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rwsplit_core::RoutingInterceptor;
use tower::{Layer, Service};

use crate::operation::DataCall;
use crate::scope;

// ---------------------------------------------------------------------------
// RoutingLayer
// ---------------------------------------------------------------------------

/// Tower layer that brackets each [`DataCall`] with the routing interceptor.
#[derive(Debug, Clone)]
pub struct RoutingLayer {
    interceptor: Arc<RoutingInterceptor>,
}

impl RoutingLayer {
    #[must_use]
    pub fn new(interceptor: Arc<RoutingInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for RoutingLayer {
    type Service = RoutingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RoutingService {
            inner,
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

// ---------------------------------------------------------------------------
// RoutingService
// ---------------------------------------------------------------------------

/// Service wrapper that marks and resets the routing context around each call.
///
/// The inner service is invoked inside the bracket, so anything it does
/// synchronously in `call` already observes the routing mode.
#[derive(Debug, Clone)]
pub struct RoutingService<S> {
    inner: S,
    interceptor: Arc<RoutingInterceptor>,
}

impl<S, R> Service<DataCall<R>> for RoutingService<S>
where
    S: Service<DataCall<R>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    R: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<S::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: DataCall<R>) -> Self::Future {
        // The driven-to-ready instance handles this call; a fresh clone takes its place.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let interceptor = Arc::clone(&self.interceptor);

        Box::pin(async move {
            let method = call.method.clone();
            scope::intercept(&interceptor, &method, move || inner.call(call)).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
