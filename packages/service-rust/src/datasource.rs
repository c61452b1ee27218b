//! Connection acquisition through the endpoint pool.
//!
//! [`RoutingDataSource`] is what data-access code asks for a connection. It
//! reads the routing mode of the current call scope, selects an endpoint
//! from the [`EndpointPool`], and opens a connection on it. Connection
//! failures are returned exactly as the endpoint produced them: there is no
//! retry and no fallback to another endpoint.

use std::future::Future;

use async_trait::async_trait;
use rwsplit_core::{EndpointPool, RouteMode, RoutingContext, Selection};
use tracing::debug;

use crate::scope;

/// A physical endpoint capable of producing connections.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Connection handle handed to data-access code.
    type Connection: Send;
    /// Error produced when a connection cannot be opened.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens (or checks out) a connection.
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;
}

/// An endpoint that can also open connections as a caller-supplied user.
#[async_trait]
pub trait CredentialedEndpoint: Endpoint {
    /// Opens a connection authenticated as `username`.
    async fn connect_as(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Self::Connection, Self::Error>;
}

/// Routes connection requests to the write endpoint or a read replica.
#[derive(Debug)]
pub struct RoutingDataSource<E> {
    pool: EndpointPool<E>,
}

impl<E: Endpoint> RoutingDataSource<E> {
    #[must_use]
    pub fn new(pool: EndpointPool<E>) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &EndpointPool<E> {
        &self.pool
    }

    /// Selects the endpoint for the current call scope without connecting.
    pub fn select(&self) -> Selection<'_, E> {
        self.select_mode(scope::current_mode())
    }

    /// Acquires a connection for the current call scope.
    ///
    /// Outside any scope the mode is `Unset`, which routes to the write endpoint.
    ///
    /// # Errors
    ///
    /// Returns the selected endpoint's connection error unchanged.
    pub async fn acquire(&self) -> Result<E::Connection, E::Error> {
        let mode = scope::current_mode();
        self.acquire_mode(mode).await
    }

    /// Acquires a connection for an explicitly threaded context.
    ///
    /// # Errors
    ///
    /// Returns the selected endpoint's connection error unchanged.
    pub fn acquire_in(
        &self,
        ctx: &RoutingContext,
    ) -> impl Future<Output = Result<E::Connection, E::Error>> + '_ {
        // Read the mode eagerly so the returned future does not borrow the context.
        self.acquire_mode(ctx.mode())
    }

    /// Acquires a connection for the current call scope as `username`.
    ///
    /// Routing is the same as [`acquire`](Self::acquire); only the
    /// credentials differ.
    ///
    /// # Errors
    ///
    /// Returns the selected endpoint's connection error unchanged.
    pub async fn acquire_as(
        &self,
        username: &str,
        password: &str,
    ) -> Result<E::Connection, E::Error>
    where
        E: CredentialedEndpoint,
    {
        let selection = self.select_mode(scope::current_mode());
        selection.endpoint.connect_as(username, password).await
    }

    async fn acquire_mode(&self, mode: RouteMode) -> Result<E::Connection, E::Error> {
        let selection = self.select_mode(mode);
        selection.endpoint.connect().await
    }

    fn select_mode(&self, mode: RouteMode) -> Selection<'_, E> {
        let selection = self.pool.select_mode(mode);
        let role = selection.role.label();
        metrics::counter!("rwsplit_endpoint_selections_total", "role" => role).increment(1);
        debug!(mode = mode.as_str(), role, "endpoint selected");
        selection
    }
}
