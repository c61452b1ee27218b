//! `PostgreSQL` endpoints backed by `sqlx` connection pools.

use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection as _, Postgres};

use crate::config::EndpointConfig;
use crate::datasource::{CredentialedEndpoint, Endpoint};

/// One physical `PostgreSQL` server, primary or replica.
///
/// Connections are checked out of a per-endpoint `sqlx` pool. The pool is
/// created lazily, so building the router does not touch the network.
#[derive(Debug, Clone)]
pub struct PgEndpoint {
    pool: PgPool,
}

impl PgEndpoint {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a lazily-connecting endpoint from its descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn from_config(config: &EndpointConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_lazy(&config.url)?;
        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A connection handed out by [`PgEndpoint`].
///
/// Pooled for the endpoint's own credentials; a dedicated connection when
/// opened for another user. Both dereference to [`PgConnection`].
#[derive(Debug)]
pub enum PgEndpointConnection {
    Pooled(PoolConnection<Postgres>),
    Dedicated(PgConnection),
}

impl Deref for PgEndpointConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        match self {
            Self::Pooled(conn) => &**conn,
            Self::Dedicated(conn) => conn,
        }
    }
}

impl DerefMut for PgEndpointConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        match self {
            Self::Pooled(conn) => &mut **conn,
            Self::Dedicated(conn) => conn,
        }
    }
}

#[async_trait]
impl Endpoint for PgEndpoint {
    type Connection = PgEndpointConnection;
    type Error = sqlx::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.pool.acquire().await.map(PgEndpointConnection::Pooled)
    }
}

#[async_trait]
impl CredentialedEndpoint for PgEndpoint {
    async fn connect_as(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Self::Connection, Self::Error> {
        let options = (*self.pool.connect_options())
            .clone()
            .username(username)
            .password(password);
        PgConnection::connect_with(&options)
            .await
            .map(PgEndpointConnection::Dedicated)
    }
}
