//! One-time router bootstrap.
//!
//! [`ReadWriteRouter::from_config`] is the explicit initialization step the
//! application calls once all endpoint descriptors and method rules are
//! known. It builds the endpoint pool, the method classifier, and the
//! interceptor, and fails with a single [`InitError`] before any traffic is
//! routed if anything is wrong.

use std::future::Future;
use std::sync::Arc;

use rwsplit_core::{
    ClassifierError, ConfigError, EndpointPool, MethodClassifier, NestingPolicy,
    RoutingInterceptor,
};
use tracing::info;

use crate::config::{EndpointConfig, RouterConfig};
use crate::datasource::{CredentialedEndpoint, Endpoint, RoutingDataSource};
use crate::middleware::RoutingLayer;
use crate::scope;

/// Errors raised while bootstrapping the router. None of them is recoverable.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("invalid endpoint configuration")]
    Endpoints(#[from] ConfigError),
    #[error("failed to build method classifier")]
    Classifier(#[from] ClassifierError),
    #[error("failed to create endpoint `{name}`")]
    Endpoint {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Fully wired read/write router: connection routing plus call interception.
#[derive(Debug)]
pub struct ReadWriteRouter<E> {
    data_source: Arc<RoutingDataSource<E>>,
    interceptor: Arc<RoutingInterceptor>,
}

impl<E> Clone for ReadWriteRouter<E> {
    fn clone(&self) -> Self {
        Self {
            data_source: Arc::clone(&self.data_source),
            interceptor: Arc::clone(&self.interceptor),
        }
    }
}

impl<E: Endpoint> ReadWriteRouter<E> {
    /// Builds the router from configuration.
    ///
    /// `connect` turns each endpoint descriptor into an endpoint handle; it
    /// is called for the write endpoint first, then for each read endpoint
    /// in order.
    ///
    /// # Errors
    ///
    /// Returns `InitError::Endpoint` if `connect` fails, `InitError::Endpoints`
    /// for a missing write endpoint, an empty or duplicated read set, and
    /// `InitError::Classifier` for a malformed method pattern.
    pub fn from_config<F>(config: &RouterConfig, mut connect: F) -> Result<Self, InitError>
    where
        F: FnMut(&EndpointConfig) -> anyhow::Result<E>,
    {
        let classifier = MethodClassifier::build(
            config.methods.iter().cloned(),
            config.force_choice_read_when_write,
        )?;

        let mut builder = EndpointPool::builder();
        if let Some(write) = &config.write {
            let endpoint = connect(write).map_err(|source| InitError::Endpoint {
                name: "write".to_string(),
                source,
            })?;
            builder = builder.write(endpoint);
        }
        for read in &config.reads {
            let endpoint = connect(&read.endpoint).map_err(|source| InitError::Endpoint {
                name: read.name.clone(),
                source,
            })?;
            builder = builder.read(read.name.clone(), endpoint);
        }
        let pool = builder.build()?;

        info!(
            read_endpoints = pool.read_count(),
            method_rules = classifier.len(),
            force_choice_read_when_write = config.force_choice_read_when_write,
            nesting = ?config.nesting,
            "read/write router initialized"
        );

        Ok(Self::new(pool, classifier, config.nesting))
    }

    /// Wires an already-built pool and classifier.
    #[must_use]
    pub fn new(
        pool: EndpointPool<E>,
        classifier: MethodClassifier,
        nesting: NestingPolicy,
    ) -> Self {
        Self {
            data_source: Arc::new(RoutingDataSource::new(pool)),
            interceptor: Arc::new(RoutingInterceptor::new(Arc::new(classifier), nesting)),
        }
    }

    /// Runs a data-access call under the routing interceptor.
    pub async fn intercept<F, Fut>(&self, method: &str, call: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        scope::intercept(&self.interceptor, method, call).await
    }

    /// Acquires a connection for the current call scope.
    ///
    /// # Errors
    ///
    /// Returns the selected endpoint's connection error unchanged.
    pub async fn acquire(&self) -> Result<E::Connection, E::Error> {
        self.data_source.acquire().await
    }

    /// Acquires a connection for the current call scope as `username`.
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
        self.data_source.acquire_as(username, password).await
    }

    /// Tower layer applying this router's interceptor.
    #[must_use]
    pub fn layer(&self) -> RoutingLayer {
        RoutingLayer::new(Arc::clone(&self.interceptor))
    }

    #[must_use]
    pub fn data_source(&self) -> &Arc<RoutingDataSource<E>> {
        &self.data_source
    }

    #[must_use]
    pub fn interceptor(&self) -> &Arc<RoutingInterceptor> {
        &self.interceptor
    }

    #[must_use]
    pub fn classifier(&self) -> &MethodClassifier {
        self.interceptor.classifier()
    }
}
