//! Endpoint pool: one write endpoint plus an ordered set of named read endpoints.
//!
//! Selection is a pure, non-blocking computation. Writes and unclassified
//! calls go to the write endpoint; reads rotate through the read endpoints
//! with a shared atomic counter.
//!
//! # Counter arithmetic
//!
//! The counter is an unsigned 64-bit integer advanced with a wrapping
//! `fetch_add`, and the index is `counter % read_count`. There is no
//! signed absolute value, so no counter value can produce an out-of-range
//! index. After 2^64 selections the sequence restarts at zero, which may
//! skip part of one rotation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::context::{RouteMode, RoutingContext};
use crate::error::ConfigError;

/// Counter value before the first read selection.
pub const DEFAULT_COUNTER_START: u64 = 1;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Which endpoint a selection resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole<'a> {
    Write,
    Read { index: usize, name: &'a str },
}

impl EndpointRole<'_> {
    /// Returns the metrics label for this role.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Read { .. } => "read",
        }
    }
}

/// Result of [`EndpointPool::select`].
#[derive(Debug)]
pub struct Selection<'a, E> {
    pub role: EndpointRole<'a>,
    pub endpoint: &'a E,
}

// ---------------------------------------------------------------------------
// EndpointPool
// ---------------------------------------------------------------------------

/// Immutable pool of endpoints with round-robin read selection.
///
/// Invariants: exactly one write endpoint, at least one read endpoint, and
/// read order fixed at construction. Use [`EndpointPool::builder`].
#[derive(Debug)]
pub struct EndpointPool<E> {
    write: E,
    reads: Vec<(String, E)>,
    counter: AtomicU64,
}

impl<E> EndpointPool<E> {
    /// Starts building a pool.
    #[must_use]
    pub fn builder() -> EndpointPoolBuilder<E> {
        EndpointPoolBuilder::new()
    }

    /// Selects the endpoint for the given routing context.
    pub fn select(&self, ctx: &RoutingContext) -> Selection<'_, E> {
        self.select_mode(ctx.mode())
    }

    /// Selects the endpoint for the given routing mode.
    ///
    /// `Write` and `Unset` both resolve to the write endpoint, so an
    /// uninstrumented call never lands on a replica.
    pub fn select_mode(&self, mode: RouteMode) -> Selection<'_, E> {
        match mode {
            RouteMode::Write => {
                debug!("current determine write endpoint");
                self.write_selection()
            }
            RouteMode::Unset => {
                debug!("no read/write choice, default to write endpoint");
                self.write_selection()
            }
            RouteMode::Read => self.next_read(),
        }
    }

    fn write_selection(&self) -> Selection<'_, E> {
        Selection {
            role: EndpointRole::Write,
            endpoint: &self.write,
        }
    }

    fn next_read(&self) -> Selection<'_, E> {
        let value = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let index = read_index(value, self.reads.len());
        let (name, endpoint) = &self.reads[index];

        debug!(endpoint = name.as_str(), index, "current choice read endpoint");

        Selection {
            role: EndpointRole::Read {
                index,
                name: name.as_str(),
            },
            endpoint,
        }
    }

    #[must_use]
    pub fn write_endpoint(&self) -> &E {
        &self.write
    }

    /// Read endpoints in registration order.
    pub fn read_endpoints(&self) -> impl Iterator<Item = (&str, &E)> {
        self.reads.iter().map(|(name, e)| (name.as_str(), e))
    }

    pub fn read_endpoint_names(&self) -> impl Iterator<Item = &str> {
        self.reads.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn read_index(counter: u64, read_count: usize) -> usize {
    // The remainder is below `read_count`, so it always fits in `usize`.
    (counter % read_count as u64) as usize
}

// ---------------------------------------------------------------------------
// EndpointPoolBuilder
// ---------------------------------------------------------------------------

/// Builder for [`EndpointPool`]; validation happens once in [`build`](Self::build).
#[derive(Debug)]
pub struct EndpointPoolBuilder<E> {
    write: Option<E>,
    reads: Vec<(String, E)>,
    counter_start: u64,
}

impl<E> EndpointPoolBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            write: None,
            reads: Vec::new(),
            counter_start: DEFAULT_COUNTER_START,
        }
    }

    /// Sets the write endpoint, replacing any previous one.
    #[must_use]
    pub fn write(mut self, endpoint: E) -> Self {
        self.write = Some(endpoint);
        self
    }

    /// Appends a named read endpoint. Selection order is registration order.
    #[must_use]
    pub fn read(mut self, name: impl Into<String>, endpoint: E) -> Self {
        self.reads.push((name.into(), endpoint));
        self
    }

    /// Sets the rotation counter's initial value.
    #[must_use]
    pub fn counter_start(mut self, start: u64) -> Self {
        self.counter_start = start;
        self
    }

    /// Validates the configuration and builds the pool.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingWriteEndpoint` if no write endpoint was set,
    /// `ConfigError::NoReadEndpoints` if no read endpoint was added, and
    /// `ConfigError::DuplicateReadEndpoint` if two read endpoints share a name.
    pub fn build(self) -> Result<EndpointPool<E>, ConfigError> {
        let write = self.write.ok_or(ConfigError::MissingWriteEndpoint)?;
        if self.reads.is_empty() {
            return Err(ConfigError::NoReadEndpoints);
        }

        let mut seen = HashSet::with_capacity(self.reads.len());
        for (name, _) in &self.reads {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateReadEndpoint { name: name.clone() });
            }
        }

        Ok(EndpointPool {
            write,
            reads: self.reads,
            counter: AtomicU64::new(self.counter_start),
        })
    }
}

impl<E> Default for EndpointPoolBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
