//! Per-call routing state.
//!
//! A [`RoutingContext`] records whether the current logical call has been
//! classified as a write, a read, or not classified at all. It is owned by a
//! single call scope (a task, a thread, or an explicit caller) and is never
//! shared across concurrent calls, so it uses a `Cell` instead of atomics.

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Routing state of a logical call.
///
/// State machine: Unset -> {Write, Read} -> Unset. There is no terminal
/// state; the same context is re-entered by every call in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// No routing decision has been made for the current call.
    #[default]
    Unset,
    /// The call must be served by the write endpoint.
    Write,
    /// The call may be served by a read endpoint.
    Read,
}

impl RouteMode {
    /// Returns the lowercase label used in logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Write => "write",
            Self::Read => "read",
        }
    }
}

/// Mutable routing state for one logical call scope.
///
/// Transitions are overwrites, not pushes: marking a context replaces
/// whatever it held before.
#[derive(Debug, Default)]
pub struct RoutingContext {
    mode: Cell<RouteMode>,
}

impl RoutingContext {
    /// Creates a context in the `Unset` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context already holding `mode`.
    ///
    /// Used to seed a nested call's context with the enclosing call's mode.
    #[must_use]
    pub fn with_mode(mode: RouteMode) -> Self {
        let ctx = Self::new();
        ctx.set(mode);
        ctx
    }

    /// Returns the current routing mode.
    #[must_use]
    pub fn mode(&self) -> RouteMode {
        self.mode.get()
    }

    /// Marks the current call as a write.
    pub fn mark_write(&self) {
        self.mode.set(RouteMode::Write);
    }

    /// Marks the current call as a read.
    pub fn mark_read(&self) {
        self.mode.set(RouteMode::Read);
    }

    /// Returns the context to `Unset`.
    pub fn reset(&self) {
        self.mode.set(RouteMode::Unset);
    }

    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.mode() == RouteMode::Unset
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        self.mode() == RouteMode::Write
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        self.mode() == RouteMode::Read
    }

    /// Moves the context to `mode` through the public transitions.
    pub(crate) fn set(&self, mode: RouteMode) {
        match mode {
            RouteMode::Unset => self.reset(),
            RouteMode::Write => self.mark_write(),
            RouteMode::Read => self.mark_read(),
        }
    }
}
