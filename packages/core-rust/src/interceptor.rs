//! Routing interceptor: brackets a data-access call with a routing decision.
//!
//! Before the call the interceptor asks the [`MethodClassifier`] whether the
//! call is a read and marks the [`RoutingContext`]; after the call, on every
//! exit path, it resets the context. The hooks are exposed separately
//! ([`RoutingInterceptor::before_call`] / [`RoutingInterceptor::after_call`])
//! so that host interception layers can drive them, and as an RAII guard for
//! direct use.
//!
//! # Nested calls
//!
//! The context is a single slot, not a stack. Under
//! [`NestingPolicy::Overwrite`] a nested call resets the context to `Unset`
//! when it returns, so code that runs afterwards inside the outer call no
//! longer sees the outer mark. [`NestingPolicy::Restore`] instead puts back
//! the mode observed when the nested call was entered.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::MethodClassifier;
use crate::context::{RouteMode, RoutingContext};

/// What the after-call hook leaves in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NestingPolicy {
    /// Reset to `Unset` on every exit.
    #[default]
    Overwrite,
    /// Restore the mode held before the call was entered.
    Restore,
}

/// State handed from [`RoutingInterceptor::before_call`] to
/// [`RoutingInterceptor::after_call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "pass the entry to `after_call` to reset the routing context"]
pub struct CallEntry {
    /// Mode chosen for the call.
    pub mode: RouteMode,
    /// Mode the context held before the call.
    pub previous: RouteMode,
}

/// Marks and resets a routing context around data-access calls.
#[derive(Debug, Clone)]
pub struct RoutingInterceptor {
    classifier: Arc<MethodClassifier>,
    nesting: NestingPolicy,
}

impl RoutingInterceptor {
    #[must_use]
    pub fn new(classifier: Arc<MethodClassifier>, nesting: NestingPolicy) -> Self {
        Self {
            classifier,
            nesting,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &MethodClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn nesting(&self) -> NestingPolicy {
        self.nesting
    }

    /// Decides the route for `method` and marks the context accordingly.
    pub fn before_call(&self, method: &str, ctx: &RoutingContext) -> CallEntry {
        let previous = ctx.mode();
        let is_read = self.classifier.is_read_decision(method, ctx);
        if is_read {
            ctx.mark_read();
        } else {
            ctx.mark_write();
        }
        let mode = ctx.mode();

        debug!(method, mode = mode.as_str(), previous = previous.as_str(), "routing decision");

        CallEntry { mode, previous }
    }

    /// Resets the context after the call, per the nesting policy.
    pub fn after_call(&self, ctx: &RoutingContext, entry: CallEntry) {
        match self.nesting {
            NestingPolicy::Overwrite => ctx.reset(),
            NestingPolicy::Restore => ctx.set(entry.previous),
        }
    }

    /// Marks the context and returns a guard that runs `after_call` on drop.
    pub fn guard<'a>(&'a self, method: &str, ctx: &'a RoutingContext) -> CallGuard<'a> {
        let entry = self.before_call(method, ctx);
        CallGuard {
            interceptor: self,
            ctx,
            entry,
        }
    }

    /// Runs `call` bracketed by the before/after hooks.
    ///
    /// The context is reset even if `call` panics.
    pub fn intercept<T>(&self, ctx: &RoutingContext, method: &str, call: impl FnOnce() -> T) -> T {
        let _guard = self.guard(method, ctx);
        call()
    }
}

/// RAII form of the after-call hook.
#[derive(Debug)]
#[must_use = "dropping the guard immediately resets the routing context"]
pub struct CallGuard<'a> {
    interceptor: &'a RoutingInterceptor,
    ctx: &'a RoutingContext,
    entry: CallEntry,
}

impl CallGuard<'_> {
    /// Mode chosen for the guarded call.
    #[must_use]
    pub fn mode(&self) -> RouteMode {
        self.entry.mode
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.interceptor.after_call(self.ctx, self.entry);
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::classify::MethodDeclaration;
    use crate::pool::EndpointPool;

    fn interceptor(force: bool, nesting: NestingPolicy) -> RoutingInterceptor {
        let classifier = MethodClassifier::build(
            vec![
                MethodDeclaration::read_only("find*"),
                MethodDeclaration::read_write("save*"),
            ],
            force,
        )
        .unwrap();
        RoutingInterceptor::new(Arc::new(classifier), nesting)
    }

    #[test]
    fn marks_read_inside_call_and_resets_after() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();

        let seen = interceptor.intercept(&ctx, "findById", || ctx.mode());
        assert_eq!(seen, RouteMode::Read);
        assert!(ctx.is_unset());
    }

    #[test]
    fn unclassified_call_marks_write() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();

        let seen = interceptor.intercept(&ctx, "deleteById", || ctx.mode());
        assert_eq!(seen, RouteMode::Write);
        assert!(ctx.is_unset());
    }

    #[test]
    fn context_resets_when_call_panics() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            interceptor.intercept(&ctx, "saveUser", || panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(ctx.is_unset());
    }

    #[test]
    fn read_nested_in_write_stays_on_write() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let pool = EndpointPool::builder()
            .write("W")
            .read("r0", "r0")
            .build()
            .unwrap();
        let ctx = RoutingContext::new();

        let inner = interceptor.intercept(&ctx, "saveUser", || {
            interceptor.intercept(&ctx, "findById", || *pool.select(&ctx).endpoint)
        });
        assert_eq!(inner, "W");
    }

    #[test]
    fn forced_read_nested_in_write_goes_to_replica() {
        let interceptor = interceptor(true, NestingPolicy::Overwrite);
        let pool = EndpointPool::builder()
            .write("W")
            .read("r0", "r0")
            .build()
            .unwrap();
        let ctx = RoutingContext::new();

        let inner = interceptor.intercept(&ctx, "saveUser", || {
            interceptor.intercept(&ctx, "findById", || *pool.select(&ctx).endpoint)
        });
        assert_eq!(inner, "r0");
    }

    #[test]
    fn overwrite_policy_drops_outer_mark_after_nested_call() {
        let interceptor = interceptor(true, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();

        let after_inner = interceptor.intercept(&ctx, "saveUser", || {
            interceptor.intercept(&ctx, "findById", || ());
            ctx.mode()
        });
        assert_eq!(after_inner, RouteMode::Unset);
        assert!(ctx.is_unset());
    }

    #[test]
    fn restore_policy_keeps_outer_mark_after_nested_call() {
        let interceptor = interceptor(true, NestingPolicy::Restore);
        let ctx = RoutingContext::new();

        let after_inner = interceptor.intercept(&ctx, "saveUser", || {
            interceptor.intercept(&ctx, "findById", || ());
            ctx.mode()
        });
        assert_eq!(after_inner, RouteMode::Write);
        assert!(ctx.is_unset());
    }

    #[test]
    fn explicit_hooks_report_entry() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();

        let entry = interceptor.before_call("findAll", &ctx);
        assert_eq!(
            entry,
            CallEntry {
                mode: RouteMode::Read,
                previous: RouteMode::Unset
            }
        );
        assert!(ctx.is_read());
        interceptor.after_call(&ctx, entry);
        assert!(ctx.is_unset());
    }

    #[test]
    fn guard_exposes_chosen_mode() {
        let interceptor = interceptor(false, NestingPolicy::Overwrite);
        let ctx = RoutingContext::new();
        {
            let guard = interceptor.guard("saveUser", &ctx);
            assert_eq!(guard.mode(), RouteMode::Write);
            assert!(ctx.is_write());
        }
        assert!(ctx.is_unset());
    }
}
