//! Task-local call scopes.
//!
//! Each intercepted call runs inside its own scope that owns one
//! [`RoutingContext`]. The context lives in tokio task-local storage, so it
//! is isolated per task and disappears with the scope; nothing leaks into
//! the next unit of work scheduled on the same worker thread.
//!
//! A nested call gets a child scope seeded with the enclosing call's mode.
//! Sibling calls polled concurrently within one task (`join!`, `select!`)
//! each see only their own mark.

use std::future::Future;

use rwsplit_core::{CallEntry, RouteMode, RoutingContext, RoutingInterceptor};

tokio::task_local! {
    static ROUTING_CONTEXT: RoutingContext;
}

/// Returns true if the caller runs inside a call scope.
#[must_use]
pub fn in_scope() -> bool {
    ROUTING_CONTEXT.try_with(|_| ()).is_ok()
}

/// Returns the routing mode of the current scope, or `Unset` outside any scope.
#[must_use]
pub fn current_mode() -> RouteMode {
    ROUTING_CONTEXT
        .try_with(RoutingContext::mode)
        .unwrap_or_default()
}

/// Runs `f` with the current scope's context, if there is one.
pub fn with_context<T>(f: impl FnOnce(&RoutingContext) -> T) -> Option<T> {
    ROUTING_CONTEXT.try_with(f).ok()
}

/// Runs `fut` inside a fresh call scope.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    ROUTING_CONTEXT.scope(RoutingContext::new(), fut).await
}

/// Runs `f` inside a fresh call scope on the current thread.
pub fn sync_scope<T>(f: impl FnOnce() -> T) -> T {
    ROUTING_CONTEXT.sync_scope(RoutingContext::new(), f)
}

/// Runs the future produced by `call` bracketed by the interceptor hooks.
///
/// The call is decided and marked in a child scope seeded with the mode of
/// the enclosing scope, so an outer write is still visible to the decision.
/// When the call completes, fails, or is cancelled by dropping the returned
/// future, the after-call hook is applied to the enclosing scope, if any.
pub async fn intercept<F, Fut>(
    interceptor: &RoutingInterceptor,
    method: &str,
    call: F,
) -> Fut::Output
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    let enclosing = with_context(RoutingContext::mode);
    let ctx = RoutingContext::with_mode(enclosing.unwrap_or_default());
    let entry = interceptor.before_call(method, &ctx);
    let _exit = enclosing.map(|_| EnclosingExit { interceptor, entry });

    ROUTING_CONTEXT.scope(ctx, async move { call().await }).await
}

/// Drop guard that runs the after-call hook against the enclosing scope.
///
/// Holds no borrow of the context, so it can live across `.await` points.
struct EnclosingExit<'a> {
    interceptor: &'a RoutingInterceptor,
    entry: CallEntry,
}

impl Drop for EnclosingExit<'_> {
    fn drop(&mut self) {
        let _ = with_context(|ctx| self.interceptor.after_call(ctx, self.entry));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rwsplit_core::{MethodClassifier, MethodDeclaration, NestingPolicy};
    use tokio::task::yield_now;

    use super::*;

    fn interceptor_with(force: bool, nesting: NestingPolicy) -> RoutingInterceptor {
        let classifier =
            MethodClassifier::build(vec![MethodDeclaration::read_only("find*")], force).unwrap();
        RoutingInterceptor::new(Arc::new(classifier), nesting)
    }

    fn interceptor(force: bool) -> RoutingInterceptor {
        interceptor_with(force, NestingPolicy::Overwrite)
    }

    #[tokio::test]
    async fn outside_scope_mode_is_unset() {
        assert!(!in_scope());
        assert_eq!(current_mode(), RouteMode::Unset);
        assert!(with_context(RoutingContext::mode).is_none());
    }

    #[tokio::test]
    async fn intercept_opens_scope_and_marks_mode() {
        let interceptor = interceptor(false);
        let seen = intercept(&interceptor, "findById", || async {
            (in_scope(), current_mode())
        })
        .await;
        assert_eq!(seen, (true, RouteMode::Read));
        assert!(!in_scope());
    }

    #[tokio::test]
    async fn nested_read_inherits_outer_write() {
        let interceptor = interceptor(false);
        let inner_mode = intercept(&interceptor, "saveUser", || async {
            intercept(&interceptor, "findById", || async { current_mode() }).await
        })
        .await;
        assert_eq!(inner_mode, RouteMode::Write);
    }

    #[tokio::test]
    async fn sequential_nested_call_resets_outer_under_overwrite() {
        let interceptor = interceptor(false);
        let (before, after) = intercept(&interceptor, "saveUser", || async {
            let before = current_mode();
            intercept(&interceptor, "findById", || async {}).await;
            (before, current_mode())
        })
        .await;
        assert_eq!(before, RouteMode::Write);
        assert_eq!(after, RouteMode::Unset);
    }

    #[tokio::test]
    async fn sequential_nested_call_keeps_outer_under_restore() {
        let interceptor = interceptor_with(true, NestingPolicy::Restore);
        let (inner, after) = intercept(&interceptor, "saveUser", || async {
            let inner = intercept(&interceptor, "findById", || async { current_mode() }).await;
            (inner, current_mode())
        })
        .await;
        assert_eq!(inner, RouteMode::Read);
        assert_eq!(after, RouteMode::Write);
    }

    #[tokio::test]
    async fn joined_siblings_keep_their_own_marks() {
        let interceptor = interceptor(true);
        let (save, find) = intercept(&interceptor, "saveAndLookup", || async {
            tokio::join!(
                intercept(&interceptor, "saveUser", || async {
                    yield_now().await;
                    current_mode()
                }),
                intercept(&interceptor, "findById", || async {
                    for _ in 0..3 {
                        yield_now().await;
                    }
                    current_mode()
                }),
            )
        })
        .await;
        assert_eq!(save, RouteMode::Write);
        assert_eq!(find, RouteMode::Read);
    }

    #[tokio::test]
    async fn finished_sibling_does_not_reset_running_sibling() {
        let interceptor = interceptor(false);
        let (save, ()) = intercept(&interceptor, "refreshCache", || async {
            tokio::join!(
                intercept(&interceptor, "saveUser", || async {
                    yield_now().await;
                    yield_now().await;
                    current_mode()
                }),
                intercept(&interceptor, "findAll", || async {}),
            )
        })
        .await;
        assert_eq!(save, RouteMode::Write);
    }

    #[tokio::test]
    async fn context_resets_after_error() {
        let interceptor = interceptor(false);
        scope(async {
            let result: Result<(), &str> =
                intercept(&interceptor, "saveUser", || async { Err("constraint violated") }).await;
            assert!(result.is_err());
            assert_eq!(current_mode(), RouteMode::Unset);
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn context_resets_when_call_is_cancelled() {
        let interceptor = interceptor(false);
        scope(async {
            with_context(RoutingContext::mark_read);
            let slow = intercept(&interceptor, "saveUser", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
            let timed_out = tokio::time::timeout(Duration::from_millis(10), slow).await;
            assert!(timed_out.is_err());
            assert_eq!(current_mode(), RouteMode::Unset);
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_tasks_do_not_share_context() {
        let interceptor = Arc::new(interceptor(false));
        let mut handles = Vec::new();
        for i in 0..16 {
            let interceptor = Arc::clone(&interceptor);
            handles.push(tokio::spawn(async move {
                let method = if i % 2 == 0 { "findById" } else { "saveUser" };
                intercept(&interceptor, method, || async {
                    yield_now().await;
                    current_mode()
                })
                .await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            let expected = if i % 2 == 0 {
                RouteMode::Read
            } else {
                RouteMode::Write
            };
            assert_eq!(handle.await.unwrap(), expected);
        }
    }

    #[test]
    fn sync_scope_supports_blocking_callers() {
        let interceptor = interceptor(true);
        let mode = sync_scope(|| {
            with_context(|ctx| interceptor.intercept(ctx, "findAll", || ctx.mode()))
        });
        assert_eq!(mode, Some(RouteMode::Read));
    }
}
