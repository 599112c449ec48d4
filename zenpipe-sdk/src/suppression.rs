//! Thread-scoped suppression of nested instrumentation.
//!
//! While a [`SuppressionGuard`] is alive on a thread, telemetry emitted on that
//! thread is dropped by [`TelemetryProvider`](crate::TelemetryProvider). The
//! export path enters a guard so sending a batch never produces records that
//! loop back into the pipeline.

use std::cell::Cell;
use std::marker::PhantomData;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard marking the current thread as suppressed.
///
/// Guards nest; the thread is unsuppressed when the outermost guard drops,
/// including during unwinding.
#[must_use = "suppression ends as soon as the guard is dropped"]
pub struct SuppressionGuard {
    // Thread-local state: the guard must be dropped on the thread that made it.
    _not_send: PhantomData<*const ()>,
}

impl SuppressionGuard {
    pub fn enter() -> Self {
        DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while any [`SuppressionGuard`] is alive on this thread.
pub fn is_suppressed() -> bool {
    DEPTH.with(|depth| depth.get() > 0)
}

/// Run `f` with instrumentation suppressed.
pub fn suppressed<R>(f: impl FnOnce() -> R) -> R {
    let _guard = SuppressionGuard::enter();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scopes_suppression() {
        assert!(!is_suppressed());
        {
            let _guard = SuppressionGuard::enter();
            assert!(is_suppressed());
        }
        assert!(!is_suppressed());
    }

    #[test]
    fn test_nested_guards() {
        let outer = SuppressionGuard::enter();
        let inner = SuppressionGuard::enter();
        drop(inner);
        assert!(is_suppressed());
        drop(outer);
        assert!(!is_suppressed());
    }

    #[test]
    fn test_restored_after_panic() {
        let result = std::panic::catch_unwind(|| {
            suppressed(|| panic!("export blew up"));
        });
        assert!(result.is_err());
        assert!(!is_suppressed());
    }

    #[test]
    fn test_other_threads_unaffected() {
        let _guard = SuppressionGuard::enter();
        let seen = std::thread::spawn(is_suppressed).join().unwrap();
        assert!(!seen);
    }
}
