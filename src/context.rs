/*!
 * Wait Context
 * Cancellation context for wait operations: explicit cancel plus an
 * optional deadline, shareable across tasks
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::core::errors::ProcError;

/// Cancellation context for [`Handle::wait`](crate::Handle::wait).
///
/// Clones share state: canceling any clone cancels them all. A context
/// built with a deadline fires on its own once the deadline passes.
#[derive(Clone)]
pub struct WaitContext {
    shared: Arc<Shared>,
}

struct Shared {
    canceled: AtomicBool,
    notify: Notify,
    deadline: Option<Instant>,
}

impl WaitContext {
    /// Context that only fires on an explicit [`cancel`](Self::cancel).
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Context that fires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    /// Context that fires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(Instant::now() + timeout))
    }

    fn build(deadline: Option<Instant>) -> Self {
        Self {
            shared: Arc::new(Shared {
                canceled: AtomicBool::new(false),
                notify: Notify::new(),
                deadline,
            }),
        }
    }

    /// Cancel the context, waking every task blocked in [`done`](Self::done).
    /// Idempotent.
    pub fn cancel(&self) {
        self.shared.canceled.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }

    /// Whether the context has fired.
    pub fn is_done(&self) -> bool {
        self.error().is_some()
    }

    /// The cancellation cause, if the context has fired.
    ///
    /// An explicit cancel is reported ahead of a simultaneously elapsed
    /// deadline.
    pub fn error(&self) -> Option<ProcError> {
        if self.shared.canceled.load(Ordering::SeqCst) {
            return Some(ProcError::Canceled);
        }
        match self.shared.deadline {
            Some(at) if at <= Instant::now() => Some(ProcError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Complete once the context fires.
    pub async fn done(&self) {
        // Register interest before checking the flag so a cancel landing in
        // between still wakes this call.
        let notified = self.shared.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.shared.canceled.load(Ordering::SeqCst) {
            return;
        }

        match self.shared.deadline {
            Some(at) => {
                tokio::select! {
                    _ = notified => {}
                    _ = tokio::time::sleep_until(at.into()) => {}
                }
            }
            None => notified.await,
        }
    }
}

impl Default for WaitContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_pending() {
        let ctx = WaitContext::new();
        assert!(!ctx.is_done());
        assert!(ctx.error().is_none());
    }

    #[tokio::test]
    async fn cancel_fires_done() {
        let ctx = WaitContext::new();

        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };

        // Give the waiter a chance to block first.
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        waiter.await.expect("waiter completes after cancel");
        assert!(ctx.is_done());
        assert!(matches!(ctx.error(), Some(ProcError::Canceled)));
    }

    #[tokio::test]
    async fn cancel_before_done_returns_immediately() {
        let ctx = WaitContext::new();
        ctx.cancel();
        ctx.done().await;
    }

    #[tokio::test]
    async fn deadline_fires_done() {
        let start = Instant::now();
        let ctx = WaitContext::with_timeout(Duration::from_millis(20));

        ctx.done().await;

        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(matches!(ctx.error(), Some(ProcError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn explicit_cancel_wins_over_elapsed_deadline() {
        let ctx = WaitContext::with_timeout(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();
        assert!(matches!(ctx.error(), Some(ProcError::Canceled)));
    }

    #[tokio::test]
    async fn clones_share_cancellation() {
        let ctx = WaitContext::new();
        let other = ctx.clone();
        other.cancel();
        assert!(ctx.is_done());
    }
}
