/*!
 * Cancellable Wait
 * Drives the readiness poller until process exit or context cancellation,
 * with cancellation taking priority in the reported outcome
 */

use std::io;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use tokio::sync::oneshot;
use tokio::task;

use crate::context::WaitContext;
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::Pid;
use crate::poller::{PollError, Poller};
use crate::sys;

/// Block until the observed process exits or `ctx` fires, whichever comes
/// first. Cancellation wins ties.
///
/// The poller has no cancellation hook of its own, so a watcher task
/// observes `ctx` and forces a blocked poll to unblock by arming an
/// already-expired read deadline on the shared descriptor. That deadline is
/// a side channel: it must be cleared before returning, and the watcher must
/// be joined before the clear so the two writes can never race. A violation
/// would leave a stale expired deadline armed for the next wait on the same
/// handle.
pub(crate) async fn wait_exit(poller: Arc<Poller>, pid: Pid, ctx: &WaitContext) -> ProcResult<()> {
    let fd = poller.descriptor().as_raw_fd();

    // The watcher starts before the poller so a context that is already
    // canceled at entry aborts the poll promptly instead of running a stale
    // exit check.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let watcher = tokio::spawn({
        let ctx = ctx.clone();
        let poller = Arc::clone(&poller);
        async move {
            tokio::select! {
                _ = ctx.done() => {
                    debug!("wait for pid {} canceled, forcing poll to unblock", pid);
                    if let Err(err) = poller.set_read_deadline(Some(Instant::now())) {
                        warn!("failed to arm expired deadline for pid {}: {}", pid, err);
                    }
                }
                _ = stop_rx => {}
            }
        }
    });

    // Poll for exit on a blocking thread. The predicate never reaps: the
    // WNOWAIT check leaves the exit status for the process's parent.
    let polled = task::spawn_blocking({
        let ctx = ctx.clone();
        let poller = Arc::clone(&poller);
        move || {
            let mut checked: Option<io::Result<()>> = None;
            let result = poller.wait_read(|fd| {
                // Cancellation preempts further OS checks.
                if ctx.is_done() {
                    return true;
                }
                match sys::check_exited(fd) {
                    Ok(false) => false,
                    Ok(true) => {
                        checked = Some(Ok(()));
                        true
                    }
                    Err(err) => {
                        checked = Some(Err(err));
                        true
                    }
                }
            });
            (result, checked)
        }
    })
    .await;

    // The poll has unblocked. Snapshot the context outcome, stop and join
    // the watcher, then disarm the deadline. Join before clear: the watcher
    // is the only other deadline writer.
    let ctx_err = ctx.error();
    let _ = stop_tx.send(());
    if let Err(err) = watcher.await {
        warn!("wait watcher for pid {} did not join cleanly: {}", pid, err);
    }
    let cleared = poller.set_read_deadline(None);

    // Strict outcome priority: context error, then poller-call errors, then
    // the recorded exit-check error, then the deadline clear.
    if let Some(err) = ctx_err {
        return Err(err);
    }

    let (poll_result, checked) =
        polled.map_err(|err| ProcError::WaitTaskFailed(err.to_string()))?;

    match poll_result {
        Ok(()) => {}
        Err(PollError::DeadlineExceeded) => return Err(ProcError::DeadlineExceeded),
        Err(PollError::Os(err)) => return Err(ProcError::os(fd, pid, err)),
    }

    if let Some(Err(err)) = checked {
        return Err(ProcError::os(fd, pid, err));
    }

    cleared.map_err(|err| ProcError::os(fd, pid, err))?;

    debug!("pid {} exited, wait complete", pid);
    Ok(())
}
