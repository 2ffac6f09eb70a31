/*!
 * Process Handle
 * Public handle over one OS process: open, signal delivery, cancellable wait
 */

use std::fmt;

use log::debug;

use crate::context::WaitContext;
use crate::core::errors::ProcResult;
use crate::core::types::{Pid, Signal};
use crate::sys;

/// A handle to one operating-system process.
///
/// The handle owns a nonblocking pidfd descriptor bound at open time; the
/// pid never changes afterward. If the target process does not exist,
/// operations fail with an error classified as
/// [`ErrorKind::NotFound`](crate::ErrorKind::NotFound).
///
/// Concurrent [`wait`](Self::wait) calls on one handle are not a supported
/// configuration: the read deadline used to interrupt a blocked wait is
/// shared descriptor state with one writer per call. Serialize use per
/// handle, one handle per observed process.
pub struct Handle {
    pid: Pid,
    inner: sys::PidFd,
}

impl Handle {
    /// Open a handle to the process identified by `pid`.
    pub fn open(pid: Pid) -> ProcResult<Self> {
        let inner = sys::PidFd::open(pid)?;
        debug!("opened process handle for pid {}", pid);
        Ok(Self { pid, inner })
    }

    /// The process id this handle observes.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Release the handle's descriptor.
    pub fn close(self) -> ProcResult<()> {
        self.inner.close()
    }

    /// Send `signal` to the process.
    ///
    /// The value is validated against the platform signal domain before any
    /// OS state is touched; out-of-domain values fail with
    /// [`ErrorKind::InvalidArgument`](crate::ErrorKind::InvalidArgument).
    /// Delivery failures classify as
    /// [`ErrorKind::PermissionDenied`](crate::ErrorKind::PermissionDenied)
    /// or [`ErrorKind::NotFound`](crate::ErrorKind::NotFound).
    pub fn send_signal(&self, signal: Signal) -> ProcResult<()> {
        self.inner.send_signal(signal)
    }

    /// Block until the process exits or `ctx` fires.
    ///
    /// Cancellation wins ties: if the context fires, the call reports a
    /// [`ErrorKind::Canceled`](crate::ErrorKind::Canceled) error even if the
    /// process exits in the same instant. The exit status is never reaped;
    /// collecting it stays with the process's parent. Waiting again on the
    /// same handle after a cancellation behaves identically, with no state
    /// carried over from the interrupted call.
    pub async fn wait(&self, ctx: &WaitContext) -> ProcResult<()> {
        self.inner.wait(ctx).await
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("pid", &self.pid).finish()
    }
}
