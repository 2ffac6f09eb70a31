/*!
 * Linux pidfd Backend
 * Raw pidfd syscalls and the functional descriptor type
 */

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;
use std::sync::Arc;

use log::debug;
use nix::errno::Errno;
use nix::sys::signal::Signal as UnixSignal;
use nix::sys::wait::{waitid, Id, WaitPidFlag};

use crate::context::WaitContext;
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::{Pid, Signal};
use crate::poller::Poller;
use crate::wait;

/// "No such process" code for this platform.
pub(crate) const NO_SUCH_PROCESS: i32 = libc::ESRCH;
/// "Operation not permitted" code for this platform.
pub(crate) const NOT_PERMITTED: i32 = libc::EPERM;
/// "Permission denied" code for this platform.
pub(crate) const ACCESS_DENIED: i32 = libc::EACCES;

/// Functional pidfd descriptor bound to one process.
pub(crate) struct PidFd {
    pid: Pid,
    poller: Arc<Poller>,
}

impl PidFd {
    /// Open a nonblocking pidfd for `pid`.
    pub(crate) fn open(pid: Pid) -> ProcResult<Self> {
        // No descriptor exists yet, so failures carry fd 0.
        let fd = pidfd_open(pid).map_err(|err| ProcError::os(0, pid, err))?;
        debug!("opened pidfd {} for pid {}", fd.as_raw_fd(), pid);

        let poller = Poller::new(fd).map_err(|err| ProcError::os(0, pid, err))?;
        Ok(Self {
            pid,
            poller: Arc::new(poller),
        })
    }

    /// Send `signal` to the process.
    ///
    /// The raw value is validated against the platform signal domain before
    /// any OS state is touched.
    pub(crate) fn send_signal(&self, signal: Signal) -> ProcResult<()> {
        let sig = UnixSignal::try_from(signal).map_err(|_| ProcError::InvalidSignal(signal))?;
        debug!("sending {} to pid {}", sig, self.pid);
        pidfd_send_signal(self.poller.descriptor(), sig).map_err(|err| self.wrap(err))
    }

    /// Block until the process exits or `ctx` fires.
    pub(crate) async fn wait(&self, ctx: &WaitContext) -> ProcResult<()> {
        wait::wait_exit(Arc::clone(&self.poller), self.pid, ctx).await
    }

    /// Release the descriptor.
    ///
    /// If a wait on another task still holds the descriptor, it stays open
    /// until that wait unblocks; the close itself reports success.
    pub(crate) fn close(self) -> ProcResult<()> {
        let pid = self.pid;
        match Arc::try_unwrap(self.poller) {
            Ok(poller) => poller.close().map_err(|err| ProcError::os(0, pid, err)),
            Err(_) => Ok(()),
        }
    }

    /// Annotate an OS failure with this handle's identity.
    fn wrap(&self, err: io::Error) -> ProcError {
        ProcError::os(self.poller.descriptor().as_raw_fd(), self.pid, err)
    }
}

/// `pidfd_open(2)` with `PIDFD_NONBLOCK`, so exit checks never block in the
/// kernel.
fn pidfd_open(pid: Pid) -> io::Result<OwnedFd> {
    // SAFETY: plain syscall, no pointer arguments.
    let fd = unsafe { libc::syscall(libc::SYS_pidfd_open, pid as libc::pid_t, libc::PIDFD_NONBLOCK) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: the kernel returned a fresh descriptor that we now own.
    Ok(unsafe { OwnedFd::from_raw_fd(fd as RawFd) })
}

/// `pidfd_send_signal(2)` with a null siginfo, which the man page defines as
/// equivalent to `kill(2)` semantics. Flags are reserved and must be zero.
fn pidfd_send_signal(fd: BorrowedFd<'_>, signal: UnixSignal) -> io::Result<()> {
    // SAFETY: the descriptor is valid for the duration of the call and the
    // null siginfo pointer is documented behavior.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_pidfd_send_signal,
            fd.as_raw_fd(),
            signal as libc::c_int,
            ptr::null::<libc::siginfo_t>(),
            0u32,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Non-destructive exit check: `WNOWAIT` observes exit without consuming the
/// status, so reaping stays with the process's parent and the check can run
/// any number of times.
pub(crate) fn check_exited(fd: BorrowedFd<'_>) -> io::Result<bool> {
    match waitid(Id::PIDFd(fd), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
        Ok(_) => Ok(true),
        // The pidfd is nonblocking: EAGAIN means not yet exited.
        Err(Errno::EAGAIN) => Ok(false),
        Err(errno) => Err(errno.into()),
    }
}
