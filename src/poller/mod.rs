/*!
 * Readiness Poller
 * Blocking predicate-driven wait over a nonblocking descriptor, with an
 * externally adjustable read deadline used to force early unblock
 */

mod deadline;

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd};
use std::time::Instant;

use log::trace;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use deadline::{DeadlineState, Remaining};

/// Outcome of a poller call that did not complete normally
#[derive(Debug)]
pub(crate) enum PollError {
    /// The read deadline elapsed before the predicate signaled completion
    DeadlineExceeded,
    /// poll(2) itself failed
    Os(io::Error),
}

/// Blocking readiness poller over one descriptor.
///
/// The poller itself has no cancellation hook; the only way to unblock a
/// sleeping [`wait_read`](Self::wait_read) from outside is to arm an
/// already-expired deadline through
/// [`set_read_deadline`](Self::set_read_deadline).
pub(crate) struct Poller {
    fd: OwnedFd,
    deadline: DeadlineState,
}

impl Poller {
    pub(crate) fn new(fd: OwnedFd) -> io::Result<Self> {
        Ok(Self {
            fd,
            deadline: DeadlineState::new()?,
        })
    }

    /// The observed descriptor.
    pub(crate) fn descriptor(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    /// Set or clear the read deadline.
    ///
    /// Arming a deadline at or before the current instant unblocks a
    /// concurrent `wait_read` promptly. The deadline is shared descriptor
    /// state: one writer per wait call, and it must be cleared before the
    /// next wait begins.
    pub(crate) fn set_read_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        self.deadline.set(deadline)
    }

    /// Block until `ready` returns true, the read deadline elapses, or
    /// poll(2) fails.
    ///
    /// `ready` runs once up front and then after every readiness event on
    /// the descriptor, so an already-satisfied predicate never blocks.
    pub(crate) fn wait_read<F>(&self, mut ready: F) -> Result<(), PollError>
    where
        F: FnMut(BorrowedFd<'_>) -> bool,
    {
        if ready(self.fd.as_fd()) {
            return Ok(());
        }

        loop {
            let timeout = match self.deadline.remaining() {
                Remaining::Elapsed => {
                    trace!("read deadline elapsed on fd {}", self.fd.as_raw_fd());
                    return Err(PollError::DeadlineExceeded);
                }
                Remaining::Unbounded => PollTimeout::NONE,
                Remaining::Within(left) => {
                    // Round up so a sub-millisecond remainder sleeps instead
                    // of spinning; the top-of-loop check decides expiry.
                    let millis = left.as_millis().saturating_add(1).min(i32::MAX as u128) as i32;
                    PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
                }
            };

            let mut fds = [
                PollFd::new(self.fd.as_fd(), PollFlags::POLLIN),
                PollFd::new(self.deadline.wake_fd(), PollFlags::POLLIN),
            ];

            match poll(&mut fds, timeout) {
                // Timed out; the deadline check at the top of the loop decides.
                Ok(0) => continue,
                Ok(_) => {
                    if fds[1].any().unwrap_or(false) {
                        self.deadline.drain();
                    }
                    if fds[0].any().unwrap_or(false) && ready(self.fd.as_fd()) {
                        return Ok(());
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(PollError::Os(errno.into())),
            }
        }
    }

    /// Release the descriptor, surfacing the close result.
    pub(crate) fn close(self) -> io::Result<()> {
        let raw = self.fd.into_raw_fd();
        // SAFETY: ownership of raw was just released; it closes exactly once.
        if unsafe { libc::close(raw) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::thread;
    use std::time::Duration;

    // A bound, unconnected UDP socket: never readable until sent to.
    fn idle_poller() -> (Poller, UdpSocket) {
        let sock = UdpSocket::bind("127.0.0.1:0").expect("bind socket");
        let addr = sock.local_addr().expect("local addr");
        let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
        peer.connect(addr).expect("connect peer");
        let poller = Poller::new(OwnedFd::from(sock)).expect("create poller");
        (poller, peer)
    }

    #[test]
    fn predicate_runs_before_blocking() {
        let (poller, _peer) = idle_poller();
        let mut calls = 0;
        poller
            .wait_read(|_| {
                calls += 1;
                true
            })
            .expect("satisfied predicate never blocks");
        assert_eq!(calls, 1);
    }

    #[test]
    fn past_deadline_fails_without_blocking() {
        let (poller, _peer) = idle_poller();
        poller
            .set_read_deadline(Some(Instant::now()))
            .expect("arm deadline");

        let result = poller.wait_read(|_| false);
        assert!(matches!(result, Err(PollError::DeadlineExceeded)));
    }

    #[test]
    fn deadline_from_another_thread_unblocks_poll() {
        let (poller, _peer) = idle_poller();

        let start = Instant::now();
        thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(50));
                poller
                    .set_read_deadline(Some(Instant::now()))
                    .expect("arm deadline");
            });

            let result = poller.wait_read(|_| false);
            assert!(matches!(result, Err(PollError::DeadlineExceeded)));
        });
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn cleared_deadline_restores_blocking_reads() {
        let (poller, peer) = idle_poller();

        // Force a timeout, then clear it; the next wait must block again
        // rather than failing on stale deadline state.
        poller
            .set_read_deadline(Some(Instant::now()))
            .expect("arm deadline");
        assert!(matches!(
            poller.wait_read(|_| false),
            Err(PollError::DeadlineExceeded)
        ));
        poller.set_read_deadline(None).expect("clear deadline");

        thread::scope(|s| {
            s.spawn(move || {
                thread::sleep(Duration::from_millis(50));
                peer.send(b"x").expect("send datagram");
            });

            let mut saw_readiness = false;
            poller
                .wait_read(|_| {
                    let ready = saw_readiness;
                    saw_readiness = true;
                    ready
                })
                .expect("readable descriptor completes the wait");
            assert!(saw_readiness);
        });
    }
}
