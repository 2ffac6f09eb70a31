/*!
 * Deadline Override
 * Shared read-deadline state with an eventfd wakeup, so a deadline written
 * by one thread interrupts a poll(2) sleeping in another
 */

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::time::{Duration, Instant};

use nix::sys::eventfd::{EfdFlags, EventFd};
use parking_lot::Mutex;

/// Time left until the current read deadline
pub(crate) enum Remaining {
    /// No deadline armed
    Unbounded,
    /// Deadline in the future
    Within(Duration),
    /// Deadline already elapsed
    Elapsed,
}

/// Read-deadline slot plus its wakeup channel.
///
/// Single writer per wait call; the poll loop is the only reader of the
/// wakeup eventfd.
pub(crate) struct DeadlineState {
    at: Mutex<Option<Instant>>,
    wake: EventFd,
}

impl DeadlineState {
    pub(crate) fn new() -> io::Result<Self> {
        let wake = EventFd::from_flags(EfdFlags::EFD_NONBLOCK | EfdFlags::EFD_CLOEXEC)?;
        Ok(Self {
            at: Mutex::new(None),
            wake,
        })
    }

    /// Replace the deadline and wake any blocked poll.
    ///
    /// The deadline is published before the wakeup is armed, so a woken
    /// poll always observes the new value.
    pub(crate) fn set(&self, deadline: Option<Instant>) -> io::Result<()> {
        *self.at.lock() = deadline;
        self.wake.arm()?;
        Ok(())
    }

    pub(crate) fn remaining(&self) -> Remaining {
        match *self.at.lock() {
            None => Remaining::Unbounded,
            Some(at) => {
                let now = Instant::now();
                if at <= now {
                    Remaining::Elapsed
                } else {
                    Remaining::Within(at - now)
                }
            }
        }
    }

    /// Descriptor to include in the poll set for wakeups.
    pub(crate) fn wake_fd(&self) -> BorrowedFd<'_> {
        self.wake.as_fd()
    }

    /// Consume a pending wakeup after poll observes it.
    pub(crate) fn drain(&self) {
        let mut buf = [0u8; 8];
        // SAFETY: reading the 8-byte eventfd counter into a local buffer on
        // our own nonblocking descriptor; EAGAIN just means no wakeup is
        // pending.
        let _ = unsafe {
            libc::read(
                self.wake.as_fd().as_raw_fd(),
                buf.as_mut_ptr().cast(),
                buf.len(),
            )
        };
    }
}
