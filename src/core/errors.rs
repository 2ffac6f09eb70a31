/*!
 * Error Types
 * Typed process-handle errors with category classification
 */

use crate::core::types::Pid;
use crate::sys;
use std::io;
use thiserror::Error;

/// Process handle operation result
pub type ProcResult<T> = Result<T, ProcError>;

/// Errors produced by process handle operations
#[derive(Error, Debug)]
pub enum ProcError {
    /// A pidfd-family operation failed.
    ///
    /// Carries the handle identity for diagnostics; `fd` is best effort and
    /// zero when no descriptor exists yet. The underlying OS cause is
    /// reachable through the source chain.
    #[error("pidfd {fd}: pid {pid}: {source}")]
    Os {
        fd: i32,
        pid: Pid,
        #[source]
        source: io::Error,
    },

    #[error("invalid signal value: {0}")]
    InvalidSignal(i32),

    #[error("wait canceled")]
    Canceled,

    #[error("wait deadline exceeded")]
    DeadlineExceeded,

    #[error("wait task failed: {0}")]
    WaitTaskFailed(String),

    #[error("pidfd is not supported on this platform")]
    Unsupported,
}

/// Error category for generic handling
///
/// Callers match on the category instead of raw OS codes; unwrap the source
/// chain for anything `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The target process does not exist (or has already been reaped)
    NotFound,
    /// The caller lacks permission over the target process
    PermissionDenied,
    /// An argument was outside its valid domain
    InvalidArgument,
    /// The wait context fired before the process exited
    Canceled,
    /// pidfds are unavailable on this platform
    Unsupported,
    /// Anything else; inspect the source chain
    Other,
}

impl ProcError {
    /// Annotate a raw OS failure with handle identity.
    pub(crate) fn os(fd: i32, pid: Pid, source: io::Error) -> Self {
        Self::Os { fd, pid, source }
    }

    /// Classify this error against the well-known categories.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Os { source, .. } => classify(source),
            Self::InvalidSignal(_) => ErrorKind::InvalidArgument,
            Self::Canceled | Self::DeadlineExceeded => ErrorKind::Canceled,
            Self::WaitTaskFailed(_) => ErrorKind::Other,
            Self::Unsupported => ErrorKind::Unsupported,
        }
    }

    /// True when the target process does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True when the caller lacks permission over the target process.
    pub fn is_permission_denied(&self) -> bool {
        self.kind() == ErrorKind::PermissionDenied
    }
}

/// Map a raw OS cause to an error category.
fn classify(err: &io::Error) -> ErrorKind {
    match err.raw_os_error() {
        Some(code) if code == sys::NO_SUCH_PROCESS => ErrorKind::NotFound,
        Some(code) if code == sys::NOT_PERMITTED || code == sys::ACCESS_DENIED => {
            ErrorKind::PermissionDenied
        }
        _ => ErrorKind::Other,
    }
}

#[cfg(test)]
#[cfg(target_os = "linux")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn os_error(code: i32) -> ProcError {
        ProcError::os(7, 42, io::Error::from_raw_os_error(code))
    }

    #[test]
    fn classifies_no_such_process() {
        let err = os_error(sys::NO_SUCH_PROCESS);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn classifies_permission_codes() {
        assert_eq!(os_error(sys::NOT_PERMITTED).kind(), ErrorKind::PermissionDenied);
        assert_eq!(os_error(sys::ACCESS_DENIED).kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn unknown_codes_stay_unclassified() {
        assert_eq!(os_error(libc::EIO).kind(), ErrorKind::Other);
    }

    #[test]
    fn cancellation_causes_share_one_category() {
        assert_eq!(ProcError::Canceled.kind(), ErrorKind::Canceled);
        assert_eq!(ProcError::DeadlineExceeded.kind(), ErrorKind::Canceled);
    }

    #[test]
    fn invalid_signal_is_invalid_argument() {
        assert_eq!(ProcError::InvalidSignal(999).kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn os_error_display_carries_identity() {
        let err = os_error(sys::NO_SUCH_PROCESS);
        assert_eq!(
            err.to_string(),
            format!(
                "pidfd 7: pid 42: {}",
                io::Error::from_raw_os_error(sys::NO_SUCH_PROCESS)
            )
        );
    }

    #[test]
    fn source_chain_reaches_os_cause() {
        use std::error::Error;

        let err = os_error(sys::NOT_PERMITTED);
        let source = err.source().expect("os error has a source");
        let cause = source
            .downcast_ref::<io::Error>()
            .expect("source is an io::Error");
        assert_eq!(cause.raw_os_error(), Some(sys::NOT_PERMITTED));
    }
}
