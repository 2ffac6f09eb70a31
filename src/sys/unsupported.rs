/*!
 * Unsupported Platform Stub
 * Every entry point fails with `ProcError::Unsupported` and touches no state
 */

use crate::context::WaitContext;
use crate::core::errors::{ProcError, ProcResult};
use crate::core::types::{Pid, Signal};

// Sentinel classification codes; never produced on this platform.
pub(crate) const NO_SUCH_PROCESS: i32 = -1;
pub(crate) const NOT_PERMITTED: i32 = -2;
pub(crate) const ACCESS_DENIED: i32 = -3;

pub(crate) struct PidFd;

impl PidFd {
    pub(crate) fn open(_pid: Pid) -> ProcResult<Self> {
        Err(ProcError::Unsupported)
    }

    pub(crate) fn send_signal(&self, _signal: Signal) -> ProcResult<()> {
        Err(ProcError::Unsupported)
    }

    pub(crate) async fn wait(&self, _ctx: &WaitContext) -> ProcResult<()> {
        Err(ProcError::Unsupported)
    }

    pub(crate) fn close(self) -> ProcResult<()> {
        Err(ProcError::Unsupported)
    }
}
