/*!
 * procfd Library
 * Cancellable wait and signal delivery for OS processes over Linux pidfds
 */

pub mod context;
pub mod core;
pub mod handle;

mod sys;

#[cfg(target_os = "linux")]
mod poller;
#[cfg(target_os = "linux")]
mod wait;

// Re-exports
pub use crate::context::WaitContext;
pub use crate::core::errors::{ErrorKind, ProcError, ProcResult};
pub use crate::core::types::{Pid, Signal};
pub use crate::handle::Handle;
