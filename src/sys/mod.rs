/*!
 * Platform Capability Layer
 * Selects the functional pidfd backend on Linux and a stub elsewhere;
 * callers never special-case the platform
 */

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub(crate) use linux::*;

#[cfg(not(target_os = "linux"))]
mod unsupported;
#[cfg(not(target_os = "linux"))]
pub(crate) use unsupported::*;
