/*!
 * Core Types
 * Common types used across the crate
 */

/// Process ID type (kernel `pid_t`)
pub type Pid = i32;

/// Raw signal number type
pub type Signal = i32;
