//! Stable exit codes for callcycle CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid layout, config, state file, or arguments.
pub const INVALID: i32 = 1;
/// `callcycle cycle` aborted at one of its stages.
pub const CYCLE_FAILED: i32 = 2;
