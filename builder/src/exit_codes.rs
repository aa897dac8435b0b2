//! Stable exit codes for builder CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Malformed record, duplicate name, name collision, invalid config, or an infrastructure error.
pub const INVALID: i32 = 1;
/// At least one assertion failed; nothing was written.
pub const FAILED: i32 = 2;
