//! Stable exit codes for repair CLI commands.

/// The artifact passes: already did, or a full pass was committed.
pub const OK: i32 = 0;
/// Invalid config, unreadable artifact, or any other error.
pub const INVALID: i32 = 1;
/// Rounds ran out without a full pass (a partial improvement may be committed).
pub const NOT_FIXED: i32 = 2;
/// A round produced no usable candidate.
pub const ABORTED: i32 = 3;
/// The search was cancelled before finishing.
pub const CANCELLED: i32 = 4;
