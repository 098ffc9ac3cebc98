/// Exit codes for CI/automation.
pub const SUCCESS: i32 = 0;
/// A step marked `on_failure: exit` failed.
pub const FATAL: i32 = 1;
pub const VALIDATION_FAILED: i32 = 2;
pub const RUNTIME_ERROR: i32 = 4;
