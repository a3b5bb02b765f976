//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - every release resolved (and deployed)
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - invalid manifest, override, env or ignore document
pub const VALIDATION_ERROR: i32 = 2;

/// Resolution error - unresolved placeholders or failing config providers
pub const RESOLUTION_ERROR: i32 = 3;

/// Deploy error - at least one release failed to build or deploy
pub const DEPLOY_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
