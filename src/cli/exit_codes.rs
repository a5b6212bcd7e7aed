//! exit codes for motion-wol commands
//!
//! these follow Unix conventions where 0 = success and non-zero = error
//! specific codes help scripts distinguish between failure types

/// command completed successfully
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// control command sent while no daemon is running
pub const DAEMON_NOT_RUNNING: i32 = 2;

/// rules file does not parse
pub const RULES_ERROR: i32 = 3;

/// invalid command-line arguments
pub const INVALID_ARGS: i32 = 4;

/// configuration file error
pub const CONFIG_ERROR: i32 = 5;
