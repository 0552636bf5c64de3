//! CLI Exit Code Registry
//!
//! Single source of truth for `mapas` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad args, bad `--today`)            |
//! | 3    | No recognized source file in the folder          |
//! | 4    | Invalid config (TOML or column tables)           |
//! | 5    | I/O error (unreadable folder/config, unwritable output) |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// The folder holds none of the six expected exports.
pub const EXIT_NO_SOURCES: u8 = 3;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 4;

/// Filesystem failure outside the pass itself.
pub const EXIT_IO: u8 = 5;
