//! CLI Exit Code Registry
//!
//! Single source of truth for `rplan` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success                                                        |
//! | 1    | Runtime failure: input not found, I/O error, update cancelled  |
//! | 2    | Usage or configuration error                                   |

/// Command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Runtime failure: missing input file, unreadable workbook, failed write.
pub const EXIT_ERROR: u8 = 1;

/// The update was declined at the confirmation prompt. Nothing was written
/// except the backup.
pub const EXIT_CANCELLED: u8 = 1;

/// Bad arguments, invalid config file or threshold overrides.
pub const EXIT_USAGE: u8 = 2;
