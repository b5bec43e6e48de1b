//! CLI exit code registry.
//!
//! Exit codes are part of the shell contract — CI scripts rely on them.
//! Code 2 is reserved for clap usage errors.

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Runtime error - unreadable input file, engine failure.
pub const EXIT_RUNTIME: u8 = 1;

/// Config failed to parse or validate (includes unknown document types).
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Ground-truth and document-index filename sets differ; nothing was scored.
pub const EXIT_FILE_SET_MISMATCH: u8 = 4;

/// Scoring completed but FAIL verdicts are present.
pub const EXIT_FAILED_FIELDS: u8 = 5;
