//! AIC Ledger - tick state machine and document replay
//!
//! - `engine`: decides the next signed tick for a request
//! - `replay`: builds the current document from a diff chain
//! - `patch`: path-based `put`/`del` edits
//! - `authorization`: key-list checks and the pluggable policy hook
//!
//! Storage and time are supplied by the caller; nothing here performs I/O.

#![forbid(unsafe_code)]

/// Key authorization rules
pub mod authorization;

/// Tick state machine
pub mod engine;

/// Document patching
pub mod patch;

/// Diff chain replay
pub mod replay;

pub use authorization::{
    key_authority, key_lists_permit, AllowAll, AuthorizationPolicy, KeyAuthority, KeyListPolicy,
    PolicyKind,
};
pub use engine::LedgerEngine;
pub use patch::{apply_patch, apply_patches, PatchOutcome, PatchSkip};
pub use replay::{DocumentReplayer, ReplayReport, SkipReason, SkippedDiff, ID_FIELD};
