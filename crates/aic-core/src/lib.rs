//! AIC Core - identifiers, chain types and signature envelopes
//!
//! This crate holds everything the consortium ledger needs that is not the
//! ledger state machine itself:
//!
//! - `s32`: the sort-order-preserving base-32 alphabet shared by PIDs and TIDs
//! - `pid`: content-addressed identifiers with a security margin in the head
//!   character
//! - `tid`: monotonic, lexicographically sortable time identifiers
//! - `types`: documents, patches, diffs, diff chains and ticks
//! - `crypto`: the `Asymmetric` capability and its Ed25519 `did:key` handler
//! - `envelope`: canonical bytes, signing and signature verification
//! - `vanity`: brute-force search for low PIDs
//!
//! Everything here is synchronous and pure apart from the clock and the
//! random sources, which are injected.

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Pure synchronous hash trait for content addressing
pub mod hash;

/// Sort-order-preserving base-32 alphabet
pub mod s32;

/// Content-addressed identifiers
pub mod pid;

/// Monotonic time identifiers
pub mod tid;

/// Documents, patches, diffs and ticks
pub mod types;

/// Asymmetric key capability and did:key handling
pub mod crypto;

/// Canonicalization, signing and verification
pub mod envelope;

/// Vanity identifier search
pub mod vanity;

pub use crypto::{Asymmetric, DidKey, Ed25519Keypair, KeyType, P256Keypair};
pub use envelope::{CanonicalForm, Signable, SignatureEnvelope};
pub use errors::{AicError, Result};
pub use pid::{bit_strength, Pid, AIC_DID_PREFIX};
pub use tid::{ClockId, SystemWallClock, Tid, TidClock, WallClock};
pub use types::{
    Candidate, ChainEntry, Diff, Diffs, Document, NotFoundAttestation, Patch, PatchOp,
    PathSegment, Tick, TickResponse, TidAttestation, Value, ACCOUNT_KEYS, RECOVERY_KEYS,
};
