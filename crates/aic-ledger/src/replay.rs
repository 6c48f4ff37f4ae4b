//! Document materialization from a diff chain
//!
//! The genesis document plus an `id` field is the starting state. Later
//! diffs are visited in tid order and applied only when they are signed,
//! authorized against the document as it stood before them, and extend the
//! last applied entry. Everything else stays in the chain but is skipped.

use crate::authorization::{key_lists_permit, AllowAll, AuthorizationPolicy};
use crate::patch::apply_patches;
use aic_core::{
    AicError, Asymmetric, Diffs, Document, Pid, Result, SignatureEnvelope, Tid, Value,
};
use std::sync::Arc;

/// Field holding the document's own did
pub const ID_FIELD: &str = "id";

/// Why replay passed over a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Diff signature missing, malformed or invalid
    BadSignature,
    /// Signer not allowed to make this change
    Unauthorized,
    /// `prev` does not name the last applied entry
    Fork {
        /// Entry the diff claims to extend
        prev: Tid,
        /// Entry it would have had to extend
        expected: Tid,
    },
}

/// Diff left out of the materialized document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDiff {
    /// Chain position
    pub tid: Tid,
    /// Reason
    pub reason: SkipReason,
}

/// Materialized document with the audit trail that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    /// Resulting document
    pub document: Document,
    /// Last applied entry, the genesis tid when no diff applied
    pub head: Tid,
    /// Applied diffs in order
    pub applied: Vec<Tid>,
    /// Diffs passed over, in chain order
    pub skipped: Vec<SkippedDiff>,
}

/// Builds documents from diff chains
#[derive(Debug, Clone)]
pub struct DocumentReplayer {
    envelope: SignatureEnvelope,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl Default for DocumentReplayer {
    fn default() -> Self {
        Self::new(SignatureEnvelope::default())
    }
}

impl DocumentReplayer {
    /// Replayer that checks diff signatures under `envelope`
    pub fn new(envelope: SignatureEnvelope) -> Self {
        Self {
            envelope,
            policy: Arc::new(AllowAll),
        }
    }

    /// Add a policy consulted after the key-list check
    pub fn with_policy(mut self, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Document as of `as_of` (inclusive), or the latest when `None`
    pub fn materialize(
        &self,
        diffs: &Diffs,
        keypair: &dyn Asymmetric,
        as_of: Option<&Tid>,
    ) -> Result<Document> {
        Ok(self.replay(diffs, keypair, as_of)?.document)
    }

    /// [`materialize`](Self::materialize) with the applied/skipped trail
    pub fn replay(
        &self,
        diffs: &Diffs,
        keypair: &dyn Asymmetric,
        as_of: Option<&Tid>,
    ) -> Result<ReplayReport> {
        let (genesis_tid, genesis) = diffs.genesis_entry().ok_or(AicError::EmptyChain)?;
        let did = Pid::of_document_in(genesis, self.envelope.form())?.did();

        let mut document = genesis.clone();
        document.insert(ID_FIELD.to_string(), Value::String(did));
        let mut head = genesis_tid.clone();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (tid, diff) in diffs.diffs() {
            if as_of.is_some_and(|limit| tid > limit) {
                break;
            }

            let reason = if !self.envelope.check(diff, keypair) {
                Some(SkipReason::BadSignature)
            } else if !key_lists_permit(&document, diff)
                || !self.policy.permits(&document, diff, tid)
            {
                Some(SkipReason::Unauthorized)
            } else if diff.prev != head {
                Some(SkipReason::Fork {
                    prev: diff.prev.clone(),
                    expected: head.clone(),
                })
            } else {
                None
            };

            if let Some(reason) = reason {
                tracing::warn!(%tid, key = %diff.key, ?reason, "ignoring diff");
                skipped.push(SkippedDiff {
                    tid: tid.clone(),
                    reason,
                });
                continue;
            }

            apply_patches(&mut document, &diff.patches);
            head = tid.clone();
            applied.push(tid.clone());
        }

        Ok(ReplayReport {
            document,
            head,
            applied,
            skipped,
        })
    }
}
