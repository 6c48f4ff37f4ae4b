//! Path-based patching of documents
//!
//! Patches walk map keys only. A patch that cannot be applied is dropped on
//! its own and the remaining patches of the diff still run.

use aic_core::{Document, Patch, PatchOp, PathSegment, Value};

/// Why a patch was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchSkip {
    /// Path has no segments
    EmptyPath,
    /// Path contains an array index
    NumericSegment,
    /// An intermediate node is an array
    ArrayIntermediate,
    /// An intermediate node is a scalar or null.
    ///
    /// Earlier clients wrote such puts into a detached map, so the
    /// document never changed; dropping the patch keeps their chains
    /// materializing to the same document.
    ScalarIntermediate,
    /// `del` through a key that does not exist
    MissingIntermediate,
    /// `put` without a value
    MissingValue,
}

/// Result of applying one patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Document updated (or `del` of an absent key)
    Applied,
    /// Patch dropped, document untouched
    Skipped(PatchSkip),
}

/// Apply one patch in place
pub fn apply_patch(document: &mut Document, patch: &Patch) -> PatchOutcome {
    let Some(keys) = patch
        .path
        .iter()
        .map(PathSegment::as_key)
        .collect::<Option<Vec<_>>>()
    else {
        return PatchOutcome::Skipped(PatchSkip::NumericSegment);
    };
    let Some((last, parents)) = keys.split_last() else {
        return PatchOutcome::Skipped(PatchSkip::EmptyPath);
    };

    let mut node = document;
    for key in parents {
        let next = match patch.op {
            PatchOp::Put => node
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Document::new())),
            PatchOp::Del => match node.get_mut(*key) {
                Some(value) => value,
                None => return PatchOutcome::Skipped(PatchSkip::MissingIntermediate),
            },
        };
        node = match next {
            Value::Object(map) => map,
            Value::Array(_) => return PatchOutcome::Skipped(PatchSkip::ArrayIntermediate),
            _ => return PatchOutcome::Skipped(PatchSkip::ScalarIntermediate),
        };
    }

    match patch.op {
        PatchOp::Put => match &patch.value {
            Some(value) => {
                node.insert(last.to_string(), value.clone());
            }
            None => return PatchOutcome::Skipped(PatchSkip::MissingValue),
        },
        PatchOp::Del => {
            node.shift_remove(*last);
        }
    }
    PatchOutcome::Applied
}

/// Apply patches in order, logging the ones that are dropped
pub fn apply_patches(document: &mut Document, patches: &[Patch]) -> Vec<PatchOutcome> {
    patches
        .iter()
        .map(|patch| {
            let outcome = apply_patch(document, patch);
            match outcome {
                PatchOutcome::Applied => {}
                PatchOutcome::Skipped(
                    reason @ (PatchSkip::NumericSegment | PatchSkip::ArrayIntermediate),
                ) => {
                    tracing::warn!(?reason, path = ?patch.path, "array traversal is not supported");
                }
                PatchOutcome::Skipped(reason) => {
                    tracing::warn!(?reason, path = ?patch.path, "dropping patch");
                }
            }
            outcome
        })
        .collect()
}
