//! Patch Application Properties
//!
//! Random patch lists against a document holding every kind of node. A
//! dropped patch must leave the document exactly as it was, and an applied
//! one must be visible at its path.

use aic_core::{Document, Patch, PatchOp, PathSegment, Value};
use aic_ledger::{apply_patch, apply_patches, PatchOutcome, PatchSkip};
use proptest::prelude::*;
use serde_json::json;

fn base() -> Document {
    match json!({
        "s": 1,
        "t": "text",
        "n": null,
        "l": [1, {"a": 2}],
        "m": {"a": 1, "b": {"c": true}},
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn lookup<'a>(document: &'a Document, keys: &[&str]) -> Option<&'a Value> {
    let (last, parents) = keys.split_last()?;
    let mut node = document;
    for key in parents {
        node = node.get(*key)?.as_object()?;
    }
    node.get(*last)
}

fn segment() -> impl Strategy<Value = PathSegment> {
    prop_oneof![
        8 => prop::sample::select(vec!["s", "t", "n", "l", "m", "a", "b", "c", "new"])
            .prop_map(PathSegment::from),
        1 => (0u64..3).prop_map(PathSegment::Index),
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        Just(json!([1, 2])),
        Just(json!({"a": "nested"})),
    ]
}

fn patch() -> impl Strategy<Value = Patch> {
    (any::<bool>(), prop::collection::vec(segment(), 0..4), leaf()).prop_map(
        |(put, path, value)| Patch {
            op: if put { PatchOp::Put } else { PatchOp::Del },
            path,
            value: put.then_some(value),
        },
    )
}

proptest! {
    #[test]
    fn prop_dropped_patches_leave_document_untouched(
        patches in prop::collection::vec(patch(), 0..16)
    ) {
        let mut document = base();
        for patch in &patches {
            let before = document.clone();
            if let PatchOutcome::Skipped(_) = apply_patch(&mut document, patch) {
                prop_assert_eq!(&document, &before);
            }
        }
    }

    #[test]
    fn prop_applied_patches_are_visible(
        patches in prop::collection::vec(patch(), 0..16)
    ) {
        let mut document = base();
        for patch in &patches {
            if apply_patch(&mut document, patch) != PatchOutcome::Applied {
                continue;
            }
            let keys: Vec<&str> = patch.path.iter().filter_map(PathSegment::as_key).collect();
            match patch.op {
                PatchOp::Put => prop_assert_eq!(lookup(&document, &keys), patch.value.as_ref()),
                PatchOp::Del => prop_assert_eq!(lookup(&document, &keys), None),
            }
        }
    }

    #[test]
    fn prop_batch_reports_one_outcome_per_patch(
        patches in prop::collection::vec(patch(), 0..16)
    ) {
        let mut document = base();
        let outcomes = apply_patches(&mut document, &patches);
        prop_assert_eq!(outcomes.len(), patches.len());
    }

    #[test]
    fn prop_paths_through_scalars_and_arrays_are_dropped(
        head in prop::sample::select(vec!["s", "t", "n", "l"]),
        rest in prop::collection::vec("[a-z]{1,4}", 1..3),
        value in leaf(),
        put in any::<bool>(),
    ) {
        let mut path = vec![head.to_string()];
        path.extend(rest);
        let patch = if put { Patch::put(path, value) } else { Patch::del(path) };

        let mut document = base();
        let outcome = apply_patch(&mut document, &patch);
        let expected = if head == "l" {
            PatchSkip::ArrayIntermediate
        } else {
            PatchSkip::ScalarIntermediate
        };
        prop_assert_eq!(outcome, PatchOutcome::Skipped(expected));
        prop_assert_eq!(document, base());
    }
}
