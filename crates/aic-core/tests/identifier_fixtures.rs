//! Identifier Fixture Tests
//!
//! Known PIDs for documents that existing clients have already registered.
//! These pin the canonical byte form: changing key order or number
//! formatting changes every identifier below.

use aic_core::{bit_strength, Document, Pid, Value};
use proptest::prelude::*;
use serde_json::json;

fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not a document: {other}"),
    }
}

#[test]
fn test_empty_document_pid() {
    let pid = Pid::of_document(&Document::new()).unwrap();
    assert_eq!(pid.as_str(), "zckdqzcupqhnso6e");
}

#[test]
fn test_empty_string_pid() {
    assert_eq!(Pid::from_text("").as_str(), "zwisgckoszki3dar");
    assert_eq!(Pid::from_bytes(b""), Pid::from_text(""));
}

#[test]
fn test_hello_world_pid() {
    let pid = Pid::of_value(&json!({"hello": "world"})).unwrap();
    assert_eq!(pid.as_str(), "zmil5mwhd4nmypmz");
}

#[test]
fn test_genesis_with_account_key_pid() {
    let genesis = document(json!({
        "a": 1,
        "b": 2,
        "c": 3,
        "adx/account_keys": ["did:key:zDnaeYgdnK7nVH2xNQENrBRJbdCQ1KKjxt5sbykiUGLAh46Ez"]
    }));
    let pid = Pid::of_document(&genesis).unwrap();
    assert_eq!(pid.as_str(), "zkug3v3btzimdf4d");
    assert_eq!(pid.did(), "did:aic:zkug3v3btzimdf4d");
}

#[test]
fn test_key_order_changes_pid() {
    let reordered = document(json!({
        "b": 2,
        "a": 1,
        "c": 3,
        "adx/account_keys": ["did:key:zDnaeYgdnK7nVH2xNQENrBRJbdCQ1KKjxt5sbykiUGLAh46Ez"]
    }));
    assert_eq!(
        Pid::of_document(&reordered).unwrap().as_str(),
        "zqcksviiy7v4keg2"
    );
}

#[test]
fn test_genesis_with_recovery_key_pid() {
    let genesis = document(json!({
        "adx/account_keys": ["did:key:zDnaeycJUNQugcrag1WmLePtK9agLYLyXvscnQM4FHm1ASiRV"],
        "adx/recovery_keys": ["did:key:zDnaeYHbbWiaCwAXvHXRyVqENDv8Sr3fwHW8P5eakkz4MqsTa"]
    }));
    assert_eq!(
        Pid::of_document(&genesis).unwrap().as_str(),
        "zrr5lxhs4rjlowv5"
    );
}

#[test]
fn test_pid_serde_validates() {
    let pid: Pid = serde_json::from_value(json!("zckdqzcupqhnso6e")).unwrap();
    assert_eq!(serde_json::to_value(&pid).unwrap(), json!("zckdqzcupqhnso6e"));
    assert!(serde_json::from_value::<Pid>(json!("did:aic:zckdqzcupqhnso6e")).is_err());
}

proptest! {
    #[test]
    fn prop_pid_is_deterministic(text in ".*") {
        prop_assert_eq!(Pid::from_text(&text), Pid::from_text(&text));
        prop_assert_eq!(Pid::from_text(&text).as_str().len(), 16);
    }

    #[test]
    fn prop_strength_reads_only_the_head(tail in "[2-7a-z]{0,15}") {
        let z = format!("z{tail}");
        let y = format!("y{tail}");
        prop_assert_eq!(bit_strength(&z).unwrap(), 75);
        prop_assert_eq!(bit_strength(&y).unwrap(), 80);
    }

    #[test]
    fn prop_strength_is_non_increasing_in_head_index(a in 0usize..32, b in 0usize..32) {
        let alphabet = aic_core::s32::ALPHABET;
        let sa = bit_strength(&(alphabet[a] as char).to_string()).unwrap();
        let sb = bit_strength(&(alphabet[b] as char).to_string()).unwrap();
        if a <= b {
            prop_assert!(sa >= sb);
        }
    }
}
