//! Key authorization for diffs
//!
//! Two layers decide whether a diff signer may change a document:
//!
//! - the key lists carried by the document itself: an account key may make
//!   any change, a recovery key may only rewrite the key lists
//! - an injected [`AuthorizationPolicy`], the extension point for rules
//!   such as key-rotation priority windows
//!
//! Replay applies both. The write path consults the policy only, so the
//! default [`AllowAll`] accepts any correctly signed diff and leaves key
//! checks to replay.

use aic_core::{Diff, Document, Tid, Value, ACCOUNT_KEYS, RECOVERY_KEYS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Authority a key holds over a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAuthority {
    /// Listed in `adx/account_keys`
    Account,
    /// Listed in `adx/recovery_keys` only
    Recovery,
    /// Not listed
    None,
}

fn lists(document: &Document, field: &str, key: &str) -> bool {
    document
        .get(field)
        .and_then(Value::as_array)
        .is_some_and(|keys| keys.iter().any(|k| k.as_str() == Some(key)))
}

/// Look up a key in the document's key lists
pub fn key_authority(document: &Document, key: &str) -> KeyAuthority {
    if lists(document, ACCOUNT_KEYS, key) {
        KeyAuthority::Account
    } else if lists(document, RECOVERY_KEYS, key) {
        KeyAuthority::Recovery
    } else {
        KeyAuthority::None
    }
}

/// Whether the document's own key lists allow this diff
pub fn key_lists_permit(document: &Document, diff: &Diff) -> bool {
    match key_authority(document, &diff.key) {
        KeyAuthority::Account => true,
        KeyAuthority::Recovery => diff.only_touches_key_lists(),
        KeyAuthority::None => false,
    }
}

/// Pluggable authorization rule
pub trait AuthorizationPolicy: Send + Sync + fmt::Debug {
    /// Whether `diff`, placed at `tid`, may change `document`
    fn permits(&self, document: &Document, diff: &Diff, tid: &Tid) -> bool;
}

impl<T: AuthorizationPolicy + ?Sized> AuthorizationPolicy for Arc<T> {
    fn permits(&self, document: &Document, diff: &Diff, tid: &Tid) -> bool {
        (**self).permits(document, diff, tid)
    }
}

/// Permits every diff
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthorizationPolicy for AllowAll {
    fn permits(&self, _document: &Document, _diff: &Diff, _tid: &Tid) -> bool {
        true
    }
}

/// Enforces the document key lists
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyListPolicy;

impl AuthorizationPolicy for KeyListPolicy {
    fn permits(&self, document: &Document, diff: &Diff, _tid: &Tid) -> bool {
        key_lists_permit(document, diff)
    }
}

/// Policy selection for configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// [`AllowAll`]
    #[default]
    AllowAll,
    /// [`KeyListPolicy`]
    KeyLists,
}

impl PolicyKind {
    /// Instantiate the selected policy
    pub fn build(self) -> Arc<dyn AuthorizationPolicy> {
        match self {
            Self::AllowAll => Arc::new(AllowAll),
            Self::KeyLists => Arc::new(KeyListPolicy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aic_core::Patch;
    use serde_json::json;

    fn document() -> Document {
        match json!({
            "name": "alice",
            "adx/account_keys": ["did:key:account"],
            "adx/recovery_keys": ["did:key:recovery"]
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn diff(key: &str, patches: Vec<Patch>) -> Diff {
        Diff::new(Tid::new("2"), patches, key)
    }

    #[test]
    fn test_key_authority_lookup() {
        let doc = document();
        assert_eq!(key_authority(&doc, "did:key:account"), KeyAuthority::Account);
        assert_eq!(key_authority(&doc, "did:key:recovery"), KeyAuthority::Recovery);
        assert_eq!(key_authority(&doc, "did:key:stranger"), KeyAuthority::None);
        assert_eq!(key_authority(&Document::new(), "did:key:account"), KeyAuthority::None);
    }

    #[test]
    fn test_account_key_may_change_anything() {
        let change = diff("did:key:account", vec![Patch::put(["name"], "bob")]);
        assert!(key_lists_permit(&document(), &change));
    }

    #[test]
    fn test_recovery_key_limited_to_key_lists() {
        let rotate = diff(
            "did:key:recovery",
            vec![Patch::put([ACCOUNT_KEYS], json!(["did:key:new"]))],
        );
        assert!(key_lists_permit(&document(), &rotate));

        let rename = diff("did:key:recovery", vec![Patch::put(["name"], "mallory")]);
        assert!(!key_lists_permit(&document(), &rename));
    }

    #[test]
    fn test_non_array_key_list_grants_nothing() {
        let mut doc = document();
        doc.insert(ACCOUNT_KEYS.to_string(), json!("did:key:account"));
        let change = diff("did:key:account", vec![Patch::put(["name"], "bob")]);
        assert!(!key_lists_permit(&doc, &change));
    }

    #[test]
    fn test_policy_kinds() {
        let stranger = diff("did:key:stranger", vec![Patch::put(["name"], "eve")]);
        let tid = Tid::new("3");
        assert!(PolicyKind::AllowAll.build().permits(&document(), &stranger, &tid));
        assert!(!PolicyKind::KeyLists.build().permits(&document(), &stranger, &tid));
    }
}
