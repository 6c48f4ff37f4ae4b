//! Canonicalization, signing and verification
//!
//! Signatures cover the JSON serialization of an object with its `sig`
//! field set to the empty string. The byte form is selected by
//! [`CanonicalForm`]: `Insertion` keeps document keys in the order they were
//! written, which matches what existing clients sign; `SortedKeys` sorts
//! every object's keys recursively so independent producers agree on the
//! bytes.
//!
//! Signatures are multibase strings: `z` followed by base58btc.

use crate::crypto::Asymmetric;
use crate::errors::{AicError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};

/// Multibase prefix for base58btc
const MULTIBASE_BASE58BTC: char = 'z';

/// Byte form of canonicalized JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalForm {
    /// Compact JSON, object keys in insertion order
    #[default]
    Insertion,
    /// Compact JSON, object keys sorted recursively
    SortedKeys,
}

/// Objects that carry a signer `key` and a `sig`
pub trait Signable: Serialize {
    /// did:key claimed as signer, empty when absent
    fn signer(&self) -> &str;

    /// Multibase signature, empty when absent
    fn signature(&self) -> &str;

    /// Replace the signature
    fn set_signature(&mut self, sig: String);
}

/// Serialize a JSON value in the given canonical form
pub fn canonical_bytes(value: &Value, form: CanonicalForm) -> Result<Vec<u8>> {
    match form {
        CanonicalForm::Insertion => Ok(serde_json::to_vec(value)?),
        CanonicalForm::SortedKeys => Ok(serde_json::to_vec(&sorted(value))?),
    }
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Signs and verifies [`Signable`] objects under one canonical form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureEnvelope {
    form: CanonicalForm,
}

impl SignatureEnvelope {
    /// Envelope using the given canonical form
    pub fn new(form: CanonicalForm) -> Self {
        Self { form }
    }

    /// Canonical form in use
    pub fn form(&self) -> CanonicalForm {
        self.form
    }

    /// Signing bytes: the object with `sig` emptied.
    ///
    /// An existing `sig` keeps its position; a missing one is appended.
    pub fn canonicalize<T: Signable + ?Sized>(&self, item: &T) -> Result<Vec<u8>> {
        let mut value = serde_json::to_value(item)?;
        match &mut value {
            Value::Object(map) => {
                map.insert("sig".to_string(), Value::String(String::new()));
            }
            _ => return Err(AicError::serialization("only objects can be signed")),
        }
        canonical_bytes(&value, self.form)
    }

    /// Sign in place.
    ///
    /// The object's `key` must be the signer's did, otherwise `KeyMismatch`.
    pub fn sign<T: Signable + ?Sized>(&self, item: &mut T, keypair: &dyn Asymmetric) -> Result<()> {
        let did = keypair.did();
        if item.signer() != did {
            return Err(AicError::KeyMismatch {
                document_key: item.signer().to_string(),
                signer: did,
            });
        }
        let bytes = self.canonicalize(item)?;
        let sig = keypair.sign(&bytes)?;
        item.set_signature(format!(
            "{MULTIBASE_BASE58BTC}{}",
            bs58::encode(sig).into_string()
        ));
        Ok(())
    }

    /// Sign and return the object
    pub fn signed<T: Signable>(&self, mut item: T, keypair: &dyn Asymmetric) -> Result<T> {
        self.sign(&mut item, keypair)?;
        Ok(item)
    }

    /// Verify an object's signature against its own `key`.
    ///
    /// A missing key or signature is `Ok(false)`. A signature that is not
    /// `z`-prefixed base58btc is `MalformedSignature`.
    pub fn verify<T: Signable + ?Sized>(&self, item: &T, keypair: &dyn Asymmetric) -> Result<bool> {
        let (key, sig) = (item.signer(), item.signature());
        if key.is_empty() || sig.is_empty() {
            return Ok(false);
        }
        let encoded = sig.strip_prefix(MULTIBASE_BASE58BTC).ok_or_else(|| {
            AicError::malformed_signature(format!(
                "expected multibase prefix '{MULTIBASE_BASE58BTC}'"
            ))
        })?;
        let sig = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| AicError::malformed_signature(e.to_string()))?;
        let bytes = self.canonicalize(item)?;
        Ok(keypair.verify_did_sig(key, &bytes, &sig))
    }

    /// [`verify`](Self::verify) with malformed signatures counted as invalid
    pub fn check<T: Signable + ?Sized>(&self, item: &T, keypair: &dyn Asymmetric) -> bool {
        match self.verify(item, keypair) {
            Ok(valid) => valid,
            Err(error) => {
                tracing::debug!(%error, "treating malformed signature as invalid");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Ed25519Keypair;
    use crate::tid::Tid;
    use crate::types::{Diff, Document, Patch};
    use serde_json::json;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_canonicalize_keeps_sig_position() {
        let doc = document(json!({"a": 1, "sig": "zabc", "b": 2}));
        let bytes = SignatureEnvelope::default().canonicalize(&doc).unwrap();
        assert_eq!(bytes, br#"{"a":1,"sig":"","b":2}"#);

        let unsigned = document(json!({"b": 2, "a": 1}));
        let bytes = SignatureEnvelope::default().canonicalize(&unsigned).unwrap();
        assert_eq!(bytes, br#"{"b":2,"a":1,"sig":""}"#);
    }

    #[test]
    fn test_sorted_form_is_order_independent() {
        let envelope = SignatureEnvelope::new(CanonicalForm::SortedKeys);
        let a = document(json!({"b": {"y": 1, "x": [{"q": 1, "p": 2}]}, "a": 1}));
        let b = document(json!({"a": 1, "b": {"x": [{"p": 2, "q": 1}], "y": 1}}));
        assert_eq!(
            envelope.canonicalize(&a).unwrap(),
            envelope.canonicalize(&b).unwrap()
        );
        assert_ne!(
            SignatureEnvelope::default().canonicalize(&a).unwrap(),
            SignatureEnvelope::default().canonicalize(&b).unwrap()
        );
    }

    #[test]
    fn test_sign_then_verify() {
        let keypair = Ed25519Keypair::from_seed([5u8; 32]);
        let envelope = SignatureEnvelope::default();
        let diff = Diff::new(Tid::new("2"), vec![Patch::put(["a"], 1)], keypair.did());
        let signed = envelope.signed(diff, &keypair).unwrap();
        assert!(signed.sig.starts_with('z'));
        assert_eq!(envelope.verify(&signed, &keypair), Ok(true));

        let mut tampered = signed.clone();
        tampered.patches.push(Patch::del(["b"]));
        assert_eq!(envelope.verify(&tampered, &keypair), Ok(false));

        // bytes differ between forms, so a signature does not carry across
        let sorted = SignatureEnvelope::new(CanonicalForm::SortedKeys);
        let doc = document(json!({"z": 1, "key": keypair.did()}));
        let signed_doc = envelope.signed(doc, &keypair).unwrap();
        assert_eq!(sorted.verify(&signed_doc, &keypair), Ok(false));
    }

    #[test]
    fn test_sign_rejects_foreign_key() {
        let keypair = Ed25519Keypair::from_seed([5u8; 32]);
        let other = Ed25519Keypair::from_seed([6u8; 32]);
        let mut diff = Diff::new(Tid::new("2"), vec![], other.did());
        let err = SignatureEnvelope::default()
            .sign(&mut diff, &keypair)
            .unwrap_err();
        assert!(matches!(err, AicError::KeyMismatch { .. }));
        assert!(diff.sig.is_empty());
    }

    #[test]
    fn test_verify_missing_and_malformed() {
        let keypair = Ed25519Keypair::from_seed([5u8; 32]);
        let envelope = SignatureEnvelope::default();

        let unsigned = Diff::new(Tid::new("2"), vec![], keypair.did());
        assert_eq!(envelope.verify(&unsigned, &keypair), Ok(false));

        let mut keyless = unsigned.clone();
        keyless.key = String::new();
        keyless.sig = "zabc".to_string();
        assert_eq!(envelope.verify(&keyless, &keypair), Ok(false));

        let mut wrong_base = unsigned.clone();
        wrong_base.sig = "mabc".to_string();
        assert!(matches!(
            envelope.verify(&wrong_base, &keypair),
            Err(AicError::MalformedSignature { .. })
        ));
        assert!(!envelope.check(&wrong_base, &keypair));

        let mut bad_chars = unsigned;
        bad_chars.sig = "z0OIl".to_string();
        assert!(matches!(
            envelope.verify(&bad_chars, &keypair),
            Err(AicError::MalformedSignature { .. })
        ));
    }
}
