//! Asymmetric key capability
//!
//! The ledger never touches key material directly. Signing and did:key
//! verification go through [`Asymmetric`], so the consortium key, client
//! keys in tests and any future key type share one seam.
//!
//! Verification does not depend on the verifier's own key type: the
//! multicodec prefix of the did:key picks the scheme, so an Ed25519
//! consortium checks P-256 client signatures and the other way round.

mod ecdsa_p256;
mod ed25519;

pub use ecdsa_p256::{P256Keypair, P256_MULTICODEC};
pub use ed25519::{Ed25519Keypair, ED25519_MULTICODEC};

use crate::errors::{AicError, Result};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Prefix of every did:key identifier
pub const DID_KEY_PREFIX: &str = "did:key:";

/// Signing identity plus did:key signature verification
pub trait Asymmetric: Send + Sync + std::fmt::Debug {
    /// did:key of this keypair
    fn did(&self) -> String;

    /// Sign bytes with the private key
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Check `sig` over `data` against the public key encoded in `did`.
    ///
    /// Unknown key types, malformed dids and bad signatures all return
    /// `false`.
    fn verify_did_sig(&self, did: &str, data: &[u8], sig: &[u8]) -> bool {
        verify_did_key_sig(did, data, sig)
    }
}

impl<T: Asymmetric + ?Sized> Asymmetric for Arc<T> {
    fn did(&self) -> String {
        (**self).did()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        (**self).sign(data)
    }

    fn verify_did_sig(&self, did: &str, data: &[u8], sig: &[u8]) -> bool {
        (**self).verify_did_sig(did, data, sig)
    }
}

/// Signature scheme of a keypair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// Ed25519, `did:key:z6Mk...`
    #[default]
    Ed25519,
    /// ECDSA over NIST P-256 with SHA-256, `did:key:zDn...`
    P256,
}

impl KeyType {
    /// Keypair from a hex-encoded 32-byte secret
    pub fn keypair_from_hex(self, seed: &str) -> Result<Arc<dyn Asymmetric>> {
        Ok(match self {
            Self::Ed25519 => Arc::new(Ed25519Keypair::from_hex_seed(seed)?),
            Self::P256 => Arc::new(P256Keypair::from_hex_seed(seed)?),
        })
    }

    /// Fresh random keypair with the hex form of its secret
    pub fn generate<R: CryptoRngCore + ?Sized>(self, rng: &mut R) -> (Arc<dyn Asymmetric>, String) {
        match self {
            Self::Ed25519 => {
                let keypair = Ed25519Keypair::generate(rng);
                let seed = keypair.seed_hex();
                (Arc::new(keypair), seed)
            }
            Self::P256 => {
                let keypair = P256Keypair::generate(rng);
                let seed = keypair.seed_hex();
                (Arc::new(keypair), seed)
            }
        }
    }
}

/// Public key carried by a did:key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DidKey {
    /// Ed25519 public key
    Ed25519(ed25519_dalek::VerifyingKey),
    /// P-256 public key
    P256(p256::ecdsa::VerifyingKey),
}

impl DidKey {
    /// Decode a did:key, choosing the scheme from its multicodec prefix
    pub fn parse(did: &str) -> Result<Self> {
        let multikey = decode_multikey(did)?;
        if let Some(key) = multikey.strip_prefix(&ED25519_MULTICODEC[..]) {
            return Ed25519Keypair::verifying_key_from_bytes(key)
                .map(Self::Ed25519)
                .map_err(|_| AicError::invalid_identifier(did));
        }
        if let Some(key) = multikey.strip_prefix(&P256_MULTICODEC[..]) {
            return P256Keypair::verifying_key_from_bytes(key)
                .map(Self::P256)
                .map_err(|_| AicError::invalid_identifier(did));
        }
        Err(AicError::invalid_identifier(did))
    }

    /// Scheme of this key
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::P256(_) => KeyType::P256,
        }
    }

    /// Check a raw signature over `data`
    pub fn verify(&self, data: &[u8], sig: &[u8]) -> bool {
        match self {
            Self::Ed25519(key) => ed25519::verify(key, data, sig),
            Self::P256(key) => ecdsa_p256::verify(key, data, sig),
        }
    }
}

/// Verify `sig` over `data` against whatever key `did` names
pub fn verify_did_key_sig(did: &str, data: &[u8], sig: &[u8]) -> bool {
    match DidKey::parse(did) {
        Ok(key) => key.verify(data, sig),
        Err(error) => {
            tracing::debug!(%error, "unverifiable did:key");
            false
        }
    }
}

/// Multicodec-prefixed key bytes of a `did:key:z...` identifier
pub(crate) fn decode_multikey(did: &str) -> Result<Vec<u8>> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .and_then(|rest| rest.strip_prefix('z'))
        .ok_or_else(|| AicError::invalid_identifier(did))?;
    bs58::decode(encoded)
        .into_vec()
        .map_err(|_| AicError::invalid_identifier(did))
}

/// `did:key:z...` for multicodec-prefixed key bytes
pub(crate) fn encode_multikey(codec: &[u8], key: &[u8]) -> String {
    let mut multikey = Vec::with_capacity(codec.len() + key.len());
    multikey.extend_from_slice(codec);
    multikey.extend_from_slice(key);
    format!("{DID_KEY_PREFIX}z{}", bs58::encode(multikey).into_string())
}
