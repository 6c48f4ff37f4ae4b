//! Ed25519 did:key handler
//!
//! Public keys are published as `did:key:z<base58btc(0xed 0x01 ++ key)>`,
//! the multicodec form for Ed25519, which renders as `did:key:z6Mk...`.

use super::{decode_multikey, encode_multikey, Asymmetric};
use crate::errors::{AicError, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::CryptoRngCore;
use std::fmt;

/// Multicodec varint prefix for an Ed25519 public key
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Ed25519 keypair identified by its did:key
#[derive(Clone)]
pub struct Ed25519Keypair {
    signing_key: SigningKey,
}

impl Ed25519Keypair {
    /// Keypair from a 32-byte secret seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Keypair from a hex-encoded 32-byte seed
    pub fn from_hex_seed(seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed.trim()).map_err(|e| AicError::crypto(e.to_string()))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            AicError::crypto(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_seed(seed))
    }

    /// Fresh random keypair
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Public half
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Hex form of the secret seed, for writing config files
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// did:key for an Ed25519 public key
    pub fn did_for_verifying_key(key: &VerifyingKey) -> String {
        encode_multikey(&ED25519_MULTICODEC, key.as_bytes())
    }

    /// Ed25519 public key encoded in a did:key
    pub fn parse_did_key(did: &str) -> Result<VerifyingKey> {
        let multikey = decode_multikey(did)?;
        let key = multikey
            .strip_prefix(&ED25519_MULTICODEC[..])
            .ok_or_else(|| AicError::invalid_identifier(did))?;
        Self::verifying_key_from_bytes(key)
    }

    /// Public key from its 32 raw bytes
    pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
        let raw: [u8; 32] = bytes.try_into().map_err(|_| {
            AicError::crypto(format!("ed25519 key must be 32 bytes, got {}", bytes.len()))
        })?;
        VerifyingKey::from_bytes(&raw).map_err(|e| AicError::crypto(e.to_string()))
    }
}

/// Check a 64-byte Ed25519 signature
pub(super) fn verify(key: &VerifyingKey, data: &[u8], sig: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(sig) else {
        return false;
    };
    key.verify(data, &signature).is_ok()
}

impl Asymmetric for Ed25519Keypair {
    fn did(&self) -> String {
        Self::did_for_verifying_key(&self.verifying_key())
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }
}

impl fmt::Debug for Ed25519Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Keypair")
            .field("did", &self.did())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}
