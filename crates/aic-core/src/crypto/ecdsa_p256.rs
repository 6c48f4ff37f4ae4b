//! P-256 did:key handler
//!
//! Public keys are published as `did:key:z<base58btc(0x80 0x24 ++ key)>`
//! with the key in compressed SEC1 form, which renders as `did:key:zDn...`.
//! Signatures are ECDSA with SHA-256, carried as raw 64-byte `r || s`.

use super::{decode_multikey, encode_multikey, Asymmetric};
use crate::errors::{AicError, Result};
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use rand_core::CryptoRngCore;
use std::fmt;

/// Multicodec varint prefix for a P-256 public key
pub const P256_MULTICODEC: [u8; 2] = [0x80, 0x24];

/// P-256 keypair identified by its did:key
#[derive(Clone)]
pub struct P256Keypair {
    signing_key: SigningKey,
}

impl P256Keypair {
    /// Keypair from a 32-byte secret scalar
    ///
    /// Fails when the bytes are zero or not below the curve order.
    pub fn from_seed(seed: [u8; 32]) -> Result<Self> {
        let signing_key =
            SigningKey::from_slice(&seed).map_err(|e| AicError::crypto(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Keypair from a hex-encoded 32-byte secret scalar
    pub fn from_hex_seed(seed: &str) -> Result<Self> {
        let bytes = hex::decode(seed.trim()).map_err(|e| AicError::crypto(e.to_string()))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            AicError::crypto(format!("seed must be 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_seed(seed)
    }

    /// Fresh random keypair
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        loop {
            rng.fill_bytes(&mut seed);
            if let Ok(signing_key) = SigningKey::from_slice(&seed) {
                return Self { signing_key };
            }
        }
    }

    /// Public half
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key().clone()
    }

    /// Hex form of the secret scalar, for writing config files
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// did:key for a P-256 public key
    pub fn did_for_verifying_key(key: &VerifyingKey) -> String {
        encode_multikey(&P256_MULTICODEC, key.to_encoded_point(true).as_bytes())
    }

    /// P-256 public key encoded in a did:key
    pub fn parse_did_key(did: &str) -> Result<VerifyingKey> {
        let multikey = decode_multikey(did)?;
        let key = multikey
            .strip_prefix(&P256_MULTICODEC[..])
            .ok_or_else(|| AicError::invalid_identifier(did))?;
        Self::verifying_key_from_bytes(key)
    }

    /// Public key from SEC1 bytes, compressed or not
    pub fn verifying_key_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
        VerifyingKey::from_sec1_bytes(bytes).map_err(|e| AicError::crypto(e.to_string()))
    }
}

/// Check a raw `r || s` ECDSA signature over the SHA-256 of `data`
///
/// High-S signatures are accepted; other signers do not normalize them.
pub(super) fn verify(key: &VerifyingKey, data: &[u8], sig: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(sig) else {
        return false;
    };
    let signature = signature.normalize_s().unwrap_or(signature);
    key.verify(data, &signature).is_ok()
}

impl Asymmetric for P256Keypair {
    fn did(&self) -> String {
        Self::did_for_verifying_key(&self.verifying_key())
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self
            .signing_key
            .try_sign(data)
            .map_err(|e| AicError::crypto(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }
}

impl fmt::Debug for P256Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P256Keypair")
            .field("did", &self.did())
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DidKey;
    use rand::SeedableRng;

    const FIXTURE_DID: &str = "did:key:zDnaeYgdnK7nVH2xNQENrBRJbdCQ1KKjxt5sbykiUGLAh46Ez";

    #[test]
    fn test_did_key_shape() {
        let keypair = P256Keypair::from_seed([7u8; 32]).unwrap();
        let did = keypair.did();
        assert!(did.starts_with("did:key:zDn"), "unexpected did {did}");
        let parsed = P256Keypair::parse_did_key(&did).unwrap();
        assert_eq!(parsed, keypair.verifying_key());
    }

    #[test]
    fn test_sign_and_verify_against_did() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(2);
        let alice = P256Keypair::generate(&mut rng);
        let bob = P256Keypair::generate(&mut rng);
        let sig = alice.sign(b"tick").unwrap();
        assert_eq!(sig.len(), 64);

        assert!(bob.verify_did_sig(&alice.did(), b"tick", &sig));
        assert!(!bob.verify_did_sig(&alice.did(), b"tock", &sig));
        assert!(!bob.verify_did_sig(&bob.did(), b"tick", &sig));
        assert!(!bob.verify_did_sig(&alice.did(), b"tick", &sig[..32]));
    }

    #[test]
    fn test_externally_signed_diff_verifies() {
        // high-S signature produced by another implementation
        let data = format!(
            r#"{{"prev":"3j55-hih-g24c-22","patches":[["put",["d"],4]],"key":"{FIXTURE_DID}","sig":""}}"#
        );
        let sig = bs58::decode(
            "58kG77wksPLi8185y6fsJG3NidUjYVBzBKVqSG3T5NQKwrNu9d6aL2UorPRzre4VCvKUASuec53jain2LRaMCtmZ",
        )
        .into_vec()
        .unwrap();

        let key = DidKey::parse(FIXTURE_DID).unwrap();
        assert!(key.verify(data.as_bytes(), &sig));
        assert!(!key.verify(data.replace('4', "5").as_bytes(), &sig));
    }

    #[test]
    fn test_rejects_invalid_scalars() {
        assert!(P256Keypair::from_seed([0u8; 32]).is_err());
        assert!(P256Keypair::from_seed([0xffu8; 32]).is_err());
        assert!(P256Keypair::from_hex_seed("abcd").is_err());
    }

    #[test]
    fn test_hex_seed_roundtrip() {
        let keypair = P256Keypair::from_seed([9u8; 32]).unwrap();
        let restored = P256Keypair::from_hex_seed(&keypair.seed_hex()).unwrap();
        assert_eq!(restored.did(), keypair.did());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let keypair = P256Keypair::from_seed([3u8; 32]).unwrap();
        let debug = format!("{keypair:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&keypair.seed_hex()));
    }
}
