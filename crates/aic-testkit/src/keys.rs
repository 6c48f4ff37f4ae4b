//! Key test helpers
//!
//! Deterministic did:key identities for consortium and account keys.

use aic_core::{Asymmetric, Ed25519Keypair};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Key fixture for consistent test key generation
#[derive(Debug, Clone)]
pub struct KeyFixture {
    keypair: Ed25519Keypair,
    did: String,
}

impl KeyFixture {
    /// Key from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let keypair = Ed25519Keypair::from_seed(*seed);
        let did = keypair.did();
        Self { keypair, did }
    }

    /// Key from a seed string, hashed to 32 bytes
    pub fn from_seed_string(seed: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
        Self::from_seed(&digest)
    }

    /// The consortium signing key used across test suites
    pub fn consortium() -> Self {
        Self::from_seed_string("aic-testkit/consortium")
    }

    /// Account key `n`
    pub fn account(n: u32) -> Self {
        Self::from_seed_string(&format!("aic-testkit/account/{n}"))
    }

    /// Recovery key `n`
    pub fn recovery(n: u32) -> Self {
        Self::from_seed_string(&format!("aic-testkit/recovery/{n}"))
    }

    /// did:key of this fixture
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Underlying keypair
    pub fn keypair(&self) -> &Ed25519Keypair {
        &self.keypair
    }

    /// Keypair as a shareable capability
    pub fn shared(&self) -> Arc<dyn Asymmetric> {
        Arc::new(self.keypair.clone())
    }
}
