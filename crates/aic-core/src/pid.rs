//! Content-addressed identifiers
//!
//! A PID is sixteen symbols of the [`s32`](crate::s32) alphabet derived from
//! the SHA-256 of some content. The run of leading zero symbols in the
//! encoded digest is folded into the head character, so the head alone
//! certifies a lower bound on how hard the PID was to find: every extra
//! leading zero symbol costs a preimage search five more bits.
//!
//! ```text
//! digest  = s32(sha256(bytes))          52 symbols
//! N       = leading '2' symbols         capped at 32
//! pid     = alphabet[31 - N] ++ digest[N .. N + 15]
//! ```

use crate::envelope::{canonical_bytes, CanonicalForm};
use crate::errors::{AicError, Result};
use crate::hash;
use crate::s32;
use crate::types::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of symbols in a PID
pub const PID_LEN: usize = 16;

/// Body symbols following the head
const BODY_LEN: usize = PID_LEN - 1;

/// Bits certified by a head of `z` (no leading zero symbols)
const BASE_STRENGTH: u32 = 75;

/// Prefix of every identity did
pub const AIC_DID_PREFIX: &str = "did:aic:";

/// Content-addressed identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid(String);

impl Pid {
    /// PID of raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_digest(&hash::hash(data))
    }

    /// PID of the UTF-8 bytes of a string
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    /// PID of a document's canonical bytes in insertion order
    pub fn of_document(document: &Document) -> Result<Self> {
        Self::of_document_in(document, CanonicalForm::Insertion)
    }

    /// PID of a document's canonical bytes in `form`
    pub fn of_document_in(document: &Document, form: CanonicalForm) -> Result<Self> {
        Self::of_value_in(document, form)
    }

    /// PID of any serializable value's canonical bytes in insertion order
    pub fn of_value<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Self::of_value_in(value, CanonicalForm::Insertion)
    }

    /// PID of any serializable value's canonical bytes in `form`
    pub fn of_value_in<T: Serialize + ?Sized>(value: &T, form: CanonicalForm) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        let bytes = canonical_bytes(&value, form)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Encode a 32-byte digest
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let encoded = s32::encode_bytes(digest);
        let zeros = encoded
            .chars()
            .take(32)
            .take_while(|c| *c == s32::ZERO)
            .count();
        let mut pid = String::with_capacity(PID_LEN);
        // an all-zero run of 32 saturates at the lowest head symbol
        pid.push(s32::symbol(31usize.saturating_sub(zeros) as u8));
        pid.extend(encoded.chars().skip(zeros).take(BODY_LEN));
        // a 52-symbol digest always has at least 20 symbols left after the run
        debug_assert_eq!(pid.len(), PID_LEN);
        Self(pid)
    }

    /// Parse and validate a PID string
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != PID_LEN || value.chars().any(|c| s32::index_of(c).is_none()) {
            return Err(AicError::invalid_identifier(value));
        }
        Ok(Self(value.to_string()))
    }

    /// Extract the PID from a `did:aic:` identifier
    pub fn from_did(did: &str) -> Result<Self> {
        did.strip_prefix(AIC_DID_PREFIX)
            .ok_or_else(|| AicError::invalid_identifier(did))
            .and_then(Self::parse)
    }

    /// The `did:aic:` identifier for this PID
    pub fn did(&self) -> String {
        format!("{AIC_DID_PREFIX}{}", self.0)
    }

    /// Head character
    pub fn head(&self) -> char {
        self.0.chars().next().unwrap_or(s32::ZERO)
    }

    /// Bits of preimage resistance certified by the head character
    pub fn bit_strength(&self) -> u32 {
        strength_of_head(s32::index_of(self.head()).unwrap_or(31))
    }

    /// String form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn strength_of_head(index: u8) -> u32 {
    BASE_STRENGTH + 5 * (31 - u32::from(index))
}

/// Security margin of a PID string, read from its first character only.
///
/// Fails with `InvalidIdentifier` if the first character is not in the
/// alphabet (or the string is empty).
pub fn bit_strength(pid: &str) -> Result<u32> {
    pid.chars()
        .next()
        .and_then(s32::index_of)
        .map(strength_of_head)
        .ok_or_else(|| AicError::invalid_identifier(pid))
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Pid {
    type Err = AicError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Pid {
    type Error = AicError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> String {
        pid.0
    }
}
