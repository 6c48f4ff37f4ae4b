//! Unified error system for the consortium ledger
//!
//! Every domain failure is a value of [`AicError`]. Errors serialize as
//! `{"error": "<Kind>", ...context}` so the HTTP layer can hand them straight
//! back to clients.

use serde::{Deserialize, Serialize};

/// Unified error type for all ledger operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "error")]
pub enum AicError {
    /// Signature field is not a `z`-prefixed base58btc multibase string
    #[error("Malformed signature: {reason}")]
    MalformedSignature {
        /// What was wrong with the signature encoding
        reason: String,
    },

    /// Document `key` does not belong to the keypair asked to sign it
    #[error("Key mismatch: document key {document_key} is not signer {signer}")]
    KeyMismatch {
        /// The `key` field of the document
        document_key: String,
        /// The did of the signing keypair
        signer: String,
    },

    /// Stored tick failed its own signature check
    #[error("Corrupted store: stored tick for {did} has a bad signature")]
    CorruptedStore {
        /// Identity whose stored tick is corrupt
        did: String,
    },

    /// Stored tick was signed by a different consortium key
    #[error("Stored tick signed by {stored}, consortium key is {consortium}")]
    ConsortiumKeyMismatch {
        /// Key recorded in the stored tick
        stored: String,
        /// Key of the running consortium
        consortium: String,
    },

    /// Stored tick is filed under the wrong identity
    #[error("Index corruption: stored tick did {stored} does not match {requested}")]
    IndexCorruption {
        /// `did` field of the stored tick
        stored: String,
        /// did the tick was looked up under
        requested: String,
    },

    /// Client-supplied did disagrees with the hash of the genesis document
    #[error("Calculated did {calculated} does not match {requested}")]
    DidMismatch {
        /// did the client asked to register
        requested: String,
        /// did derived from the submitted genesis document
        calculated: String,
    },

    /// Candidate diff carries no valid signature of its own
    #[error("Diff has bad signature (key {key})")]
    BadDiffSignature {
        /// Signer key claimed by the diff, empty when absent
        key: String,
    },

    /// Authorization policy refused the diff signer
    #[error("Diff signed by key not authorized in did doc: {key}")]
    UnauthorizedKey {
        /// Signer key claimed by the diff
        key: String,
    },

    /// Diff chain has no entries
    #[error("Empty chain: no genesis document")]
    EmptyChain,

    /// Malformed content identifier
    #[error("Invalid identifier: {value}")]
    InvalidIdentifier {
        /// The rejected identifier
        value: String,
    },

    /// Malformed time identifier
    #[error("Invalid tid: {value}")]
    InvalidTid {
        /// The rejected tid
        value: String,
    },

    /// Tid already present in the chain or not after the genesis entry
    #[error("Stale tid {tid}: chain entries are append-only")]
    StaleTid {
        /// The rejected tid
        tid: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {message}")]
    Serialization {
        /// Underlying serializer message
        message: String,
    },

    /// Cryptographic primitive failure
    #[error("Crypto error: {message}")]
    Crypto {
        /// Underlying crypto message
        message: String,
    },

    /// Persistence failure
    #[error("Storage error: {message}")]
    Storage {
        /// Underlying storage message
        message: String,
    },

    /// Invalid configuration
    #[error("Config error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },
}

impl AicError {
    /// Create a malformed signature error
    pub fn malformed_signature(reason: impl Into<String>) -> Self {
        Self::MalformedSignature {
            reason: reason.into(),
        }
    }

    /// Create an invalid identifier error
    pub fn invalid_identifier(value: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
        }
    }

    /// Create an invalid tid error
    pub fn invalid_tid(value: impl Into<String>) -> Self {
        Self::InvalidTid {
            value: value.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable kind name, identical to the serialized `error` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedSignature { .. } => "MalformedSignature",
            Self::KeyMismatch { .. } => "KeyMismatch",
            Self::CorruptedStore { .. } => "CorruptedStore",
            Self::ConsortiumKeyMismatch { .. } => "ConsortiumKeyMismatch",
            Self::IndexCorruption { .. } => "IndexCorruption",
            Self::DidMismatch { .. } => "DidMismatch",
            Self::BadDiffSignature { .. } => "BadDiffSignature",
            Self::UnauthorizedKey { .. } => "UnauthorizedKey",
            Self::EmptyChain => "EmptyChain",
            Self::InvalidIdentifier { .. } => "InvalidIdentifier",
            Self::InvalidTid { .. } => "InvalidTid",
            Self::StaleTid { .. } => "StaleTid",
            Self::Serialization { .. } => "Serialization",
            Self::Crypto { .. } => "Crypto",
            Self::Storage { .. } => "Storage",
            Self::Config { .. } => "Config",
        }
    }

    /// Whether the failure points at damaged persisted state rather than at
    /// the request
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::CorruptedStore { .. }
                | Self::ConsortiumKeyMismatch { .. }
                | Self::IndexCorruption { .. }
        )
    }
}

/// Standard Result type for ledger operations
pub type Result<T> = std::result::Result<T, AicError>;

impl From<serde_json::Error> for AicError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_kind_tag() {
        let err = AicError::DidMismatch {
            requested: "did:aic:zaaaaaaaaaaaaaaa".to_string(),
            calculated: "did:aic:zbbbbbbbbbbbbbbb".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "DidMismatch");
        assert_eq!(json["calculated"], "did:aic:zbbbbbbbbbbbbbbb");
        assert_eq!(err.kind(), "DidMismatch");
    }

    #[test]
    fn test_unit_variant_roundtrip() {
        let json = serde_json::to_string(&AicError::EmptyChain).unwrap();
        assert_eq!(json, r#"{"error":"EmptyChain"}"#);
        let back: AicError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AicError::EmptyChain);
    }

    #[test]
    fn test_integrity_classification() {
        assert!(AicError::CorruptedStore { did: "d".into() }.is_integrity_failure());
        assert!(!AicError::EmptyChain.is_integrity_failure());
    }
}
