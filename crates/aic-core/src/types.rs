//! Documents, patches, diffs, diff chains and ticks
//!
//! Documents are schemaless JSON maps. Field order inside every struct here
//! is the serialization order, and signatures are computed over serialized
//! bytes, so reordering fields is a wire-format change.

use crate::envelope::Signable;
use crate::errors::{AicError, Result};
use crate::tid::Tid;
use serde::de::Error as _;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub use serde_json::Value;

/// Identity document: string keys to JSON values, insertion ordered
pub type Document = serde_json::Map<String, Value>;

/// Keys with full authority over the document
pub const ACCOUNT_KEYS: &str = "adx/account_keys";

/// Keys that may only rotate the key lists
pub const RECOVERY_KEYS: &str = "adx/recovery_keys";

/// Patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Set the value at a path
    Put,
    /// Remove the key at a path
    Del,
}

/// One step of a patch path.
///
/// Numeric segments are accepted on the wire but never traversed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Map key
    Key(String),
    /// Array index
    Index(u64),
}

impl PathSegment {
    /// Map key, `None` for array indices
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

/// A single `put`/`del` edit, serialized as `[op, path]` or `[op, path, value]`
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Operation
    pub op: PatchOp,
    /// Non-empty path from the document root
    pub path: Vec<PathSegment>,
    /// New value; always present for `put`
    pub value: Option<Value>,
}

impl Patch {
    /// `put` patch
    pub fn put<S: Into<PathSegment>>(
        path: impl IntoIterator<Item = S>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            op: PatchOp::Put,
            path: path.into_iter().map(Into::into).collect(),
            value: Some(value.into()),
        }
    }

    /// `del` patch
    pub fn del<S: Into<PathSegment>>(path: impl IntoIterator<Item = S>) -> Self {
        Self {
            op: PatchOp::Del,
            path: path.into_iter().map(Into::into).collect(),
            value: None,
        }
    }

    /// First path segment when it is a map key
    pub fn top_level_key(&self) -> Option<&str> {
        self.path.first().and_then(PathSegment::as_key)
    }
}

impl Serialize for Patch {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = if self.value.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.op)?;
        seq.serialize_element(&self.path)?;
        if let Some(value) = &self.value {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Patch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<Value>::deserialize(deserializer)?;
        if !(2..=3).contains(&raw.len()) {
            return Err(D::Error::custom(format!(
                "patch must have 2 or 3 elements, got {}",
                raw.len()
            )));
        }
        let mut elements = raw.into_iter();
        let op: PatchOp = elements
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(D::Error::custom)?
            .ok_or_else(|| D::Error::custom("patch is missing its op"))?;
        let path: Vec<PathSegment> = elements
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(D::Error::custom)?
            .unwrap_or_default();
        if path.is_empty() {
            return Err(D::Error::custom("patch path must not be empty"));
        }
        let value = elements.next();
        if op == PatchOp::Put && value.is_none() {
            return Err(D::Error::custom("put patch requires a value"));
        }
        Ok(Self { op, path, value })
    }
}

/// Signed mutation extending the chain at `prev`.
///
/// Fields other than these four are rejected when parsing, since they would
/// not be covered by the signature once dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diff {
    /// Chain position this diff extends
    pub prev: Tid,
    /// Edits, applied in order
    pub patches: Vec<Patch>,
    /// did:key of the signer
    pub key: String,
    /// `z` + base58btc signature, empty until signed
    #[serde(default)]
    pub sig: String,
}

impl Diff {
    /// Unsigned diff
    pub fn new(prev: Tid, patches: Vec<Patch>, key: impl Into<String>) -> Self {
        Self {
            prev,
            patches,
            key: key.into(),
            sig: String::new(),
        }
    }

    /// Whether every patch only touches the reserved key lists
    pub fn only_touches_key_lists(&self) -> bool {
        self.patches
            .iter()
            .all(|p| matches!(p.top_level_key(), Some(ACCOUNT_KEYS | RECOVERY_KEYS)))
    }
}

/// Entry of a diff chain
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChainEntry {
    /// Initial state; always the smallest tid
    Genesis(Document),
    /// Later mutation
    Diff(Diff),
}

/// Diff chain ordered by tid.
///
/// The smallest tid holds the genesis document and every later tid holds a
/// diff. Entries are never removed, and forks (several diffs naming the same
/// `prev`) are all retained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Diffs(BTreeMap<Tid, ChainEntry>);

impl Diffs {
    /// Chain holding only a genesis document
    pub fn genesis(tid: Tid, document: Document) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(tid, ChainEntry::Genesis(document));
        Self(entries)
    }

    /// Append a diff.
    ///
    /// Fails with `EmptyChain` when there is no genesis yet and with
    /// `StaleTid` unless `tid` sorts after every entry already present.
    pub fn append(&mut self, tid: Tid, diff: Diff) -> Result<()> {
        let latest = self.latest_tid().ok_or(AicError::EmptyChain)?;
        if tid <= *latest {
            return Err(AicError::StaleTid {
                tid: tid.to_string(),
            });
        }
        self.0.insert(tid, ChainEntry::Diff(diff));
        Ok(())
    }

    /// Tid of the genesis entry
    pub fn genesis_tid(&self) -> Option<&Tid> {
        self.0.keys().next()
    }

    /// Genesis document with its tid
    pub fn genesis_entry(&self) -> Option<(&Tid, &Document)> {
        self.0.iter().next().and_then(|(tid, entry)| match entry {
            ChainEntry::Genesis(doc) => Some((tid, doc)),
            ChainEntry::Diff(_) => None,
        })
    }

    /// Diffs after genesis in chain order, forks included
    pub fn diffs(&self) -> impl Iterator<Item = (&Tid, &Diff)> {
        self.0.iter().filter_map(|(tid, entry)| match entry {
            ChainEntry::Diff(diff) => Some((tid, diff)),
            ChainEntry::Genesis(_) => None,
        })
    }

    /// All entries in chain order
    pub fn iter(&self) -> impl Iterator<Item = (&Tid, &ChainEntry)> {
        self.0.iter()
    }

    /// Entry at a tid
    pub fn get(&self, tid: &Tid) -> Option<&ChainEntry> {
        self.0.get(tid)
    }

    /// Largest tid in the chain
    pub fn latest_tid(&self) -> Option<&Tid> {
        self.0.keys().next_back()
    }

    /// Number of entries, genesis included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain has no genesis
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Diffs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (tid, entry) in &self.0 {
            map.serialize_entry(tid, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Diffs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<Tid, Value>::deserialize(deserializer)?;
        let mut entries = BTreeMap::new();
        for (index, (tid, value)) in raw.into_iter().enumerate() {
            let entry = if index == 0 {
                match value {
                    Value::Object(document) => ChainEntry::Genesis(document),
                    _ => {
                        return Err(D::Error::custom(format!(
                            "genesis entry {tid} is not a document"
                        )))
                    }
                }
            } else {
                let diff = serde_json::from_value(value)
                    .map_err(|e| D::Error::custom(format!("entry {tid} is not a diff: {e}")))?;
                ChainEntry::Diff(diff)
            };
            entries.insert(tid, entry);
        }
        Ok(Self(entries))
    }
}

/// Consortium-signed snapshot of an identity's chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Consensus time of this snapshot
    pub tid: Tid,
    /// `did:aic:` of the genesis document
    pub did: String,
    /// Full chain
    pub diffs: Diffs,
    /// did:key of the consortium
    pub key: String,
    /// Consortium signature
    #[serde(default)]
    pub sig: String,
}

/// Signed statement that an identity is not registered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotFoundAttestation {
    /// Consensus time of the statement
    pub tid: Tid,
    /// Identity that was looked up
    pub did: String,
    /// Always `did not found`
    pub error: String,
    /// Always empty
    pub diffs: Diffs,
    /// did:key of the consortium
    pub key: String,
    /// Consortium signature
    #[serde(default)]
    pub sig: String,
}

impl NotFoundAttestation {
    /// Error text carried by the attestation
    pub const ERROR: &'static str = "did not found";

    /// Unsigned attestation
    pub fn new(tid: Tid, did: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            tid,
            did: did.into(),
            error: Self::ERROR.to_string(),
            diffs: Diffs::default(),
            key: key.into(),
            sig: String::new(),
        }
    }
}

/// Signed consortium time, for client clock calibration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TidAttestation {
    /// Consortium time
    pub tid: Tid,
    /// did:key of the consortium
    pub key: String,
    /// Consortium signature
    #[serde(default)]
    pub sig: String,
}

/// Successful outcome of a ledger update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TickResponse {
    /// Identity is not registered
    NotFound(NotFoundAttestation),
    /// Current chain snapshot
    Tick(Tick),
}

impl TickResponse {
    /// The tick, if the identity exists
    pub fn into_tick(self) -> Option<Tick> {
        match self {
            Self::Tick(tick) => Some(tick),
            Self::NotFound(_) => None,
        }
    }
}

/// Body of a write request
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Initial state for a registration
    Genesis(Document),
    /// Mutation of a registered identity
    Diff(Diff),
}

impl Candidate {
    /// Classify a request body for an identity that is `registered` or not.
    ///
    /// Before registration every object is a genesis document, including one
    /// that happens to carry `prev` and `patches` keys. Afterwards the body is
    /// read as by [`from_value`](Self::from_value).
    pub fn classify(value: Value, registered: bool) -> Result<Self> {
        match value {
            Value::Object(map) if !registered => Ok(Self::Genesis(map)),
            other => Self::from_value(other),
        }
    }

    /// Classify a request body by shape alone.
    ///
    /// Objects carrying both `prev` and `patches` are diffs and must parse as
    /// one; any other object is a genesis document.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) if map.contains_key("prev") && map.contains_key("patches") => {
                Ok(Self::Diff(serde_json::from_value(Value::Object(map))?))
            }
            Value::Object(map) => Ok(Self::Genesis(map)),
            other => Err(AicError::serialization(format!(
                "request body must be a JSON object, got {other}"
            ))),
        }
    }

    /// JSON form of the candidate
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Self::Genesis(document) => Value::Object(document.clone()),
            Self::Diff(diff) => serde_json::to_value(diff)?,
        })
    }
}

impl Signable for Diff {
    fn signer(&self) -> &str {
        &self.key
    }

    fn signature(&self) -> &str {
        &self.sig
    }

    fn set_signature(&mut self, sig: String) {
        self.sig = sig;
    }
}

impl Signable for Tick {
    fn signer(&self) -> &str {
        &self.key
    }

    fn signature(&self) -> &str {
        &self.sig
    }

    fn set_signature(&mut self, sig: String) {
        self.sig = sig;
    }
}

impl Signable for NotFoundAttestation {
    fn signer(&self) -> &str {
        &self.key
    }

    fn signature(&self) -> &str {
        &self.sig
    }

    fn set_signature(&mut self, sig: String) {
        self.sig = sig;
    }
}

impl Signable for TidAttestation {
    fn signer(&self) -> &str {
        &self.key
    }

    fn signature(&self) -> &str {
        &self.sig
    }

    fn set_signature(&mut self, sig: String) {
        self.sig = sig;
    }
}

impl Signable for Document {
    fn signer(&self) -> &str {
        self.get("key").and_then(Value::as_str).unwrap_or_default()
    }

    fn signature(&self) -> &str {
        self.get("sig").and_then(Value::as_str).unwrap_or_default()
    }

    fn set_signature(&mut self, sig: String) {
        self.insert("sig".to_string(), Value::String(sig));
    }
}
