//! Tick state machine
//!
//! [`LedgerEngine::update_tick`] decides what the consortium signs for one
//! request, given the stored tick for the identity (if any) and the write
//! candidate (if any):
//!
//! ```text
//! stored  candidate  result
//! none    none       signed "did not found" attestation
//! none    document   genesis tick, if the document hashes to the did
//! tick    none       same chain, fresh tid, re-signed
//! tick    diff       chain plus the diff, if signed and authorized
//! ```
//!
//! The engine is pure apart from signing. Reading and writing ticks, and
//! minting tids, belong to the caller.

use crate::authorization::{AllowAll, AuthorizationPolicy};
use crate::replay::DocumentReplayer;
use aic_core::{
    AicError, Asymmetric, Candidate, Diff, Diffs, Document, NotFoundAttestation, Pid, Result,
    SignatureEnvelope, Signable, Tick, TickResponse, Tid, TidAttestation, Value,
};
use std::sync::Arc;

/// Consortium ledger state machine
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    keypair: Arc<dyn Asymmetric>,
    envelope: SignatureEnvelope,
    policy: Arc<dyn AuthorizationPolicy>,
}

impl LedgerEngine {
    /// Engine signing with the consortium keypair
    pub fn new(keypair: Arc<dyn Asymmetric>) -> Self {
        Self {
            keypair,
            envelope: SignatureEnvelope::default(),
            policy: Arc::new(AllowAll),
        }
    }

    /// Use a different signature envelope
    pub fn with_envelope(mut self, envelope: SignatureEnvelope) -> Self {
        self.envelope = envelope;
        self
    }

    /// Consult `policy` on writes and during replay
    pub fn with_policy(mut self, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// did:key of the consortium
    pub fn consortium_did(&self) -> String {
        self.keypair.did()
    }

    /// Consortium keypair
    pub fn keypair(&self) -> &dyn Asymmetric {
        self.keypair.as_ref()
    }

    /// Envelope used for every signature
    pub fn envelope(&self) -> SignatureEnvelope {
        self.envelope
    }

    /// Replayer sharing this engine's envelope and policy
    pub fn replayer(&self) -> DocumentReplayer {
        DocumentReplayer::new(self.envelope).with_policy(Arc::clone(&self.policy))
    }

    /// Decide the next tick for `did` at consensus time `tid`
    pub fn update_tick(
        &self,
        did: &str,
        tid: &Tid,
        candidate: Option<Candidate>,
        stored: Option<Tick>,
    ) -> Result<TickResponse> {
        let Some(stored) = stored else {
            return match candidate {
                None => Ok(TickResponse::NotFound(self.not_found(did, tid)?)),
                Some(candidate) => Ok(TickResponse::Tick(self.register(did, tid, candidate)?)),
            };
        };

        self.check_stored(did, &stored)?;

        match candidate {
            None => Ok(TickResponse::Tick(self.refresh(tid, stored)?)),
            Some(Candidate::Genesis(document)) => Err(AicError::BadDiffSignature {
                key: document.signer().to_string(),
            }),
            Some(Candidate::Diff(diff)) => Ok(TickResponse::Tick(self.apply(tid, stored, diff)?)),
        }
    }

    fn register(&self, did: &str, tid: &Tid, candidate: Candidate) -> Result<Tick> {
        let genesis = match candidate.to_value()? {
            Value::Object(document) => document,
            _ => return Err(AicError::serialization("genesis must be a document")),
        };
        let calculated = Pid::of_document_in(&genesis, self.envelope.form())?.did();
        if calculated != did {
            return Err(AicError::DidMismatch {
                requested: did.to_string(),
                calculated,
            });
        }
        tracing::debug!(%did, %tid, "registering identity");
        self.tick_from_diffs(Diffs::genesis(tid.clone(), genesis), tid)
    }

    fn check_stored(&self, did: &str, stored: &Tick) -> Result<()> {
        if !self.envelope.check(stored, self.keypair.as_ref()) {
            return Err(AicError::CorruptedStore {
                did: did.to_string(),
            });
        }
        let consortium = self.keypair.did();
        if stored.key != consortium {
            return Err(AicError::ConsortiumKeyMismatch {
                stored: stored.key.clone(),
                consortium,
            });
        }
        if stored.did != did {
            return Err(AicError::IndexCorruption {
                stored: stored.did.clone(),
                requested: did.to_string(),
            });
        }
        Ok(())
    }

    fn refresh(&self, tid: &Tid, stored: Tick) -> Result<Tick> {
        let tick = Tick {
            tid: tid.clone(),
            did: stored.did,
            diffs: stored.diffs,
            key: self.keypair.did(),
            sig: String::new(),
        };
        self.envelope.signed(tick, self.keypair.as_ref())
    }

    fn apply(&self, tid: &Tid, stored: Tick, diff: Diff) -> Result<Tick> {
        if !self.envelope.check(&diff, self.keypair.as_ref()) {
            return Err(AicError::BadDiffSignature { key: diff.key });
        }
        let current = self
            .replayer()
            .materialize(&stored.diffs, self.keypair.as_ref(), None)?;
        if !self.policy.permits(&current, &diff, tid) {
            return Err(AicError::UnauthorizedKey { key: diff.key });
        }
        let mut diffs = stored.diffs;
        diffs.append(tid.clone(), diff)?;
        self.tick_from_diffs(diffs, tid)
    }

    /// Sign a tick over `diffs`; the did comes from the genesis entry.
    ///
    /// Diffs are not validated here.
    pub fn tick_from_diffs(&self, diffs: Diffs, tid: &Tid) -> Result<Tick> {
        let (_, genesis) = diffs.genesis_entry().ok_or(AicError::EmptyChain)?;
        let tick = Tick {
            tid: tid.clone(),
            did: Pid::of_document_in(genesis, self.envelope.form())?.did(),
            diffs,
            key: self.keypair.did(),
            sig: String::new(),
        };
        self.envelope.signed(tick, self.keypair.as_ref())
    }

    /// Chain of a tick whose signature verifies
    pub fn tick_to_diffs(&self, tick: &Tick) -> Option<Diffs> {
        self.envelope
            .check(tick, self.keypair.as_ref())
            .then(|| tick.diffs.clone())
    }

    /// Document of a tick whose signature verifies, as of `as_of`
    pub fn tick_to_document(&self, tick: &Tick, as_of: Option<&Tid>) -> Result<Option<Document>> {
        match self.tick_to_diffs(tick) {
            Some(diffs) => Ok(Some(self.replayer().materialize(
                &diffs,
                self.keypair.as_ref(),
                as_of,
            )?)),
            None => Ok(None),
        }
    }

    /// Signed "did not found" statement
    pub fn not_found(&self, did: &str, tid: &Tid) -> Result<NotFoundAttestation> {
        let attestation = NotFoundAttestation::new(tid.clone(), did, self.keypair.did());
        self.envelope.signed(attestation, self.keypair.as_ref())
    }

    /// Signed consortium time
    pub fn attest_tid(&self, tid: &Tid) -> Result<TidAttestation> {
        let attestation = TidAttestation {
            tid: tid.clone(),
            key: self.keypair.did(),
            sig: String::new(),
        };
        self.envelope.signed(attestation, self.keypair.as_ref())
    }
}
