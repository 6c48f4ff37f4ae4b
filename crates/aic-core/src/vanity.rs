//! Vanity identifier search
//!
//! Tries random `nonce` values in a genesis document and keeps the one whose
//! PID sorts lowest. Lower heads certify more search work, see
//! [`Pid::bit_strength`].

use crate::envelope::CanonicalForm;
use crate::errors::Result;
use crate::pid::Pid;
use crate::types::{Document, Value};
use rand::Rng;

/// Field the search writes into the document
pub const NONCE_FIELD: &str = "nonce";

/// Nonces stay below 2^53 so every JSON consumer reads them exactly
pub const MAX_NONCE: u64 = 1 << 53;

/// Best document found by [`search`]
#[derive(Debug, Clone, PartialEq)]
pub struct VanityResult {
    /// Document with the winning nonce
    pub document: Document,
    /// Its PID
    pub pid: Pid,
    /// Security margin of the PID
    pub bit_strength: u32,
    /// Nonces tried
    pub attempts: u64,
}

/// Try `attempts` random nonces and keep the lowest PID.
///
/// The unmodified document is the baseline, so zero attempts returns it as
/// is.
pub fn search<R: Rng>(
    genesis: &Document,
    attempts: u64,
    rng: &mut R,
) -> Result<VanityResult> {
    search_in(genesis, attempts, CanonicalForm::Insertion, rng)
}

/// [`search`] for a ledger that derives PIDs in `form`
pub fn search_in<R: Rng>(
    genesis: &Document,
    attempts: u64,
    form: CanonicalForm,
    rng: &mut R,
) -> Result<VanityResult> {
    let mut best_document = genesis.clone();
    let mut best_pid = Pid::of_document_in(genesis, form)?;
    let mut candidate = genesis.clone();

    for _ in 0..attempts {
        let nonce = rng.gen_range(0..MAX_NONCE);
        candidate.insert(NONCE_FIELD.to_string(), Value::from(nonce));
        let pid = Pid::of_document_in(&candidate, form)?;
        if pid < best_pid {
            tracing::debug!(%pid, nonce, "new best vanity pid");
            best_pid = pid;
            best_document = candidate.clone();
        }
    }

    Ok(VanityResult {
        bit_strength: best_pid.bit_strength(),
        document: best_document,
        pid: best_pid,
        attempts,
    })
}
