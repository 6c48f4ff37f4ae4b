//! Offline CLI commands

use aic_core::{Asymmetric, Document, Ed25519Keypair, KeyType, Pid, SignatureEnvelope, Tick, Tid};
use aic_consortium::ConsortiumConfig;
use aic_ledger::{DocumentReplayer, SkipReason};
use anyhow::{Context, Result};
use std::path::Path;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Print a fresh seed and the did:key it yields
pub fn keygen(key_type: KeyType) {
    let (keypair, seed) = key_type.generate(&mut rand::rngs::OsRng);
    println!("key_type = {}", serde_json::to_string(&key_type).unwrap_or_default());
    println!("key_seed = \"{seed}\"");
    println!("# {}", keypair.did());
}

/// Print the PID, did and strength of a genesis document
pub fn pid(config: &ConsortiumConfig, file: &Path) -> Result<()> {
    let genesis: Document = read_json(file)?;
    let pid = Pid::of_document_in(&genesis, config.canonical_form)?;
    println!("pid:          {pid}");
    println!("did:          {}", pid.did());
    println!("bit strength: {}", pid.bit_strength());
    Ok(())
}

/// Print the strongest variant of a genesis document found in `attempts` nonces
pub fn vanity(config: &ConsortiumConfig, file: &Path, attempts: u64) -> Result<()> {
    let genesis: Document = read_json(file)?;
    let found = aic_core::vanity::search_in(
        &genesis,
        attempts,
        config.canonical_form,
        &mut rand::thread_rng(),
    )?;
    tracing::info!(pid = %found.pid, strength = found.bit_strength, attempts, "vanity search done");
    println!("{}", serde_json::to_string_pretty(&found.document)?);
    Ok(())
}

/// Replay a tick under the configured signing form and policy
pub fn audit(config: &ConsortiumConfig, file: &Path, as_of: Option<&str>) -> Result<()> {
    let tick: Tick = read_json(file)?;
    let as_of = as_of.map(Tid::parse).transpose()?;
    let replayer = DocumentReplayer::new(SignatureEnvelope::new(config.canonical_form))
        .with_policy(config.authorization.build());

    // diff signatures are checked against their own did:key, any local key will do
    let verifier = Ed25519Keypair::generate(&mut rand::rngs::OsRng);
    if !SignatureEnvelope::new(config.canonical_form).check(&tick, &verifier) {
        tracing::warn!(did = %tick.did, key = %tick.key, "tick signature does not verify");
    }

    let report = replayer.replay(&tick.diffs, &verifier, as_of.as_ref())?;
    for tid in &report.applied {
        println!("applied  {tid}");
    }
    for skipped in &report.skipped {
        let reason = match &skipped.reason {
            SkipReason::BadSignature => "bad signature".to_string(),
            SkipReason::Unauthorized => "unauthorized".to_string(),
            SkipReason::Fork { prev, expected } => format!("fork: prev {prev}, head {expected}"),
        };
        println!("skipped  {}  {reason}", skipped.tid);
    }
    println!("head     {}", report.head);
    println!("{}", serde_json::to_string_pretty(&report.document)?);
    Ok(())
}
