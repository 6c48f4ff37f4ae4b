//! Consortium server configuration
//!
//! Values come from defaults, then an optional TOML file, then `AIC_*`
//! environment variables, and are validated once before the server starts.

use aic_core::{AicError, Asymmetric, CanonicalForm, KeyType, Result};
use std::sync::Arc;
use aic_ledger::PolicyKind;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "AIC_";

/// Runtime configuration of a consortium node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsortiumConfig {
    /// Socket address the HTTP server binds
    pub listen: String,
    /// SQLite database file; ticks are kept in memory when unset
    pub database: Option<PathBuf>,
    /// Signature scheme of the consortium key
    pub key_type: KeyType,
    /// Hex-encoded 32-byte secret of the consortium key
    pub key_seed: Option<String>,
    /// Byte form signatures are computed over
    pub canonical_form: CanonicalForm,
    /// Extra authorization applied to diffs
    pub authorization: PolicyKind,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for ConsortiumConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            database: None,
            key_type: KeyType::default(),
            key_seed: None,
            canonical_form: CanonicalForm::default(),
            authorization: PolicyKind::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ConsortiumConfig {
    /// Parse a TOML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AicError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AicError::config(format!("Invalid TOML: {e}")))
    }

    /// Defaults, overlaid with `path` when it exists, then the environment,
    /// then validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::load_from_file(path)?,
            Some(path) => {
                tracing::debug!(path = %path.display(), "config file absent, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `AIC_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `AIC_*` overrides from any variable source
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();
            match name {
                "LISTEN" => self.listen = value,
                "DATABASE" => self.database = Some(PathBuf::from(value)),
                "KEY_TYPE" => self.key_type = parse_variant(name, value)?,
                "KEY_SEED" => self.key_seed = Some(value),
                "CANONICAL_FORM" => self.canonical_form = parse_variant(name, value)?,
                "AUTHORIZATION" => self.authorization = parse_variant(name, value)?,
                "LOG_FILTER" => self.log_filter = value,
                _ => {}
            }
        }
        Ok(())
    }

    /// Reject values the server cannot start with
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if let Some(seed) = &self.key_seed {
            self.key_type
                .keypair_from_hex(seed)
                .map_err(|e| AicError::config(format!("key_seed: {e}")))?;
        }
        if self.log_filter.trim().is_empty() {
            return Err(AicError::config("log_filter must not be empty"));
        }
        Ok(())
    }

    /// Parsed listen address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| AicError::config(format!("listen {:?}: {e}", self.listen)))
    }

    /// Consortium key from the configured seed, or a fresh key when none is set
    pub fn keypair(&self) -> Result<Arc<dyn Asymmetric>> {
        match &self.key_seed {
            Some(seed) => self.key_type.keypair_from_hex(seed),
            None => {
                tracing::warn!(
                    key_type = ?self.key_type,
                    "no key_seed configured, consortium key is ephemeral"
                );
                Ok(self.key_type.generate(&mut rand::rngs::OsRng).0)
            }
        }
    }
}

/// Read a snake_case enum variant from an environment string
fn parse_variant<T: serde::de::DeserializeOwned>(name: &str, value: String) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value))
        .map_err(|e| AicError::config(format!("{ENV_PREFIX}{name}: {e}")))
}
