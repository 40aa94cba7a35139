//! Advice configuration.

use serde::{Deserialize, Serialize};

use memento_core::constants::{ENV_KEY_PREFIX, ENV_SERIALIZE_CALLS, KEY_PREFIX_SEPARATOR};

/// Caching advice configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdviceConfig {
    /// Namespace prepended to every generated key
    pub key_prefix: Option<String>,
    /// Hold a lock across lookup, proceed and store
    pub serialize_calls: bool,
}

impl AdviceConfig {
    /// Creates a config with a key prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Enables the call lock.
    pub fn serialized(mut self) -> Self {
        self.serialize_calls = true;
        self
    }

    /// Reads `MEMENTO_KEY_PREFIX` and `MEMENTO_SERIALIZE_CALLS`.
    ///
    /// Unset variables keep their defaults. An empty prefix counts as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from variables resolved by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            key_prefix: lookup(ENV_KEY_PREFIX).filter(|p| !p.is_empty()),
            serialize_calls: lookup(ENV_SERIALIZE_CALLS)
                .map(|v| v != "false" && v != "0")
                .unwrap_or(false),
        }
    }

    /// Applies the configured prefix to a generated key.
    pub(crate) fn scoped_key(&self, key: String) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}{KEY_PREFIX_SEPARATOR}{key}"),
            None => key,
        }
    }
}
