//! Constants shared across memento crates.

/// Separator placed between a configured key prefix and the generated key.
pub const KEY_PREFIX_SEPARATOR: char = ':';

/// Environment variable holding the default key prefix.
pub const ENV_KEY_PREFIX: &str = "MEMENTO_KEY_PREFIX";

/// Environment variable enabling the per-advice call lock.
pub const ENV_SERIALIZE_CALLS: &str = "MEMENTO_SERIALIZE_CALLS";
