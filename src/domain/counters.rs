//! Counter entries, identifiers and the key namespace they live under.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use super::error::DomainError;

/// Lifetime given to a freshly (re)initialized counter and to every remote write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Namespace prepended to every logical counter identifier.
pub const DEFAULT_KEY_PREFIX: &str = "counter_";

/// In-memory state of a single counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    pub value: i64,
    pub expiry: Instant,
}

impl CounterEntry {
    /// A zero-valued entry expiring `ttl` after `now`.
    pub fn fresh(now: Instant, ttl: Duration) -> Self {
        Self {
            value: 0,
            expiry: now + ttl,
        }
    }

    /// Entry reconstructed from a remote value and its remaining lifetime.
    pub fn restored(value: i64, now: Instant, ttl: Duration) -> Self {
        Self {
            value,
            expiry: now + ttl,
        }
    }

    /// An entry is gone once its expiry is at or before `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiry <= now
    }
}

/// Caller-supplied counter identifier, guaranteed non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterId(String);

impl CounterId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::validation("counter id must not be empty"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps logical identifiers to fully-qualified store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn qualify(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

impl Default for KeyNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}
