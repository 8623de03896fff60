/*!
 * Synchronization Configuration
 *
 * Runtime configuration for fairness policy and contention logging
 */

use std::time::Duration;

/// Environment variable selecting the default reader/writer policy
pub const RW_POLICY_ENV: &str = "LOCKKIT_RW_POLICY";

/// Fairness policy of a [`ReadWriteLock`](super::ReadWriteLock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RwPolicy {
    /// Queued writers go before new readers (no writer starvation)
    #[default]
    WriterPreferred,
    /// Queued readers go before writers (maximum read concurrency)
    ReaderPreferred,
}

impl RwPolicy {
    /// Parse a policy name (`writer`/`reader`, case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "writer" | "writer-preferred" | "writer_preferred" => Some(Self::WriterPreferred),
            "reader" | "reader-preferred" | "reader_preferred" => Some(Self::ReaderPreferred),
            _ => None,
        }
    }
}

/// Synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Reader/writer fairness policy
    pub rw_policy: RwPolicy,
    /// Blocking waits longer than this are logged at debug level
    pub slow_wait_threshold: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl SyncConfig {
    pub(crate) const DEFAULT: Self = Self::writer_preferred();

    /// Writer preference (the default)
    pub const fn writer_preferred() -> Self {
        Self {
            rw_policy: RwPolicy::WriterPreferred,
            slow_wait_threshold: Duration::from_millis(1),
        }
    }

    /// Reader preference, for read-mostly data where writers can wait
    pub const fn reader_preferred() -> Self {
        Self {
            rw_policy: RwPolicy::ReaderPreferred,
            slow_wait_threshold: Duration::from_millis(1),
        }
    }

    /// Override the slow wait threshold
    pub const fn with_slow_wait_threshold(mut self, threshold: Duration) -> Self {
        self.slow_wait_threshold = threshold;
        self
    }

    /// Default configuration with the policy taken from `LOCKKIT_RW_POLICY`
    ///
    /// Unknown values fall back to writer preference.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(RW_POLICY_ENV) {
            match RwPolicy::parse(&value) {
                Some(policy) => config.rw_policy = policy,
                None => tracing::warn!(
                    value = %value,
                    "unknown {}, using writer preference",
                    RW_POLICY_ENV
                ),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_writer_preferred() {
        assert_eq!(SyncConfig::default().rw_policy, RwPolicy::WriterPreferred);
        assert_eq!(RwPolicy::default(), RwPolicy::WriterPreferred);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(RwPolicy::parse("Reader"), Some(RwPolicy::ReaderPreferred));
        assert_eq!(RwPolicy::parse(" writer "), Some(RwPolicy::WriterPreferred));
        assert_eq!(RwPolicy::parse("fifo"), None);
    }

    #[test]
    fn test_threshold_override() {
        let config = SyncConfig::reader_preferred().with_slow_wait_threshold(Duration::ZERO);
        assert_eq!(config.rw_policy, RwPolicy::ReaderPreferred);
        assert_eq!(config.slow_wait_threshold, Duration::ZERO);
    }
}
