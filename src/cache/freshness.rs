use chrono::{DateTime, Duration, Utc};

/// Default time-to-live for the index entry: 7 days, in seconds
pub const DEFAULT_TTL_SECS: u64 = 7 * 24 * 3600;

/// Decides whether a cached entry has to be revalidated
///
/// Only the local `last_check` timestamp is consulted; the remote revision
/// timestamp plays no part in the decision.
///
/// # Arguments
///
/// * `last_check` - When the entry was last revalidated, `None` if there is no
///   entry (or it was never checked)
/// * `now` - The current time
/// * `ttl` - How long an entry stays fresh
///
/// # Returns
///
/// * `true` - Cold cache, or more than `ttl` elapsed since the last check
/// * `false` - The entry can be served as is
pub fn needs_refresh(last_check: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match last_check {
        None => true,
        Some(checked) => now - checked > ttl,
    }
}

/// Staleness policy with a fixed TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    ttl: Duration,
}

impl FreshnessPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Builds a policy from a TTL expressed in seconds
    pub fn from_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Self::new(Duration::try_seconds(secs).unwrap_or(Duration::MAX))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn needs_refresh(&self, last_check: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        needs_refresh(last_check, now, self.ttl)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_secs(DEFAULT_TTL_SECS)
    }
}
