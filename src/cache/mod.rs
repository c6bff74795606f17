//! Cache policy and coordination
//!
//! - `FreshnessPolicy`: decides whether a cached entry must be revalidated
//! - `InFlight`: per-key async locks so one key is fetched at most once at a time

mod freshness;
mod inflight;

pub use freshness::{needs_refresh, FreshnessPolicy, DEFAULT_TTL_SECS};
pub use inflight::{InFlight, KeyGuard};
