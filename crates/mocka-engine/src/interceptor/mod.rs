//! Request interception.
//!
//! Two dependency-injected wrappers around the same resolver, one for each
//! request style: consumers opt in by routing their requests through
//! [`fetch::MockFetch`] or [`xhr::XhrInterceptor`] instead of having ambient
//! calls silently redirected. Each wrapper owns a reference to the real
//! primitive it stands in for.

pub mod fetch;
pub mod xhr;

use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Simulated network latency applied before a fabricated response.
pub const LATENCY_RANGE_MS: RangeInclusive<u64> = 50..=150;

pub(crate) fn simulated_latency() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(LATENCY_RANGE_MS))
}
