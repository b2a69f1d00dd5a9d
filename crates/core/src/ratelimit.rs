//! Token-bucket rate limiting keyed by API key id or client IP (spec §4.11).
//!
//! Crate: `governor`, precedented in the retrieval pack's manifests for this
//! exact purpose (see DESIGN.md) — avoids hand-rolling atomic bucket
//! bookkeeping the way the teacher avoids hand-rolling a symbol table by
//! reaching for `dashmap`.

use crate::error::{CoreError, CoreResult};
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

/// Route classes with independent rate-limit buckets (spec §4.11 defaults).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Global,
    Search,
    Index,
}

type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// One keyed limiter per route class; a request must pass both its class's
/// bucket and the global bucket (spec §4.11: "100 req/min global; search
/// endpoints 50 req/min ...; index endpoints 10 req/min").
pub struct RateGate {
    global: KeyedLimiter,
    search: KeyedLimiter,
    index: KeyedLimiter,
    clock: DefaultClock,
}

impl RateGate {
    pub fn new(global_per_min: u32, search_per_min: u32, index_per_min: u32) -> Self {
        Self {
            global: RateLimiter::dashmap(quota_per_minute(global_per_min)),
            search: RateLimiter::dashmap(quota_per_minute(search_per_min)),
            index: RateLimiter::dashmap(quota_per_minute(index_per_min)),
            clock: DefaultClock::default(),
        }
    }

    /// Check `client_key` (an api key id, or the client IP for unauthenticated
    /// calls) against the global bucket and `class`'s bucket. Returns
    /// `RateLimited { retry_after_secs }` on the first bucket to reject.
    pub fn check(&self, client_key: &str, class: RouteClass) -> CoreResult<()> {
        self.check_one(&self.global, client_key)?;
        match class {
            RouteClass::Global => {}
            RouteClass::Search => self.check_one(&self.search, client_key)?,
            RouteClass::Index => self.check_one(&self.index, client_key)?,
        }
        Ok(())
    }

    fn check_one(&self, limiter: &KeyedLimiter, key: &str) -> CoreResult<()> {
        match limiter.check_key(&key.to_string()) {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(self.clock.now());
                Err(CoreError::RateLimited { retry_after_secs: wait.as_secs().max(1) })
            }
        }
    }
}

fn quota_per_minute(per_min: u32) -> Quota {
    let n = NonZeroU32::new(per_min.max(1)).unwrap();
    Quota::per_minute(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_within_quota() {
        let gate = RateGate::new(100, 50, 10);
        for _ in 0..5 {
            gate.check("client-a", RouteClass::Search).unwrap();
        }
    }

    #[test]
    fn rejects_once_quota_exhausted() {
        let gate = RateGate::new(100, 2, 10);
        gate.check("client-a", RouteClass::Search).unwrap();
        gate.check("client-a", RouteClass::Search).unwrap();
        let err = gate.check("client-a", RouteClass::Search).unwrap_err();
        assert!(matches!(err, CoreError::RateLimited { .. }));
    }

    #[test]
    fn buckets_are_independent_per_client() {
        let gate = RateGate::new(100, 1, 10);
        gate.check("client-a", RouteClass::Search).unwrap();
        assert!(gate.check("client-a", RouteClass::Search).is_err());
        gate.check("client-b", RouteClass::Search).unwrap();
    }
}
