//! Client-side sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Which budget a request draws from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LimitKind {
    Login,
    Api,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limit {
    pub max_requests: usize,
    pub window: Duration,
}

impl LimitKind {
    pub fn limit(&self) -> Limit {
        match self {
            LimitKind::Login => Limit {
                max_requests: 5,
                window: Duration::from_secs(300),
            },
            LimitKind::Api => Limit {
                max_requests: 100,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over budget; `retry_after` is rounded up to whole seconds.
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[derive(Debug)]
struct Bucket {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl Bucket {
    fn expire(&mut self, now: Instant) {
        while let Some(oldest) = self.stamps.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Per-key sliding-window limiter.
///
/// Time is passed in by the caller so behaviour is deterministic under test.
/// Keys whose window has fully expired are dropped on the next check.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: HashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, key: &str, kind: LimitKind, now: Instant) -> RateDecision {
        let limit = kind.limit();

        self.buckets.retain(|_, bucket| {
            bucket.expire(now);
            !bucket.stamps.is_empty()
        });

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket {
                window: limit.window,
                stamps: VecDeque::new(),
            });
        bucket.window = limit.window;
        let stamps = &mut bucket.stamps;

        if stamps.len() >= limit.max_requests {
            let retry_after = match stamps.front() {
                Some(oldest) => (*oldest + limit.window).saturating_duration_since(now),
                None => Duration::ZERO,
            };
            return RateDecision::Limited {
                retry_after: ceil_to_seconds(retry_after),
            };
        }

        stamps.push_back(now);
        RateDecision::Allowed
    }

    pub fn reset(&mut self, key: &str) {
        self.buckets.remove(key);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Number of keys with requests still inside their window.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }
}

fn ceil_to_seconds(d: Duration) -> Duration {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    Duration::from_secs(secs)
}
