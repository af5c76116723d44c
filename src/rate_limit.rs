//! Sliding-window rate limiting for the authentication endpoints.
//!
//! One shared [`RateLimiter`] is constructed at startup from configuration
//! and injected as application data; the hit map behind its single mutex is
//! the only mutation point. Counters live in process memory and reset on
//! restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::AppError;

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Records a hit for `key` (normally a source IP) and rejects it once
    /// the number of hits inside the sliding window reaches the ceiling.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap();
        let entry = hits.entry(key.to_string()).or_default();
        entry.retain(|hit| now.duration_since(*hit) < self.window);
        if entry.len() >= self.max_requests {
            return Err(AppError::TooManyRequests(
                "Too many authentication attempts, please try again later.".into(),
            ));
        }
        entry.push(now);
        Ok(())
    }
}
