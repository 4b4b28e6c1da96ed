//! Per-client sliding-window rate limiter, applied before any retrieval or
//! generation work. Each client's recent-timestamp queue lives behind its own
//! map-shard lock, so the evict-check-record sequence is atomic per client and
//! concurrent requests cannot jointly exceed the window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

pub struct RateLimiter {
    clients: DashMap<String, VecDeque<Instant>>,
    window: Duration,
    max_hits: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_hits: usize) -> Self {
        Self {
            clients: DashMap::new(),
            window,
            max_hits,
        }
    }

    /// Admit and record the request if the client is under its window
    /// budget; reject without recording otherwise.
    pub fn allow(&self, client_id: &str) -> bool {
        self.allow_at(client_id, Instant::now())
    }

    pub fn allow_at(&self, client_id: &str, now: Instant) -> bool {
        let mut queue = self.clients.entry(client_id.to_string()).or_default();

        while queue
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            queue.pop_front();
        }

        if queue.len() < self.max_hits {
            queue.push_back(now);
            true
        } else {
            tracing::debug!(client = %client_id, "Rate limit exceeded");
            false
        }
    }
}
