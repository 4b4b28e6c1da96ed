//! Response cache and budget guard.
//!
//! The cache memoizes remote-model responses under a content hash with a TTL;
//! the budget guard tracks approximate daily spend and refuses remote calls
//! once the ceiling is reached. Both are shared mutable state across request
//! tasks, so every read-check-then-write runs under one lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use lru::LruCache;
use parking_lot::Mutex;

/// Deterministic key over (normalized user text, exact ordered context
/// snippets, backend model id). Any change in context or model misses.
pub fn cache_key(normalized_text: &str, context: &[String], model_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    normalized_text.hash(&mut hasher);
    context.len().hash(&mut hasher);
    for snippet in context {
        snippet.hash(&mut hasher);
    }
    model_id.hash(&mut hasher);
    hasher.finish()
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<u64, CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn get(&self, key: u64) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: u64, value: String) {
        self.put_at(key, value, Instant::now());
    }

    /// Lookup with the TTL check and expiry eviction under one lock, so a
    /// concurrent put never resurrects an expired entry.
    pub fn get_at(&self, key: u64, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(&key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put_at(&self, key: u64, value: String, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        // LruCache::put evicts the least-recently-used entry at capacity,
        // which approximates dropping the near-earliest-expiring one.
        self.entries.lock().put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Quick token estimate (chars / 4), matching the prompt-size accounting used
/// for cost estimation everywhere in this crate.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

struct Ledger {
    day: NaiveDate,
    spent_estimate: f64,
}

/// Process-wide daily spend gate for the remote backend. Callers take an
/// atomic reservation before generating and refund it when the call yields no
/// text, so only successful calls count toward the total and two concurrent
/// turns can never jointly clear a ceiling that admits only one of them. The
/// running total resets at UTC-date rollover.
pub struct BudgetGuard {
    ledger: Mutex<Ledger>,
    daily_ceiling: f64,
    cost_per_1k_tokens: f64,
}

impl BudgetGuard {
    pub fn new(daily_ceiling: f64, cost_per_1k_tokens: f64) -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                day: Utc::now().date_naive(),
                spent_estimate: 0.0,
            }),
            daily_ceiling,
            cost_per_1k_tokens,
        }
    }

    /// Read-only headroom probe for availability flags. Routing decisions may
    /// race; the reservation below is the actual gate.
    pub fn budget_ok(&self, estimated_tokens: usize) -> bool {
        self.budget_ok_on(estimated_tokens, Utc::now().date_naive())
    }

    /// Check headroom and provisionally charge under one lock. Returns false
    /// without charging when the estimate would exceed the ceiling.
    pub fn try_reserve(&self, estimated_tokens: usize) -> bool {
        self.try_reserve_on(estimated_tokens, Utc::now().date_naive())
    }

    /// Release a reservation whose call produced no text.
    pub fn refund(&self, estimated_tokens: usize) {
        self.refund_on(estimated_tokens, Utc::now().date_naive());
    }

    /// Today's running estimate (after any pending rollover).
    pub fn spent(&self) -> f64 {
        self.spent_on(Utc::now().date_naive())
    }

    pub fn ceiling(&self) -> f64 {
        self.daily_ceiling
    }

    pub fn budget_ok_on(&self, estimated_tokens: usize, today: NaiveDate) -> bool {
        let mut ledger = self.ledger.lock();
        roll_over(&mut ledger, today);
        ledger.spent_estimate + self.cost_of(estimated_tokens) <= self.daily_ceiling
    }

    pub fn try_reserve_on(&self, estimated_tokens: usize, today: NaiveDate) -> bool {
        let mut ledger = self.ledger.lock();
        roll_over(&mut ledger, today);
        let cost = self.cost_of(estimated_tokens);
        if ledger.spent_estimate + cost > self.daily_ceiling {
            return false;
        }
        ledger.spent_estimate += cost;
        tracing::debug!(
            spent = ledger.spent_estimate,
            ceiling = self.daily_ceiling,
            "Budget reserved"
        );
        true
    }

    pub fn refund_on(&self, estimated_tokens: usize, today: NaiveDate) {
        let mut ledger = self.ledger.lock();
        roll_over(&mut ledger, today);
        ledger.spent_estimate = (ledger.spent_estimate - self.cost_of(estimated_tokens)).max(0.0);
    }

    fn spent_on(&self, today: NaiveDate) -> f64 {
        let mut ledger = self.ledger.lock();
        roll_over(&mut ledger, today);
        ledger.spent_estimate
    }

    fn cost_of(&self, estimated_tokens: usize) -> f64 {
        estimated_tokens as f64 / 1000.0 * self.cost_per_1k_tokens
    }
}

fn roll_over(ledger: &mut Ledger, today: NaiveDate) {
    if ledger.day != today {
        tracing::info!(day = %today, "Budget ledger reset at date rollover");
        ledger.day = today;
        ledger.spent_estimate = 0.0;
    }
}
