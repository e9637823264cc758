use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per client within one window.
    pub limit: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenBucketConfig {
    /// Largest burst a submitter can spend at once.
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl Default for TokenBucketConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            refill_per_sec: 5.0,
        }
    }
}

/// A limiter whose per-client state can be pruned in the background.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Drops state for idle clients. Returns how many were removed.
    async fn sweep(&self) -> usize;
}

/// Per-client sliding-window request limiter.
///
/// Keeps the admission timestamps of each client and drops the ones that fell
/// out of the window before counting.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request from `client` and reports whether it is within the limit.
    pub async fn allow(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let log = clients.entry(client.to_string()).or_default();
        prune(log, now, self.config.window);

        if log.len() < self.config.limit {
            log.push_back(now);
            true
        } else {
            debug!(client, limit = self.config.limit, "rate limit exceeded");
            false
        }
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

#[async_trait]
impl Sweep for SlidingWindowRateLimiter {
    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, log| {
            prune(log, now, self.config.window);
            !log.is_empty()
        });
        before - clients.len()
    }
}

fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = log.front() {
        if now.duration_since(oldest) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant, config: TokenBucketConfig) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens =
                (self.tokens + elapsed * config.refill_per_sec).min(f64::from(config.capacity));
            self.last_refill = now;
        }
    }
}

/// Per-submitter token bucket guarding payment submission.
///
/// Each submitter starts with a full bucket of `capacity` tokens, spends one per
/// request and regains `refill_per_sec` tokens every second.
#[derive(Debug)]
pub struct TokenBucketRateLimiter {
    config: TokenBucketConfig,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl TokenBucketRateLimiter {
    pub fn new(config: TokenBucketConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Takes a token from `submitter`'s bucket if one is available.
    pub async fn allow(&self, submitter: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(submitter.to_string())
            .or_insert_with(|| TokenBucket {
                tokens: f64::from(self.config.capacity),
                last_refill: now,
            });
        bucket.refill(now, self.config);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            debug!(submitter, "token bucket empty");
            false
        }
    }

    pub async fn tracked_submitters(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

#[async_trait]
impl Sweep for TokenBucketRateLimiter {
    /// A bucket that has refilled completely carries no state worth keeping.
    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket.refill(now, self.config);
            bucket.tokens < f64::from(self.config.capacity)
        });
        before - buckets.len()
    }
}

/// Sweeps every limiter each `interval` until `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_sweeper(
    limiters: Vec<Arc<dyn Sweep>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut removed = 0;
                    for limiter in &limiters {
                        removed += limiter.sweep().await;
                    }
                    if removed > 0 {
                        debug!(removed, "rate limiters swept idle clients");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("rate limiter sweeper stopped");
    })
}
