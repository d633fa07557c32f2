//! Rate Limiting Infrastructure
//!
//! Per-client windowed request counters, the storage seam they sit behind,
//! and the periodic sweeper that evicts expired windows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(5 * 60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Requests still admissible in the current window
    pub remaining: u32,
    /// Time until the window resets; zero when admitted
    pub retry_after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The caller could not be identified (empty key)
    #[error("Client identifier is empty")]
    InvalidIdentifier,
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment the counter for `key` as one atomic step
    async fn check_and_increment(
        &self,
        key: &str,
        now: Instant,
    ) -> Result<RateLimitResult, RateLimitError>;
}

/// One client's current window
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
}

impl ClientWindow {
    fn starting_at(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// In-process rate limit store
///
/// A single mutex covers check-and-update so two concurrent requests from the
/// same client can never both observe spare quota. State is lost on restart.
#[derive(Debug)]
pub struct InMemoryRateLimitStore {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, ClientWindow>>,
}

impl InMemoryRateLimitStore {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decide whether `key` may make another request at `now`
    ///
    /// A rejected attempt does not consume quota.
    pub fn admit(&self, key: &str, now: Instant) -> Result<RateLimitResult, RateLimitError> {
        if key.trim().is_empty() {
            return Err(RateLimitError::InvalidIdentifier);
        }

        let max = self.config.max_requests;
        let window = self.config.window;
        let mut windows = self.lock();

        if let Some(entry) = windows.get_mut(key) {
            if !entry.is_expired(now, window) {
                if entry.count >= max {
                    let elapsed = now.saturating_duration_since(entry.window_start);
                    return Ok(RateLimitResult {
                        allowed: false,
                        remaining: 0,
                        retry_after: window.saturating_sub(elapsed),
                    });
                }
                entry.count += 1;
                return Ok(RateLimitResult {
                    allowed: true,
                    remaining: max - entry.count,
                    retry_after: Duration::ZERO,
                });
            }
        }

        // First request, or the previous window has run out
        windows.insert(key.to_string(), ClientWindow::starting_at(now));
        Ok(RateLimitResult {
            allowed: max >= 1,
            remaining: max.saturating_sub(1),
            retry_after: Duration::ZERO,
        })
    }

    /// Remove every window that has fully expired at `now`
    ///
    /// Returns the number of evicted clients.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let window = self.config.window;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, entry| !entry.is_expired(now, window));
        before - windows.len()
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    // The map is only ever mutated inside one call, so a poisoned lock still
    // holds consistent data.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        now: Instant,
    ) -> Result<RateLimitResult, RateLimitError> {
        self.admit(key, now)
    }
}

// ============================================================================
// Sweeper task
// ============================================================================

/// Handle to a running sweeper; stopping it joins the task
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Rate limit sweeper ended abnormally");
        }
    }
}

/// Spawn a task that evicts expired windows every `period`
///
/// The first sweep runs one full period after start.
pub fn spawn_sweeper(store: Arc<InMemoryRateLimitStore>, period: Duration) -> SweeperHandle {
    let (tx, mut rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        tracing::info!(period_secs = period.as_secs_f64(), "Rate limit sweeper started");

        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = ticker.tick() => {
                    let removed = store.sweep_expired(Instant::now());
                    if removed > 0 {
                        tracing::debug!(
                            removed,
                            remaining = store.tracked_clients(),
                            "Swept expired rate limit windows"
                        );
                    }
                }
            }
        }

        tracing::info!("Rate limit sweeper stopped");
    });

    SweeperHandle {
        shutdown: Some(tx),
        task,
    }
}
