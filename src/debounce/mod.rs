//! Per-file debouncing of change notifications.
//!
//! Every file gets its own timer task. A new change for the same file aborts
//! the pending timer and starts a fresh one, so a burst of saves settles into
//! a single change once the file has been quiet for `delay`.
//!
//! ```text
//! on_change(a) ──► timer(a, g1) ──abort──┐
//! on_change(a) ──► timer(a, g2) ─────────┴─► sleep(delay) ─► settled_tx.send(a)
//! ```
//!
//! Timers hold only a `Weak` to the shared state, and a timer fires only if
//! its generation is still the registered one. A background sweep drops
//! timers that have been idle longer than `idle_timeout`.


use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::debug;

pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// `tokio::time::interval` rejects a zero period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    pub delay: Duration,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
    last_activity: Instant,
}

struct Inner {
    settings: DebounceSettings,
    timers: DashMap<PathBuf, PendingTimer>,
    settled_tx: mpsc::UnboundedSender<PathBuf>,
    debounced: Arc<AtomicU64>,
    generation: AtomicU64,
}

impl Inner {
    /// Drop timers idle for at least `idle_timeout`. Returns how many.
    fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle = self.settings.idle_timeout;
        let before = self.timers.len();

        self.timers.retain(|path, timer| {
            let keep = now.duration_since(timer.last_activity) < idle;
            if !keep {
                timer.handle.abort();
                debug!("debounce"; "dropped idle timer: {}", path.display());
            }
            keep
        });

        before.saturating_sub(self.timers.len())
    }
}

/// Coalesces bursts of changes per file into settled changes.
pub struct Debouncer {
    inner: Arc<Inner>,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Start a debouncer emitting settled paths on `settled_tx`.
    ///
    /// Every cancelled timer increments `debounced`. Must be called from
    /// within a tokio runtime (the sweep task is spawned here).
    pub fn new(
        settings: DebounceSettings,
        settled_tx: mpsc::UnboundedSender<PathBuf>,
        debounced: Arc<AtomicU64>,
    ) -> Self {
        let inner = Arc::new(Inner {
            settings,
            timers: DashMap::new(),
            settled_tx,
            debounced,
            generation: AtomicU64::new(0),
        });
        let sweep = spawn_sweep(Arc::downgrade(&inner), settings.sweep_interval);

        Self {
            inner,
            sweep: Mutex::new(Some(sweep)),
        }
    }

    /// Record a change for `path`, restarting its quiet period.
    pub fn on_change(&self, path: PathBuf) {
        let inner = &self.inner;
        let generation = inner.generation.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let deadline = now + inner.settings.delay;

        match inner.timers.entry(path.clone()) {
            Entry::Occupied(mut pending) => {
                pending.get().handle.abort();
                inner.debounced.fetch_add(1, Ordering::SeqCst);
                debug!("debounce"; "coalesced: {}", path.display());

                let handle = spawn_timer(Arc::downgrade(inner), path, generation, deadline);
                pending.insert(PendingTimer {
                    generation,
                    handle,
                    last_activity: now,
                });
            }
            Entry::Vacant(slot) => {
                let handle = spawn_timer(Arc::downgrade(inner), path, generation, deadline);
                slot.insert(PendingTimer {
                    generation,
                    handle,
                    last_activity: now,
                });
            }
        }
    }

    /// Whether a timer is pending for `path`.
    pub fn is_pending(&self, path: &Path) -> bool {
        self.inner.timers.contains_key(path)
    }

    /// Number of files with a pending timer.
    pub fn pending(&self) -> usize {
        self.inner.timers.len()
    }

    /// Total cancellations so far.
    pub fn debounced_events(&self) -> u64 {
        self.inner.debounced.load(Ordering::SeqCst)
    }

    /// Cancel every pending timer and the sweep. Not counted as debounced.
    pub fn shutdown(&self) {
        if let Some(sweep) = self.sweep.lock().take() {
            sweep.abort();
        }
        self.inner.timers.retain(|_, timer| {
            timer.handle.abort();
            false
        });
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_timer(
    inner: Weak<Inner>,
    path: PathBuf,
    generation: u64,
    deadline: Instant,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        // A newer change may have replaced this timer after it woke up.
        let fired = inner
            .timers
            .remove_if(&path, |_, timer| timer.generation == generation)
            .is_some();
        if fired {
            debug!("debounce"; "settled: {}", path.display());
            let _ = inner.settled_tx.send(path);
        }
    })
}

fn spawn_sweep(inner: Weak<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(MIN_SWEEP_INTERVAL));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let dropped = inner.sweep();
            if dropped > 0 {
                debug!("debounce"; "swept {} idle timer(s)", dropped);
            }
        }
    })
}
