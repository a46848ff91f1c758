//! Reload statistics.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::core::ScriptIdentity;

/// Counters for one script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptStatistics {
    pub reloads: u64,
    pub successes: u64,
    pub failures: u64,
    pub rollbacks: u64,
    pub emergency_rollbacks: u64,
    pub last_compile_time: Option<Duration>,
    pub last_reload_at: Option<SystemTime>,
}

/// Point-in-time snapshot returned by `statistics()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HotReloadStatistics {
    pub total_reloads: u64,
    pub successful_reloads: u64,
    pub failed_reloads: u64,
    pub rollbacks_performed: u64,
    pub debounced_events: u64,
    pub emergency_rollbacks: u64,
    pub rollbacks_unavailable: u64,
    pub average_compile_time: Duration,
    pub average_reload_time: Duration,
    pub last_reload_at: Option<SystemTime>,
    pub scripts: BTreeMap<ScriptIdentity, ScriptStatistics>,
}

impl HotReloadStatistics {
    /// Successful share of finished reloads, `0.0` before the first one.
    pub fn success_rate(&self) -> f64 {
        let finished = self.successful_reloads + self.failed_reloads;
        if finished == 0 {
            return 0.0;
        }
        self.successful_reloads as f64 / finished as f64
    }
}

#[derive(Debug, Default)]
struct Timings {
    compile_total: Duration,
    compile_count: u32,
    reload_total: Duration,
    reload_count: u32,
    last_reload_at: Option<SystemTime>,
}

fn average(total: Duration, count: u32) -> Duration {
    total.checked_div(count).unwrap_or_default()
}

/// Thread-safe recorder behind the snapshot.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    rollbacks: AtomicU64,
    emergency: AtomicU64,
    unavailable: AtomicU64,
    /// Shared with the debouncer, which increments it on every cancellation.
    debounced: Arc<AtomicU64>,
    timings: Mutex<Timings>,
    scripts: DashMap<ScriptIdentity, ScriptStatistics>,
}

impl StatsRecorder {
    pub fn debounced_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.debounced)
    }

    fn script(&self, id: &ScriptIdentity, update: impl FnOnce(&mut ScriptStatistics)) {
        update(&mut self.scripts.entry(id.clone()).or_default());
    }

    pub fn record_attempt(&self, id: &ScriptIdentity) {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.script(id, |s| s.reloads += 1);
    }

    pub fn record_compile_time(&self, id: &ScriptIdentity, elapsed: Duration) {
        {
            let mut timings = self.timings.lock();
            timings.compile_total += elapsed;
            timings.compile_count += 1;
        }
        self.script(id, |s| s.last_compile_time = Some(elapsed));
    }

    pub fn record_success(&self, id: &ScriptIdentity, elapsed: Duration) {
        self.successful.fetch_add(1, Ordering::SeqCst);
        let now = self.finish_reload(elapsed);
        self.script(id, |s| {
            s.successes += 1;
            s.last_reload_at = Some(now);
        });
    }

    pub fn record_failure(&self, id: &ScriptIdentity, elapsed: Duration) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let now = self.finish_reload(elapsed);
        self.script(id, |s| {
            s.failures += 1;
            s.last_reload_at = Some(now);
        });
    }

    pub fn record_rollback(&self, id: &ScriptIdentity) {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.script(id, |s| s.rollbacks += 1);
    }

    pub fn record_emergency(&self, id: &ScriptIdentity) {
        self.emergency.fetch_add(1, Ordering::SeqCst);
        self.script(id, |s| s.emergency_rollbacks += 1);
    }

    pub fn record_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::SeqCst);
    }

    fn finish_reload(&self, elapsed: Duration) -> SystemTime {
        let now = SystemTime::now();
        let mut timings = self.timings.lock();
        timings.reload_total += elapsed;
        timings.reload_count += 1;
        timings.last_reload_at = Some(now);
        now
    }

    pub fn snapshot(&self) -> HotReloadStatistics {
        let (average_compile_time, average_reload_time, last_reload_at) = {
            let t = self.timings.lock();
            (
                average(t.compile_total, t.compile_count),
                average(t.reload_total, t.reload_count),
                t.last_reload_at,
            )
        };

        HotReloadStatistics {
            total_reloads: self.total.load(Ordering::SeqCst),
            successful_reloads: self.successful.load(Ordering::SeqCst),
            failed_reloads: self.failed.load(Ordering::SeqCst),
            rollbacks_performed: self.rollbacks.load(Ordering::SeqCst),
            debounced_events: self.debounced.load(Ordering::SeqCst),
            emergency_rollbacks: self.emergency.load(Ordering::SeqCst),
            rollbacks_unavailable: self.unavailable.load(Ordering::SeqCst),
            average_compile_time,
            average_reload_time,
            last_reload_at,
            scripts: self
                .scripts
                .iter()
                .map(|s| (s.key().clone(), s.value().clone()))
                .collect(),
        }
    }
}
