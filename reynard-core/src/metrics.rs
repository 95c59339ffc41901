//! Runtime metrics for the world loop.
//!
//! Lifetime counters are lock-free `AtomicU64`s. Tick timing history sits
//! behind a `parking_lot::Mutex` since it is written once per tick and read
//! rarely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

/// Number of tick timings retained for percentiles.
const HISTORY_LEN: usize = 256;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// World-level event counters.
#[derive(Debug)]
pub struct WorldCounters {
    /// Ticks completed.
    pub ticks: AtomicU64,
    /// Agents created.
    pub agents_created: AtomicU64,
    /// Agents removed.
    pub agents_removed: AtomicU64,
    /// Per-agent failures swallowed during ticks.
    pub agent_errors: AtomicU64,
    /// Ticks that exceeded the budget.
    pub ticks_over_budget: AtomicU64,
    /// Agents written to storage.
    pub agents_saved: AtomicU64,
    /// Agents read from storage.
    pub agents_loaded: AtomicU64,
}

impl WorldCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            agents_created: AtomicU64::new(0),
            agents_removed: AtomicU64::new(0),
            agent_errors: AtomicU64::new(0),
            ticks_over_budget: AtomicU64::new(0),
            agents_saved: AtomicU64::new(0),
            agents_loaded: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            agents_created: self.agents_created.load(Ordering::Relaxed),
            agents_removed: self.agents_removed.load(Ordering::Relaxed),
            agent_errors: self.agent_errors.load(Ordering::Relaxed),
            ticks_over_budget: self.ticks_over_budget.load(Ordering::Relaxed),
            agents_saved: self.agents_saved.load(Ordering::Relaxed),
            agents_loaded: self.agents_loaded.load(Ordering::Relaxed),
        }
    }
}

impl Default for WorldCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Ticks completed.
    pub ticks: u64,
    /// Agents created.
    pub agents_created: u64,
    /// Agents removed.
    pub agents_removed: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
    /// Over-budget ticks.
    pub ticks_over_budget: u64,
    /// Agents saved.
    pub agents_saved: u64,
    /// Agents loaded.
    pub agents_loaded: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus exposition text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("reynard_ticks_total", "World ticks completed", self.ticks),
            ("reynard_agents_created_total", "Agents created", self.agents_created),
            ("reynard_agents_removed_total", "Agents removed", self.agents_removed),
            ("reynard_agent_errors_total", "Per-agent tick failures", self.agent_errors),
            ("reynard_ticks_over_budget_total", "Ticks over budget", self.ticks_over_budget),
            ("reynard_agents_saved_total", "Agents written to storage", self.agents_saved),
            ("reynard_agents_loaded_total", "Agents read from storage", self.agents_loaded),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tick budget monitor
// ---------------------------------------------------------------------------

/// Tracks wall-clock time spent per world tick.
#[derive(Debug)]
pub struct TickBudgetMonitor {
    budget_ms: f64,
    history: Mutex<TickHistory>,
}

#[derive(Debug)]
struct TickHistory {
    timings: Vec<f64>,
    write_idx: usize,
    count: u64,
    last_over_budget: bool,
}

impl TickBudgetMonitor {
    /// A monitor with the given per-tick budget in milliseconds.
    #[must_use]
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget_ms,
            history: Mutex::new(TickHistory {
                timings: vec![0.0; HISTORY_LEN],
                write_idx: 0,
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Start timing a tick; the timing is recorded when the guard drops.
    pub fn begin_tick(&self) -> TickGuard<'_> {
        TickGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record a tick timing in milliseconds.
    pub fn record(&self, ms: f64) {
        let mut h = self.history.lock();
        let idx = h.write_idx;
        let len = h.timings.len();
        h.timings[idx] = ms;
        h.write_idx = (idx + 1) % len;
        h.count += 1;
        h.last_over_budget = ms > self.budget_ms;
    }

    /// Most recent tick timing (milliseconds), zero before the first tick.
    #[must_use]
    pub fn last_tick_ms(&self) -> f64 {
        let h = self.history.lock();
        if h.count == 0 {
            return 0.0;
        }
        let idx = h.write_idx.checked_sub(1).unwrap_or(h.timings.len() - 1);
        h.timings[idx]
    }

    /// Whether the most recent tick exceeded the budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// Number of ticks recorded.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.history.lock().count
    }

    /// The configured budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }

    /// P50 / P95 / P99 / max over the retained history.
    #[must_use]
    pub fn percentiles(&self) -> TickPercentiles {
        let h = self.history.lock();
        let n = usize::try_from(h.count).map_or(h.timings.len(), |c| c.min(h.timings.len()));
        if n == 0 {
            return TickPercentiles::default();
        }
        let mut sorted = h.timings[..n].to_vec();
        sorted.sort_by(f64::total_cmp);

        let at = |q: f64| sorted[((n as f64 * q) as usize).min(n - 1)];
        let over = sorted.iter().filter(|&&t| t > self.budget_ms).count();
        TickPercentiles {
            p50: at(0.5),
            p95: at(0.95),
            p99: at(0.99),
            max: sorted[n - 1],
            over_budget_ratio: over as f64 / n as f64,
        }
    }
}

/// Records elapsed time into its monitor when dropped.
pub struct TickGuard<'a> {
    monitor: &'a TickBudgetMonitor,
    start: Instant,
}

impl TickGuard<'_> {
    /// Milliseconds elapsed so far.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.monitor.record(self.elapsed_ms());
    }
}

/// Tick timing percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickPercentiles {
    /// Median.
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Slowest retained tick.
    pub max: f64,
    /// Fraction of retained ticks over budget.
    pub over_budget_ratio: f64,
}
