//! The five systems.
//!
//! Each system owns its tuning and lifetime counters, never agents. Request
//! operations (`store_memory_for_agent`, `initiate_interaction`, ...) return
//! `bool` / `Option` / empty results; their `try_*` twins return the
//! [`ReynardError`](reynard_core::ReynardError) explaining a refusal.
//!
//! `update` runs once per world tick. Agents are processed independently: an
//! error on one agent is logged, counted in the [`TickReport`] and the tick
//! moves on.
//!
//! | System              | Every tick              | On its interval                 |
//! |---------------------|-------------------------|---------------------------------|
//! | Memory              | decay                   | consolidation                   |
//! | Interaction         | energy recovery         | spontaneous interactions        |
//! | Social              |                         | group health, leadership        |
//! | Learning            | knowledge decay         | opportunity expiry / completion |
//! | Gender              | fluidity, confidence    |                                 |

use reynard_core::Result;
use reynard_core::types::AgentId;
use serde::Serialize;
use tracing::warn;

pub mod gender;
pub mod interaction;
pub mod learning;
pub mod memory;
pub mod social;

pub use gender::GenderSystem;
pub use interaction::InteractionSystem;
pub use learning::LearningSystem;
pub use memory::MemorySystem;
pub use social::SocialSystem;

/// Outcome of one system pass over the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Agents processed without error.
    pub agents_processed: usize,
    /// Agents skipped because processing them failed.
    pub agent_errors: usize,
}

impl TickReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.agents_processed += other.agents_processed;
        self.agent_errors += other.agent_errors;
    }
}

/// Record one agent's result, logging instead of propagating failures.
pub(crate) fn isolate(system: &'static str, agent: AgentId, result: Result<()>, report: &mut TickReport) {
    match result {
        Ok(()) => report.agents_processed += 1,
        Err(e) => {
            warn!(system, agent = %agent, error = %e, "Agent skipped during tick");
            report.agent_errors += 1;
        }
    }
}

/// Accumulates tick deltas until a processing interval has passed.
#[derive(Debug, Clone)]
pub(crate) struct IntervalTimer {
    interval: f64,
    accumulated: f64,
}

impl IntervalTimer {
    pub(crate) fn new(interval: f64) -> Self {
        Self {
            interval: interval.max(0.0),
            accumulated: 0.0,
        }
    }

    /// Add `delta`; once the interval is reached, return the time accumulated
    /// since the last firing and reset.
    pub(crate) fn advance(&mut self, delta: f64) -> Option<f64> {
        self.accumulated += delta;
        if self.accumulated >= self.interval {
            let elapsed = self.accumulated;
            self.accumulated = 0.0;
            Some(elapsed)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_fires_after_interval() {
        let mut timer = IntervalTimer::new(1.0);
        assert!(timer.advance(0.4).is_none());
        assert!(timer.advance(0.4).is_none());
        let elapsed = timer.advance(0.4).expect("fires");
        assert!((elapsed - 1.2).abs() < 1e-9);
        assert!(timer.advance(0.5).is_none());
    }

    #[test]
    fn zero_interval_fires_every_tick() {
        let mut timer = IntervalTimer::new(0.0);
        assert!(timer.advance(0.0).is_some());
        assert!(timer.advance(0.1).is_some());
    }

    #[test]
    fn isolate_counts_errors() {
        let mut report = TickReport::default();
        let agent = AgentId::new();
        isolate("test", agent, Ok(()), &mut report);
        isolate("test", agent, Err(reynard_core::ReynardError::AgentNotFound(agent)), &mut report);
        assert_eq!(report.agents_processed, 1);
        assert_eq!(report.agent_errors, 1);
    }
}
