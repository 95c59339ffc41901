//! Memory decay.
//!
//! Memories younger than the configured age threshold are untouched. Older
//! memories lose importance every tick:
//!
//! ```text
//! loss = decay_rate × Δt × age_factor
//! age_factor = clamp(age / threshold, 1, max_age_factor)
//!              × 1 / (1 + log2(1 + access_count))     (rehearsal)
//!              × (1 − 0.5 × emotional_weight)          (emotional salience)
//! ```
//!
//! Every factor is positive, so importance never rises under decay. A memory
//! whose importance reaches the cleanup threshold is forgotten.

use crate::config::MemoryConfig;
use crate::memory::{Memory, MemoryComponent};
use crate::types::{MemoryId, SimTime};

/// Multiplier applied to the base decay rate for one memory.
#[must_use]
pub fn age_factor(
    age_secs: f64,
    threshold_secs: f64,
    access_count: u32,
    emotional_weight: f32,
    max_age_factor: f32,
) -> f32 {
    let ratio = if threshold_secs > 0.0 {
        (age_secs / threshold_secs) as f32
    } else {
        max_age_factor
    };
    let age = ratio.clamp(1.0, max_age_factor.max(1.0));
    let rehearsal = 1.0 / (1.0 + (1.0 + access_count as f32).log2());
    let salience = 1.0 - 0.5 * emotional_weight.clamp(0.0, 1.0);
    age * rehearsal * salience
}

/// Apply one tick of decay to a single memory.
///
/// Returns `true` if the memory was old enough to decay.
pub fn decay_memory(
    memory: &mut Memory,
    decay_rate: f32,
    now: &SimTime,
    delta_time: f64,
    config: &MemoryConfig,
) -> bool {
    let age = memory.age_secs(now);
    if age < config.decay_age_threshold_secs {
        return false;
    }
    let factor = age_factor(
        age,
        config.decay_age_threshold_secs,
        memory.access_count,
        memory.emotional_weight,
        config.max_age_factor,
    );
    let loss = decay_rate.max(0.0) * delta_time.max(0.0) as f32 * factor;
    memory.importance = (memory.importance - loss).max(0.0);
    true
}

/// Outcome of a decay pass over one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecayReport {
    /// Memories that lost importance.
    pub decayed: usize,
    /// Memories removed after reaching the cleanup threshold.
    pub forgotten: Vec<MemoryId>,
}

/// Decay every memory in `component` and forget those that fade out.
pub fn decay_component(
    component: &mut MemoryComponent,
    now: &SimTime,
    delta_time: f64,
    config: &MemoryConfig,
) -> DecayReport {
    let mut report = DecayReport::default();
    let rate = component.decay_rate;

    for memory in component.memories.values_mut() {
        if decay_memory(memory, rate, now, delta_time, config) {
            report.decayed += 1;
            if memory.importance <= config.cleanup_threshold {
                report.forgotten.push(memory.id);
            }
        }
    }

    for id in &report.forgotten {
        component.memories.remove(id);
    }
    component.total_memories_forgotten += report.forgotten.len() as u64;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;

    fn config() -> MemoryConfig {
        MemoryConfig {
            decay_age_threshold_secs: 10.0,
            ..MemoryConfig::default()
        }
    }

    #[test]
    fn young_memories_do_not_decay() {
        let mut m = Memory::new(MemoryType::Episodic, "fresh", 0.6, 0.0, SimTime::at(0.0));
        assert!(!decay_memory(&mut m, 0.01, &SimTime::at(5.0), 1.0, &config()));
        assert!((m.importance - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn old_memories_lose_importance() {
        let mut m = Memory::new(MemoryType::Episodic, "old", 0.6, 0.0, SimTime::at(0.0));
        assert!(decay_memory(&mut m, 0.01, &SimTime::at(100.0), 1.0, &config()));
        assert!(m.importance < 0.6);
    }

    #[test]
    fn rehearsal_and_emotion_slow_decay() {
        let plain = age_factor(100.0, 10.0, 0, 0.0, 5.0);
        let rehearsed = age_factor(100.0, 10.0, 7, 0.0, 5.0);
        let emotional = age_factor(100.0, 10.0, 0, 1.0, 5.0);
        assert!(rehearsed < plain);
        assert!(emotional < plain);
        assert!(rehearsed > 0.0 && emotional > 0.0);
    }

    #[test]
    fn age_factor_is_capped() {
        let capped = age_factor(1.0e9, 10.0, 0, 0.0, 5.0);
        assert!((capped - 5.0).abs() < 1e-5);
    }

    #[test]
    fn importance_floors_at_zero_and_is_forgotten() {
        let mut component = MemoryComponent::new(10);
        component.decay_rate = 1.0;
        let id = component.store(Memory::new(
            MemoryType::Semantic,
            "faint",
            0.1,
            0.0,
            SimTime::at(0.0),
        ));
        let report = decay_component(&mut component, &SimTime::at(100.0), 10.0, &config());
        assert_eq!(report.forgotten, vec![id]);
        assert!(component.is_empty());
        assert_eq!(component.total_memories_forgotten, 1);
    }

    #[test]
    fn zero_delta_changes_nothing() {
        let mut component = MemoryComponent::new(10);
        component.store(Memory::new(MemoryType::Episodic, "x", 0.5, 0.0, SimTime::at(0.0)));
        decay_component(&mut component, &SimTime::at(100.0), 0.0, &config());
        let m = component.memories.values().next().expect("memory kept");
        assert!((m.importance - 0.5).abs() < f32::EPSILON);
    }
}
