//! Capacity eviction for memory components.
//!
//! When a component is over capacity, the memory with the lowest importance
//! goes first. Ties go to the oldest memory by creation time, then by
//! insertion order, so eviction is deterministic regardless of map order.

use ordered_float::OrderedFloat;

use crate::memory::Memory;
use crate::types::MemoryId;

/// Sort key for eviction: smaller keys are evicted first.
#[must_use]
pub fn eviction_key(memory: &Memory) -> (OrderedFloat<f32>, OrderedFloat<f64>, u64) {
    (
        OrderedFloat(memory.importance),
        OrderedFloat(memory.created_at.seconds),
        memory.sequence,
    )
}

/// Pick the memory that should be evicted next, if any.
pub fn select_victim<'a>(memories: impl IntoIterator<Item = &'a Memory>) -> Option<MemoryId> {
    memories
        .into_iter()
        .min_by_key(|memory| eviction_key(memory))
        .map(|memory| memory.id)
}

/// Ids of the `count` memories that would be evicted first, in eviction order.
#[must_use]
pub fn eviction_order<'a>(
    memories: impl IntoIterator<Item = &'a Memory>,
    count: usize,
) -> Vec<MemoryId> {
    let mut ranked: Vec<&Memory> = memories.into_iter().collect();
    ranked.sort_by_key(|memory| eviction_key(memory));
    ranked.into_iter().take(count).map(|memory| memory.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;
    use crate::types::SimTime;

    fn memory(importance: f32, at: f64, sequence: u64) -> Memory {
        let mut m = Memory::new(MemoryType::Episodic, "m", importance, 0.0, SimTime::at(at));
        m.sequence = sequence;
        m
    }

    #[test]
    fn lowest_importance_is_victim() {
        let low = memory(0.1, 10.0, 2);
        let high = memory(0.9, 0.0, 0);
        let mid = memory(0.5, 5.0, 1);
        assert_eq!(select_victim([&high, &low, &mid]), Some(low.id));
    }

    #[test]
    fn ties_break_by_age_then_sequence() {
        let older = memory(0.5, 1.0, 5);
        let newer = memory(0.5, 2.0, 0);
        assert_eq!(select_victim([&newer, &older]), Some(older.id));

        let first = memory(0.5, 1.0, 0);
        let second = memory(0.5, 1.0, 1);
        assert_eq!(select_victim([&second, &first]), Some(first.id));
    }

    #[test]
    fn empty_has_no_victim() {
        assert_eq!(select_victim(std::iter::empty()), None);
    }

    #[test]
    fn order_lists_lowest_first() {
        let a = memory(0.3, 0.0, 0);
        let b = memory(0.1, 0.0, 1);
        let c = memory(0.7, 0.0, 2);
        assert_eq!(eviction_order([&a, &b, &c], 2), vec![b.id, a.id]);
    }
}
