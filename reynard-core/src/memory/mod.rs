//! Memory storage for a single agent.
//!
//! A [`MemoryComponent`] owns every [`Memory`] an agent holds. Storing past
//! capacity evicts the least important memory (see [`crate::eviction`]);
//! decay and consolidation operate on the component from the outside
//! ([`crate::decay`], [`crate::consolidation`]).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MemoryConfig;
use crate::eviction;
use crate::types::{AgentId, MemoryId, SimTime};

/// The kind of experience a memory records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryType {
    /// Something that happened.
    Episodic,
    /// Something the agent knows.
    Semantic,
    /// Something about another agent.
    Social,
    /// How the agent felt.
    Emotional,
    /// How to do something.
    Procedural,
}

impl MemoryType {
    /// All memory types, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Episodic,
        Self::Semantic,
        Self::Social,
        Self::Emotional,
        Self::Procedural,
    ];
}

/// A single memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique memory identifier.
    pub id: MemoryId,
    /// Free-text description of what is remembered.
    pub content: String,
    /// Kind of memory.
    pub memory_type: MemoryType,
    /// How much this memory matters (0.0–1.0). Only decay lowers it.
    pub importance: f32,
    /// Emotional intensity (0.0–1.0). Strong emotions slow decay.
    pub emotional_weight: f32,
    /// Other agents this memory involves.
    pub associated_agents: BTreeSet<AgentId>,
    /// When the memory was formed.
    pub created_at: SimTime,
    /// When the memory was last retrieved.
    pub last_accessed: SimTime,
    /// How many times the memory has been retrieved.
    pub access_count: u32,
    /// Insertion order within the owning component; breaks timestamp ties.
    #[serde(default)]
    pub sequence: u64,
    /// Memories merged to form this one, if it is a consolidation.
    #[serde(default)]
    pub consolidated_from: Vec<MemoryId>,
}

impl Memory {
    /// Create a new memory formed at `now`.
    ///
    /// Importance and emotional weight are clamped to `[0.0, 1.0]`.
    #[must_use]
    pub fn new(
        memory_type: MemoryType,
        content: impl Into<String>,
        importance: f32,
        emotional_weight: f32,
        now: SimTime,
    ) -> Self {
        Self {
            id: MemoryId::new(),
            content: content.into(),
            memory_type,
            importance: importance.clamp(0.0, 1.0),
            emotional_weight: emotional_weight.clamp(0.0, 1.0),
            associated_agents: BTreeSet::new(),
            created_at: now,
            last_accessed: now,
            access_count: 0,
            sequence: 0,
            consolidated_from: Vec::new(),
        }
    }

    /// Attach the agents this memory involves.
    #[must_use]
    pub fn with_agents(mut self, agents: impl IntoIterator<Item = AgentId>) -> Self {
        self.associated_agents.extend(agents);
        self
    }

    /// Record a retrieval.
    pub fn record_access(&mut self, now: SimTime) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now;
    }

    /// Seconds since the memory was formed.
    #[must_use]
    pub fn age_secs(&self, now: &SimTime) -> f64 {
        now.seconds_since(&self.created_at)
    }
}

/// All memories held by one agent, plus lifetime counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryComponent {
    /// Memories keyed by id.
    pub memories: HashMap<MemoryId, Memory>,
    /// Maximum number of memories held at once.
    pub capacity: usize,
    /// Importance lost per second before age scaling.
    pub decay_rate: f32,
    /// Importance below which memories become consolidation candidates.
    pub consolidation_threshold: f32,
    /// Memories ever stored.
    pub total_memories_created: u64,
    /// Memories evicted to respect capacity.
    pub total_memories_evicted: u64,
    /// Memories removed after decaying away.
    pub total_memories_forgotten: u64,
    /// Source memories merged by consolidation.
    pub total_memories_consolidated: u64,
    next_sequence: u64,
}

impl Default for MemoryComponent {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl MemoryComponent {
    /// Create an empty component with the given capacity and default tuning.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Create an empty component tuned by `config`.
    #[must_use]
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self {
            memories: HashMap::new(),
            capacity: config.capacity,
            decay_rate: config.decay_rate,
            consolidation_threshold: config.consolidation_threshold,
            total_memories_created: 0,
            total_memories_evicted: 0,
            total_memories_forgotten: 0,
            total_memories_consolidated: 0,
            next_sequence: 0,
        }
    }

    /// Number of memories currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    /// Whether the component holds no memories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Look up a memory by id.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<&Memory> {
        self.memories.get(id)
    }

    /// Store a memory, evicting the least important ones while over capacity.
    ///
    /// Returns the stored memory's id. If the new memory is itself the least
    /// important, it is the one evicted.
    pub fn store(&mut self, memory: Memory) -> MemoryId {
        let id = self.insert(memory);
        self.total_memories_created += 1;
        self.enforce_capacity();
        id
    }

    /// Insert without touching `total_memories_created` (used for consolidations).
    pub(crate) fn insert(&mut self, mut memory: Memory) -> MemoryId {
        memory.sequence = self.next_sequence;
        self.next_sequence += 1;
        let id = memory.id;
        self.memories.insert(id, memory);
        id
    }

    /// Evict until the component is within capacity. Returns the evicted memories.
    pub fn enforce_capacity(&mut self) -> Vec<Memory> {
        let mut evicted = Vec::new();
        while self.memories.len() > self.capacity {
            let Some(victim) = eviction::select_victim(self.memories.values()) else {
                break;
            };
            if let Some(memory) = self.memories.remove(&victim) {
                debug!(
                    memory = %memory.id,
                    importance = memory.importance,
                    "Evicted memory over capacity"
                );
                self.total_memories_evicted += 1;
                evicted.push(memory);
            }
        }
        evicted
    }

    /// Retrieve up to `limit` memories, most recently accessed first.
    ///
    /// Each returned memory has its access count and last-access time updated
    /// before being cloned out. `memory_type` filters when given.
    pub fn retrieve(
        &mut self,
        memory_type: Option<MemoryType>,
        limit: usize,
        now: SimTime,
    ) -> Vec<Memory> {
        let mut selected: Vec<&mut Memory> = self
            .memories
            .values_mut()
            .filter(|m| memory_type.is_none_or(|t| m.memory_type == t))
            .collect();

        selected.sort_by(|a, b| {
            b.last_accessed
                .seconds
                .total_cmp(&a.last_accessed.seconds)
                .then(a.sequence.cmp(&b.sequence))
        });
        selected.truncate(limit);

        selected
            .into_iter()
            .map(|memory| {
                memory.record_access(now);
                memory.clone()
            })
            .collect()
    }

    /// All memories of one type, in insertion order. Does not count as access.
    #[must_use]
    pub fn by_type(&self, memory_type: MemoryType) -> Vec<&Memory> {
        let mut found: Vec<&Memory> = self
            .memories
            .values()
            .filter(|m| m.memory_type == memory_type)
            .collect();
        found.sort_by_key(|m| m.sequence);
        found
    }

    /// Summary counts for reporting.
    #[must_use]
    pub fn stats(&self) -> MemoryStats {
        let mut by_type = HashMap::new();
        for memory in self.memories.values() {
            *by_type.entry(memory.memory_type).or_insert(0usize) += 1;
        }
        let average_importance = if self.memories.is_empty() {
            0.0
        } else {
            self.memories.values().map(|m| m.importance).sum::<f32>() / self.memories.len() as f32
        };
        MemoryStats {
            total: self.memories.len(),
            capacity: self.capacity,
            by_type,
            average_importance,
            total_created: self.total_memories_created,
            total_evicted: self.total_memories_evicted,
            total_forgotten: self.total_memories_forgotten,
            total_consolidated: self.total_memories_consolidated,
        }
    }
}

/// Point-in-time summary of a [`MemoryComponent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Memories currently held.
    pub total: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Count per memory type.
    pub by_type: HashMap<MemoryType, usize>,
    /// Mean importance of held memories.
    pub average_importance: f32,
    /// Lifetime stores.
    pub total_created: u64,
    /// Lifetime evictions.
    pub total_evicted: u64,
    /// Lifetime decay removals.
    pub total_forgotten: u64,
    /// Lifetime consolidated sources.
    pub total_consolidated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(content: &str, importance: f32, at: f64) -> Memory {
        Memory::new(MemoryType::Episodic, content, importance, 0.2, SimTime::at(at))
    }

    #[test]
    fn new_memory_clamps_inputs() {
        let m = Memory::new(MemoryType::Semantic, "x", 1.8, -0.4, SimTime::zero());
        assert!((m.importance - 1.0).abs() < f32::EPSILON);
        assert!(m.emotional_weight.abs() < f32::EPSILON);
    }

    #[test]
    fn capacity_evicts_lowest_importance() {
        let mut component = MemoryComponent::new(2);
        component.store(memory("Memory 1", 0.5, 0.0));
        component.store(memory("Memory 2", 0.9, 1.0));
        component.store(memory("Memory 3", 0.7, 2.0));

        assert_eq!(component.len(), 2);
        assert_eq!(component.total_memories_created, 3);
        assert_eq!(component.total_memories_evicted, 1);
        assert!(component.memories.values().all(|m| m.content != "Memory 1"));
    }

    #[test]
    fn equal_importance_evicts_oldest() {
        let mut component = MemoryComponent::new(2);
        component.store(memory("old", 0.5, 0.0));
        component.store(memory("mid", 0.5, 5.0));
        component.store(memory("new", 0.5, 10.0));

        let contents: Vec<_> = component.memories.values().map(|m| m.content.as_str()).collect();
        assert!(!contents.contains(&"old"));
        assert_eq!(component.len(), 2);
    }

    #[test]
    fn retrieve_orders_by_recency_and_records_access() {
        let mut component = MemoryComponent::new(10);
        let first = component.store(memory("Memory 1", 0.5, 0.0));
        component.store(memory("Memory 2", 0.5, 0.0));

        let got = component.retrieve(None, 10, SimTime::at(5.0));
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].content, "Memory 1");
        assert_eq!(got[0].access_count, 1);

        // Equal access times fall back to insertion order, so only Memory 1 is touched.
        let later = component.retrieve(None, 1, SimTime::at(6.0));
        assert_eq!(later[0].content, "Memory 1");

        let all = component.retrieve(None, 10, SimTime::at(7.0));
        assert_eq!(all[0].content, "Memory 1");
        assert_eq!(all[1].content, "Memory 2");
        let touched = component.get(&first).expect("still stored");
        assert_eq!(touched.access_count, 3);
        assert_eq!(all[1].access_count, 2);
    }

    #[test]
    fn retrieve_filters_by_type_and_limit() {
        let mut component = MemoryComponent::new(10);
        component.store(memory("a", 0.5, 0.0));
        component.store(Memory::new(MemoryType::Social, "b", 0.5, 0.0, SimTime::zero()));
        component.store(memory("c", 0.5, 0.0));

        let social = component.retrieve(Some(MemoryType::Social), 10, SimTime::at(1.0));
        assert_eq!(social.len(), 1);
        assert_eq!(social[0].content, "b");

        let limited = component.retrieve(Some(MemoryType::Episodic), 1, SimTime::at(1.0));
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let mut component = MemoryComponent::new(0);
        component.store(memory("gone", 1.0, 0.0));
        assert!(component.is_empty());
        assert_eq!(component.total_memories_created, 1);
    }

    #[test]
    fn stats_count_types() {
        let mut component = MemoryComponent::new(10);
        component.store(memory("a", 0.4, 0.0));
        component.store(memory("b", 0.6, 0.0));
        let stats = component.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_type.get(&MemoryType::Episodic), Some(&2));
        assert!((stats.average_importance - 0.5).abs() < 1e-6);
    }
}
