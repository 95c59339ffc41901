//! Memory system: storing, retrieving, decaying and consolidating memories.

use reynard_core::agent::HasMemory;
use reynard_core::config::MemoryConfig;
use reynard_core::consolidation;
use reynard_core::decay;
use reynard_core::error::{ReynardError, Result};
use reynard_core::memory::{Memory, MemoryComponent, MemoryType};
use reynard_core::types::{AgentId, MemoryId};
use serde::Serialize;
use tracing::debug;

use super::{IntervalTimer, TickReport, isolate};
use crate::registry::AgentRegistry;

/// Lifetime counters for the memory system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemorySystemStats {
    /// Memories stored through the system.
    pub memories_stored: u64,
    /// Memories handed out by retrieval.
    pub memories_retrieved: u64,
    /// Memories forgotten by decay.
    pub memories_forgotten: u64,
    /// Consolidated memories created.
    pub consolidations: u64,
    /// Source memories merged into consolidations.
    pub memories_consolidated: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
}

/// Stores, retrieves, decays and consolidates agent memories.
#[derive(Debug, Clone)]
pub struct MemorySystem {
    config: MemoryConfig,
    consolidation_timer: IntervalTimer,
    stats: MemorySystemStats,
}

fn memory_of<A: HasMemory>(agent: &mut A, id: AgentId) -> Result<&mut MemoryComponent> {
    agent.memory_mut().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "memory",
    })
}

impl MemorySystem {
    /// A memory system tuned by `config`.
    #[must_use]
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            consolidation_timer: IntervalTimer::new(config.processing_interval_secs),
            config,
            stats: MemorySystemStats::default(),
        }
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> MemorySystemStats {
        self.stats
    }

    /// Store a memory for an agent. `false` if the agent or its memory
    /// component is missing.
    pub fn store_memory_for_agent<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        self.try_store_memory_for_agent(
            registry,
            agent_id,
            memory_type,
            content,
            importance,
            emotional_weight,
        )
        .inspect_err(|e| debug!(agent = %agent_id, error = %e, "Memory not stored"))
        .is_ok()
    }

    /// Store a memory for an agent, returning its id.
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    pub fn try_store_memory_for_agent<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
    ) -> Result<MemoryId>
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        self.try_store_shared_memory(
            registry,
            agent_id,
            memory_type,
            content,
            importance,
            emotional_weight,
            &[],
        )
    }

    /// Store a memory that involves other agents. `false` on lookup failure.
    #[allow(clippy::too_many_arguments)]
    pub fn store_shared_memory<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
        associated_agents: &[AgentId],
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        self.try_store_shared_memory(
            registry,
            agent_id,
            memory_type,
            content,
            importance,
            emotional_weight,
            associated_agents,
        )
        .inspect_err(|e| debug!(agent = %agent_id, error = %e, "Shared memory not stored"))
        .is_ok()
    }

    /// Store a memory that involves other agents, returning its id.
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    #[allow(clippy::too_many_arguments)]
    pub fn try_store_shared_memory<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
        associated_agents: &[AgentId],
    ) -> Result<MemoryId>
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        let now = registry.now();
        let agent = registry
            .get_agent_mut(agent_id)
            .ok_or(ReynardError::AgentNotFound(*agent_id))?;
        let component = memory_of(agent, *agent_id)?;

        let memory = Memory::new(memory_type, content, importance, emotional_weight, now)
            .with_agents(associated_agents.iter().copied().filter(|a| a != agent_id));
        let id = component.store(memory);
        self.stats.memories_stored += 1;

        debug!(
            agent = %agent_id,
            memory = %id,
            kind = ?memory_type,
            held = component.len(),
            "Stored memory"
        );
        Ok(id)
    }

    /// Up to `limit` memories, most recently accessed first, optionally of one
    /// type. Each returned memory counts as accessed. Empty on lookup failure.
    pub fn retrieve_memories_for_agent<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Vec<Memory>
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        self.try_retrieve_memories_for_agent(registry, agent_id, memory_type, limit)
            .unwrap_or_default()
    }

    /// Fallible form of [`Self::retrieve_memories_for_agent`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    pub fn try_retrieve_memories_for_agent<R>(
        &mut self,
        registry: &mut R,
        agent_id: &AgentId,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<Memory>>
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        let now = registry.now();
        let agent = registry
            .get_agent_mut(agent_id)
            .ok_or(ReynardError::AgentNotFound(*agent_id))?;
        let retrieved = memory_of(agent, *agent_id)?.retrieve(memory_type, limit, now);
        self.stats.memories_retrieved += retrieved.len() as u64;
        Ok(retrieved)
    }

    /// Run one tick: decay every agent's memories, then consolidate once the
    /// processing interval has passed.
    pub fn update<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        let mut report = self.process_memory_decay(registry, delta_time);
        if self.consolidation_timer.advance(delta_time).is_some() {
            let consolidation = self.process_memory_consolidation(registry);
            report.agent_errors += consolidation.agent_errors;
        }
        report
    }

    /// Decay every agent's memories by `delta_time`, forgetting those that
    /// fall to the cleanup threshold.
    pub fn process_memory_decay<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        let now = registry.now();
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(component) = registry.get_agent_mut(&id).and_then(HasMemory::memory_mut) else {
                continue;
            };
            let result = check_memories(component, id).map(|()| {
                let decayed = decay::decay_component(component, &now, delta_time, &self.config);
                if !decayed.forgotten.is_empty() {
                    debug!(
                        agent = %id,
                        forgotten = decayed.forgotten.len(),
                        "Memories forgotten"
                    );
                }
                self.stats.memories_forgotten += decayed.forgotten.len() as u64;
            });
            isolate("memory", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }

    /// Merge clusters of similar weak memories on every agent.
    pub fn process_memory_consolidation<R>(&mut self, registry: &mut R) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasMemory,
    {
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(component) = registry.get_agent_mut(&id).and_then(HasMemory::memory_mut) else {
                continue;
            };
            let result = check_memories(component, id).map(|()| {
                let merged = consolidation::consolidate(component, self.config.min_cluster_size);
                if !merged.created.is_empty() {
                    debug!(
                        agent = %id,
                        created = merged.created.len(),
                        sources = merged.merged_sources,
                        "Consolidated memories"
                    );
                }
                self.stats.consolidations += merged.created.len() as u64;
                self.stats.memories_consolidated += merged.merged_sources as u64;
            });
            isolate("memory", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }
}

/// Reject components holding values no operation produces.
fn check_memories(component: &MemoryComponent, agent: AgentId) -> Result<()> {
    if let Some(bad) = component
        .memories
        .values()
        .find(|m| !m.importance.is_finite() || !m.emotional_weight.is_finite())
    {
        return Err(ReynardError::CorruptState {
            agent,
            reason: format!("memory {} has non-finite importance or emotional weight", bad.id),
        });
    }
    Ok(())
}
