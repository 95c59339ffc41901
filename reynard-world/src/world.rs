//! The agent world: one store, five systems, a clock and its metrics.
//!
//! [`AgentWorld`] is the usual entry point. It owns every agent, advances
//! simulated time and runs the systems in a fixed order each tick:
//! memory, interaction, social, learning, gender.

use std::path::Path;

use rand::{RngCore, SeedableRng};
use rand::rngs::StdRng;
use reynard_core::agent::Agent;
use reynard_core::config::ReynardConfig;
use reynard_core::error::{ReynardError, Result};
use reynard_core::gender::{GenderExpression, GenderIdentity, GenderStats, PronounSet};
use reynard_core::interaction::{InteractionStats, InteractionType, Relationship};
use reynard_core::knowledge::{KnowledgeStats, KnowledgeType};
use reynard_core::memory::{Memory, MemoryType};
use reynard_core::metrics::{CounterSnapshot, TickBudgetMonitor, TickPercentiles, WorldCounters};
use reynard_core::persistence::PersistenceEngine;
use reynard_core::social::GroupType;
use reynard_core::types::{AgentId, GroupId, KnowledgeId, OpportunityId, PersonalityTraits, Position, SimTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::registry::{AgentRegistry, AgentStore};
use crate::systems::gender::{GenderDistribution, GenderSystemStats};
use crate::systems::interaction::InteractionSystemStats;
use crate::systems::learning::LearningSystemStats;
use crate::systems::memory::MemorySystemStats;
use crate::systems::social::{GroupInfo, SocialNetwork, SocialSystemStats};
use crate::systems::{GenderSystem, InteractionSystem, LearningSystem, MemorySystem, SocialSystem, TickReport};

/// Metadata key holding the simulated clock in a save file.
const CLOCK_META_KEY: &str = "clock_seconds";

/// What one call to [`AgentWorld::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickSummary {
    /// Sequence number of this tick, starting at 1.
    pub tick: u64,
    /// Simulated time after the tick.
    pub sim_seconds: f64,
    /// Agents in the world during the tick.
    pub agents: usize,
    /// Memory system pass.
    pub memory: TickReport,
    /// Interaction system pass.
    pub interaction: TickReport,
    /// Social system pass.
    pub social: TickReport,
    /// Learning system pass.
    pub learning: TickReport,
    /// Gender system pass.
    pub gender: TickReport,
    /// Wall-clock milliseconds spent.
    pub elapsed_ms: f64,
    /// Whether the tick went over the configured budget.
    pub over_budget: bool,
}

impl TickSummary {
    /// Per-agent failures across all systems.
    #[must_use]
    pub fn agent_errors(&self) -> usize {
        [self.memory, self.interaction, self.social, self.learning, self.gender]
            .iter()
            .map(|r| r.agent_errors)
            .sum()
    }
}

/// Snapshot of world-wide counters and per-system stats.
#[derive(Debug, Clone, Serialize)]
pub struct WorldStats {
    /// Agents currently in the world.
    pub agent_count: usize,
    /// Simulated seconds elapsed.
    pub sim_seconds: f64,
    /// Lifetime world counters.
    pub counters: CounterSnapshot,
    /// Recent tick timing.
    pub tick_timing: TickPercentiles,
    /// Memory system counters.
    pub memory: MemorySystemStats,
    /// Interaction system counters.
    pub interaction: InteractionSystemStats,
    /// Social system counters.
    pub social: SocialSystemStats,
    /// Learning system counters.
    pub learning: LearningSystemStats,
    /// Gender system counters.
    pub gender: GenderSystemStats,
}

/// Owns all agents and runs every system over them.
#[derive(Debug)]
pub struct AgentWorld {
    config: ReynardConfig,
    store: AgentStore,
    memory: MemorySystem,
    interaction: InteractionSystem,
    social: SocialSystem,
    learning: LearningSystem,
    gender: GenderSystem,
    counters: WorldCounters,
    monitor: TickBudgetMonitor,
}

impl Default for AgentWorld {
    fn default() -> Self {
        Self::new(ReynardConfig::default())
    }
}

impl AgentWorld {
    /// An empty world at time zero. Random rolls are seeded from
    /// `config.general.seed` when set.
    #[must_use]
    pub fn new(config: ReynardConfig) -> Self {
        let mut rng = config
            .general
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        let social_rng = StdRng::seed_from_u64(rng.next_u64());
        Self {
            store: AgentStore::new(),
            memory: MemorySystem::new(config.memory.clone()),
            interaction: InteractionSystem::new(config.interaction.clone(), rng),
            social: SocialSystem::new(config.social.clone(), social_rng),
            learning: LearningSystem::new(config.learning.clone()),
            gender: GenderSystem::new(config.gender.clone()),
            counters: WorldCounters::new(),
            monitor: TickBudgetMonitor::new(config.performance.tick_budget_ms),
            config,
        }
    }

    /// The configuration the world was built with.
    #[must_use]
    pub fn config(&self) -> &ReynardConfig {
        &self.config
    }

    // -- Agents ---------------------------------------------------------------

    /// Create a fully equipped agent and return its id.
    pub fn create_agent(&mut self, name: &str, position: Position, traits: PersonalityTraits) -> AgentId {
        self.insert_agent(Agent::new(name, position, traits, &self.config))
    }

    /// Add an existing agent, replacing any agent with the same id.
    pub fn insert_agent(&mut self, agent: Agent) -> AgentId {
        let name = agent.name.clone();
        let id = self.store.insert(agent);
        WorldCounters::add(&self.counters.agents_created, 1);
        info!(agent = %id, name, "Agent created");
        id
    }

    /// Remove an agent. `false` if it was not present.
    pub fn remove_agent(&mut self, id: &AgentId) -> bool {
        let removed = self.store.remove(id).is_some();
        if removed {
            WorldCounters::add(&self.counters.agents_removed, 1);
            info!(agent = %id, "Agent removed");
        }
        removed
    }

    /// Look up an agent.
    #[must_use]
    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.store.get_agent(id)
    }

    /// Mutable agent lookup.
    pub fn agent_mut(&mut self, id: &AgentId) -> Option<&mut Agent> {
        self.store.get_agent_mut(id)
    }

    /// All agent ids, in store order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.store.agent_ids()
    }

    /// Number of agents.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.store.len()
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.store.now()
    }

    /// The underlying store, for driving systems directly.
    #[must_use]
    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    // -- Tick -------------------------------------------------------------------

    /// Advance the clock by `delta_time` seconds and run every system once.
    ///
    /// A zero delta runs the systems without moving time.
    ///
    /// # Errors
    ///
    /// [`ReynardError::InvalidDelta`] if `delta_time` is negative or not
    /// finite. Per-agent failures never fail the tick; they are counted in
    /// the summary.
    pub fn tick(&mut self, delta_time: f64) -> Result<TickSummary> {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(ReynardError::InvalidDelta(delta_time));
        }

        let (now, reports, elapsed_ms) = {
            let guard = self.monitor.begin_tick();
            let now = self.store.advance_clock(delta_time);
            let reports = [
                self.memory.update(&mut self.store, delta_time),
                self.interaction.update(&mut self.store, delta_time),
                self.social.update(&mut self.store, delta_time),
                self.learning.update(&mut self.store, delta_time),
                self.gender.update(&mut self.store, delta_time),
            ];
            (now, reports, guard.elapsed_ms())
        };
        let [memory, interaction, social, learning, gender] = reports;

        WorldCounters::add(&self.counters.ticks, 1);
        let over_budget = self.monitor.is_over_budget();
        if over_budget {
            WorldCounters::add(&self.counters.ticks_over_budget, 1);
            warn!(
                elapsed_ms,
                budget_ms = self.monitor.budget_ms(),
                agents = self.store.len(),
                "Tick over budget"
            );
        }

        let summary = TickSummary {
            tick: self.monitor.tick_count(),
            sim_seconds: now.seconds,
            agents: self.store.len(),
            memory,
            interaction,
            social,
            learning,
            gender,
            elapsed_ms,
            over_budget,
        };
        let errors = summary.agent_errors();
        if errors > 0 {
            WorldCounters::add(&self.counters.agent_errors, errors as u64);
        }
        debug!(tick = summary.tick, sim_seconds = summary.sim_seconds, errors, "Tick complete");
        Ok(summary)
    }

    // -- Memory -----------------------------------------------------------------

    /// See [`MemorySystem::store_memory_for_agent`].
    pub fn store_memory(
        &mut self,
        agent: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
    ) -> bool {
        self.memory
            .store_memory_for_agent(&mut self.store, agent, memory_type, content, importance, emotional_weight)
    }

    /// See [`MemorySystem::store_shared_memory`].
    pub fn store_shared_memory(
        &mut self,
        agent: &AgentId,
        memory_type: MemoryType,
        content: &str,
        importance: f32,
        emotional_weight: f32,
        associated_agents: &[AgentId],
    ) -> bool {
        self.memory.store_shared_memory(
            &mut self.store,
            agent,
            memory_type,
            content,
            importance,
            emotional_weight,
            associated_agents,
        )
    }

    /// See [`MemorySystem::retrieve_memories_for_agent`].
    pub fn retrieve_memories(&mut self, agent: &AgentId, memory_type: Option<MemoryType>, limit: usize) -> Vec<Memory> {
        self.memory
            .retrieve_memories_for_agent(&mut self.store, agent, memory_type, limit)
    }

    // -- Interaction ------------------------------------------------------------

    /// See [`InteractionSystem::initiate_interaction`].
    pub fn initiate_interaction(&mut self, initiator: &AgentId, target: &AgentId, interaction_type: InteractionType) -> bool {
        self.interaction
            .initiate_interaction(&mut self.store, initiator, target, interaction_type)
    }

    /// See [`InteractionSystem::check_proximity`].
    #[must_use]
    pub fn check_proximity(&self, a: &AgentId, b: &AgentId) -> bool {
        self.interaction.check_proximity(&self.store, a, b)
    }

    /// See [`InteractionSystem::get_relationship_status`].
    #[must_use]
    pub fn relationship(&self, agent: &AgentId, peer: &AgentId) -> Option<Relationship> {
        self.interaction.get_relationship_status(&self.store, agent, peer)
    }

    /// See [`InteractionSystem::get_interaction_stats`].
    #[must_use]
    pub fn interaction_stats(&self, agent: &AgentId) -> Option<InteractionStats> {
        self.interaction.get_interaction_stats(&self.store, agent)
    }

    // -- Social -----------------------------------------------------------------

    /// See [`SocialSystem::create_social_group`].
    pub fn create_social_group(
        &mut self,
        creator: &AgentId,
        name: &str,
        group_type: GroupType,
        members: &[AgentId],
    ) -> Option<GroupId> {
        self.social
            .create_social_group(&mut self.store, creator, name, group_type, members)
    }

    /// See [`SocialSystem::leave_social_group`].
    pub fn leave_social_group(&mut self, agent: &AgentId, group: &GroupId) -> bool {
        self.social.leave_social_group(&mut self.store, agent, group)
    }

    /// See [`SocialSystem::form_social_connection`].
    pub fn form_social_connection(&mut self, a: &AgentId, b: &AgentId, strength: f32) -> bool {
        self.social.form_social_connection(&mut self.store, a, b, strength)
    }

    /// See [`SocialSystem::get_group_info`].
    #[must_use]
    pub fn group_info(&self, group: &GroupId) -> Option<GroupInfo> {
        self.social.get_group_info(&self.store, group)
    }

    /// See [`SocialSystem::get_social_network`].
    #[must_use]
    pub fn social_network(&self, agent: &AgentId) -> Option<SocialNetwork> {
        self.social.get_social_network(&self.store, agent)
    }

    /// See [`SocialSystem::calculate_social_influence`].
    #[must_use]
    pub fn social_influence(&self, agent: &AgentId) -> Option<f32> {
        self.social.calculate_social_influence(&self.store, agent)
    }

    // -- Learning ---------------------------------------------------------------

    /// See [`LearningSystem::add_knowledge_to_agent`].
    pub fn add_knowledge(
        &mut self,
        agent: &AgentId,
        title: &str,
        knowledge_type: KnowledgeType,
        description: &str,
        proficiency: f32,
        importance: f32,
    ) -> Option<KnowledgeId> {
        self.learning.add_knowledge_to_agent(
            &mut self.store,
            agent,
            title,
            knowledge_type,
            description,
            proficiency,
            importance,
        )
    }

    /// See [`LearningSystem::transfer_knowledge`].
    pub fn transfer_knowledge(&mut self, teacher: &AgentId, student: &AgentId, knowledge: &KnowledgeId) -> bool {
        self.learning
            .transfer_knowledge(&mut self.store, teacher, student, knowledge)
    }

    /// See [`LearningSystem::transfer_knowledge_by_title`].
    pub fn transfer_knowledge_by_title(&mut self, teacher: &AgentId, student: &AgentId, title: &str) -> bool {
        self.learning
            .transfer_knowledge_by_title(&mut self.store, teacher, student, title)
    }

    /// See [`LearningSystem::queue_learning_opportunity`].
    pub fn queue_learning_opportunity(
        &mut self,
        student: &AgentId,
        teacher: &AgentId,
        knowledge: &KnowledgeId,
    ) -> Option<OpportunityId> {
        self.learning
            .queue_learning_opportunity(&mut self.store, student, teacher, knowledge)
    }

    /// See [`LearningSystem::calculate_teaching_effectiveness`].
    #[must_use]
    pub fn teaching_effectiveness(&self, teacher: &AgentId, student: &AgentId) -> Option<f32> {
        self.learning
            .calculate_teaching_effectiveness(&self.store, teacher, student)
    }

    /// See [`LearningSystem::get_knowledge_stats`].
    #[must_use]
    pub fn knowledge_stats(&self, agent: &AgentId) -> Option<KnowledgeStats> {
        self.learning.get_knowledge_stats(&self.store, agent)
    }

    // -- Gender -----------------------------------------------------------------

    /// See [`GenderSystem::update_gender_identity`].
    pub fn update_gender_identity(&mut self, agent: &AgentId, identity: GenderIdentity) -> bool {
        self.gender.update_gender_identity(&mut self.store, agent, identity)
    }

    /// See [`GenderSystem::set_gender_expression`].
    pub fn set_gender_expression(&mut self, agent: &AgentId, expression: GenderExpression) -> bool {
        self.gender.set_gender_expression(&mut self.store, agent, expression)
    }

    /// See [`GenderSystem::set_preferred_pronouns`].
    pub fn set_preferred_pronouns(&mut self, agent: &AgentId, pronouns: PronounSet) -> bool {
        self.gender.set_preferred_pronouns(&mut self.store, agent, pronouns)
    }

    /// See [`GenderSystem::set_gender_fluidity`].
    pub fn set_gender_fluidity(&mut self, agent: &AgentId, fluidity: f32) -> bool {
        self.gender.set_gender_fluidity(&mut self.store, agent, fluidity)
    }

    /// See [`GenderSystem::add_support_agent`].
    pub fn add_support_agent(&mut self, agent: &AgentId, supporter: &AgentId) -> bool {
        self.gender.add_support_agent(&mut self.store, agent, supporter)
    }

    /// See [`GenderSystem::remove_support_agent`].
    pub fn remove_support_agent(&mut self, agent: &AgentId, supporter: &AgentId) -> bool {
        self.gender.remove_support_agent(&mut self.store, agent, supporter)
    }

    /// See [`GenderSystem::update_coming_out_status`].
    pub fn update_coming_out_status(&mut self, agent: &AgentId, peer: &AgentId, disclosed: bool) -> bool {
        self.gender
            .update_coming_out_status(&mut self.store, agent, peer, disclosed)
    }

    /// See [`GenderSystem::calculate_gender_wellbeing`].
    #[must_use]
    pub fn gender_wellbeing(&self, agent: &AgentId) -> Option<f32> {
        self.gender.calculate_gender_wellbeing(&self.store, agent)
    }

    /// See [`GenderSystem::get_gender_stats`].
    #[must_use]
    pub fn gender_stats(&self, agent: &AgentId) -> Option<GenderStats> {
        self.gender.get_gender_stats(&self.store, agent)
    }

    /// Identity, expression and pronoun counts from the most recent gender
    /// pass.
    #[must_use]
    pub fn gender_distribution(&self) -> &GenderDistribution {
        self.gender.distribution()
    }

    // -- Reporting --------------------------------------------------------------

    /// World counters, tick timing and per-system stats.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            agent_count: self.store.len(),
            sim_seconds: self.store.now().seconds,
            counters: self.counters.snapshot(),
            tick_timing: self.monitor.percentiles(),
            memory: self.memory.stats(),
            interaction: self.interaction.stats(),
            social: self.social.stats(),
            learning: self.learning.stats(),
            gender: self.gender.stats(),
        }
    }

    /// Counters in Prometheus exposition format, plus an agent gauge.
    #[must_use]
    pub fn metrics_text(&self) -> String {
        let mut out = self.counters.snapshot().to_prometheus();
        out.push_str(&format!(
            "# HELP reynard_agents Agents in the world\n# TYPE reynard_agents gauge\nreynard_agents {}\n",
            self.store.len()
        ));
        out
    }

    // -- Persistence ------------------------------------------------------------

    /// Write every agent and the clock to the `SQLite` file at `path`.
    ///
    /// An existing file is backed up first (`<path>.bak.N`) and agents no
    /// longer in the world are deleted from it. Returns the number of agents
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or written.
    pub fn save_to(&self, path: &Path) -> Result<usize> {
        let existed = path.exists();
        let mut engine = PersistenceEngine::open(path, &self.config.persistence)?;
        if existed {
            engine.create_rotating_backup()?;
        }
        for id in engine.list_agents()? {
            if !self.store.contains(&id) {
                engine.delete_agent(&id)?;
            }
        }
        let saved = engine.save_agents(self.store.iter())?;
        engine.set_meta(CLOCK_META_KEY, &self.store.now().seconds.to_string())?;
        WorldCounters::add(&self.counters.agents_saved, saved as u64);
        info!(path = %path.display(), agents = saved, "World saved");
        Ok(saved)
    }

    /// Rebuild a world from a file written by [`Self::save_to`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be read or the stored clock
    /// is not a number.
    pub fn load_from(path: &Path, config: ReynardConfig) -> Result<Self> {
        let engine = PersistenceEngine::open(path, &config.persistence)?;
        let agents = engine.load_all()?;
        let clock = match engine.get_meta(CLOCK_META_KEY)? {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|e| ReynardError::Config(format!("stored clock '{raw}': {e}")))?,
            None => 0.0,
        };

        let mut world = Self::new(config);
        world.store.set_clock(SimTime::at(clock));
        let loaded = agents.len();
        for agent in agents {
            world.store.insert(agent);
        }
        WorldCounters::add(&world.counters.agents_loaded, loaded as u64);
        info!(path = %path.display(), agents = loaded, clock, "World loaded");
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> AgentWorld {
        let mut config = ReynardConfig::default();
        config.general.seed = Some(7);
        config.interaction.spontaneous_interactions = false;
        AgentWorld::new(config)
    }

    fn spawn(world: &mut AgentWorld, name: &str, x: f32) -> AgentId {
        world.create_agent(name, Position::new(x, 0.0), PersonalityTraits::default())
    }

    #[test]
    fn tick_rejects_bad_deltas() {
        let mut world = seeded();
        assert!(matches!(world.tick(-1.0), Err(ReynardError::InvalidDelta(_))));
        assert!(matches!(world.tick(f64::NAN), Err(ReynardError::InvalidDelta(_))));
        assert!(world.tick(0.0).is_ok());
        assert!((world.now().seconds - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tick_advances_clock_and_counts() {
        let mut world = seeded();
        spawn(&mut world, "a", 0.0);
        let first = world.tick(1.5).expect("tick");
        let second = world.tick(1.5).expect("tick");
        assert_eq!(first.tick, 1);
        assert_eq!(second.tick, 2);
        assert!((second.sim_seconds - 3.0).abs() < 1e-9);
        assert_eq!(second.agents, 1);
        assert_eq!(second.agent_errors(), 0);
        assert_eq!(world.stats().counters.ticks, 2);
    }

    #[test]
    fn agents_come_and_go() {
        let mut world = seeded();
        let a = spawn(&mut world, "a", 0.0);
        assert_eq!(world.agent_count(), 1);
        assert!(world.remove_agent(&a));
        assert!(!world.remove_agent(&a));
        assert!(world.agent(&a).is_none());
        let counters = world.stats().counters;
        assert_eq!(counters.agents_created, 1);
        assert_eq!(counters.agents_removed, 1);
    }

    #[test]
    fn facades_reach_the_systems() {
        let mut world = seeded();
        let a = spawn(&mut world, "a", 0.0);
        let b = spawn(&mut world, "b", 1.0);
        assert!(world.store_memory(&a, MemoryType::Episodic, "met b", 0.6, 0.2));
        assert!(world.initiate_interaction(&a, &b, InteractionType::Communication));
        assert!(world.form_social_connection(&a, &b, 0.6));
        assert!(world.add_knowledge(&a, "X", KnowledgeType::Factual, "x", 0.8, 0.5).is_some());
        assert!(world.add_support_agent(&a, &b));

        let stats = world.stats();
        assert_eq!(stats.memory.memories_stored, 1);
        assert_eq!(stats.interaction.interactions, 1);
        assert_eq!(stats.social.connections_formed, 1);
        assert_eq!(stats.learning.knowledge_added, 1);
        assert_eq!(stats.gender.support_changes, 1);
        assert!(world.relationship(&a, &b).is_some());
    }

    #[test]
    fn metrics_text_lists_counters() {
        let mut world = seeded();
        spawn(&mut world, "a", 0.0);
        let text = world.metrics_text();
        assert!(text.contains("reynard_agents_created_total 1"));
        assert!(text.contains("reynard_agents 1"));
    }

    #[test]
    fn stats_serialize_for_reporting() {
        let mut world = seeded();
        spawn(&mut world, "a", 0.0);
        world.tick(1.0).expect("tick");
        let json = serde_json::to_value(world.stats()).expect("serialize");
        assert_eq!(json["agent_count"], 1);
        assert_eq!(json["counters"]["ticks"], 1);
    }

    #[test]
    fn same_seed_same_world() {
        let run = || {
            let mut config = ReynardConfig::default();
            config.general.seed = Some(11);
            let mut world = AgentWorld::new(config);
            let a = world.create_agent("a", Position::new(0.0, 0.0), PersonalityTraits::default());
            let b = world.create_agent("b", Position::new(1.0, 0.0), PersonalityTraits::default());
            for _ in 0..30 {
                world.tick(1.0).expect("tick");
            }
            let records = |id: &AgentId| world.interaction_stats(id).map(|s| s.total_interactions);
            (records(&a), records(&b), world.stats().interaction.spontaneous_interactions)
        };
        assert_eq!(run(), run());
    }
}
