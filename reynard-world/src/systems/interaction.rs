//! Interaction system: pairwise interactions, relationships and social energy.
//!
//! A requested interaction is checked in full before anything changes:
//! distinct agents, both present with positions and interaction components,
//! within range, enough energy on both sides and an acceptance probability
//! at or above the configured threshold. Only then do both sides pay the
//! energy cost, receive the same [`Interaction`] record and update their
//! relationship with each other.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reynard_core::agent::{HasInteraction, HasTraits, Positioned};
use reynard_core::config::InteractionConfig;
use reynard_core::error::{ReynardError, Result};
use reynard_core::interaction::{
    CommunicationStyle, Interaction, InteractionComponent, InteractionStats, InteractionType,
    Relationship, RelationshipDelta, acceptance_probability, success_probability,
};
use reynard_core::types::{AgentId, InteractionId, Position};
use serde::Serialize;
use tracing::debug;

use super::{IntervalTimer, TickReport, isolate};
use crate::registry::AgentRegistry;

/// Seconds an interaction lasts between perfectly compatible agents, halved
/// for completely incompatible ones.
const BASE_INTERACTION_SECONDS: f64 = 60.0;

/// Interaction types rolled for spontaneous encounters.
const SPONTANEOUS_TYPES: [InteractionType; 3] = [
    InteractionType::Communication,
    InteractionType::Social,
    InteractionType::Collaboration,
];

/// Lifetime counters for the interaction system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InteractionSystemStats {
    /// Interactions that took place.
    pub interactions: u64,
    /// Interactions that went well.
    pub successful_interactions: u64,
    /// Requests refused before any state changed.
    pub rejected_requests: u64,
    /// Interactions started by the tick rather than a request.
    pub spontaneous_interactions: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
}

/// Runs interactions between agents and regenerates social energy.
#[derive(Debug, Clone)]
pub struct InteractionSystem {
    config: InteractionConfig,
    rng: StdRng,
    spontaneous_timer: IntervalTimer,
    stats: InteractionSystemStats,
}

fn interaction_of<A: HasInteraction>(agent: &A, id: AgentId) -> Result<&InteractionComponent> {
    agent.interaction().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "interaction",
    })
}

fn position_of<A: Positioned>(agent: &A, id: AgentId) -> Result<Position> {
    agent.position().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "position",
    })
}

fn roll(rng: &mut StdRng, probability: f64) -> bool {
    if probability.is_nan() {
        return false;
    }
    rng.gen_bool(probability.clamp(0.0, 1.0))
}

impl InteractionSystem {
    /// An interaction system with its own random source.
    #[must_use]
    pub fn new(config: InteractionConfig, rng: StdRng) -> Self {
        Self {
            spontaneous_timer: IntervalTimer::new(config.processing_interval_secs),
            config,
            rng,
            stats: InteractionSystemStats::default(),
        }
    }

    /// An interaction system seeded for reproducible rolls.
    #[must_use]
    pub fn seeded(config: InteractionConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> InteractionSystemStats {
        self.stats
    }

    /// Whether two agents are within interaction range (inclusive). `false`
    /// if either is missing or has no position.
    #[must_use]
    pub fn check_proximity<R>(&self, registry: &R, a: &AgentId, b: &AgentId) -> bool
    where
        R: AgentRegistry,
        R::Agent: Positioned,
    {
        let (Some(pa), Some(pb)) = (
            registry.get_agent(a).and_then(Positioned::position),
            registry.get_agent(b).and_then(Positioned::position),
        ) else {
            return false;
        };
        pa.is_within(&pb, self.config.interaction_range)
    }

    /// Try to run an interaction. `false` (with no state change) if any
    /// precondition fails.
    pub fn initiate_interaction<R>(
        &mut self,
        registry: &mut R,
        initiator: &AgentId,
        target: &AgentId,
        interaction_type: InteractionType,
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: Positioned + HasTraits + HasInteraction,
    {
        self.try_initiate_interaction(registry, initiator, target, interaction_type)
            .inspect_err(|e| {
                debug!(
                    initiator = %initiator,
                    target = %target,
                    reason = %e,
                    "Interaction rejected"
                );
            })
            .is_ok()
    }

    /// Run an interaction, returning the record both agents received.
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`],
    /// [`ReynardError::ComponentMissing`], [`ReynardError::OutOfRange`],
    /// [`ReynardError::InsufficientEnergy`] or [`ReynardError::Declined`].
    /// No state changes on error.
    pub fn try_initiate_interaction<R>(
        &mut self,
        registry: &mut R,
        initiator: &AgentId,
        target: &AgentId,
        interaction_type: InteractionType,
    ) -> Result<Interaction>
    where
        R: AgentRegistry,
        R::Agent: Positioned + HasTraits + HasInteraction,
    {
        let result = self.interact(registry, initiator, target, interaction_type);
        if result.is_err() {
            self.stats.rejected_requests += 1;
        }
        result
    }

    fn interact<R>(
        &mut self,
        registry: &mut R,
        initiator: &AgentId,
        target: &AgentId,
        interaction_type: InteractionType,
    ) -> Result<Interaction>
    where
        R: AgentRegistry,
        R::Agent: Positioned + HasTraits + HasInteraction,
    {
        if initiator == target {
            return Err(ReynardError::SelfInteraction(*initiator));
        }
        for id in [initiator, target] {
            if !registry.contains(id) {
                return Err(ReynardError::AgentNotFound(*id));
            }
        }
        let now = registry.now();
        let (a, b) = registry
            .get_pair_mut(initiator, target)
            .ok_or(ReynardError::AgentNotFound(*target))?;

        // Validate everything before mutating either side.
        let distance = position_of(&*a, *initiator)?.distance_to(&position_of(&*b, *target)?);
        if distance > self.config.interaction_range {
            return Err(ReynardError::OutOfRange {
                distance,
                range: self.config.interaction_range,
            });
        }

        let cost = self.config.social_energy_cost;
        let ia = interaction_of(&*a, *initiator)?;
        let ib = interaction_of(&*b, *target)?;
        for (id, component) in [(initiator, ia), (target, ib)] {
            if !component.can_interact(cost) {
                return Err(ReynardError::InsufficientEnergy {
                    agent: *id,
                    available: component.social_energy,
                    required: cost,
                });
            }
        }

        let ta = a.traits_or_default();
        let tb = b.traits_or_default();
        let relationship = ia.relationship(target);
        let probability = acceptance_probability(
            self.config.base_interaction_probability,
            &ta,
            &tb,
            relationship,
        );
        if probability < self.config.acceptance_threshold {
            return Err(ReynardError::Declined { probability });
        }

        let success = roll(
            &mut self.rng,
            f64::from(success_probability(&ta, &tb, relationship)),
        );
        let interaction = Interaction {
            id: InteractionId::new(),
            agent1_id: *initiator,
            agent2_id: *target,
            interaction_type,
            communication_style: CommunicationStyle::for_traits(&ta),
            duration: BASE_INTERACTION_SECONDS * (0.5 + f64::from(ta.compatibility(&tb))),
            success,
            timestamp: now,
        };

        let delta = RelationshipDelta::for_outcome(success, interaction_type);
        let (Some(ia), Some(ib)) = (a.interaction_mut(), b.interaction_mut()) else {
            return Err(ReynardError::ComponentMissing {
                agent: *initiator,
                component: "interaction",
            });
        };
        ia.spend_energy(cost);
        ib.spend_energy(cost);
        ia.record(interaction.clone());
        ib.record(interaction.clone());
        ia.update_relationship(*target, delta, success, now);
        ib.update_relationship(*initiator, delta, success, now);

        let mutual = mutual_relationships(ia, ib, initiator, target);
        for (component, peer) in [(ia, target), (ib, initiator)] {
            if let Some(relationship) = component.relationships.get_mut(peer) {
                relationship.mutual_connections = mutual;
            }
        }

        self.stats.interactions += 1;
        if success {
            self.stats.successful_interactions += 1;
        }
        debug!(
            initiator = %initiator,
            target = %target,
            kind = ?interaction_type,
            success,
            probability,
            "Interaction recorded"
        );
        Ok(interaction)
    }

    /// The relationship `agent` holds toward `peer`, if any.
    #[must_use]
    pub fn get_relationship_status<R>(
        &self,
        registry: &R,
        agent: &AgentId,
        peer: &AgentId,
    ) -> Option<Relationship>
    where
        R: AgentRegistry,
        R::Agent: HasInteraction,
    {
        registry
            .get_agent(agent)?
            .interaction()?
            .relationship(peer)
            .cloned()
    }

    /// Interaction summary for one agent.
    #[must_use]
    pub fn get_interaction_stats<R>(&self, registry: &R, agent: &AgentId) -> Option<InteractionStats>
    where
        R: AgentRegistry,
        R::Agent: HasInteraction,
    {
        Some(registry.get_agent(agent)?.interaction()?.stats())
    }

    /// Run one tick: regenerate energy, then roll spontaneous interactions
    /// once the processing interval has passed.
    pub fn update<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: Positioned + HasTraits + HasInteraction,
    {
        let report = self.process_social_energy(registry, delta_time);
        if let Some(elapsed) = self.spontaneous_timer.advance(delta_time) {
            if self.config.spontaneous_interactions {
                self.process_spontaneous_interactions(registry, elapsed);
            }
        }
        report
    }

    /// Regenerate every agent's social energy toward its maximum.
    pub fn process_social_energy<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasInteraction,
    {
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(component) = registry
                .get_agent_mut(&id)
                .and_then(HasInteraction::interaction_mut)
            else {
                continue;
            };
            let result = if component.social_energy.is_finite()
                && component.max_social_energy.is_finite()
            {
                component.recover_energy(delta_time);
                Ok(())
            } else {
                Err(ReynardError::CorruptState {
                    agent: id,
                    reason: format!(
                        "social energy {} of {}",
                        component.social_energy, component.max_social_energy
                    ),
                })
            };
            isolate("interaction", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }

    /// Give every pair of nearby agents a chance to interact on their own.
    ///
    /// Each pair rolls its acceptance probability scaled by `elapsed`.
    fn process_spontaneous_interactions<R>(&mut self, registry: &mut R, elapsed: f64)
    where
        R: AgentRegistry,
        R::Agent: Positioned + HasTraits + HasInteraction,
    {
        let cost = self.config.social_energy_cost;
        let candidates: Vec<(AgentId, Position)> = registry
            .agent_ids()
            .into_iter()
            .filter_map(|id| {
                let agent = registry.get_agent(&id)?;
                agent.interaction().filter(|c| c.can_interact(cost))?;
                Some((id, agent.position()?))
            })
            .collect();

        for (i, (a, pa)) in candidates.iter().enumerate() {
            for (b, pb) in &candidates[i + 1..] {
                if !pa.is_within(pb, self.config.interaction_range) {
                    continue;
                }
                let Some(probability) = self.pair_acceptance(&*registry, a, b) else {
                    continue;
                };
                if !roll(&mut self.rng, f64::from(probability) * elapsed) {
                    continue;
                }
                let kind = SPONTANEOUS_TYPES[self.rng.gen_range(0..SPONTANEOUS_TYPES.len())];
                if self.interact(registry, a, b, kind).is_ok() {
                    self.stats.spontaneous_interactions += 1;
                }
            }
        }
    }

    fn pair_acceptance<R>(&self, registry: &R, a: &AgentId, b: &AgentId) -> Option<f32>
    where
        R: AgentRegistry,
        R::Agent: HasTraits + HasInteraction,
    {
        let agent_a = registry.get_agent(a)?;
        let agent_b = registry.get_agent(b)?;
        Some(acceptance_probability(
            self.config.base_interaction_probability,
            &agent_a.traits_or_default(),
            &agent_b.traits_or_default(),
            agent_a.interaction()?.relationship(b),
        ))
    }
}

/// Peers both sides have a relationship with, excluding each other.
fn mutual_relationships(
    a: &InteractionComponent,
    b: &InteractionComponent,
    a_id: &AgentId,
    b_id: &AgentId,
) -> u32 {
    let count = a
        .relationships
        .keys()
        .filter(|peer| *peer != a_id && *peer != b_id && b.relationships.contains_key(*peer))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reynard_core::agent::Agent;
    use reynard_core::config::ReynardConfig;
    use reynard_core::types::PersonalityTraits;

    use crate::registry::AgentStore;

    fn config() -> InteractionConfig {
        InteractionConfig {
            spontaneous_interactions: false,
            ..InteractionConfig::default()
        }
    }

    fn spawn(store: &mut AgentStore, name: &str, x: f32) -> AgentId {
        store.insert(Agent::new(
            name,
            Position::new(x, 0.0),
            PersonalityTraits::default(),
            &ReynardConfig::default(),
        ))
    }

    fn energy(store: &AgentStore, id: &AgentId) -> f32 {
        store
            .get_agent(id)
            .and_then(|a| a.interaction.as_ref())
            .map_or(-1.0, |c| c.social_energy)
    }

    #[test]
    fn interaction_costs_energy_and_records_both_sides() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 3.0);
        let mut system = InteractionSystem::seeded(config(), 7);

        assert!(system.initiate_interaction(&mut store, &a, &b, InteractionType::Communication));
        assert!((energy(&store, &a) - 90.0).abs() < 1e-4);
        assert!((energy(&store, &b) - 90.0).abs() < 1e-4);

        for id in [&a, &b] {
            let component = store.get_agent(id).and_then(|x| x.interaction.as_ref()).expect("component");
            assert_eq!(component.interactions.len(), 1);
        }
        let rel = system.get_relationship_status(&store, &a, &b).expect("relationship");
        assert_eq!(rel.interaction_count, 1);
        assert!(system.get_relationship_status(&store, &b, &a).is_some());
    }

    #[test]
    fn out_of_range_changes_nothing() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 5.5);
        let mut system = InteractionSystem::seeded(config(), 1);

        let err = system
            .try_initiate_interaction(&mut store, &a, &b, InteractionType::Social)
            .expect_err("too far");
        assert!(matches!(err, ReynardError::OutOfRange { .. }));
        assert!((energy(&store, &a) - 100.0).abs() < f32::EPSILON);
        assert!(system.get_relationship_status(&store, &a, &b).is_none());
        assert_eq!(system.stats().rejected_requests, 1);
    }

    #[test]
    fn range_is_inclusive() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 5.0);
        let system = InteractionSystem::seeded(config(), 1);
        assert!(system.check_proximity(&store, &a, &b));
        assert!(!system.check_proximity(&store, &a, &AgentId::new()));
    }

    #[test]
    fn depleted_energy_is_refused() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 1.0);
        if let Some(c) = store.get_agent_mut(&b).and_then(|x| x.interaction.as_mut()) {
            c.social_energy = 5.0;
        }
        let mut system = InteractionSystem::seeded(config(), 1);
        let err = system
            .try_initiate_interaction(&mut store, &a, &b, InteractionType::Social)
            .expect_err("tired");
        assert!(matches!(err, ReynardError::InsufficientEnergy { .. }));
        assert!((energy(&store, &a) - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn self_and_missing_agents_are_refused() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let mut system = InteractionSystem::seeded(config(), 1);
        assert!(matches!(
            system.try_initiate_interaction(&mut store, &a, &a, InteractionType::Social),
            Err(ReynardError::SelfInteraction(_))
        ));
        assert!(!system.initiate_interaction(&mut store, &a, &AgentId::new(), InteractionType::Social));
    }

    #[test]
    fn high_threshold_declines() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 1.0);
        let mut system = InteractionSystem::seeded(
            InteractionConfig {
                acceptance_threshold: 0.95,
                ..config()
            },
            1,
        );
        assert!(matches!(
            system.try_initiate_interaction(&mut store, &a, &b, InteractionType::Social),
            Err(ReynardError::Declined { .. })
        ));
    }

    #[test]
    fn energy_recovers_up_to_max() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 1.0);
        let mut system = InteractionSystem::seeded(config(), 3);
        system.initiate_interaction(&mut store, &a, &b, InteractionType::Social);

        system.update(&mut store, 1.0);
        assert!((energy(&store, &a) - 95.0).abs() < 1e-4);
        system.update(&mut store, 10.0);
        assert!((energy(&store, &a) - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn spontaneous_interactions_happen_between_neighbours() {
        let mut store = AgentStore::new();
        let a = spawn(&mut store, "A", 0.0);
        let b = spawn(&mut store, "B", 1.0);
        let far = spawn(&mut store, "far", 100.0);
        let mut system = InteractionSystem::seeded(
            InteractionConfig {
                spontaneous_interactions: true,
                processing_interval_secs: 1.0,
                ..InteractionConfig::default()
            },
            11,
        );
        // A long interval makes the roll certain.
        system.update(&mut store, 10.0);
        assert_eq!(system.stats().spontaneous_interactions, 1);
        assert!(system.get_relationship_status(&store, &a, &b).is_some());
        assert!(system.get_relationship_status(&store, &a, &far).is_none());
    }

    #[test]
    fn seeded_systems_agree() {
        let run = |seed| {
            let mut store = AgentStore::new();
            let a = spawn(&mut store, "A", 0.0);
            let b = spawn(&mut store, "B", 1.0);
            let mut system = InteractionSystem::seeded(config(), seed);
            (0..5)
                .map(|_| {
                    system.update(&mut store, 10.0);
                    system
                        .try_initiate_interaction(&mut store, &a, &b, InteractionType::Social)
                        .map(|i| i.success)
                        .unwrap_or(false)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
