//! Gender system: identity, expression, pronouns, support networks and
//! coming-out status, plus fluidity drift and confidence over time.
//!
//! Identity only ever changes on request. Fluidity moves expression, never
//! identity.

use std::collections::BTreeMap;

use reynard_core::agent::HasGender;
use reynard_core::config::GenderConfig;
use reynard_core::error::{ReynardError, Result};
use reynard_core::gender::{GenderComponent, GenderExpression, GenderIdentity, GenderStats, PronounSet};
use reynard_core::types::AgentId;
use serde::Serialize;
use tracing::{debug, info};

use super::{TickReport, isolate};
use crate::registry::AgentRegistry;

/// Confidence gained per simulated second with a full support network.
const CONFIDENCE_GAIN_PER_SEC: f32 = 0.001;
/// Confidence lost per simulated second while wellbeing is low.
const CONFIDENCE_LOSS_PER_SEC: f32 = 0.002;
/// Confidence gained per simulated second while euphoria is high.
const EUPHORIA_CONFIDENCE_GAIN_PER_SEC: f32 = 0.002;
/// Euphoria above which it feeds confidence.
const EUPHORIA_BOOST_THRESHOLD: f32 = 0.5;
/// Confidence and euphoria gained per simulated second by each side of a
/// mutual support pair.
const MUTUAL_SUPPORT_GAIN_PER_SEC: f32 = 0.001;

/// Lifetime counters for the gender system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenderSystemStats {
    /// Requested identity changes applied.
    pub identity_changes: u64,
    /// Requested expression changes applied.
    pub expression_changes: u64,
    /// Expression shifts caused by fluidity drift.
    pub drift_shifts: u64,
    /// Supporters added or removed.
    pub support_changes: u64,
    /// Coming-out status updates.
    pub coming_out_updates: u64,
    /// Mutual support pairs found during the last tick.
    pub mutual_support_pairs: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
}

/// World-wide identity, expression and pronoun counts, rebuilt every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenderDistribution {
    /// Agents with a gender component.
    pub agents: usize,
    /// Agents per primary identity.
    pub identities: BTreeMap<GenderIdentity, usize>,
    /// Agents per expression.
    pub expressions: BTreeMap<GenderExpression, usize>,
    /// Agents per preferred subject pronoun.
    pub pronouns: BTreeMap<String, usize>,
}

/// Applies gender requests and runs fluidity and confidence over time.
#[derive(Debug, Clone)]
pub struct GenderSystem {
    config: GenderConfig,
    stats: GenderSystemStats,
    distribution: GenderDistribution,
}

fn gender_of<A: HasGender>(agent: &mut A, id: AgentId) -> Result<&mut GenderComponent> {
    agent.gender_mut().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "gender",
    })
}

fn lookup<'a, R>(registry: &'a mut R, agent: &AgentId) -> Result<&'a mut GenderComponent>
where
    R: AgentRegistry,
    R::Agent: HasGender,
{
    let found = registry
        .get_agent_mut(agent)
        .ok_or(ReynardError::AgentNotFound(*agent))?;
    gender_of(found, *agent)
}

fn require_peer<R: AgentRegistry>(registry: &R, agent: &AgentId, peer: &AgentId) -> Result<()> {
    if agent == peer {
        return Err(ReynardError::SelfInteraction(*agent));
    }
    if !registry.contains(peer) {
        return Err(ReynardError::AgentNotFound(*peer));
    }
    Ok(())
}

impl GenderSystem {
    /// A gender system tuned by `config`.
    #[must_use]
    pub fn new(config: GenderConfig) -> Self {
        Self {
            config,
            stats: GenderSystemStats::default(),
            distribution: GenderDistribution::default(),
        }
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> GenderSystemStats {
        self.stats
    }

    /// Counts from the most recent tick.
    #[must_use]
    pub fn distribution(&self) -> &GenderDistribution {
        &self.distribution
    }

    /// Set an agent's primary identity. `false` on lookup failure; setting
    /// the current identity again succeeds without logging a change.
    pub fn update_gender_identity<R>(&mut self, registry: &mut R, agent: &AgentId, identity: GenderIdentity) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        self.try_update_gender_identity(registry, agent, identity)
            .inspect_err(|e| debug!(agent = %agent, error = %e, "Identity not updated"))
            .is_ok()
    }

    /// Set an agent's primary identity. `Ok(true)` if it changed.
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    pub fn try_update_gender_identity<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        identity: GenderIdentity,
    ) -> Result<bool>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let now = registry.now();
        let changed = lookup(registry, agent)?.update_identity(identity, now);
        if changed {
            self.stats.identity_changes += 1;
            info!(agent = %agent, ?identity, "Gender identity updated");
        }
        Ok(changed)
    }

    /// Set an agent's expression. `false` on lookup failure.
    pub fn set_gender_expression<R>(&mut self, registry: &mut R, agent: &AgentId, expression: GenderExpression) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        self.try_set_gender_expression(registry, agent, expression)
            .inspect_err(|e| debug!(agent = %agent, error = %e, "Expression not set"))
            .is_ok()
    }

    /// Set an agent's expression. `Ok(true)` if it changed.
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    pub fn try_set_gender_expression<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        expression: GenderExpression,
    ) -> Result<bool>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let now = registry.now();
        let changed = lookup(registry, agent)?.set_expression(expression, false, now);
        if changed {
            self.stats.expression_changes += 1;
            debug!(agent = %agent, ?expression, "Gender expression set");
        }
        Ok(changed)
    }

    /// Make `pronouns` the agent's preferred set. `false` on lookup failure.
    pub fn set_preferred_pronouns<R>(&mut self, registry: &mut R, agent: &AgentId, pronouns: PronounSet) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        lookup(registry, agent)
            .map(|gender| gender.prefer_pronouns(pronouns))
            .inspect_err(|e| debug!(agent = %agent, error = %e, "Pronouns not set"))
            .is_ok()
    }

    /// Set how strongly an agent's expression drifts, clamped to `[0, 1]`.
    pub fn set_gender_fluidity<R>(&mut self, registry: &mut R, agent: &AgentId, fluidity: f32) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        lookup(registry, agent)
            .map(|gender| gender.profile.gender_fluidity = fluidity.clamp(0.0, 1.0))
            .inspect_err(|e| debug!(agent = %agent, error = %e, "Fluidity not set"))
            .is_ok()
    }

    /// Add `supporter` to the agent's support network. `false` if either
    /// agent is missing or they are the same agent.
    pub fn add_support_agent<R>(&mut self, registry: &mut R, agent: &AgentId, supporter: &AgentId) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        self.try_add_support_agent(registry, agent, supporter)
            .inspect_err(|e| debug!(agent = %agent, supporter = %supporter, error = %e, "Supporter not added"))
            .is_ok()
    }

    /// Add a supporter. `Ok(false)` if already present.
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`] or
    /// [`ReynardError::ComponentMissing`].
    pub fn try_add_support_agent<R>(&mut self, registry: &mut R, agent: &AgentId, supporter: &AgentId) -> Result<bool>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        require_peer(&*registry, agent, supporter)?;
        let now = registry.now();
        let added = lookup(registry, agent)?.add_support_agent(*supporter, now);
        if added {
            self.stats.support_changes += 1;
            debug!(agent = %agent, supporter = %supporter, "Supporter added");
        }
        Ok(added)
    }

    /// Remove `supporter` from the agent's support network.
    pub fn remove_support_agent<R>(&mut self, registry: &mut R, agent: &AgentId, supporter: &AgentId) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        self.try_remove_support_agent(registry, agent, supporter)
            .inspect_err(|e| debug!(agent = %agent, supporter = %supporter, error = %e, "Supporter not removed"))
            .is_ok()
    }

    /// Remove a supporter. `Ok(false)` if they were not in the network.
    ///
    /// A supporter who has since left the world can still be removed.
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`].
    pub fn try_remove_support_agent<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        supporter: &AgentId,
    ) -> Result<bool>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let now = registry.now();
        let removed = lookup(registry, agent)?.remove_support_agent(supporter, now);
        if removed {
            self.stats.support_changes += 1;
            debug!(agent = %agent, supporter = %supporter, "Supporter removed");
        }
        Ok(removed)
    }

    /// Record whether the agent is out to `peer`.
    pub fn update_coming_out_status<R>(&mut self, registry: &mut R, agent: &AgentId, peer: &AgentId, disclosed: bool) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        self.try_update_coming_out_status(registry, agent, peer, disclosed)
            .inspect_err(|e| debug!(agent = %agent, peer = %peer, error = %e, "Coming-out status not updated"))
            .is_ok()
    }

    /// Record whether the agent is out to `peer`, returning the new wellbeing.
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`] or
    /// [`ReynardError::ComponentMissing`].
    pub fn try_update_coming_out_status<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        peer: &AgentId,
        disclosed: bool,
    ) -> Result<f32>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        require_peer(&*registry, agent, peer)?;
        let now = registry.now();
        let gender = lookup(registry, agent)?;
        gender.update_coming_out_status(*peer, disclosed, now);
        let wellbeing = gender.profile.gender_wellbeing;
        self.stats.coming_out_updates += 1;
        info!(agent = %agent, peer = %peer, disclosed, wellbeing, "Coming-out status updated");
        Ok(wellbeing)
    }

    /// Current wellbeing, recomputed from the profile.
    #[must_use]
    pub fn calculate_gender_wellbeing<R>(&self, registry: &R, agent: &AgentId) -> Option<f32>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let gender = registry.get_agent(agent)?.gender()?;
        Some(reynard_core::gender::calculate_gender_wellbeing(
            &gender.profile,
            gender.support_cap,
        ))
    }

    /// Gender summary for one agent.
    #[must_use]
    pub fn get_gender_stats<R>(&self, registry: &R, agent: &AgentId) -> Option<GenderStats>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        Some(registry.get_agent(agent)?.gender()?.stats())
    }

    /// Agents whose wellbeing is below the support threshold.
    #[must_use]
    pub fn agents_needing_support<R>(&self, registry: &R) -> Vec<AgentId>
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        registry
            .agent_ids()
            .into_iter()
            .filter(|id| {
                registry
                    .get_agent(id)
                    .and_then(HasGender::gender)
                    .is_some_and(|g| g.profile.gender_wellbeing < self.config.support_network_threshold)
            })
            .collect()
    }

    /// Run one tick: fluidity drift, expression confidence, mutual support,
    /// then the world-wide counts.
    pub fn update<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let mut report = self.process_gender_fluidity(registry, delta_time);
        let confidence = self.process_expression_confidence(registry, delta_time);
        report.agent_errors += confidence.agent_errors;
        self.process_social_gender_dynamics(registry, delta_time);
        self.update_gender_statistics(&*registry);
        report
    }

    /// Advance each fluid agent's drift phase; whole units shift expression.
    pub fn process_gender_fluidity<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let now = registry.now();
        let rate = self.config.gender_fluidity_rate;
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(gender) = registry.get_agent_mut(&id).and_then(HasGender::gender_mut) else {
                continue;
            };
            let result = check_gender(gender, id).map(|()| {
                let amount = gender.profile.gender_fluidity * rate * delta_time as f32;
                if let Some(expression) = gender.advance_drift(amount, now) {
                    self.stats.drift_shifts += 1;
                    debug!(agent = %id, ?expression, "Expression drifted");
                }
            });
            isolate("gender", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }

    /// Support raises expression confidence; wellbeing below the support
    /// threshold lowers it, never below the configured floor.
    pub fn process_expression_confidence<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let dt = delta_time.max(0.0) as f32;
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(gender) = registry.get_agent_mut(&id).and_then(HasGender::gender_mut) else {
                continue;
            };
            let result = check_gender(gender, id).map(|()| {
                let cap = gender.support_cap.max(1);
                let support = gender.profile.support_network.len().min(cap) as f32 / cap as f32;
                let mut delta = CONFIDENCE_GAIN_PER_SEC * support * dt;
                if gender.profile.gender_euphoria > EUPHORIA_BOOST_THRESHOLD {
                    delta += EUPHORIA_CONFIDENCE_GAIN_PER_SEC * dt;
                }
                if gender.profile.gender_wellbeing < self.config.support_network_threshold {
                    delta -= CONFIDENCE_LOSS_PER_SEC * dt;
                }
                if delta != 0.0 {
                    gender.adjust_confidence(delta, self.config.expression_confidence_threshold);
                }
            });
            isolate("gender", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }

    /// Agents who support each other both gain confidence and euphoria.
    /// Returns the number of mutual pairs found.
    pub fn process_social_gender_dynamics<R>(&mut self, registry: &mut R, delta_time: f64) -> usize
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let gain = MUTUAL_SUPPORT_GAIN_PER_SEC * delta_time.max(0.0) as f32;
        let mut pairs = Vec::new();
        for id in registry.agent_ids() {
            let Some(gender) = registry.get_agent(&id).and_then(HasGender::gender) else {
                continue;
            };
            for peer in gender.profile.support_network.range(id..).skip_while(|p| **p == id) {
                let mutual = registry
                    .get_agent(peer)
                    .and_then(HasGender::gender)
                    .is_some_and(|g| g.profile.support_network.contains(&id));
                if mutual {
                    pairs.push((id, *peer));
                }
            }
        }

        let floor = self.config.expression_confidence_threshold;
        for id in pairs.iter().flat_map(|(a, b)| [a, b]) {
            let Some(gender) = registry.get_agent_mut(id).and_then(HasGender::gender_mut) else {
                continue;
            };
            if gain > 0.0 && check_gender(gender, *id).is_ok() {
                gender.adjust_confidence(gain, floor);
                gender.lift_euphoria(gain);
            }
        }
        self.stats.mutual_support_pairs = pairs.len() as u64;
        if !pairs.is_empty() {
            debug!(pairs = pairs.len(), "Mutual support applied");
        }
        pairs.len()
    }

    /// Rebuild the world-wide identity, expression and pronoun counts.
    pub fn update_gender_statistics<R>(&mut self, registry: &R)
    where
        R: AgentRegistry,
        R::Agent: HasGender,
    {
        let mut distribution = GenderDistribution::default();
        for id in registry.agent_ids() {
            let Some(gender) = registry.get_agent(&id).and_then(HasGender::gender) else {
                continue;
            };
            distribution.agents += 1;
            *distribution
                .identities
                .entry(gender.profile.primary_identity)
                .or_default() += 1;
            *distribution
                .expressions
                .entry(gender.profile.expression)
                .or_default() += 1;
            if let Some(pronouns) = gender.preferred_pronouns() {
                *distribution
                    .pronouns
                    .entry(pronouns.subject.clone())
                    .or_default() += 1;
            }
        }
        self.distribution = distribution;
    }
}

fn check_gender(gender: &GenderComponent, agent: AgentId) -> Result<()> {
    let profile = &gender.profile;
    if !profile.gender_fluidity.is_finite()
        || !profile.expression_confidence.is_finite()
        || !profile.drift_phase.is_finite()
    {
        return Err(ReynardError::CorruptState {
            agent,
            reason: "non-finite gender profile value".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reynard_core::agent::Agent;
    use reynard_core::config::ReynardConfig;
    use reynard_core::types::{PersonalityTraits, Position};

    use crate::registry::AgentStore;

    fn pair() -> (GenderSystem, AgentStore, AgentId, AgentId) {
        let mut store = AgentStore::new();
        let config = ReynardConfig::default();
        let a = store.insert(Agent::new("a", Position::new(0.0, 0.0), PersonalityTraits::default(), &config));
        let b = store.insert(Agent::new("b", Position::new(1.0, 0.0), PersonalityTraits::default(), &config));
        (GenderSystem::new(config.gender), store, a, b)
    }

    fn profile<'a>(store: &'a AgentStore, id: &AgentId) -> &'a reynard_core::gender::GenderProfile {
        &store.get_agent(id).and_then(|a| a.gender.as_ref()).expect("gender").profile
    }

    #[test]
    fn coming_out_to_supporter_raises_wellbeing() {
        let (mut system, mut store, a, b) = pair();
        assert!(system.add_support_agent(&mut store, &a, &b));
        let before = profile(&store, &a).gender_wellbeing;
        assert!(system.update_coming_out_status(&mut store, &a, &b, true));

        let stats = system.get_gender_stats(&store, &a).expect("stats");
        assert_eq!(stats.coming_out_status.get(&b), Some(&true));
        assert!(stats.gender_wellbeing > before);
        assert_eq!(profile(&store, &a).coming_out_events.len(), 1);
    }

    #[test]
    fn identity_changes_are_logged_once() {
        let (mut system, mut store, a, _) = pair();
        assert_eq!(system.try_update_gender_identity(&mut store, &a, GenderIdentity::Genderfluid).ok(), Some(true));
        assert_eq!(system.try_update_gender_identity(&mut store, &a, GenderIdentity::Genderfluid).ok(), Some(false));
        assert!(system.update_gender_identity(&mut store, &a, GenderIdentity::Genderfluid));
        assert_eq!(profile(&store, &a).identity_change_history.len(), 1);
        assert_eq!(system.stats().identity_changes, 1);
    }

    #[test]
    fn missing_agents_are_refused() {
        let (mut system, mut store, a, _) = pair();
        let ghost = AgentId::new();
        assert!(!system.update_gender_identity(&mut store, &ghost, GenderIdentity::Agender));
        assert!(!system.add_support_agent(&mut store, &a, &ghost));
        assert!(!system.add_support_agent(&mut store, &a, &a));
        assert!(!system.update_coming_out_status(&mut store, &a, &ghost, true));
        assert!(system.get_gender_stats(&store, &ghost).is_none());
        assert!(profile(&store, &a).support_network.is_empty());
    }

    #[test]
    fn support_network_add_and_remove() {
        let (mut system, mut store, a, b) = pair();
        assert_eq!(system.try_add_support_agent(&mut store, &a, &b).ok(), Some(true));
        assert_eq!(system.try_add_support_agent(&mut store, &a, &b).ok(), Some(false));
        assert_eq!(system.try_remove_support_agent(&mut store, &a, &b).ok(), Some(true));
        assert_eq!(system.try_remove_support_agent(&mut store, &a, &b).ok(), Some(false));
        assert_eq!(profile(&store, &a).support_network_changes.len(), 2);
    }

    #[test]
    fn pronouns_put_first() {
        let (mut system, mut store, a, _) = pair();
        assert!(system.set_preferred_pronouns(&mut store, &a, PronounSet::she()));
        assert!(system.set_preferred_pronouns(&mut store, &a, PronounSet::they()));
        let stats = system.get_gender_stats(&store, &a).expect("stats");
        assert_eq!(stats.preferred_pronouns, Some(PronounSet::they()));
    }

    #[test]
    fn fluidity_drifts_expression_not_identity() {
        let (mut system, mut store, a, _) = pair();
        let identity = profile(&store, &a).primary_identity;
        assert!(system.set_gender_fluidity(&mut store, &a, 1.0));
        // 1.0 fluidity at 0.01/s crosses one drift unit after 100 s.
        for _ in 0..20 {
            system.process_gender_fluidity(&mut store, 10.0);
        }
        assert!(!profile(&store, &a).expression_changes.is_empty());
        assert!(profile(&store, &a).expression_changes.iter().all(|c| c.drifted));
        assert_eq!(profile(&store, &a).primary_identity, identity);
        assert!(system.stats().drift_shifts >= 1);
    }

    #[test]
    fn static_agents_never_drift() {
        let (mut system, mut store, a, _) = pair();
        assert!(system.set_gender_fluidity(&mut store, &a, 0.0));
        system.process_gender_fluidity(&mut store, 10_000.0);
        assert!(profile(&store, &a).expression_changes.is_empty());
    }

    #[test]
    fn support_builds_confidence() {
        let (mut system, mut store, a, b) = pair();
        system.add_support_agent(&mut store, &a, &b);
        let before = profile(&store, &a).expression_confidence;
        system.process_expression_confidence(&mut store, 100.0);
        assert!(profile(&store, &a).expression_confidence > before);
    }

    #[test]
    fn low_wellbeing_erodes_confidence_to_floor() {
        let mut config = ReynardConfig::default();
        config.gender.support_network_threshold = 1.0;
        let mut store = AgentStore::new();
        let a = store.insert(Agent::new("a", Position::new(0.0, 0.0), PersonalityTraits::default(), &config));
        let mut system = GenderSystem::new(config.gender.clone());
        assert_eq!(system.agents_needing_support(&store), vec![a]);

        for _ in 0..100 {
            system.process_expression_confidence(&mut store, 100.0);
        }
        let confidence = profile(&store, &a).expression_confidence;
        assert!((confidence - config.gender.expression_confidence_threshold).abs() < 1e-6);
    }

    #[test]
    fn mutual_support_builds_confidence_and_euphoria() {
        let (mut system, mut store, a, b) = pair();
        system.add_support_agent(&mut store, &a, &b);
        assert_eq!(system.process_social_gender_dynamics(&mut store, 10.0), 0);

        system.add_support_agent(&mut store, &b, &a);
        let before = profile(&store, &a).expression_confidence;
        assert_eq!(system.process_social_gender_dynamics(&mut store, 10.0), 1);
        for id in [a, b] {
            assert!(profile(&store, &id).gender_euphoria > 0.0);
        }
        assert!(profile(&store, &a).expression_confidence > before);
        assert_eq!(system.stats().mutual_support_pairs, 1);
    }

    #[test]
    fn euphoria_feeds_confidence() {
        let (mut system, mut store, a, _) = pair();
        if let Some(gender) = store.get_agent_mut(&a).and_then(|x| x.gender.as_mut()) {
            gender.lift_euphoria(0.9);
        }
        let before = profile(&store, &a).expression_confidence;
        system.process_expression_confidence(&mut store, 10.0);
        assert!(profile(&store, &a).expression_confidence > before);
    }

    #[test]
    fn distribution_counts_every_agent() {
        let (mut system, mut store, a, b) = pair();
        system.update_gender_identity(&mut store, &a, GenderIdentity::Female);
        system.set_gender_expression(&mut store, &a, GenderExpression::Feminine);
        system.set_preferred_pronouns(&mut store, &a, PronounSet::she());
        system.set_preferred_pronouns(&mut store, &b, PronounSet::they());
        system.update(&mut store, 1.0);

        let distribution = system.distribution();
        assert_eq!(distribution.agents, 2);
        assert_eq!(distribution.identities.get(&GenderIdentity::Female), Some(&1));
        assert_eq!(distribution.identities.get(&GenderIdentity::NonBinary), Some(&1));
        assert_eq!(distribution.expressions.get(&GenderExpression::Feminine), Some(&1));
        assert_eq!(distribution.pronouns.get("she"), Some(&1));
        assert_eq!(distribution.pronouns.get("they"), Some(&1));
    }
}
