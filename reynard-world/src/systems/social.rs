//! Social system: connections, groups, influence and leadership.
//!
//! Every member's [`SocialComponent`] holds its own copy of each group it
//! belongs to. The system keeps those copies in step: any change to a group
//! is written back to every member, and the leader's copy wins if copies
//! ever disagree.
//!
//! On each processing interval the tick lets eligible agents found groups,
//! runs group dynamics, then lets compatible strangers connect.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reynard_core::agent::{HasInteraction, HasSocial, HasTraits};
use reynard_core::config::SocialConfig;
use reynard_core::error::{ReynardError, Result};
use reynard_core::social::{
    GroupType, SocialComponent, SocialConnection, SocialGroup, SocialStatus,
    calculate_social_influence, fits_group, group_activity_preference, group_health,
    spontaneous_connection_strength,
};
use reynard_core::types::{AgentId, GroupId, PersonalityTraits, SimTime};
use serde::Serialize;
use tracing::{debug, info};

use super::{IntervalTimer, TickReport, isolate};
use crate::registry::AgentRegistry;

/// Founders need more than this share of their social energy.
const FOUNDER_MIN_ENERGY: f32 = 0.7;
/// Founders need a group-activity preference above this.
const FOUNDER_MIN_PREFERENCE: f32 = 0.6;
/// Founders need leadership ability above this.
const FOUNDER_MIN_LEADERSHIP: f32 = 0.5;
/// Joiners need more than this share of their social energy.
const JOINER_MIN_ENERGY: f32 = 0.5;
/// Joiners need a group-activity preference above this.
const JOINER_MIN_PREFERENCE: f32 = 0.4;
/// Fitting joiners a founder needs before a group forms.
const MIN_FOUNDED_MEMBERS: usize = 2;
/// Most joiners a founder takes on.
const MAX_FOUNDED_MEMBERS: usize = 5;
/// Share of the founder's energy ceiling spent founding a group.
const FOUNDING_ENERGY_SHARE: f32 = 0.3;
/// Agents below this share of their energy make no new connections.
const NETWORK_MIN_ENERGY: f32 = 0.3;
/// Agents below this group-activity preference make no new connections.
const NETWORK_MIN_PREFERENCE: f32 = 0.3;
/// Trait compatibility needed before two strangers may connect.
const NETWORK_MIN_COMPATIBILITY: f32 = 0.4;
/// Candidates each agent considers per network pass.
const MAX_NEW_CONNECTIONS: usize = 2;

/// Lifetime counters for the social system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SocialSystemStats {
    /// Groups created.
    pub groups_created: u64,
    /// Groups dissolved, by health or by their last member leaving.
    pub groups_dissolved: u64,
    /// Leaders replaced.
    pub leadership_changes: u64,
    /// New connections formed (reinforcements not counted).
    pub connections_formed: u64,
    /// Groups founded by the tick rather than a request.
    pub spontaneous_groups: u64,
    /// Connections struck up by the tick rather than a request.
    pub spontaneous_connections: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
}

/// A snapshot of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupInfo {
    /// Group id.
    pub group_id: GroupId,
    /// Display name.
    pub name: String,
    /// Purpose.
    pub group_type: GroupType,
    /// Current leader.
    pub leader_id: AgentId,
    /// Members, leader included.
    pub members: Vec<AgentId>,
    /// Cohesion.
    pub cohesion: f32,
    /// Health as evaluated by the group-dynamics pass.
    pub health: f32,
    /// Creation time.
    pub created_at: SimTime,
}

/// One agent's view of its social network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SocialNetwork {
    /// The agent.
    pub agent_id: AgentId,
    /// Connections, strongest first.
    pub connections: Vec<SocialConnection>,
    /// Groups the agent belongs to.
    pub groups: Vec<GroupId>,
    /// Groups the agent leads.
    pub leader_of: Vec<GroupId>,
    /// Influence.
    pub social_influence: f32,
    /// Status derived from influence.
    pub social_status: SocialStatus,
}

/// Forms connections and groups, and runs group dynamics.
#[derive(Debug, Clone)]
pub struct SocialSystem {
    config: SocialConfig,
    rng: StdRng,
    dynamics_timer: IntervalTimer,
    last_dynamics: SimTime,
    stats: SocialSystemStats,
}

fn social_of<A: HasSocial>(agent: &A, id: AgentId) -> Result<&SocialComponent> {
    agent.social().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "social",
    })
}

fn require_social<R>(registry: &R, id: &AgentId) -> Result<()>
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    let agent = registry
        .get_agent(id)
        .ok_or(ReynardError::AgentNotFound(*id))?;
    social_of(agent, *id).map(|_| ())
}

fn influence_of<R>(registry: &R, id: &AgentId) -> f32
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    registry
        .get_agent(id)
        .and_then(HasSocial::social)
        .map_or(0.0, |s| s.social_influence)
}

impl SocialSystem {
    /// A social system with its own random source.
    #[must_use]
    pub fn new(config: SocialConfig, rng: StdRng) -> Self {
        Self {
            dynamics_timer: IntervalTimer::new(config.processing_interval_secs),
            config,
            rng,
            last_dynamics: SimTime::zero(),
            stats: SocialSystemStats::default(),
        }
    }

    /// A social system seeded for reproducible rolls.
    #[must_use]
    pub fn seeded(config: SocialConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> SocialSystemStats {
        self.stats
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Create a group led by `creator`. `None` if the creator or any member
    /// is missing, in which case nothing changes.
    pub fn create_social_group<R>(
        &mut self,
        registry: &mut R,
        creator: &AgentId,
        name: &str,
        group_type: GroupType,
        members: &[AgentId],
    ) -> Option<GroupId>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        self.try_create_social_group(registry, creator, name, group_type, members)
            .inspect_err(|e| debug!(creator = %creator, error = %e, "Group not created"))
            .ok()
    }

    /// Fallible form of [`Self::create_social_group`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`] or [`ReynardError::ComponentMissing`]
    /// for the first agent that fails lookup.
    pub fn try_create_social_group<R>(
        &mut self,
        registry: &mut R,
        creator: &AgentId,
        name: &str,
        group_type: GroupType,
        members: &[AgentId],
    ) -> Result<GroupId>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        for id in std::iter::once(creator).chain(members) {
            require_social(&*registry, id)?;
        }

        let group = SocialGroup::new(
            name,
            group_type,
            *creator,
            members.iter().copied(),
            self.config.initial_group_cohesion,
            registry.now(),
        );
        sync_group(registry, &group);
        self.stats.groups_created += 1;

        info!(
            group = %group.group_id(),
            name = group.name(),
            leader = %creator,
            members = group.size(),
            "Social group created"
        );
        Ok(group.group_id())
    }

    /// Remove `agent` from a group. A departing leader hands over to the most
    /// influential remaining member; the last member leaving dissolves it.
    pub fn leave_social_group<R>(&mut self, registry: &mut R, agent: &AgentId, group_id: &GroupId) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        self.try_leave_social_group(registry, agent, group_id)
            .inspect_err(|e| debug!(agent = %agent, group = %group_id, error = %e, "Leave refused"))
            .is_ok()
    }

    /// Fallible form of [`Self::leave_social_group`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`], [`ReynardError::ComponentMissing`] or
    /// [`ReynardError::GroupNotFound`] if the agent is not a member.
    pub fn try_leave_social_group<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        group_id: &GroupId,
    ) -> Result<()>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        let member = registry
            .get_agent(agent)
            .ok_or(ReynardError::AgentNotFound(*agent))?;
        let mut group = social_of(member, *agent)?
            .groups
            .get(group_id)
            .map(|m| m.group.clone())
            .ok_or(ReynardError::GroupNotFound(*group_id))?;

        if group.leader_id() == *agent {
            let successor = strongest_member(&*registry, &group);
            match successor {
                Some((next, _)) => {
                    group.set_leader(next);
                    info!(group = %group_id, leader = %next, "Leader left, successor takes over");
                    self.stats.leadership_changes += 1;
                }
                None => {
                    self.dissolve(registry, &group, "last member left");
                    return Ok(());
                }
            }
        }
        group.remove_member(agent);

        if let Some(social) = registry.get_agent_mut(agent).and_then(HasSocial::social_mut) {
            social.leave_group(group_id);
            social.refresh_influence();
        }
        sync_group(registry, &group);
        debug!(agent = %agent, group = %group_id, "Left social group");
        Ok(())
    }

    /// A snapshot of a group, with its current health.
    #[must_use]
    pub fn get_group_info<R>(&self, registry: &R, group_id: &GroupId) -> Option<GroupInfo>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        let group = collect_groups(registry).remove(group_id)?;
        let health = group_health(&group, internal_strength(registry, &group));
        Some(GroupInfo {
            group_id: group.group_id(),
            name: group.name().to_string(),
            group_type: group.group_type(),
            leader_id: group.leader_id(),
            members: group.members().iter().copied().collect(),
            cohesion: group.cohesion,
            health,
            created_at: group.created_at(),
        })
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Connect two agents symmetrically at `strength` (clamped). Reconnecting
    /// overwrites the strength. `false` on lookup failure.
    pub fn form_social_connection<R>(
        &mut self,
        registry: &mut R,
        a: &AgentId,
        b: &AgentId,
        strength: f32,
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        self.try_form_social_connection(registry, a, b, strength)
            .inspect_err(|e| debug!(a = %a, b = %b, error = %e, "Connection not formed"))
            .is_ok()
    }

    /// Fallible form of [`Self::form_social_connection`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`] or
    /// [`ReynardError::ComponentMissing`].
    pub fn try_form_social_connection<R>(
        &mut self,
        registry: &mut R,
        a: &AgentId,
        b: &AgentId,
        strength: f32,
    ) -> Result<()>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        if a == b {
            return Err(ReynardError::SelfInteraction(*a));
        }
        require_social(&*registry, a)?;
        require_social(&*registry, b)?;

        let now = registry.now();
        let (agent_a, agent_b) = registry
            .get_pair_mut(a, b)
            .ok_or(ReynardError::AgentNotFound(*b))?;
        let (Some(sa), Some(sb)) = (agent_a.social_mut(), agent_b.social_mut()) else {
            return Err(ReynardError::ComponentMissing {
                agent: *a,
                component: "social",
            });
        };

        let formed = sa.connect(*b, strength, now);
        sb.connect(*a, strength, now);

        let mutual = sa
            .connections
            .keys()
            .filter(|peer| *peer != a && *peer != b && sb.connections.contains_key(*peer))
            .count();
        let mutual = u32::try_from(mutual).unwrap_or(u32::MAX);
        if let Some(c) = sa.connections.get_mut(b) {
            c.mutual_connections = mutual;
        }
        if let Some(c) = sb.connections.get_mut(a) {
            c.mutual_connections = mutual;
        }
        sa.refresh_influence();
        sb.refresh_influence();

        if formed {
            self.stats.connections_formed += 1;
        }
        debug!(a = %a, b = %b, strength, mutual, formed, "Social connection updated");
        Ok(())
    }

    /// An agent's connections, memberships and standing.
    #[must_use]
    pub fn get_social_network<R>(&self, registry: &R, agent: &AgentId) -> Option<SocialNetwork>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        let social = registry.get_agent(agent)?.social()?;
        let mut connections: Vec<SocialConnection> = social.connections.values().cloned().collect();
        connections.sort_by_key(|c| (Reverse(OrderedFloat(c.connection_strength)), c.peer_id));
        let mut groups: Vec<GroupId> = social.groups.keys().copied().collect();
        groups.sort();
        Some(SocialNetwork {
            agent_id: *agent,
            connections,
            groups,
            leader_of: social.leadership_roles(),
            social_influence: social.social_influence,
            social_status: social.social_status,
        })
    }

    /// Influence recomputed from the agent's current connections and roles.
    #[must_use]
    pub fn calculate_social_influence<R>(&self, registry: &R, agent: &AgentId) -> Option<f32>
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        Some(calculate_social_influence(registry.get_agent(agent)?.social()?))
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one tick. Once the processing interval has passed: spontaneous
    /// group formation, group dynamics, then spontaneous connections.
    pub fn update<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasSocial + HasInteraction + HasTraits,
    {
        if self.dynamics_timer.advance(delta_time).is_none() {
            return TickReport::default();
        }
        if self.config.spontaneous_groups {
            self.process_group_formation(registry);
        }
        let report = self.process_group_dynamics(registry);
        if self.config.spontaneous_connections {
            self.process_network_updates(registry);
        }
        report
    }

    /// Let eligible agents found groups with fitting peers. Returns the
    /// number of groups founded.
    ///
    /// A founder has plenty of energy, enjoys group activity, can lead and
    /// leads nothing yet. The group's purpose follows the founder's strongest
    /// trait, and it forms only if enough joiners fit that purpose. Founding
    /// costs the founder part of their energy.
    pub fn process_group_formation<R>(&mut self, registry: &mut R) -> usize
    where
        R: AgentRegistry,
        R::Agent: HasSocial + HasInteraction + HasTraits,
    {
        let mut founders = Vec::new();
        let mut joiners = Vec::new();
        for id in registry.agent_ids() {
            let Some(agent) = registry.get_agent(&id) else {
                continue;
            };
            let (Some(social), Some(interaction)) = (agent.social(), agent.interaction()) else {
                continue;
            };
            let traits = agent.traits_or_default();
            let preference = group_activity_preference(&traits);
            let energy = interaction.energy_fraction();
            if energy > FOUNDER_MIN_ENERGY
                && preference > FOUNDER_MIN_PREFERENCE
                && social.leadership_ability > FOUNDER_MIN_LEADERSHIP
                && social.leadership_roles().is_empty()
            {
                founders.push((id, traits));
            } else if energy > JOINER_MIN_ENERGY && preference > JOINER_MIN_PREFERENCE {
                joiners.push((id, traits));
            }
        }

        let chance = probability(self.config.group_formation_chance);
        let mut founded = 0;
        for (founder, traits) in founders {
            if !self.rng.gen_bool(chance) {
                continue;
            }
            let group_type = self.pick_group_type(&traits);
            let mut members: Vec<AgentId> = joiners
                .iter()
                .filter(|(_, joiner)| fits_group(&traits, joiner, group_type))
                .map(|(id, _)| *id)
                .collect();
            if members.len() < MIN_FOUNDED_MEMBERS {
                debug!(
                    founder = %founder,
                    ?group_type,
                    fitting = members.len(),
                    "Too few joiners to found a group"
                );
                continue;
            }
            members.shuffle(&mut self.rng);
            members.truncate(MAX_FOUNDED_MEMBERS);

            let name = format!("{group_type:?} circle {}", self.stats.groups_created + 1);
            match self.try_create_social_group(registry, &founder, &name, group_type, &members) {
                Ok(group_id) => {
                    if let Some(interaction) =
                        registry.get_agent_mut(&founder).and_then(HasInteraction::interaction_mut)
                    {
                        let cost = FOUNDING_ENERGY_SHARE * interaction.max_social_energy;
                        interaction.spend_energy(cost);
                    }
                    self.stats.spontaneous_groups += 1;
                    founded += 1;
                    debug!(group = %group_id, founder = %founder, "Group founded spontaneously");
                }
                Err(e) => debug!(founder = %founder, error = %e, "Spontaneous group not founded"),
            }
        }
        founded
    }

    fn pick_group_type(&mut self, traits: &PersonalityTraits) -> GroupType {
        if traits.charisma > 0.7 {
            if self.rng.gen_bool(0.5) {
                GroupType::Community
            } else {
                GroupType::Alliance
            }
        } else if traits.playfulness > 0.7 {
            GroupType::Friendship
        } else if traits.intelligence > 0.7 {
            GroupType::Mentorship
        } else {
            GroupType::ALL[self.rng.gen_range(0..GroupType::ALL.len())]
        }
    }

    /// Let compatible, sociable strangers connect. Each agent considers at
    /// most a couple of candidates per pass, and each candidate connects
    /// with the configured chance. Returns the number of connections formed.
    pub fn process_network_updates<R>(&mut self, registry: &mut R) -> usize
    where
        R: AgentRegistry,
        R::Agent: HasSocial + HasInteraction + HasTraits,
    {
        let eligible: Vec<(AgentId, PersonalityTraits)> = registry
            .agent_ids()
            .into_iter()
            .filter_map(|id| {
                let agent = registry.get_agent(&id)?;
                agent.social()?;
                let energy = agent.interaction()?.energy_fraction();
                let traits = agent.traits_or_default();
                (energy >= NETWORK_MIN_ENERGY
                    && group_activity_preference(&traits) >= NETWORK_MIN_PREFERENCE)
                    .then_some((id, traits))
            })
            .collect();

        let chance = probability(self.config.connection_chance);
        let mut formed = 0;
        for (id, traits) in &eligible {
            let candidates: Vec<(AgentId, PersonalityTraits)> = eligible
                .iter()
                .filter(|(peer, peer_traits)| {
                    peer != id
                        && traits.compatibility(peer_traits) > NETWORK_MIN_COMPATIBILITY
                        && !connected(&*registry, id, peer)
                })
                .take(MAX_NEW_CONNECTIONS)
                .copied()
                .collect();
            for (peer, peer_traits) in candidates {
                // an earlier agent in this pass may already have connected
                if connected(&*registry, id, &peer) || !self.rng.gen_bool(chance) {
                    continue;
                }
                let strength = spontaneous_connection_strength(traits, &peer_traits);
                if self.form_social_connection(registry, id, &peer, strength) {
                    formed += 1;
                }
            }
        }
        self.stats.spontaneous_connections += formed as u64;
        if formed > 0 {
            debug!(formed, "Spontaneous connections formed");
        }
        formed
    }

    /// Refresh influence, drop departed members, move cohesion with the
    /// quality of recent member interactions, dissolve groups that are too
    /// small or unhealthy and hand leadership to a sufficiently stronger
    /// member.
    pub fn process_group_dynamics<R>(&mut self, registry: &mut R) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasSocial + HasInteraction,
    {
        let now = registry.now();
        let since = self.last_dynamics;
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(social) = registry.get_agent_mut(&id).and_then(HasSocial::social_mut) else {
                continue;
            };
            let result = check_social(social, id).map(|()| {
                social.refresh_influence();
            });
            isolate("social", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;

        for (group_id, mut group) in collect_groups(&*registry) {
            let departed: Vec<AgentId> = group
                .members()
                .iter()
                .filter(|id| !registry.contains(id))
                .copied()
                .collect();
            if departed.contains(&group.leader_id()) {
                let Some((next, _)) = strongest_member(&*registry, &group) else {
                    self.dissolve(registry, &group, "leader gone with no successor");
                    continue;
                };
                group.set_leader(next);
                self.stats.leadership_changes += 1;
                info!(group = %group_id, leader = %next, "Leader gone, successor takes over");
            }
            for id in &departed {
                group.remove_member(id);
            }

            if group.size() < self.config.min_group_size {
                self.dissolve(registry, &group, "too few members");
                continue;
            }
            let (successful, total) = recent_interactions(&*registry, &group, since, now);
            group.apply_interaction_quality(successful, total, self.config.cohesion_rate);

            let health = group_health(&group, internal_strength(&*registry, &group));
            if health < self.config.group_health_threshold {
                self.dissolve(registry, &group, "health below threshold");
                continue;
            }

            let leader_influence = influence_of(&*registry, &group.leader_id());
            let challenge = strongest_member(&*registry, &group).filter(|(_, influence)| {
                *influence > leader_influence
                    && leader_influence < self.config.leadership_change_threshold * influence
            });
            if let Some((challenger, influence)) = challenge {
                info!(
                    group = %group_id,
                    from = %group.leader_id(),
                    to = %challenger,
                    leader_influence,
                    challenger_influence = influence,
                    "Leadership changed"
                );
                group.set_leader(challenger);
                self.stats.leadership_changes += 1;
            }
            sync_group(registry, &group);
        }
        self.last_dynamics = now;
        report
    }

    fn dissolve<R>(&mut self, registry: &mut R, group: &SocialGroup, reason: &str)
    where
        R: AgentRegistry,
        R::Agent: HasSocial,
    {
        let group_id = group.group_id();
        // stale copies may not list every holder
        for id in registry.agent_ids() {
            let holder = registry
                .get_agent_mut(&id)
                .and_then(HasSocial::social_mut)
                .filter(|social| social.groups.contains_key(&group_id));
            if let Some(social) = holder {
                social.leave_group(&group_id);
                social.refresh_influence();
            }
        }
        self.stats.groups_dissolved += 1;
        info!(group = %group_id, name = group.name(), reason, "Social group dissolved");
    }
}

/// Write `group` into every member's component with the member's role.
fn sync_group<R>(registry: &mut R, group: &SocialGroup)
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    for id in group.members() {
        let Some(role) = group.role_of(id) else {
            continue;
        };
        if let Some(social) = registry.get_agent_mut(id).and_then(HasSocial::social_mut) {
            social.join_group(group.clone(), role);
            social.refresh_influence();
        }
    }
}

/// Every group held by any agent, the leader's copy preferred.
fn collect_groups<R>(registry: &R) -> BTreeMap<GroupId, SocialGroup>
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    let mut groups = BTreeMap::new();
    for id in registry.agent_ids() {
        let Some(social) = registry.get_agent(&id).and_then(HasSocial::social) else {
            continue;
        };
        for (group_id, membership) in &social.groups {
            if membership.group.leader_id() == id {
                groups.insert(*group_id, membership.group.clone());
            } else {
                groups
                    .entry(*group_id)
                    .or_insert_with(|| membership.group.clone());
            }
        }
    }
    groups
}

/// The most influential present member other than the leader. Ties go to
/// the smaller id.
fn strongest_member<R>(registry: &R, group: &SocialGroup) -> Option<(AgentId, f32)>
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    group
        .members()
        .iter()
        .filter(|id| **id != group.leader_id() && registry.contains(id))
        .map(|id| (*id, influence_of(registry, id)))
        .max_by_key(|(id, influence)| (OrderedFloat(*influence), Reverse(*id)))
}

/// Successful and total interactions logged by members in `[since, now)`.
fn recent_interactions<R>(registry: &R, group: &SocialGroup, since: SimTime, now: SimTime) -> (u64, u64)
where
    R: AgentRegistry,
    R::Agent: HasInteraction,
{
    let mut successful = 0;
    let mut total = 0;
    let logged = group
        .members()
        .iter()
        .filter_map(|id| registry.get_agent(id).and_then(HasInteraction::interaction))
        .flat_map(|component| component.interactions.iter())
        .filter(|i| i.timestamp.seconds >= since.seconds && i.timestamp.seconds < now.seconds);
    for interaction in logged {
        total += 1;
        if interaction.success {
            successful += 1;
        }
    }
    (successful, total)
}

/// A configured chance usable with `gen_bool`; NaN counts as never.
fn probability(chance: f64) -> f64 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 1.0)
    }
}

fn connected<R>(registry: &R, a: &AgentId, b: &AgentId) -> bool
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    registry
        .get_agent(a)
        .and_then(HasSocial::social)
        .is_some_and(|s| s.connections.contains_key(b))
}

/// Mean connection strength between present members, over ordered pairs.
fn internal_strength<R>(registry: &R, group: &SocialGroup) -> f32
where
    R: AgentRegistry,
    R::Agent: HasSocial,
{
    let present: BTreeSet<AgentId> = group
        .members()
        .iter()
        .filter(|id| registry.contains(id))
        .copied()
        .collect();
    if present.len() < 2 {
        return 0.0;
    }
    let total: f32 = present
        .iter()
        .filter_map(|id| registry.get_agent(id).and_then(HasSocial::social))
        .map(|social| {
            present
                .iter()
                .map(|peer| social.strength_to(peer))
                .sum::<f32>()
        })
        .sum();
    let pairs = present.len() * (present.len() - 1);
    total / pairs as f32
}

fn check_social(social: &SocialComponent, agent: AgentId) -> Result<()> {
    let bad_connection = social
        .connections
        .values()
        .any(|c| !c.connection_strength.is_finite());
    if bad_connection || !social.leadership_ability.is_finite() {
        return Err(ReynardError::CorruptState {
            agent,
            reason: "non-finite connection strength or leadership ability".to_string(),
        });
    }
    Ok(())
}
