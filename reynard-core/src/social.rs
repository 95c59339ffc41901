//! Social connections, groups and influence.
//!
//! Connections are owner-relative: each side of a connection stores its own
//! [`SocialConnection`] to the other. Groups are replicated into every
//! member's [`SocialComponent`] together with that member's role.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AgentId, GroupId, PersonalityTraits, SimTime};

/// Network size at which the size factor reaches one half.
const NETWORK_HALF_SATURATION: f32 = 5.0;
/// Influence bonus per group led.
const LEADERSHIP_BONUS: f32 = 0.1;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Label for a connection, derived from its strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// Strength at least 0.7.
    Friend,
    /// Strength at least 0.4.
    Acquaintance,
    /// Anything weaker.
    Neutral,
}

impl ConnectionType {
    /// Label for a connection strength.
    #[must_use]
    pub fn for_strength(strength: f32) -> Self {
        if strength >= 0.7 {
            Self::Friend
        } else if strength >= 0.4 {
            Self::Acquaintance
        } else {
            Self::Neutral
        }
    }
}

/// Purpose of a social group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    /// Friends.
    Friendship,
    /// Colleagues.
    Work,
    /// Teacher and students.
    Mentorship,
    /// Neighbourhood or interest community.
    Community,
    /// Formal alliance.
    Alliance,
    /// Kin.
    Family,
}

impl GroupType {
    /// Every group type.
    pub const ALL: [Self; 6] = [
        Self::Friendship,
        Self::Work,
        Self::Mentorship,
        Self::Community,
        Self::Alliance,
        Self::Family,
    ];
}

/// A member's role inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialRole {
    /// The group's leader.
    Leader,
    /// An ordinary member.
    Member,
}

/// An agent's standing, derived from influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocialStatus {
    /// Influence below 0.1.
    Isolated,
    /// Influence below 0.4.
    Accepted,
    /// Influence below 0.6.
    Popular,
    /// Influence below 0.8.
    Influential,
    /// Influence of 0.8 or more.
    Leader,
}

impl SocialStatus {
    /// Status for an influence score.
    #[must_use]
    pub fn for_influence(influence: f32) -> Self {
        if influence >= 0.8 {
            Self::Leader
        } else if influence >= 0.6 {
            Self::Influential
        } else if influence >= 0.4 {
            Self::Popular
        } else if influence >= 0.1 {
            Self::Accepted
        } else {
            Self::Isolated
        }
    }
}

// ---------------------------------------------------------------------------
// Connections and groups
// ---------------------------------------------------------------------------

/// One side of a connection between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialConnection {
    /// The other agent.
    pub peer_id: AgentId,
    /// Derived label.
    pub connection_type: ConnectionType,
    /// Strength in `[0.0, 1.0]`.
    pub connection_strength: f32,
    /// Number of peers both sides are connected to.
    pub mutual_connections: u32,
    /// How many times the connection was formed or reinforced.
    pub interaction_frequency: u32,
    /// When the connection was first formed.
    pub formed_at: SimTime,
    /// Most recent reinforcement.
    pub last_interaction: SimTime,
}

impl SocialConnection {
    /// A new connection at the given (clamped) strength.
    #[must_use]
    pub fn new(peer_id: AgentId, strength: f32, now: SimTime) -> Self {
        let strength = strength.clamp(0.0, 1.0);
        Self {
            peer_id,
            connection_type: ConnectionType::for_strength(strength),
            connection_strength: strength,
            mutual_connections: 0,
            interaction_frequency: 1,
            formed_at: now,
            last_interaction: now,
        }
    }

    /// Set a new (clamped) strength and record the reinforcement.
    pub fn reinforce(&mut self, strength: f32, now: SimTime) {
        self.connection_strength = strength.clamp(0.0, 1.0);
        self.connection_type = ConnectionType::for_strength(self.connection_strength);
        self.interaction_frequency = self.interaction_frequency.saturating_add(1);
        self.last_interaction = now;
    }
}

/// A social group. The leader is always a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialGroup {
    group_id: GroupId,
    name: String,
    group_type: GroupType,
    members: BTreeSet<AgentId>,
    leader_id: AgentId,
    created_at: SimTime,
    /// How tightly the group holds together, in `[0.0, 1.0]`.
    pub cohesion: f32,
}

impl SocialGroup {
    /// Create a group led by `leader`, who is added to `members`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        group_type: GroupType,
        leader: AgentId,
        members: impl IntoIterator<Item = AgentId>,
        cohesion: f32,
        now: SimTime,
    ) -> Self {
        let mut members: BTreeSet<AgentId> = members.into_iter().collect();
        members.insert(leader);
        Self {
            group_id: GroupId::new(),
            name: name.into(),
            group_type,
            members,
            leader_id: leader,
            created_at: now,
            cohesion: cohesion.clamp(0.0, 1.0),
        }
    }

    /// Group identifier.
    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Purpose.
    #[must_use]
    pub fn group_type(&self) -> GroupType {
        self.group_type
    }

    /// Current members, including the leader.
    #[must_use]
    pub fn members(&self) -> &BTreeSet<AgentId> {
        &self.members
    }

    /// Current leader.
    #[must_use]
    pub fn leader_id(&self) -> AgentId {
        self.leader_id
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    /// Whether `agent` belongs to the group.
    #[must_use]
    pub fn is_member(&self, agent: &AgentId) -> bool {
        self.members.contains(agent)
    }

    /// Number of members.
    #[must_use]
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Hand leadership to `agent`. Returns `false` if they are not a member.
    pub fn set_leader(&mut self, agent: AgentId) -> bool {
        if !self.members.contains(&agent) {
            return false;
        }
        self.leader_id = agent;
        true
    }

    /// Remove a member. The leader can only leave once leadership has moved on.
    pub fn remove_member(&mut self, agent: &AgentId) -> bool {
        if *agent == self.leader_id {
            return false;
        }
        self.members.remove(agent)
    }

    /// Shift cohesion toward the share of recent member interactions that
    /// succeeded: above one half it rises, below it falls, by at most half of `rate`.
    pub fn apply_interaction_quality(&mut self, successful: u64, total: u64, rate: f32) {
        if total == 0 {
            return;
        }
        let quality = successful.min(total) as f32 / total as f32;
        self.cohesion = (self.cohesion + (quality - 0.5) * rate).clamp(0.0, 1.0);
    }

    /// Role `agent` holds in this group, if a member.
    #[must_use]
    pub fn role_of(&self, agent: &AgentId) -> Option<SocialRole> {
        if *agent == self.leader_id {
            Some(SocialRole::Leader)
        } else if self.members.contains(agent) {
            Some(SocialRole::Member)
        } else {
            None
        }
    }
}

/// A group as seen by one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// Replicated group state.
    pub group: SocialGroup,
    /// This member's role.
    pub role: SocialRole,
}

/// Group health in `[0.0, 1.0]`.
///
/// `internal_strength` is the mean connection strength between members; the
/// size term saturates at three members.
#[must_use]
pub fn group_health(group: &SocialGroup, internal_strength: f32) -> f32 {
    let size_factor = (group.size() as f32 / 3.0).min(1.0);
    (0.4 * group.cohesion + 0.3 * internal_strength.clamp(0.0, 1.0) + 0.3 * size_factor)
        .clamp(0.0, 1.0)
}

/// How much an agent enjoys group activity.
#[must_use]
pub fn group_activity_preference(traits: &PersonalityTraits) -> f32 {
    ((traits.charisma + traits.playfulness + traits.empathy) / 3.0).clamp(0.0, 1.0)
}

/// Whether `member` suits a group of `group_type` led by `leader`.
///
/// Work groups tolerate the most difference and friendships the least;
/// mentors must also be the more intelligent of the two.
#[must_use]
pub fn fits_group(leader: &PersonalityTraits, member: &PersonalityTraits, group_type: GroupType) -> bool {
    let compatibility = leader.compatibility(member);
    match group_type {
        GroupType::Friendship => compatibility > 0.6,
        GroupType::Work => compatibility > 0.4,
        GroupType::Mentorship => compatibility > 0.5 && leader.intelligence > member.intelligence,
        GroupType::Community | GroupType::Alliance | GroupType::Family => compatibility > 0.5,
    }
}

/// Strength of a connection two agents strike up on their own: friends if
/// both are charismatic or both playful, acquaintances if either is fairly
/// charismatic, otherwise neutral.
#[must_use]
pub fn spontaneous_connection_strength(a: &PersonalityTraits, b: &PersonalityTraits) -> f32 {
    if (a.charisma > 0.7 && b.charisma > 0.7) || (a.playfulness > 0.7 && b.playfulness > 0.7) {
        0.7
    } else if a.charisma > 0.6 || b.charisma > 0.6 {
        0.4
    } else {
        0.2
    }
}

// ---------------------------------------------------------------------------
// SocialComponent
// ---------------------------------------------------------------------------

/// Per-agent social state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialComponent {
    /// Connections keyed by peer.
    pub connections: HashMap<AgentId, SocialConnection>,
    /// Group memberships keyed by group.
    pub groups: HashMap<GroupId, GroupMembership>,
    /// Standing derived from influence.
    pub social_status: SocialStatus,
    /// Last computed influence.
    pub social_influence: f32,
    /// Aptitude for leading groups.
    pub leadership_ability: f32,
    /// Connections ever formed.
    pub total_connections_formed: u64,
    /// Groups ever joined.
    pub total_groups_joined: u64,
}

impl Default for SocialComponent {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
            groups: HashMap::new(),
            social_status: SocialStatus::Accepted,
            social_influence: 0.0,
            leadership_ability: 0.5,
            total_connections_formed: 0,
            total_groups_joined: 0,
        }
    }
}

impl SocialComponent {
    /// Upsert the connection to `peer`. Returns `true` if it was new.
    pub fn connect(&mut self, peer: AgentId, strength: f32, now: SimTime) -> bool {
        if let Some(existing) = self.connections.get_mut(&peer) {
            existing.reinforce(strength, now);
            false
        } else {
            self.connections
                .insert(peer, SocialConnection::new(peer, strength, now));
            self.total_connections_formed += 1;
            true
        }
    }

    /// The connection to `peer`, if any.
    #[must_use]
    pub fn connection(&self, peer: &AgentId) -> Option<&SocialConnection> {
        self.connections.get(peer)
    }

    /// Strength of the connection to `peer`, zero if unconnected.
    #[must_use]
    pub fn strength_to(&self, peer: &AgentId) -> f32 {
        self.connections
            .get(peer)
            .map_or(0.0, |c| c.connection_strength)
    }

    /// Peers this agent is connected to.
    #[must_use]
    pub fn peers(&self) -> BTreeSet<AgentId> {
        self.connections.keys().copied().collect()
    }

    /// Store or replace a group membership. Returns `true` if newly joined.
    pub fn join_group(&mut self, group: SocialGroup, role: SocialRole) -> bool {
        let joined = !self.groups.contains_key(&group.group_id());
        if joined {
            self.total_groups_joined += 1;
        }
        self.groups
            .insert(group.group_id(), GroupMembership { group, role });
        joined
    }

    /// Drop a group membership.
    pub fn leave_group(&mut self, group_id: &GroupId) -> Option<GroupMembership> {
        self.groups.remove(group_id)
    }

    /// Groups this agent currently leads.
    #[must_use]
    pub fn leadership_roles(&self) -> Vec<GroupId> {
        let mut led: Vec<GroupId> = self
            .groups
            .iter()
            .filter(|(_, m)| m.role == SocialRole::Leader)
            .map(|(id, _)| *id)
            .collect();
        led.sort();
        led
    }

    /// Recompute influence and status from current connections.
    pub fn refresh_influence(&mut self) -> f32 {
        self.social_influence = calculate_social_influence(self);
        self.social_status = SocialStatus::for_influence(self.social_influence);
        self.social_influence
    }
}

/// Influence in `[0.0, 1.0]`.
///
/// ```text
/// weighted = Σ strength × (1 + 0.1 × mutual_connections) / n
/// size     = n / (n + 5)
/// influence = weighted × (0.5 + 0.5 × size) + 0.1 × groups_led
/// ```
#[must_use]
pub fn calculate_social_influence(component: &SocialComponent) -> f32 {
    let n = component.connections.len();
    let led = component
        .groups
        .values()
        .filter(|m| m.role == SocialRole::Leader)
        .count();
    let leadership = LEADERSHIP_BONUS * led as f32;
    if n == 0 {
        return leadership.clamp(0.0, 1.0);
    }
    let weighted: f32 = component
        .connections
        .values()
        .map(|c| c.connection_strength * (1.0 + 0.1 * c.mutual_connections as f32))
        .sum::<f32>()
        / n as f32;
    let size = n as f32 / (n as f32 + NETWORK_HALF_SATURATION);
    (weighted * (0.5 + 0.5 * size) + leadership).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_is_always_member() {
        let leader = AgentId::new();
        let other = AgentId::new();
        let mut group = SocialGroup::new("Book club", GroupType::Community, leader, [other], 0.7, SimTime::zero());
        assert!(group.is_member(&leader));
        assert_eq!(group.size(), 2);
        assert!(!group.remove_member(&leader));
        assert!(!group.set_leader(AgentId::new()));
        assert!(group.set_leader(other));
        assert!(group.remove_member(&leader));
        assert_eq!(group.leader_id(), other);
    }

    #[test]
    fn roles_follow_leadership() {
        let leader = AgentId::new();
        let member = AgentId::new();
        let group = SocialGroup::new("Guild", GroupType::Work, leader, [member], 0.7, SimTime::zero());
        assert_eq!(group.role_of(&leader), Some(SocialRole::Leader));
        assert_eq!(group.role_of(&member), Some(SocialRole::Member));
        assert_eq!(group.role_of(&AgentId::new()), None);
    }

    #[test]
    fn connect_upserts() {
        let mut c = SocialComponent::default();
        let peer = AgentId::new();
        assert!(c.connect(peer, 0.5, SimTime::zero()));
        assert!(!c.connect(peer, 0.9, SimTime::at(1.0)));
        let conn = c.connection(&peer).expect("connected");
        assert!((conn.connection_strength - 0.9).abs() < f32::EPSILON);
        assert_eq!(conn.connection_type, ConnectionType::Friend);
        assert_eq!(conn.interaction_frequency, 2);
        assert_eq!(c.total_connections_formed, 1);
    }

    #[test]
    fn influence_grows_with_connections() {
        let mut c = SocialComponent::default();
        assert!(calculate_social_influence(&c).abs() < f32::EPSILON);
        c.connect(AgentId::new(), 0.8, SimTime::zero());
        c.connect(AgentId::new(), 0.6, SimTime::zero());
        let two = calculate_social_influence(&c);
        assert!(two > 0.0);
        c.connect(AgentId::new(), 0.7, SimTime::zero());
        assert!(calculate_social_influence(&c) > two);
    }

    #[test]
    fn influence_is_bounded() {
        let mut c = SocialComponent::default();
        for _ in 0..200 {
            let peer = AgentId::new();
            c.connect(peer, 1.0, SimTime::zero());
            if let Some(conn) = c.connections.get_mut(&peer) {
                conn.mutual_connections = 50;
            }
        }
        let influence = c.refresh_influence();
        assert!((influence - 1.0).abs() < f32::EPSILON);
        assert_eq!(c.social_status, SocialStatus::Leader);
    }

    #[test]
    fn health_drops_with_low_cohesion() {
        let leader = AgentId::new();
        let mut group = SocialGroup::new("Pair", GroupType::Friendship, leader, [AgentId::new()], 0.9, SimTime::zero());
        let healthy = group_health(&group, 0.5);
        group.cohesion = 0.0;
        assert!(group_health(&group, 0.0) < healthy);
        assert!(group_health(&group, 0.0) < 0.3);
    }

    #[test]
    fn cohesion_follows_interaction_quality() {
        let mut group = SocialGroup::new("Pair", GroupType::Friendship, AgentId::new(), [AgentId::new()], 0.5, SimTime::zero());
        group.apply_interaction_quality(0, 0, 0.1);
        assert!((group.cohesion - 0.5).abs() < f32::EPSILON);
        group.apply_interaction_quality(4, 4, 0.1);
        assert!((group.cohesion - 0.55).abs() < 1e-6);
        group.apply_interaction_quality(0, 4, 0.1);
        group.apply_interaction_quality(0, 4, 0.1);
        assert!((group.cohesion - 0.45).abs() < 1e-6);
        for _ in 0..20 {
            group.apply_interaction_quality(0, 1, 0.1);
        }
        assert!(group.cohesion.abs() < f32::EPSILON);
    }

    #[test]
    fn group_fit_depends_on_type() {
        let mentor = PersonalityTraits {
            intelligence: 0.9,
            ..PersonalityTraits::default()
        };
        let pupil = PersonalityTraits::default();
        assert!(fits_group(&mentor, &pupil, GroupType::Mentorship));
        assert!(!fits_group(&pupil, &mentor, GroupType::Mentorship));

        let opposite = PersonalityTraits {
            charisma: 0.0,
            playfulness: 0.0,
            intelligence: 0.0,
            curiosity: 1.0,
            patience: 1.0,
            empathy: 1.0,
        };
        assert!(fits_group(&pupil, &opposite, GroupType::Work));
        assert!(!fits_group(&pupil, &opposite, GroupType::Friendship));
    }

    #[test]
    fn spontaneous_strength_by_temperament() {
        let lively = PersonalityTraits {
            playfulness: 0.9,
            ..PersonalityTraits::default()
        };
        let plain = PersonalityTraits::default();
        assert!((spontaneous_connection_strength(&lively, &lively) - 0.7).abs() < f32::EPSILON);
        assert!((spontaneous_connection_strength(&lively, &plain) - 0.2).abs() < f32::EPSILON);
    }
}
