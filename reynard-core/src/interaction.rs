//! Interaction history, relationships and social energy.
//!
//! An [`InteractionComponent`] is the per-agent side of every pairwise
//! interaction: the log of what happened, how the agent feels about each
//! peer, and how much social energy it has left.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::types::{AgentId, InteractionId, PersonalityTraits, SimTime};

// ---------------------------------------------------------------------------
// Interaction records
// ---------------------------------------------------------------------------

/// What kind of interaction took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionType {
    /// Conversation.
    Communication,
    /// Casual socialising.
    Social,
    /// Working together on something.
    Collaboration,
    /// Friendly rivalry.
    Competitive,
    /// One agent instructing another.
    Teaching,
    /// Disagreement or confrontation.
    Conflict,
}

/// How the initiator communicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommunicationStyle {
    /// Relaxed.
    Casual,
    /// Reserved and polite.
    Formal,
    /// Warm.
    Friendly,
    /// Teasing, light-hearted.
    Playful,
    /// Blunt.
    Direct,
    /// Encouraging.
    Supportive,
}

impl CommunicationStyle {
    /// The style an agent with these traits naturally falls into.
    #[must_use]
    pub fn for_traits(traits: &PersonalityTraits) -> Self {
        if traits.playfulness >= 0.7 {
            Self::Playful
        } else if traits.empathy >= 0.7 {
            Self::Supportive
        } else if traits.charisma >= 0.7 {
            Self::Friendly
        } else if traits.patience <= 0.3 {
            Self::Direct
        } else if traits.playfulness <= 0.3 {
            Self::Formal
        } else {
            Self::Casual
        }
    }
}

/// An immutable record of one interaction between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Unique record identifier; shared by both participants' copies.
    pub id: InteractionId,
    /// The initiating agent.
    pub agent1_id: AgentId,
    /// The responding agent.
    pub agent2_id: AgentId,
    /// Kind of interaction.
    pub interaction_type: InteractionType,
    /// Initiator's communication style.
    pub communication_style: CommunicationStyle,
    /// Simulated seconds the interaction lasted.
    pub duration: f64,
    /// Whether the interaction went well.
    pub success: bool,
    /// When it happened.
    pub timestamp: SimTime,
}

impl Interaction {
    /// The participant that is not `me`.
    #[must_use]
    pub fn peer_of(&self, me: &AgentId) -> AgentId {
        if self.agent1_id == *me {
            self.agent2_id
        } else {
            self.agent1_id
        }
    }
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

/// Coarse label for a relationship, derived from its scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Never or barely interacted.
    Stranger,
    /// Some familiarity.
    Acquaintance,
    /// Solid connection and trust.
    Friend,
    /// Strong connection and high trust.
    CloseFriend,
    /// Familiar but distrustful.
    Rival,
}

/// Score changes applied to a relationship after an interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipDelta {
    /// Change in connection strength.
    pub strength: f32,
    /// Change in trust.
    pub trust: f32,
    /// Change in familiarity.
    pub familiarity: f32,
}

impl RelationshipDelta {
    /// Delta for an interaction outcome. Failures still build familiarity.
    #[must_use]
    pub fn for_outcome(success: bool, interaction_type: InteractionType) -> Self {
        let weight = match interaction_type {
            InteractionType::Collaboration | InteractionType::Teaching => 1.2,
            InteractionType::Conflict => 1.5,
            _ => 1.0,
        };
        if success {
            Self {
                strength: 0.05 * weight,
                trust: 0.04 * weight,
                familiarity: 0.1,
            }
        } else {
            Self {
                strength: -0.02 * weight,
                trust: -0.05 * weight,
                familiarity: 0.05,
            }
        }
    }
}

/// How one agent regards one peer. Scores are in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The other agent.
    pub peer_id: AgentId,
    /// Derived label.
    pub relationship_type: RelationshipType,
    /// Strength of the bond.
    pub connection_strength: f32,
    /// Trust in the peer.
    pub trust_level: f32,
    /// How well the agent knows the peer.
    pub familiarity: f32,
    /// Number of shared acquaintances.
    pub mutual_connections: u32,
    /// Interactions with this peer.
    pub interaction_count: u32,
    /// Successful interactions with this peer.
    pub positive_interactions: u32,
    /// Failed interactions with this peer.
    pub negative_interactions: u32,
    /// First interaction.
    pub first_met: SimTime,
    /// Most recent interaction.
    pub last_interaction: SimTime,
}

impl Relationship {
    /// A fresh relationship with a stranger.
    #[must_use]
    pub fn new(peer_id: AgentId, now: SimTime) -> Self {
        Self {
            peer_id,
            relationship_type: RelationshipType::Stranger,
            connection_strength: 0.0,
            trust_level: 0.5,
            familiarity: 0.0,
            mutual_connections: 0,
            interaction_count: 0,
            positive_interactions: 0,
            negative_interactions: 0,
            first_met: now,
            last_interaction: now,
        }
    }

    /// Apply additive score changes, clamped to `[0.0, 1.0]`, and re-derive the label.
    pub fn apply(&mut self, delta: RelationshipDelta, now: SimTime) {
        self.connection_strength = (self.connection_strength + delta.strength).clamp(0.0, 1.0);
        self.trust_level = (self.trust_level + delta.trust).clamp(0.0, 1.0);
        self.familiarity = (self.familiarity + delta.familiarity).clamp(0.0, 1.0);
        self.last_interaction = now;
        self.relationship_type = self.classify();
    }

    /// Derive the relationship label from the current scores.
    #[must_use]
    pub fn classify(&self) -> RelationshipType {
        if self.familiarity >= 0.3 && self.trust_level < 0.25 {
            RelationshipType::Rival
        } else if self.connection_strength >= 0.7 && self.trust_level >= 0.7 {
            RelationshipType::CloseFriend
        } else if self.connection_strength >= 0.4 && self.trust_level >= 0.5 {
            RelationshipType::Friend
        } else if self.familiarity >= 0.1 {
            RelationshipType::Acquaintance
        } else {
            RelationshipType::Stranger
        }
    }
}

// ---------------------------------------------------------------------------
// Acceptance math
// ---------------------------------------------------------------------------

/// Probability in `[0.0, 1.0]` that `target` accepts an interaction from `initiator`.
///
/// ```text
/// p = base × trait_factor × relationship_factor × compatibility_factor
/// trait_factor         = 0.5 + mean(charisma, playfulness of both)
/// relationship_factor  = 1 + 0.5 × connection_strength   (1 for strangers)
/// compatibility_factor = 1 + 0.3 × compatibility
/// ```
#[must_use]
pub fn acceptance_probability(
    base: f32,
    initiator: &PersonalityTraits,
    target: &PersonalityTraits,
    relationship: Option<&Relationship>,
) -> f32 {
    let sociability = (initiator.charisma
        + target.charisma
        + initiator.playfulness
        + target.playfulness)
        / 4.0;
    let trait_factor = 0.5 + sociability;
    let relationship_factor = relationship.map_or(1.0, |r| 1.0 + 0.5 * r.connection_strength);
    let compatibility_factor = 1.0 + 0.3 * initiator.compatibility(target);
    (base * trait_factor * relationship_factor * compatibility_factor).clamp(0.0, 1.0)
}

/// Probability in `[0.0, 1.0]` that an accepted interaction goes well.
#[must_use]
pub fn success_probability(
    initiator: &PersonalityTraits,
    target: &PersonalityTraits,
    relationship: Option<&Relationship>,
) -> f32 {
    let charisma = (initiator.charisma + target.charisma) / 2.0;
    let trust = relationship.map_or(0.5, |r| r.trust_level);
    (0.5 * charisma + 0.3 * initiator.compatibility(target) + 0.2 * trust).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// InteractionComponent
// ---------------------------------------------------------------------------

/// Per-agent interaction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionComponent {
    /// Interaction log, oldest first.
    pub interactions: VecDeque<Interaction>,
    /// Relationships keyed by peer.
    pub relationships: HashMap<AgentId, Relationship>,
    /// Current social energy, in `[0, max_social_energy]`.
    pub social_energy: f32,
    /// Energy ceiling.
    pub max_social_energy: f32,
    /// Energy regained per simulated second.
    pub energy_recovery_rate: f32,
    /// Maximum log length.
    pub max_history: usize,
    /// Lifetime interactions.
    pub total_interactions: u64,
    /// Lifetime successful interactions.
    pub successful_interactions: u64,
    /// Most recent interaction, if any.
    pub last_interaction_time: Option<SimTime>,
}

impl Default for InteractionComponent {
    fn default() -> Self {
        Self::from_config(&InteractionConfig::default())
    }
}

impl InteractionComponent {
    /// A full-energy component tuned by `config`.
    #[must_use]
    pub fn from_config(config: &InteractionConfig) -> Self {
        Self {
            interactions: VecDeque::new(),
            relationships: HashMap::new(),
            social_energy: config.max_social_energy,
            max_social_energy: config.max_social_energy,
            energy_recovery_rate: config.energy_recovery_rate,
            max_history: config.max_interaction_history,
            total_interactions: 0,
            successful_interactions: 0,
            last_interaction_time: None,
        }
    }

    /// Whether the agent can afford an interaction costing `cost`.
    #[must_use]
    pub fn can_interact(&self, cost: f32) -> bool {
        self.social_energy >= cost
    }

    /// Current energy as a share of the ceiling; zero when the ceiling is.
    #[must_use]
    pub fn energy_fraction(&self) -> f32 {
        if self.max_social_energy > 0.0 {
            (self.social_energy / self.max_social_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Spend energy, never going below zero.
    pub fn spend_energy(&mut self, cost: f32) {
        self.social_energy = (self.social_energy - cost.max(0.0)).max(0.0);
    }

    /// Regain energy for `delta_time` seconds, never exceeding the ceiling.
    pub fn recover_energy(&mut self, delta_time: f64) {
        let gain = self.energy_recovery_rate.max(0.0) * delta_time.max(0.0) as f32;
        self.social_energy = (self.social_energy + gain).min(self.max_social_energy);
    }

    /// Append an interaction to the log, dropping the oldest past `max_history`.
    pub fn record(&mut self, interaction: Interaction) {
        if interaction.success {
            self.successful_interactions += 1;
        }
        self.total_interactions += 1;
        self.last_interaction_time = Some(interaction.timestamp);
        self.interactions.push_back(interaction);
        while self.interactions.len() > self.max_history {
            self.interactions.pop_front();
        }
    }

    /// The relationship with `peer`, if one exists.
    #[must_use]
    pub fn relationship(&self, peer: &AgentId) -> Option<&Relationship> {
        self.relationships.get(peer)
    }

    /// Apply a delta to the relationship with `peer`, creating it if needed.
    pub fn update_relationship(
        &mut self,
        peer: AgentId,
        delta: RelationshipDelta,
        success: bool,
        now: SimTime,
    ) -> &Relationship {
        let relationship = self
            .relationships
            .entry(peer)
            .or_insert_with(|| Relationship::new(peer, now));
        relationship.interaction_count += 1;
        if success {
            relationship.positive_interactions += 1;
        } else {
            relationship.negative_interactions += 1;
        }
        relationship.apply(delta, now);
        relationship
    }

    /// Interactions involving `peer`, oldest first.
    pub fn history_with<'a>(&'a self, peer: &'a AgentId) -> impl Iterator<Item = &'a Interaction> {
        self.interactions
            .iter()
            .filter(move |i| i.agent1_id == *peer || i.agent2_id == *peer)
    }

    /// Summary for reporting.
    #[must_use]
    pub fn stats(&self) -> InteractionStats {
        InteractionStats {
            total_interactions: self.total_interactions,
            successful_interactions: self.successful_interactions,
            success_rate: if self.total_interactions == 0 {
                0.0
            } else {
                self.successful_interactions as f32 / self.total_interactions as f32
            },
            relationships: self.relationships.len(),
            social_energy: self.social_energy,
            max_social_energy: self.max_social_energy,
        }
    }
}

/// Point-in-time summary of an [`InteractionComponent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionStats {
    /// Lifetime interactions.
    pub total_interactions: u64,
    /// Lifetime successes.
    pub successful_interactions: u64,
    /// Successes over total (0 with no interactions).
    pub success_rate: f32,
    /// Number of known peers.
    pub relationships: usize,
    /// Current energy.
    pub social_energy: f32,
    /// Energy ceiling.
    pub max_social_energy: f32,
}
