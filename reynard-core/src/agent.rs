//! The agent entity and the capability traits systems are written against.
//!
//! Systems never name [`Agent`] directly; they ask for the capabilities they
//! need (`HasMemory`, `Positioned`, ...). A test double only has to
//! implement the traits a system touches.

use serde::{Deserialize, Serialize};

use crate::config::ReynardConfig;
use crate::gender::GenderComponent;
use crate::interaction::InteractionComponent;
use crate::knowledge::KnowledgeComponent;
use crate::memory::MemoryComponent;
use crate::social::SocialComponent;
use crate::types::{AgentId, PersonalityTraits, Position};

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Anything with a unique agent id.
pub trait Identified {
    /// The agent's id.
    fn agent_id(&self) -> AgentId;
}

/// Anything with a location in the world.
pub trait Positioned {
    /// Current position, if the agent has one.
    fn position(&self) -> Option<Position>;
}

/// Anything with personality traits.
pub trait HasTraits {
    /// The agent's traits, if set.
    fn traits(&self) -> Option<&PersonalityTraits>;

    /// The agent's traits, or the neutral defaults when unset.
    fn traits_or_default(&self) -> PersonalityTraits {
        self.traits().copied().unwrap_or_default()
    }
}

/// Anything that owns a [`MemoryComponent`].
pub trait HasMemory {
    /// Shared access.
    fn memory(&self) -> Option<&MemoryComponent>;
    /// Exclusive access.
    fn memory_mut(&mut self) -> Option<&mut MemoryComponent>;
}

/// Anything that owns an [`InteractionComponent`].
pub trait HasInteraction {
    /// Shared access.
    fn interaction(&self) -> Option<&InteractionComponent>;
    /// Exclusive access.
    fn interaction_mut(&mut self) -> Option<&mut InteractionComponent>;
}

/// Anything that owns a [`SocialComponent`].
pub trait HasSocial {
    /// Shared access.
    fn social(&self) -> Option<&SocialComponent>;
    /// Exclusive access.
    fn social_mut(&mut self) -> Option<&mut SocialComponent>;
}

/// Anything that owns a [`KnowledgeComponent`].
pub trait HasKnowledge {
    /// Shared access.
    fn knowledge(&self) -> Option<&KnowledgeComponent>;
    /// Exclusive access.
    fn knowledge_mut(&mut self) -> Option<&mut KnowledgeComponent>;
}

/// Anything that owns a [`GenderComponent`].
pub trait HasGender {
    /// Shared access.
    fn gender(&self) -> Option<&GenderComponent>;
    /// Exclusive access.
    fn gender_mut(&mut self) -> Option<&mut GenderComponent>;
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A simulated agent: identity, placement, personality and its components.
///
/// Components are optional so partially equipped agents can exist; the
/// world creates every agent fully equipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Location.
    pub position: Option<Position>,
    /// Personality.
    #[serde(default)]
    pub traits: Option<PersonalityTraits>,
    /// Memory component.
    pub memory: Option<MemoryComponent>,
    /// Interaction component.
    pub interaction: Option<InteractionComponent>,
    /// Social component.
    pub social: Option<SocialComponent>,
    /// Knowledge component.
    pub knowledge: Option<KnowledgeComponent>,
    /// Gender component.
    pub gender: Option<GenderComponent>,
}

impl Agent {
    /// A fully equipped agent with components tuned by `config`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        position: Position,
        traits: PersonalityTraits,
        config: &ReynardConfig,
    ) -> Self {
        let traits = traits.clamped();
        let mut knowledge = KnowledgeComponent::from_config(&config.learning);
        knowledge.curiosity = traits.curiosity;
        let social = SocialComponent {
            leadership_ability: ((traits.charisma + traits.intelligence) / 2.0).clamp(0.0, 1.0),
            ..SocialComponent::default()
        };
        Self {
            id: AgentId::new(),
            name: name.into(),
            position: Some(position),
            traits: Some(traits),
            memory: Some(MemoryComponent::from_config(&config.memory)),
            interaction: Some(InteractionComponent::from_config(&config.interaction)),
            social: Some(social),
            knowledge: Some(knowledge),
            gender: Some(GenderComponent::from_config(&config.gender)),
        }
    }

    /// An agent with no position, traits or components.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            position: None,
            traits: None,
            memory: None,
            interaction: None,
            social: None,
            knowledge: None,
            gender: None,
        }
    }
}

impl Identified for Agent {
    fn agent_id(&self) -> AgentId {
        self.id
    }
}

impl Positioned for Agent {
    fn position(&self) -> Option<Position> {
        self.position
    }
}

impl HasTraits for Agent {
    fn traits(&self) -> Option<&PersonalityTraits> {
        self.traits.as_ref()
    }
}

impl HasMemory for Agent {
    fn memory(&self) -> Option<&MemoryComponent> {
        self.memory.as_ref()
    }
    fn memory_mut(&mut self) -> Option<&mut MemoryComponent> {
        self.memory.as_mut()
    }
}

impl HasInteraction for Agent {
    fn interaction(&self) -> Option<&InteractionComponent> {
        self.interaction.as_ref()
    }
    fn interaction_mut(&mut self) -> Option<&mut InteractionComponent> {
        self.interaction.as_mut()
    }
}

impl HasSocial for Agent {
    fn social(&self) -> Option<&SocialComponent> {
        self.social.as_ref()
    }
    fn social_mut(&mut self) -> Option<&mut SocialComponent> {
        self.social.as_mut()
    }
}

impl HasKnowledge for Agent {
    fn knowledge(&self) -> Option<&KnowledgeComponent> {
        self.knowledge.as_ref()
    }
    fn knowledge_mut(&mut self) -> Option<&mut KnowledgeComponent> {
        self.knowledge.as_mut()
    }
}

impl HasGender for Agent {
    fn gender(&self) -> Option<&GenderComponent> {
        self.gender.as_ref()
    }
    fn gender_mut(&mut self) -> Option<&mut GenderComponent> {
        self.gender.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_is_fully_equipped() {
        let config = ReynardConfig::default();
        let agent = Agent::new("Vulpes", Position::new(1.0, 2.0), PersonalityTraits::default(), &config);
        assert!(agent.memory().is_some());
        assert!(agent.interaction().is_some());
        assert!(agent.social().is_some());
        assert!(agent.knowledge().is_some());
        assert!(agent.gender().is_some());
        assert_eq!(agent.memory().map(|m| m.capacity), Some(config.memory.capacity));
    }

    #[test]
    fn leadership_follows_charisma_and_intelligence() {
        let traits = PersonalityTraits {
            charisma: 0.9,
            intelligence: 0.7,
            ..PersonalityTraits::default()
        };
        let agent = Agent::new("Reynard", Position::new(0.0, 0.0), traits, &ReynardConfig::default());
        let ability = agent.social().map(|s| s.leadership_ability).unwrap_or_default();
        assert!((ability - 0.8).abs() < 1e-6);
    }

    #[test]
    fn bare_agent_falls_back_to_default_traits() {
        let agent = Agent::bare("ghost");
        assert!(agent.traits().is_none());
        assert_eq!(agent.traits_or_default(), PersonalityTraits::default());
        assert!(agent.position().is_none());
    }

    #[test]
    fn agent_round_trips_through_json() {
        let agent = Agent::new("Rey", Position::new(0.0, 0.0), PersonalityTraits::default(), &ReynardConfig::default());
        let json = serde_json::to_string(&agent).expect("serialize");
        let back: Agent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.id, agent.id);
        assert_eq!(back.name, "Rey");
    }
}
