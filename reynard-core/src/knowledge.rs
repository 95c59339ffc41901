//! Knowledge items, learning opportunities and teaching math.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::LearningConfig;
use crate::types::{AgentId, KnowledgeId, OpportunityId, PersonalityTraits, SimTime};

/// Teaching effectiveness never drops below this, so every transfer teaches something.
pub const MIN_TEACHING_EFFECTIVENESS: f32 = 0.05;
/// Student confidence relative to learned proficiency after being taught.
const TAUGHT_CONFIDENCE_RATIO: f32 = 0.8;
/// Seconds of study per unit of difficulty before method adjustment.
const BASE_STUDY_SECONDS: f64 = 300.0;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Category of knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnowledgeType {
    /// Facts.
    Factual,
    /// Skills and procedures.
    Procedural,
    /// Ideas and models.
    Conceptual,
    /// Lessons from experience.
    Experiential,
    /// Knowledge about people.
    Social,
    /// Technical know-how.
    Technical,
    /// Artistic craft.
    Creative,
    /// Emotional understanding.
    Emotional,
}

/// How knowledge was (or will be) acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearningMethod {
    /// Watching someone else.
    Observation,
    /// Repetition.
    Practice,
    /// Being taught directly.
    Teaching,
    /// Living through it.
    Experience,
    /// Reading and research.
    Study,
    /// Working it out together.
    Collaboration,
    /// Long-term guidance.
    Mentorship,
    /// Trial and error.
    Experimentation,
}

impl LearningMethod {
    /// Relative time cost of this method.
    #[must_use]
    pub fn duration_multiplier(self) -> f64 {
        match self {
            Self::Observation => 0.8,
            Self::Practice => 1.2,
            Self::Teaching => 0.6,
            Self::Experience => 1.0,
            Self::Study => 1.5,
            Self::Collaboration => 0.9,
            Self::Mentorship => 0.7,
            Self::Experimentation => 1.3,
        }
    }

    /// The method best suited to a kind of knowledge.
    #[must_use]
    pub fn preferred_for(knowledge_type: KnowledgeType) -> Self {
        match knowledge_type {
            KnowledgeType::Procedural => Self::Practice,
            KnowledgeType::Factual | KnowledgeType::Conceptual => Self::Teaching,
            KnowledgeType::Social => Self::Observation,
            KnowledgeType::Creative => Self::Collaboration,
            KnowledgeType::Technical => Self::Study,
            KnowledgeType::Experiential | KnowledgeType::Emotional => Self::Experience,
        }
    }
}

/// Proficiency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    /// Below 0.2.
    Beginner,
    /// Below 0.4.
    Novice,
    /// Below 0.6.
    Intermediate,
    /// Below 0.8.
    Advanced,
    /// Below 0.95.
    Expert,
    /// 0.95 and above.
    Master,
}

impl KnowledgeLevel {
    /// Band for a proficiency value.
    #[must_use]
    pub fn for_proficiency(proficiency: f32) -> Self {
        if proficiency >= 0.95 {
            Self::Master
        } else if proficiency >= 0.8 {
            Self::Expert
        } else if proficiency >= 0.6 {
            Self::Advanced
        } else if proficiency >= 0.4 {
            Self::Intermediate
        } else if proficiency >= 0.2 {
            Self::Novice
        } else {
            Self::Beginner
        }
    }
}

// ---------------------------------------------------------------------------
// Knowledge
// ---------------------------------------------------------------------------

/// A knowledge item. Scores are in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knowledge {
    /// Unique identifier.
    pub id: KnowledgeId,
    /// Human-readable title; unique per agent in practice.
    pub title: String,
    /// Category.
    pub knowledge_type: KnowledgeType,
    /// Free-text description.
    pub description: String,
    /// Skill level.
    pub proficiency: f32,
    /// How much the agent cares about it.
    pub importance: f32,
    /// Self-assurance in the knowledge.
    pub confidence: f32,
    /// How hard it is to learn.
    pub difficulty: f32,
    /// How easily it can be passed on.
    pub transferability: f32,
    /// How it was acquired.
    pub learning_method: LearningMethod,
    /// Who taught it, if anyone.
    pub source_agent: Option<AgentId>,
    /// Times used or taught.
    pub usage_count: u32,
    /// When it was acquired.
    pub acquired_at: SimTime,
    /// When it was last used.
    pub last_used: SimTime,
}

impl Knowledge {
    /// Knowledge acquired by the agent itself at `now`. Scores are clamped.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        knowledge_type: KnowledgeType,
        description: impl Into<String>,
        proficiency: f32,
        importance: f32,
        now: SimTime,
    ) -> Self {
        Self {
            id: KnowledgeId::new(),
            title: title.into(),
            knowledge_type,
            description: description.into(),
            proficiency: proficiency.clamp(0.0, 1.0),
            importance: importance.clamp(0.0, 1.0),
            confidence: 0.5,
            difficulty: 0.5,
            transferability: 0.5,
            learning_method: LearningMethod::Experience,
            source_agent: None,
            usage_count: 0,
            acquired_at: now,
            last_used: now,
        }
    }

    /// Proficiency band.
    #[must_use]
    pub fn level(&self) -> KnowledgeLevel {
        KnowledgeLevel::for_proficiency(self.proficiency)
    }

    /// Whether this item is solid enough to teach.
    #[must_use]
    pub fn can_teach(&self, min_proficiency: f32) -> bool {
        self.proficiency >= min_proficiency && self.confidence >= 0.4 && self.transferability >= 0.3
    }

    /// How well this item lends itself to teaching.
    #[must_use]
    pub fn teaching_quality(&self) -> f32 {
        self.proficiency * 0.4 + self.confidence * 0.3 + self.transferability * 0.3
    }

    /// Overall worth to the holder; the least valuable item is evicted first.
    #[must_use]
    pub fn value(&self) -> f32 {
        let usage = (self.usage_count as f32 / 100.0).min(1.0);
        self.proficiency * 0.3 + self.importance * 0.3 + self.confidence * 0.2 + usage * 0.2
    }

    /// Record a use. Practice nudges proficiency up slightly.
    pub fn mark_used(&mut self, now: SimTime) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used = now;
        self.proficiency = (self.proficiency + 0.001).min(1.0);
    }

    /// Raise proficiency to `proficiency` if higher. Never lowers it.
    pub fn raise_to(&mut self, proficiency: f32) {
        self.proficiency = self.proficiency.max(proficiency.clamp(0.0, 1.0));
    }
}

// ---------------------------------------------------------------------------
// Learning opportunities
// ---------------------------------------------------------------------------

/// A chance for the holder to learn a teacher's knowledge item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningOpportunity {
    /// Unique identifier.
    pub id: OpportunityId,
    /// Teacher's knowledge item.
    pub knowledge_id: KnowledgeId,
    /// The teacher.
    pub teacher_id: AgentId,
    /// How the learning would happen.
    pub learning_method: LearningMethod,
    /// Difficulty for this particular student.
    pub estimated_difficulty: f32,
    /// Simulated seconds of study required.
    pub estimated_duration: f64,
    /// Expected value of learning it.
    pub learning_potential: f32,
    /// When it was offered.
    pub created_at: SimTime,
    /// When it lapses, if ever.
    pub expires_at: Option<SimTime>,
}

impl LearningOpportunity {
    /// Whether the opportunity has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: &SimTime) -> bool {
        self.expires_at
            .is_some_and(|expires| expires.is_before(now))
    }

    /// Whether enough study time has passed to complete it.
    #[must_use]
    pub fn is_ready(&self, now: &SimTime) -> bool {
        now.seconds_since(&self.created_at) >= self.estimated_duration
    }

    /// Attractiveness in `[0.0, 1.0]`: easier, shorter, more valuable scores higher.
    #[must_use]
    pub fn score(&self, now: &SimTime) -> f32 {
        if self.is_expired(now) {
            return 0.0;
        }
        let difficulty = 1.0 - self.estimated_difficulty;
        let duration = (1.0 - (self.estimated_duration / 3600.0) as f32).max(0.1);
        difficulty * 0.3 + duration * 0.3 + self.learning_potential * 0.4
    }
}

/// Difficulty of `knowledge` for a student with `traits`, floored at 0.1.
#[must_use]
pub fn learning_difficulty(knowledge: &Knowledge, traits: &PersonalityTraits) -> f32 {
    let reduction = traits.intelligence * 0.3 + traits.patience * 0.2 + traits.curiosity * 0.2;
    (knowledge.difficulty - reduction).max(0.1)
}

/// Simulated seconds needed to learn `knowledge` by `method`.
#[must_use]
pub fn learning_duration(knowledge: &Knowledge, method: LearningMethod) -> f64 {
    f64::from(knowledge.difficulty) * BASE_STUDY_SECONDS * method.duration_multiplier()
}

/// Expected value of learning `knowledge` for a student with this component.
#[must_use]
pub fn learning_potential(knowledge: &Knowledge, student: &KnowledgeComponent) -> f32 {
    (knowledge.transferability + student.learning_rate * 0.3 + student.curiosity * 0.2).min(1.0)
}

/// Teaching effectiveness in `[MIN_TEACHING_EFFECTIVENESS, 1.0]`.
///
/// Half comes from the configured baseline, half from teacher charisma and
/// intelligence plus student intelligence and curiosity, equally weighted.
#[must_use]
pub fn teaching_effectiveness(
    base: f32,
    teacher: &PersonalityTraits,
    student: &PersonalityTraits,
) -> f32 {
    let traits = 0.25 * teacher.charisma
        + 0.25 * teacher.intelligence
        + 0.25 * student.intelligence
        + 0.25 * student.curiosity;
    (0.5 * base + 0.5 * traits).clamp(MIN_TEACHING_EFFECTIVENESS, 1.0)
}

/// Build the student's copy of a taught item.
#[must_use]
pub fn taught_copy(source: &Knowledge, teacher: AgentId, proficiency: f32, now: SimTime) -> Knowledge {
    let proficiency = proficiency.clamp(0.0, 1.0);
    Knowledge {
        id: KnowledgeId::new(),
        title: source.title.clone(),
        knowledge_type: source.knowledge_type,
        description: source.description.clone(),
        proficiency,
        importance: source.importance,
        confidence: proficiency * TAUGHT_CONFIDENCE_RATIO,
        difficulty: source.difficulty,
        transferability: source.transferability,
        learning_method: LearningMethod::Teaching,
        source_agent: Some(teacher),
        usage_count: 0,
        acquired_at: now,
        last_used: now,
    }
}

// ---------------------------------------------------------------------------
// KnowledgeComponent
// ---------------------------------------------------------------------------

/// Per-agent knowledge state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeComponent {
    /// Knowledge items keyed by id.
    pub items: HashMap<KnowledgeId, Knowledge>,
    /// Queued opportunities, in the order offered.
    pub opportunities: Vec<LearningOpportunity>,
    /// Maximum items held.
    pub capacity: usize,
    /// How quickly the agent learns.
    pub learning_rate: f32,
    /// Appetite for new knowledge.
    pub curiosity: f32,
    /// Proficiency lost per second once items go stale.
    pub decay_rate: f32,
    /// Items ever acquired.
    pub total_knowledge_acquired: u64,
    /// Items taught to others.
    pub total_knowledge_shared: u64,
    /// Sessions as teacher.
    pub total_teaching_sessions: u64,
    /// Sessions as student.
    pub total_learning_sessions: u64,
}

impl Default for KnowledgeComponent {
    fn default() -> Self {
        Self::from_config(&LearningConfig::default())
    }
}

impl KnowledgeComponent {
    /// An empty component tuned by `config`.
    #[must_use]
    pub fn from_config(config: &LearningConfig) -> Self {
        Self {
            items: HashMap::new(),
            opportunities: Vec::new(),
            capacity: config.knowledge_capacity,
            learning_rate: config.learning_rate,
            curiosity: 0.5,
            decay_rate: config.knowledge_decay_rate,
            total_knowledge_acquired: 0,
            total_knowledge_shared: 0,
            total_teaching_sessions: 0,
            total_learning_sessions: 0,
        }
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, first evicting the least valuable one if at capacity.
    ///
    /// Returns `None` only when capacity is zero.
    pub fn add(&mut self, knowledge: Knowledge) -> Option<KnowledgeId> {
        if self.capacity == 0 {
            return None;
        }
        while self.items.len() >= self.capacity {
            let victim = self
                .items
                .values()
                .min_by_key(|k| (OrderedFloat(k.value()), OrderedFloat(k.acquired_at.seconds)))
                .map(|k| k.id)?;
            self.items.remove(&victim);
        }
        let id = knowledge.id;
        self.items.insert(id, knowledge);
        self.total_knowledge_acquired += 1;
        Some(id)
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &KnowledgeId) -> Option<&Knowledge> {
        self.items.get(id)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: &KnowledgeId) -> Option<&mut Knowledge> {
        self.items.get_mut(id)
    }

    /// Look up an item by exact title.
    #[must_use]
    pub fn find_by_title(&self, title: &str) -> Option<&Knowledge> {
        self.items.values().find(|k| k.title == title)
    }

    /// Mutable lookup by exact title.
    pub fn find_by_title_mut(&mut self, title: &str) -> Option<&mut Knowledge> {
        self.items.values_mut().find(|k| k.title == title)
    }

    /// Items of one type.
    #[must_use]
    pub fn by_type(&self, knowledge_type: KnowledgeType) -> Vec<&Knowledge> {
        self.items
            .values()
            .filter(|k| k.knowledge_type == knowledge_type)
            .collect()
    }

    /// Items solid enough to teach.
    #[must_use]
    pub fn teachable(&self, min_proficiency: f32) -> Vec<&Knowledge> {
        self.items
            .values()
            .filter(|k| k.can_teach(min_proficiency))
            .collect()
    }

    /// Queue an opportunity unless an identical teacher/item pair is already queued.
    pub fn queue_opportunity(&mut self, opportunity: LearningOpportunity) -> bool {
        let duplicate = self.opportunities.iter().any(|o| {
            o.teacher_id == opportunity.teacher_id && o.knowledge_id == opportunity.knowledge_id
        });
        if duplicate {
            return false;
        }
        self.opportunities.push(opportunity);
        true
    }

    /// The highest-scoring opportunity that is ready to complete.
    #[must_use]
    pub fn best_ready_opportunity(&self, now: &SimTime) -> Option<&LearningOpportunity> {
        self.opportunities
            .iter()
            .filter(|o| !o.is_expired(now) && o.is_ready(now))
            .max_by_key(|o| OrderedFloat(o.score(now)))
    }

    /// Remove queued opportunities for one teacher's item. Returns how many were removed.
    pub fn remove_opportunities_for(&mut self, teacher: &AgentId, knowledge: &KnowledgeId) -> usize {
        let before = self.opportunities.len();
        self.opportunities
            .retain(|o| !(o.teacher_id == *teacher && o.knowledge_id == *knowledge));
        before - self.opportunities.len()
    }

    /// Drop lapsed opportunities. Returns how many were removed.
    pub fn expire_opportunities(&mut self, now: &SimTime) -> usize {
        let before = self.opportunities.len();
        self.opportunities.retain(|o| !o.is_expired(now));
        before - self.opportunities.len()
    }

    /// Decay items unused for longer than `stale_after` seconds.
    ///
    /// Returns the number of items that lost proficiency.
    pub fn decay(&mut self, now: &SimTime, delta_time: f64, stale_after: f64) -> usize {
        let mut decayed = 0;
        for item in self.items.values_mut() {
            let idle = now.seconds_since(&item.last_used);
            if idle <= stale_after {
                continue;
            }
            let staleness = if stale_after > 0.0 {
                (idle / stale_after).min(10.0) as f32
            } else {
                10.0
            };
            let loss = self.decay_rate.max(0.0) * delta_time.max(0.0) as f32 * staleness;
            if loss > 0.0 {
                item.proficiency = (item.proficiency - loss).max(0.0);
                item.confidence = (item.confidence - loss * 0.5).max(0.0);
                decayed += 1;
            }
        }
        decayed
    }

    /// Summary for reporting.
    #[must_use]
    pub fn stats(&self) -> KnowledgeStats {
        let mut by_level = HashMap::new();
        for item in self.items.values() {
            *by_level.entry(item.level()).or_insert(0usize) += 1;
        }
        KnowledgeStats {
            total_items: self.items.len(),
            by_level,
            queued_opportunities: self.opportunities.len(),
            total_acquired: self.total_knowledge_acquired,
            total_shared: self.total_knowledge_shared,
            teaching_sessions: self.total_teaching_sessions,
            learning_sessions: self.total_learning_sessions,
        }
    }
}

/// Point-in-time summary of a [`KnowledgeComponent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeStats {
    /// Items held.
    pub total_items: usize,
    /// Items per proficiency band.
    pub by_level: HashMap<KnowledgeLevel, usize>,
    /// Queued opportunities.
    pub queued_opportunities: usize,
    /// Lifetime acquisitions.
    pub total_acquired: u64,
    /// Lifetime items taught.
    pub total_shared: u64,
    /// Lifetime teaching sessions.
    pub teaching_sessions: u64,
    /// Lifetime learning sessions.
    pub learning_sessions: u64,
}
