//! Learning system: knowledge acquisition, teaching and learning opportunities.
//!
//! Teaching copies a teachable item from teacher to student at
//! `teacher proficiency × effectiveness`. The student's copy is only ever
//! raised, and the teacher's copy is only ever marked used.

use reynard_core::agent::{HasKnowledge, HasTraits};
use reynard_core::config::LearningConfig;
use reynard_core::error::{ReynardError, Result};
use reynard_core::knowledge::{
    Knowledge, KnowledgeComponent, KnowledgeStats, KnowledgeType, LearningMethod,
    LearningOpportunity, learning_difficulty, learning_duration, learning_potential,
    taught_copy, teaching_effectiveness,
};
use reynard_core::types::{AgentId, KnowledgeId, OpportunityId};
use serde::Serialize;
use tracing::{debug, info};

use super::{IntervalTimer, TickReport, isolate};
use crate::registry::AgentRegistry;

/// Items below this proficiency cannot be taught.
pub const MIN_TEACHING_PROFICIENCY: f32 = 0.3;

/// Lifetime counters for the learning system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LearningSystemStats {
    /// Items added directly to agents.
    pub knowledge_added: u64,
    /// Successful teacher-to-student transfers.
    pub transfers: u64,
    /// Transfer requests refused.
    pub rejected_transfers: u64,
    /// Opportunities queued.
    pub opportunities_queued: u64,
    /// Opportunities completed by the tick.
    pub opportunities_completed: u64,
    /// Opportunities dropped after expiring.
    pub opportunities_expired: u64,
    /// Per-agent tick failures.
    pub agent_errors: u64,
}

/// Adds, teaches and decays knowledge, and works through queued
/// learning opportunities.
#[derive(Debug, Clone)]
pub struct LearningSystem {
    config: LearningConfig,
    opportunity_timer: IntervalTimer,
    stats: LearningSystemStats,
}

fn knowledge_of<A: HasKnowledge>(agent: &A, id: AgentId) -> Result<&KnowledgeComponent> {
    agent.knowledge().ok_or(ReynardError::ComponentMissing {
        agent: id,
        component: "knowledge",
    })
}

impl LearningSystem {
    /// A learning system tuned by `config`.
    #[must_use]
    pub fn new(config: LearningConfig) -> Self {
        Self {
            opportunity_timer: IntervalTimer::new(config.processing_interval_secs),
            config,
            stats: LearningSystemStats::default(),
        }
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> LearningSystemStats {
        self.stats
    }

    /// Give an agent a knowledge item. `None` on lookup failure.
    #[allow(clippy::too_many_arguments)]
    pub fn add_knowledge_to_agent<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        title: &str,
        knowledge_type: KnowledgeType,
        description: &str,
        proficiency: f32,
        importance: f32,
    ) -> Option<KnowledgeId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge,
    {
        self.try_add_knowledge_to_agent(
            registry,
            agent,
            title,
            knowledge_type,
            description,
            proficiency,
            importance,
        )
        .inspect_err(|e| debug!(agent = %agent, title, error = %e, "Knowledge not added"))
        .ok()
    }

    /// Fallible form of [`Self::add_knowledge_to_agent`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::AgentNotFound`], [`ReynardError::ComponentMissing`], or
    /// [`ReynardError::Config`] when the agent's knowledge capacity is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn try_add_knowledge_to_agent<R>(
        &mut self,
        registry: &mut R,
        agent: &AgentId,
        title: &str,
        knowledge_type: KnowledgeType,
        description: &str,
        proficiency: f32,
        importance: f32,
    ) -> Result<KnowledgeId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge,
    {
        let now = registry.now();
        let component = registry
            .get_agent_mut(agent)
            .ok_or(ReynardError::AgentNotFound(*agent))?
            .knowledge_mut()
            .ok_or(ReynardError::ComponentMissing {
                agent: *agent,
                component: "knowledge",
            })?;
        let id = component
            .add(Knowledge::new(
                title,
                knowledge_type,
                description,
                proficiency,
                importance,
                now,
            ))
            .ok_or_else(|| ReynardError::Config("knowledge capacity is zero".to_string()))?;
        self.stats.knowledge_added += 1;
        debug!(agent = %agent, knowledge = %id, title, "Knowledge added");
        Ok(id)
    }

    /// Effectiveness of `teacher` teaching `student`, in
    /// `[MIN_TEACHING_EFFECTIVENESS, 1]`. `None` if either is missing.
    ///
    /// [`MIN_TEACHING_EFFECTIVENESS`]: reynard_core::knowledge::MIN_TEACHING_EFFECTIVENESS
    #[must_use]
    pub fn calculate_teaching_effectiveness<R>(
        &self,
        registry: &R,
        teacher: &AgentId,
        student: &AgentId,
    ) -> Option<f32>
    where
        R: AgentRegistry,
        R::Agent: HasTraits,
    {
        Some(teaching_effectiveness(
            self.config.teaching_effectiveness,
            &registry.get_agent(teacher)?.traits_or_default(),
            &registry.get_agent(student)?.traits_or_default(),
        ))
    }

    /// Teach the teacher's item `knowledge_id` to `student`. `false` on any
    /// refusal, with no state change.
    pub fn transfer_knowledge<R>(
        &mut self,
        registry: &mut R,
        teacher: &AgentId,
        student: &AgentId,
        knowledge_id: &KnowledgeId,
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        self.try_transfer_knowledge(registry, teacher, student, knowledge_id)
            .inspect_err(|e| {
                debug!(teacher = %teacher, student = %student, error = %e, "Transfer refused");
            })
            .is_ok()
    }

    /// Teach the teacher's item titled `title` to `student`.
    pub fn transfer_knowledge_by_title<R>(
        &mut self,
        registry: &mut R,
        teacher: &AgentId,
        student: &AgentId,
        title: &str,
    ) -> bool
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        self.try_transfer_knowledge_by_title(registry, teacher, student, title)
            .inspect_err(|e| {
                debug!(teacher = %teacher, student = %student, title, error = %e, "Transfer refused");
            })
            .is_ok()
    }

    /// Fallible form of [`Self::transfer_knowledge_by_title`].
    ///
    /// # Errors
    ///
    /// As [`Self::try_transfer_knowledge`]. A title the teacher lacks is
    /// reported as [`ReynardError::KnowledgeNotFound`] with a fresh id.
    pub fn try_transfer_knowledge_by_title<R>(
        &mut self,
        registry: &mut R,
        teacher: &AgentId,
        student: &AgentId,
        title: &str,
    ) -> Result<KnowledgeId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        let source = registry
            .get_agent(teacher)
            .ok_or(ReynardError::AgentNotFound(*teacher))?;
        let knowledge_id = knowledge_of(source, *teacher)?
            .find_by_title(title)
            .map(|k| k.id)
            .ok_or_else(|| ReynardError::KnowledgeNotFound(KnowledgeId::new()))?;
        self.try_transfer_knowledge(registry, teacher, student, &knowledge_id)
    }

    /// Teach an item, returning the id of the student's copy.
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`],
    /// [`ReynardError::ComponentMissing`], [`ReynardError::KnowledgeNotFound`],
    /// [`ReynardError::NotTeachable`], or [`ReynardError::Config`] when the
    /// student cannot hold any knowledge. No state changes on error.
    pub fn try_transfer_knowledge<R>(
        &mut self,
        registry: &mut R,
        teacher: &AgentId,
        student: &AgentId,
        knowledge_id: &KnowledgeId,
    ) -> Result<KnowledgeId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        let result = self.transfer(registry, teacher, student, knowledge_id);
        if result.is_err() {
            self.stats.rejected_transfers += 1;
        }
        result
    }

    fn transfer<R>(
        &mut self,
        registry: &mut R,
        teacher: &AgentId,
        student: &AgentId,
        knowledge_id: &KnowledgeId,
    ) -> Result<KnowledgeId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        if teacher == student {
            return Err(ReynardError::SelfInteraction(*teacher));
        }
        for id in [teacher, student] {
            if !registry.contains(id) {
                return Err(ReynardError::AgentNotFound(*id));
            }
        }
        let now = registry.now();
        let (t, s) = registry
            .get_pair_mut(teacher, student)
            .ok_or(ReynardError::AgentNotFound(*student))?;

        let effectiveness = teaching_effectiveness(
            self.config.teaching_effectiveness,
            &t.traits_or_default(),
            &s.traits_or_default(),
        );
        let item = knowledge_of(&*t, *teacher)?
            .get(knowledge_id)
            .ok_or(ReynardError::KnowledgeNotFound(*knowledge_id))?;
        if !item.can_teach(MIN_TEACHING_PROFICIENCY) {
            return Err(ReynardError::NotTeachable(*knowledge_id));
        }
        let learned = item.proficiency * effectiveness;
        let student_knowledge = knowledge_of(&*s, *student)?;
        if student_knowledge.capacity == 0 {
            return Err(ReynardError::Config("knowledge capacity is zero".to_string()));
        }
        let existing = student_knowledge.find_by_title(&item.title).map(|k| k.id);
        let copy = taught_copy(item, *teacher, learned, now);

        let (Some(tk), Some(sk)) = (t.knowledge_mut(), s.knowledge_mut()) else {
            return Err(ReynardError::ComponentMissing {
                agent: *student,
                component: "knowledge",
            });
        };
        let student_item = match existing.and_then(|id| sk.get_mut(&id)) {
            Some(held) => {
                held.raise_to(learned);
                held.last_used = now;
                held.id
            }
            None => sk
                .add(copy)
                .ok_or_else(|| ReynardError::Config("knowledge capacity is zero".to_string()))?,
        };
        sk.total_learning_sessions += 1;
        sk.remove_opportunities_for(teacher, knowledge_id);

        if let Some(source) = tk.get_mut(knowledge_id) {
            source.mark_used(now);
        }
        tk.total_knowledge_shared += 1;
        tk.total_teaching_sessions += 1;

        self.stats.transfers += 1;
        info!(
            teacher = %teacher,
            student = %student,
            knowledge = %knowledge_id,
            effectiveness,
            learned,
            "Knowledge transferred"
        );
        Ok(student_item)
    }

    /// Queue a chance for `student` to learn `teacher`'s item later. Returns
    /// the opportunity id, or the existing one if already queued.
    pub fn queue_learning_opportunity<R>(
        &mut self,
        registry: &mut R,
        student: &AgentId,
        teacher: &AgentId,
        knowledge_id: &KnowledgeId,
    ) -> Option<OpportunityId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        self.try_queue_learning_opportunity(registry, student, teacher, knowledge_id)
            .inspect_err(|e| debug!(student = %student, teacher = %teacher, error = %e, "Opportunity not queued"))
            .ok()
    }

    /// Fallible form of [`Self::queue_learning_opportunity`].
    ///
    /// # Errors
    ///
    /// [`ReynardError::SelfInteraction`], [`ReynardError::AgentNotFound`],
    /// [`ReynardError::ComponentMissing`], [`ReynardError::KnowledgeNotFound`]
    /// or [`ReynardError::NotTeachable`].
    pub fn try_queue_learning_opportunity<R>(
        &mut self,
        registry: &mut R,
        student: &AgentId,
        teacher: &AgentId,
        knowledge_id: &KnowledgeId,
    ) -> Result<OpportunityId>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        if teacher == student {
            return Err(ReynardError::SelfInteraction(*teacher));
        }
        for id in [teacher, student] {
            if !registry.contains(id) {
                return Err(ReynardError::AgentNotFound(*id));
            }
        }
        let now = registry.now();
        let (s, t) = registry
            .get_pair_mut(student, teacher)
            .ok_or(ReynardError::AgentNotFound(*teacher))?;

        let item = knowledge_of(&*t, *teacher)?
            .get(knowledge_id)
            .ok_or(ReynardError::KnowledgeNotFound(*knowledge_id))?;
        if !item.can_teach(MIN_TEACHING_PROFICIENCY) {
            return Err(ReynardError::NotTeachable(*knowledge_id));
        }
        let traits = s.traits_or_default();
        let sk = s.knowledge_mut().ok_or(ReynardError::ComponentMissing {
            agent: *student,
            component: "knowledge",
        })?;
        if let Some(queued) = sk
            .opportunities
            .iter()
            .find(|o| o.teacher_id == *teacher && o.knowledge_id == *knowledge_id)
        {
            return Ok(queued.id);
        }

        let method = LearningMethod::preferred_for(item.knowledge_type);
        let opportunity = LearningOpportunity {
            id: OpportunityId::new(),
            knowledge_id: *knowledge_id,
            teacher_id: *teacher,
            learning_method: method,
            estimated_difficulty: learning_difficulty(item, &traits),
            estimated_duration: learning_duration(item, method),
            learning_potential: learning_potential(item, sk),
            created_at: now,
            expires_at: Some(now.advanced(self.config.opportunity_ttl_secs)),
        };
        let id = opportunity.id;
        sk.queue_opportunity(opportunity);
        self.stats.opportunities_queued += 1;
        debug!(student = %student, teacher = %teacher, opportunity = %id, ?method, "Learning opportunity queued");
        Ok(id)
    }

    /// Knowledge summary for one agent.
    #[must_use]
    pub fn get_knowledge_stats<R>(&self, registry: &R, agent: &AgentId) -> Option<KnowledgeStats>
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge,
    {
        Some(registry.get_agent(agent)?.knowledge()?.stats())
    }

    /// Run one tick: decay stale knowledge, then work through opportunities
    /// once the processing interval has passed.
    pub fn update<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        let mut report = self.process_knowledge_decay(registry, delta_time);
        if self.opportunity_timer.advance(delta_time).is_some() {
            let opportunities = self.process_learning_opportunities(registry);
            report.agent_errors += opportunities.agent_errors;
        }
        report
    }

    /// Lower proficiency and confidence of items left unused for longer than
    /// the decay age.
    pub fn process_knowledge_decay<R>(&mut self, registry: &mut R, delta_time: f64) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge,
    {
        let now = registry.now();
        let stale_after = self.config.knowledge_decay_age_secs;
        let mut report = TickReport::default();
        for id in registry.agent_ids() {
            let Some(component) = registry
                .get_agent_mut(&id)
                .and_then(HasKnowledge::knowledge_mut)
            else {
                continue;
            };
            let result = check_knowledge(component, id).map(|()| {
                component.decay(&now, delta_time, stale_after);
            });
            isolate("learning", id, result, &mut report);
        }
        self.stats.agent_errors += report.agent_errors as u64;
        report
    }

    /// Drop expired opportunities and complete each student's best ready one.
    pub fn process_learning_opportunities<R>(&mut self, registry: &mut R) -> TickReport
    where
        R: AgentRegistry,
        R::Agent: HasKnowledge + HasTraits,
    {
        let now = registry.now();
        let mut report = TickReport::default();
        let mut ready = Vec::new();
        for id in registry.agent_ids() {
            let Some(component) = registry
                .get_agent_mut(&id)
                .and_then(HasKnowledge::knowledge_mut)
            else {
                continue;
            };
            let expired = component.expire_opportunities(&now);
            self.stats.opportunities_expired += expired as u64;
            if let Some(best) = component.best_ready_opportunity(&now) {
                ready.push((id, best.id, best.teacher_id, best.knowledge_id));
            }
            report.agents_processed += 1;
        }

        for (student, opportunity, teacher, knowledge_id) in ready {
            match self.try_transfer_knowledge(registry, &teacher, &student, &knowledge_id) {
                Ok(_) => self.stats.opportunities_completed += 1,
                Err(e) => {
                    debug!(
                        student = %student,
                        opportunity = %opportunity,
                        error = %e,
                        "Learning opportunity abandoned"
                    );
                    if let Some(component) = registry
                        .get_agent_mut(&student)
                        .and_then(HasKnowledge::knowledge_mut)
                    {
                        component.opportunities.retain(|o| o.id != opportunity);
                    }
                }
            }
        }
        report
    }
}

fn check_knowledge(component: &KnowledgeComponent, agent: AgentId) -> Result<()> {
    if let Some(bad) = component
        .items
        .values()
        .find(|k| !k.proficiency.is_finite() || !k.confidence.is_finite())
    {
        return Err(ReynardError::CorruptState {
            agent,
            reason: format!("knowledge '{}' has non-finite proficiency or confidence", bad.title),
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

    fn pair() -> (LearningSystem, AgentStore, AgentId, AgentId) {
        let mut store = AgentStore::new();
        let config = ReynardConfig::default();
        let a = store.insert(Agent::new("teacher", Position::new(0.0, 0.0), PersonalityTraits::default(), &config));
        let b = store.insert(Agent::new("student", Position::new(1.0, 0.0), PersonalityTraits::default(), &config));
        (LearningSystem::new(config.learning), store, a, b)
    }

    fn item<'a>(store: &'a AgentStore, agent: &AgentId, title: &str) -> Option<&'a Knowledge> {
        store.get_agent(agent)?.knowledge.as_ref()?.find_by_title(title)
    }

    #[test]
    fn transfer_teaches_at_reduced_proficiency() {
        let (mut system, mut store, a, b) = pair();
        let kid = system
            .add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5)
            .expect("added");
        assert!(system.transfer_knowledge(&mut store, &a, &b, &kid));

        let learned = item(&store, &b, "X").expect("student item");
        assert!(learned.proficiency > 0.0 && learned.proficiency <= 0.8);
        assert_eq!(learned.source_agent, Some(a));
        let taught = item(&store, &a, "X").expect("teacher item");
        assert!(taught.proficiency >= 0.8);
        assert_eq!(taught.usage_count, 1);
        assert_eq!(system.stats().transfers, 1);
    }

    #[test]
    fn repeated_transfer_never_lowers_student() {
        let (mut system, mut store, a, b) = pair();
        system.add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5);
        system.add_knowledge_to_agent(&mut store, &b, "X", KnowledgeType::Factual, "d", 0.9, 0.5);
        assert!(system.transfer_knowledge_by_title(&mut store, &a, &b, "X"));
        let held = item(&store, &b, "X").expect("student item");
        assert!((held.proficiency - 0.9).abs() < f32::EPSILON);
        let count = store.get_agent(&b).and_then(|x| x.knowledge.as_ref()).map(KnowledgeComponent::len);
        assert_eq!(count, Some(1));
    }

    #[test]
    fn weak_items_are_not_teachable() {
        let (mut system, mut store, a, b) = pair();
        let kid = system
            .add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.1, 0.5)
            .expect("added");
        assert!(matches!(
            system.try_transfer_knowledge(&mut store, &a, &b, &kid),
            Err(ReynardError::NotTeachable(_))
        ));
        assert!(item(&store, &b, "X").is_none());
        assert_eq!(system.stats().rejected_transfers, 1);
    }

    #[test]
    fn missing_parties_are_refused() {
        let (mut system, mut store, a, _) = pair();
        let kid = system
            .add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5)
            .expect("added");
        assert!(!system.transfer_knowledge(&mut store, &a, &AgentId::new(), &kid));
        assert!(!system.transfer_knowledge(&mut store, &a, &a, &kid));
        assert!(system
            .add_knowledge_to_agent(&mut store, &AgentId::new(), "Y", KnowledgeType::Social, "", 0.5, 0.5)
            .is_none());
    }

    #[test]
    fn effectiveness_follows_traits() {
        let (system, mut store, a, b) = pair();
        let neutral = system.calculate_teaching_effectiveness(&store, &a, &b).expect("both exist");
        if let Some(agent) = store.get_agent_mut(&a) {
            agent.traits = Some(PersonalityTraits {
                charisma: 1.0,
                intelligence: 1.0,
                ..PersonalityTraits::default()
            });
        }
        let gifted = system.calculate_teaching_effectiveness(&store, &a, &b).expect("both exist");
        assert!(gifted > neutral);
        assert!(gifted <= 1.0);
    }

    #[test]
    fn opportunities_complete_once_ready() {
        let (mut system, mut store, a, b) = pair();
        let kid = system
            .add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5)
            .expect("added");
        let first = system.queue_learning_opportunity(&mut store, &b, &a, &kid).expect("queued");
        let again = system.queue_learning_opportunity(&mut store, &b, &a, &kid).expect("queued");
        assert_eq!(first, again);
        assert_eq!(system.stats().opportunities_queued, 1);

        // Not ready yet: nothing learned.
        system.process_learning_opportunities(&mut store);
        assert!(item(&store, &b, "X").is_none());

        store.advance_clock(1_000.0);
        system.process_learning_opportunities(&mut store);
        assert!(item(&store, &b, "X").is_some());
        assert_eq!(system.stats().opportunities_completed, 1);
        let queued = store
            .get_agent(&b)
            .and_then(|x| x.knowledge.as_ref())
            .map(|k| k.opportunities.len());
        assert_eq!(queued, Some(0));
    }

    #[test]
    fn expired_opportunities_are_dropped() {
        let (mut system, mut store, a, b) = pair();
        let kid = system
            .add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5)
            .expect("added");
        system.queue_learning_opportunity(&mut store, &b, &a, &kid);
        store.advance_clock(10_000.0);
        system.process_learning_opportunities(&mut store);
        assert_eq!(system.stats().opportunities_expired, 1);
        assert!(item(&store, &b, "X").is_none());
    }

    #[test]
    fn stale_knowledge_decays() {
        let (mut system, mut store, a, _) = pair();
        system.add_knowledge_to_agent(&mut store, &a, "X", KnowledgeType::Factual, "d", 0.8, 0.5);
        store.advance_clock(1_200.0);
        system.process_knowledge_decay(&mut store, 10.0);
        let decayed = item(&store, &a, "X").expect("item");
        assert!(decayed.proficiency < 0.8);
    }
}
