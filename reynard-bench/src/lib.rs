//! Fixtures shared by the Reynard benchmarks.

use reynard_core::config::ReynardConfig;
use reynard_core::knowledge::KnowledgeType;
use reynard_core::memory::MemoryType;
use reynard_core::social::GroupType;
use reynard_core::types::{AgentId, PersonalityTraits, Position};
use reynard_world::AgentWorld;

/// Default configuration with a fixed seed.
#[must_use]
pub fn bench_config() -> ReynardConfig {
    let mut config = ReynardConfig::default();
    config.general.seed = Some(0xBEEF);
    config
}

/// Varied but deterministic traits for agent `i`.
#[must_use]
pub fn traits_for(i: usize) -> PersonalityTraits {
    let f = |k: usize| ((i * 7 + k * 13) % 10) as f32 / 10.0;
    PersonalityTraits {
        charisma: f(1),
        playfulness: f(2),
        intelligence: f(3),
        curiosity: f(4),
        patience: f(5),
        empathy: f(6),
    }
}

/// A world of `agents` agents on a line two units apart, each holding
/// `memories` memories and one teachable skill, connected to its neighbours
/// and grouped in fives.
#[must_use]
pub fn populated_world(agents: usize, memories: usize) -> (AgentWorld, Vec<AgentId>) {
    let mut world = AgentWorld::new(bench_config());
    let ids: Vec<AgentId> = (0..agents)
        .map(|i| world.create_agent(&format!("agent-{i}"), Position::new(i as f32 * 2.0, 0.0), traits_for(i)))
        .collect();

    for (i, id) in ids.iter().enumerate() {
        for m in 0..memories {
            let memory_type = MemoryType::ALL[m % MemoryType::ALL.len()];
            let importance = ((i + m) % 10) as f32 / 10.0;
            world.store_memory(id, memory_type, &format!("event {m} seen by agent {i}"), importance, 0.2);
        }
        world.add_knowledge(id, &format!("skill {i}"), KnowledgeType::Procedural, "practice", 0.7, 0.5);
    }
    for pair in ids.windows(2) {
        world.form_social_connection(&pair[0], &pair[1], 0.6);
    }
    for chunk in ids.chunks(5) {
        if let [leader, members @ ..] = chunk {
            world.create_social_group(leader, "band", GroupType::Community, members);
        }
    }
    (world, ids)
}
