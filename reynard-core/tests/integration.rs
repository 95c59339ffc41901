//! Integration tests: component lifecycles across modules, and agents
//! surviving a trip through the database.

use std::io::Write;

use reynard_core::agent::Agent;
use reynard_core::config::{MemoryConfig, PersistenceConfig, ReynardConfig};
use reynard_core::consolidation;
use reynard_core::decay;
use reynard_core::gender::GenderIdentity;
use reynard_core::knowledge::{Knowledge, KnowledgeType};
use reynard_core::memory::{Memory, MemoryComponent, MemoryType};
use reynard_core::persistence::PersistenceEngine;
use reynard_core::types::{AgentId, PersonalityTraits, Position, SimTime};

// ---------------------------------------------------------------------------
// Memory lifecycle: store -> decay -> consolidate -> forget
// ---------------------------------------------------------------------------

#[test]
fn memory_lifecycle() {
    let config = MemoryConfig {
        decay_age_threshold_secs: 10.0,
        ..MemoryConfig::default()
    };
    let mut component = MemoryComponent::from_config(&config);
    let friend = AgentId::new();

    component.store(Memory::new(MemoryType::Social, "shared bread", 0.25, 0.2, SimTime::zero()).with_agents([friend]));
    component.store(Memory::new(MemoryType::Social, "walked the ridge", 0.2, 0.2, SimTime::zero()).with_agents([friend]));
    component.store(Memory::new(MemoryType::Episodic, "storm", 0.9, 0.9, SimTime::zero()));
    assert_eq!(component.len(), 3);

    // Two faint social memories about the same friend merge into one.
    let report = consolidation::consolidate(&mut component, config.min_cluster_size);
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.merged_sources, 2);
    assert_eq!(component.len(), 2);
    let merged = component.get(&report.created[0]).expect("merged memory");
    assert!(merged.associated_agents.contains(&friend));
    assert_eq!(merged.consolidated_from.len(), 2);

    // Long neglect eventually forgets the weaker memories entirely.
    let mut now = SimTime::zero();
    for _ in 0..200 {
        now = now.advanced(10.0);
        decay::decay_component(&mut component, &now, 10.0, &config);
    }
    assert!(component.len() < 2);
    assert!(component.total_memories_forgotten >= 1);
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

fn populated_agent(config: &ReynardConfig) -> Agent {
    let mut agent = Agent::new("Tod", Position::new(3.0, 4.0), PersonalityTraits::default(), config);
    let now = SimTime::at(42.0);
    if let Some(memory) = agent.memory.as_mut() {
        memory.store(Memory::new(MemoryType::Procedural, "how to set a snare", 0.7, 0.1, now));
    }
    if let Some(knowledge) = agent.knowledge.as_mut() {
        knowledge.add(Knowledge::new("snares", KnowledgeType::Procedural, "wire loops", 0.6, 0.4, now));
    }
    if let Some(gender) = agent.gender.as_mut() {
        gender.update_identity(GenderIdentity::Genderfluid, now);
        gender.add_support_agent(AgentId::new(), now);
    }
    agent
}

#[test]
fn agent_round_trip_through_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("agents.db");
    let config = ReynardConfig::default();
    let agent = populated_agent(&config);

    {
        let engine = PersistenceEngine::open(&path, &config.persistence).expect("open");
        engine.save_agent(&agent).expect("save");
        engine.set_meta("clock_seconds", "42").expect("meta");
        assert!(engine.integrity_check().expect("integrity"));
    }

    let engine = PersistenceEngine::open(&path, &config.persistence).expect("reopen");
    assert_eq!(engine.agent_count().expect("count"), 1);
    assert_eq!(engine.get_meta("clock_seconds").expect("meta").as_deref(), Some("42"));
    let loaded = engine.load_agent(&agent.id).expect("load").expect("present");

    assert_eq!(loaded.name, "Tod");
    assert_eq!(loaded.position, agent.position);
    assert_eq!(loaded.memory.as_ref().map(MemoryComponent::len), Some(1));
    assert!(loaded
        .knowledge
        .as_ref()
        .is_some_and(|k| k.find_by_title("snares").is_some()));
    let gender = loaded.gender.as_ref().expect("gender");
    assert_eq!(gender.profile.primary_identity, GenderIdentity::Genderfluid);
    assert_eq!(gender.profile.identity_change_history.len(), 1);
    assert_eq!(gender.profile.support_network.len(), 1);
}

#[test]
fn rotating_backups_are_capped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("agents.db");
    let persistence = PersistenceConfig {
        backup_count: 2,
        ..PersistenceConfig::default()
    };
    let config = ReynardConfig::default();
    let mut engine = PersistenceEngine::open(&path, &persistence).expect("open");
    let agents: Vec<Agent> = (0..3).map(|_| populated_agent(&config)).collect();
    assert_eq!(engine.save_agents(&agents).expect("save"), 3);

    for _ in 0..4 {
        engine.create_rotating_backup().expect("backup");
    }
    assert!(dir.path().join("agents.db.bak.1").exists());
    assert!(dir.path().join("agents.db.bak.2").exists());
    assert!(!dir.path().join("agents.db.bak.3").exists());

    let backup = PersistenceEngine::open(dir.path().join("agents.db.bak.2"), &persistence).expect("open backup");
    assert_eq!(backup.agent_count().expect("count"), 3);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn config_file_overrides_some_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("reynard.toml");
    let mut file = std::fs::File::create(&path).expect("create");
    writeln!(
        file,
        "[general]\nseed = 9\n\n[memory]\ncapacity = 12\n\n[gender]\nsupport_cap = 3\n"
    )
    .expect("write");

    let config = ReynardConfig::from_file(&path).expect("parse");
    assert_eq!(config.general.seed, Some(9));
    assert_eq!(config.memory.capacity, 12);
    assert_eq!(config.gender.support_cap, 3);
    assert_eq!(config.learning.knowledge_capacity, 100);

    let agent = Agent::new("Ada", Position::new(0.0, 0.0), PersonalityTraits::default(), &config);
    assert_eq!(agent.memory.as_ref().map(|m| m.capacity), Some(12));
    assert_eq!(agent.gender.as_ref().map(|g| g.support_cap), Some(3));
}

#[test]
fn bad_config_is_an_error() {
    assert!(ReynardConfig::from_toml("[memory]\ncapacity = \"lots\"").is_err());
    assert!(ReynardConfig::from_file(std::path::Path::new("/nonexistent/reynard.toml")).is_err());
}
