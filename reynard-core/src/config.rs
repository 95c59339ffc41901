//! Configuration for the Reynard world.
//!
//! Maps directly to `reynard.toml`. Every field has a default, so a partial
//! file (or an empty one) yields a working configuration.

use serde::{Deserialize, Serialize};

/// Top-level world configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReynardConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Memory component and system tuning.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Interaction system tuning.
    #[serde(default)]
    pub interaction: InteractionConfig,
    /// Social system tuning.
    #[serde(default)]
    pub social: SocialConfig,
    /// Learning system tuning.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Gender system tuning.
    #[serde(default)]
    pub gender: GenderConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Tick budget monitoring.
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl ReynardConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ReynardError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::ReynardError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General world settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level hint for the embedding application: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seed for every random roll. `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            seed: None,
        }
    }
}

/// Memory component and system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum memories per agent.
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
    /// Importance lost per simulated second, before the age factor.
    #[serde(default = "default_memory_decay_rate")]
    pub decay_rate: f32,
    /// Memories younger than this (seconds) do not decay.
    #[serde(default = "default_decay_age_threshold")]
    pub decay_age_threshold_secs: f64,
    /// Upper bound on the age multiplier.
    #[serde(default = "default_max_age_factor")]
    pub max_age_factor: f32,
    /// Memories below this importance are consolidation candidates.
    #[serde(default = "default_consolidation_threshold")]
    pub consolidation_threshold: f32,
    /// Minimum number of similar memories merged at once.
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    /// Decayed memories at or below this importance are forgotten.
    #[serde(default = "default_cleanup_threshold")]
    pub cleanup_threshold: f32,
    /// Seconds between consolidation passes.
    #[serde(default = "default_interval")]
    pub processing_interval_secs: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
            decay_rate: default_memory_decay_rate(),
            decay_age_threshold_secs: default_decay_age_threshold(),
            max_age_factor: default_max_age_factor(),
            consolidation_threshold: default_consolidation_threshold(),
            min_cluster_size: default_min_cluster_size(),
            cleanup_threshold: default_cleanup_threshold(),
            processing_interval_secs: default_interval(),
        }
    }
}

/// Interaction system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Maximum Euclidean distance between interacting agents.
    #[serde(default = "default_interaction_range")]
    pub interaction_range: f32,
    /// Baseline acceptance probability before trait modifiers.
    #[serde(default = "default_base_probability")]
    pub base_interaction_probability: f32,
    /// Requested interactions below this acceptance probability are declined.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f32,
    /// Social energy each participant spends per interaction.
    #[serde(default = "default_energy_cost")]
    pub social_energy_cost: f32,
    /// Social energy ceiling for new agents.
    #[serde(default = "default_max_energy")]
    pub max_social_energy: f32,
    /// Energy regained per simulated second.
    #[serde(default = "default_energy_recovery")]
    pub energy_recovery_rate: f32,
    /// Whether nearby agents interact on their own during ticks.
    #[serde(default = "default_true")]
    pub spontaneous_interactions: bool,
    /// Interaction records kept per agent; oldest are dropped first.
    #[serde(default = "default_max_history")]
    pub max_interaction_history: usize,
    /// Seconds between spontaneous-interaction passes.
    #[serde(default = "default_interval")]
    pub processing_interval_secs: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            interaction_range: default_interaction_range(),
            base_interaction_probability: default_base_probability(),
            acceptance_threshold: default_acceptance_threshold(),
            social_energy_cost: default_energy_cost(),
            max_social_energy: default_max_energy(),
            energy_recovery_rate: default_energy_recovery(),
            spontaneous_interactions: true,
            max_interaction_history: default_max_history(),
            processing_interval_secs: default_interval(),
        }
    }
}

/// Social system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// A leader is replaced once their influence drops below this fraction of a
    /// challenger's.
    #[serde(default = "default_leadership_change_threshold")]
    pub leadership_change_threshold: f32,
    /// Groups whose health falls below this dissolve.
    #[serde(default = "default_group_health_threshold")]
    pub group_health_threshold: f32,
    /// Cohesion assigned to newly created groups.
    #[serde(default = "default_initial_cohesion")]
    pub initial_group_cohesion: f32,
    /// Groups with fewer members than this dissolve.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,
    /// Cohesion moves by `(success share - 0.5) * cohesion_rate` per pass,
    /// judged over member interactions since the previous pass.
    #[serde(default = "default_cohesion_rate")]
    pub cohesion_rate: f32,
    /// Let eligible agents found groups on their own.
    #[serde(default = "default_true")]
    pub spontaneous_groups: bool,
    /// Chance per pass that an eligible agent tries to found a group.
    #[serde(default = "default_spontaneous_chance")]
    pub group_formation_chance: f64,
    /// Let compatible agents connect on their own.
    #[serde(default = "default_true")]
    pub spontaneous_connections: bool,
    /// Chance per pass that a candidate connection forms.
    #[serde(default = "default_spontaneous_chance")]
    pub connection_chance: f64,
    /// Seconds between group-dynamics passes.
    #[serde(default = "default_interval")]
    pub processing_interval_secs: f64,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            leadership_change_threshold: default_leadership_change_threshold(),
            group_health_threshold: default_group_health_threshold(),
            initial_group_cohesion: default_initial_cohesion(),
            min_group_size: default_min_group_size(),
            cohesion_rate: default_cohesion_rate(),
            spontaneous_groups: true,
            group_formation_chance: default_spontaneous_chance(),
            spontaneous_connections: true,
            connection_chance: default_spontaneous_chance(),
            processing_interval_secs: default_interval(),
        }
    }
}

/// Learning system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Maximum knowledge items per agent.
    #[serde(default = "default_knowledge_capacity")]
    pub knowledge_capacity: usize,
    /// Base learning rate for new agents.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Baseline teaching effectiveness blended with trait effects.
    #[serde(default = "default_teaching_effectiveness")]
    pub teaching_effectiveness: f32,
    /// Proficiency lost per simulated second once an item goes stale.
    #[serde(default = "default_knowledge_decay_rate")]
    pub knowledge_decay_rate: f32,
    /// Items unused for longer than this (seconds) start to decay.
    #[serde(default = "default_knowledge_decay_age")]
    pub knowledge_decay_age_secs: f64,
    /// Seconds before a queued learning opportunity expires.
    #[serde(default = "default_opportunity_ttl")]
    pub opportunity_ttl_secs: f64,
    /// Seconds between opportunity passes.
    #[serde(default = "default_interval")]
    pub processing_interval_secs: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            knowledge_capacity: default_knowledge_capacity(),
            learning_rate: default_learning_rate(),
            teaching_effectiveness: default_teaching_effectiveness(),
            knowledge_decay_rate: default_knowledge_decay_rate(),
            knowledge_decay_age_secs: default_knowledge_decay_age(),
            opportunity_ttl_secs: default_opportunity_ttl(),
            processing_interval_secs: default_interval(),
        }
    }
}

/// Gender system tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderConfig {
    /// Wellbeing below this marks an agent as needing support.
    #[serde(default = "default_support_network_threshold")]
    pub support_network_threshold: f32,
    /// Expression confidence never drifts below this floor.
    #[serde(default = "default_expression_confidence_threshold")]
    pub expression_confidence_threshold: f32,
    /// Expression drift speed, scaled by each agent's fluidity.
    #[serde(default = "default_gender_fluidity_rate")]
    pub gender_fluidity_rate: f32,
    /// Supporters beyond this count add no further wellbeing.
    #[serde(default = "default_support_cap")]
    pub support_cap: usize,
}

impl Default for GenderConfig {
    fn default() -> Self {
        Self {
            support_network_threshold: default_support_network_threshold(),
            expression_confidence_threshold: default_expression_confidence_threshold(),
            gender_fluidity_rate: default_gender_fluidity_rate(),
            support_cap: default_support_cap(),
        }
    }
}

/// Persistence / save settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable `SQLite` WAL mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify CRC-32 checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Number of rotating backups to keep.
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
            backup_count: default_backup_count(),
        }
    }
}

/// Tick budget monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Per-tick budget in milliseconds; ticks above it are logged.
    #[serde(default = "default_tick_budget_ms")]
    pub tick_budget_ms: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            tick_budget_ms: default_tick_budget_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_interval() -> f64 {
    1.0
}
fn default_memory_capacity() -> usize {
    1000
}
fn default_memory_decay_rate() -> f32 {
    0.01
}
fn default_decay_age_threshold() -> f64 {
    300.0
}
fn default_max_age_factor() -> f32 {
    5.0
}
fn default_consolidation_threshold() -> f32 {
    0.3
}
fn default_min_cluster_size() -> usize {
    2
}
fn default_cleanup_threshold() -> f32 {
    0.05
}
fn default_interaction_range() -> f32 {
    5.0
}
fn default_base_probability() -> f32 {
    0.3
}
fn default_acceptance_threshold() -> f32 {
    0.1
}
fn default_energy_cost() -> f32 {
    10.0
}
fn default_max_energy() -> f32 {
    100.0
}
fn default_energy_recovery() -> f32 {
    5.0
}
fn default_max_history() -> usize {
    500
}
fn default_leadership_change_threshold() -> f32 {
    0.8
}
fn default_group_health_threshold() -> f32 {
    0.3
}
fn default_initial_cohesion() -> f32 {
    0.7
}
fn default_min_group_size() -> usize {
    2
}
fn default_cohesion_rate() -> f32 {
    0.1
}
fn default_spontaneous_chance() -> f64 {
    0.1
}
fn default_knowledge_capacity() -> usize {
    100
}
fn default_learning_rate() -> f32 {
    0.1
}
fn default_teaching_effectiveness() -> f32 {
    0.5
}
fn default_knowledge_decay_rate() -> f32 {
    0.001
}
fn default_knowledge_decay_age() -> f64 {
    600.0
}
fn default_opportunity_ttl() -> f64 {
    3600.0
}
fn default_support_network_threshold() -> f32 {
    0.5
}
fn default_expression_confidence_threshold() -> f32 {
    0.3
}
fn default_gender_fluidity_rate() -> f32 {
    0.01
}
fn default_support_cap() -> usize {
    5
}
fn default_backup_count() -> u32 {
    3
}
fn default_tick_budget_ms() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ReynardConfig::from_toml("").expect("empty config parses");
        assert_eq!(config.memory.capacity, 1000);
        assert!((config.interaction.interaction_range - 5.0).abs() < f32::EPSILON);
        assert!((config.social.group_health_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.learning.knowledge_capacity, 100);
        assert!(config.general.seed.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = ReynardConfig::from_toml(
            r#"
            [general]
            seed = 42

            [memory]
            capacity = 50

            [interaction]
            social_energy_cost = 20.0
            "#,
        )
        .expect("partial config parses");
        assert_eq!(config.general.seed, Some(42));
        assert_eq!(config.memory.capacity, 50);
        assert!((config.memory.decay_rate - 0.01).abs() < f32::EPSILON);
        assert!((config.interaction.social_energy_cost - 20.0).abs() < f32::EPSILON);
        assert!((config.interaction.energy_recovery_rate - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = ReynardConfig::from_toml("[memory\ncapacity = ").expect_err("invalid");
        assert!(matches!(err, crate::ReynardError::Config(_)));
    }

    #[test]
    fn from_file_reads_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reynard.toml");
        std::fs::write(&path, "[learning]\nknowledge_capacity = 7\n").expect("write");
        let config = ReynardConfig::from_file(&path).expect("load");
        assert_eq!(config.learning.knowledge_capacity, 7);
    }
}
