//! Error types for the Reynard world.

use thiserror::Error;

use crate::types::{AgentId, GroupId, KnowledgeId};

/// Errors that can occur in component and system operations.
///
/// Public system operations collapse these into `false` / `None` / empty
/// results; the `try_*` variants surface them so callers can see why a
/// request was refused.
#[derive(Error, Debug)]
pub enum ReynardError {
    /// The referenced agent is not registered.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// The agent exists but lacks a component the operation needs.
    #[error("agent {agent} has no {component} component")]
    ComponentMissing {
        /// The agent that was looked up.
        agent: AgentId,
        /// Name of the missing component.
        component: &'static str,
    },

    /// The referenced knowledge item does not exist on the agent.
    #[error("knowledge not found: {0}")]
    KnowledgeNotFound(KnowledgeId),

    /// The referenced social group does not exist.
    #[error("social group not found: {0}")]
    GroupNotFound(GroupId),

    /// An agent was asked to interact with itself.
    #[error("agent {0} cannot interact with itself")]
    SelfInteraction(AgentId),

    /// Two agents are too far apart to interact.
    #[error("agents are {distance:.2} apart, interaction range is {range:.2}")]
    OutOfRange {
        /// Euclidean distance between the agents.
        distance: f32,
        /// Configured interaction range.
        range: f32,
    },

    /// An agent does not have enough social energy.
    #[error("agent {agent} has {available:.1} social energy, {required:.1} required")]
    InsufficientEnergy {
        /// The depleted agent.
        agent: AgentId,
        /// Energy currently available.
        available: f32,
        /// Energy the interaction costs.
        required: f32,
    },

    /// The acceptance probability fell below the configured threshold.
    #[error("interaction declined (acceptance probability {probability:.3})")]
    Declined {
        /// Computed acceptance probability.
        probability: f32,
    },

    /// The teacher's knowledge item is not strong enough to teach.
    #[error("knowledge {0} is not teachable")]
    NotTeachable(KnowledgeId),

    /// A tick was requested with a negative or non-finite delta.
    #[error("invalid delta time: {0}")]
    InvalidDelta(f64),

    /// An agent's component holds values no operation could have produced.
    #[error("corrupt state on agent {agent}: {reason}")]
    CorruptState {
        /// The affected agent.
        agent: AgentId,
        /// Description of the inconsistency.
        reason: String,
    },

    /// Serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for Reynard operations.
pub type Result<T> = std::result::Result<T, ReynardError>;
