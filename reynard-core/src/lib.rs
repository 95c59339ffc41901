//! # Reynard Core Library
//!
//! Per-agent simulation state for the Reynard world. Every agent owns one
//! instance of each component:
//!
//! - **Memory**: episodic, semantic, social, emotional and procedural
//!   memories with capacity eviction, decay and consolidation
//! - **Interaction**: interaction history, per-peer relationships and a
//!   social energy budget
//! - **Social**: connections, group memberships, status and influence
//! - **Knowledge**: proficiency-tracked knowledge items and a queue of
//!   learning opportunities
//! - **Gender**: identity, expression, pronouns, support network and
//!   disclosure history
//!
//! Components hold data plus the pure math that acts on it. Scheduling,
//! cross-agent lookups and ticking live in `reynard-world`.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod consolidation;
pub mod decay;
pub mod error;
pub mod eviction;
pub mod gender;
pub mod interaction;
pub mod knowledge;
pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod social;
pub mod types;

pub use agent::{
    Agent, HasGender, HasInteraction, HasKnowledge, HasMemory, HasSocial, HasTraits, Identified,
    Positioned,
};
pub use config::ReynardConfig;
pub use error::{ReynardError, Result};
pub use memory::{Memory, MemoryComponent, MemoryType};
pub use types::*;
