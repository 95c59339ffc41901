//! # reynard-world: systems and the world loop
//!
//! Drives the per-agent components from `reynard-core` through time.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 AgentWorld                    │
//! │  clock · counters · tick budget · storage    │
//! │  ┌────────────────────────────────────────┐  │
//! │  │ Memory · Interaction · Social ·        │  │
//! │  │ Learning · Gender systems              │  │
//! │  └──────────────────┬─────────────────────┘  │
//! │                     ▼                        │
//! │  ┌────────────────────────────────────────┐  │
//! │  │  AgentRegistry (AgentStore)            │  │
//! │  └────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `registry`: the [`AgentRegistry`] seam systems look agents up through,
//!   and the in-memory [`AgentStore`]
//! - `systems`: one system per component, each with request operations and
//!   a per-tick `update`
//! - `world`: [`AgentWorld`], which owns the store and runs every system once
//!   per tick

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod registry;
pub mod systems;
pub mod world;

pub use registry::{AgentRegistry, AgentStore};
pub use systems::{
    GenderSystem, InteractionSystem, LearningSystem, MemorySystem, SocialSystem, TickReport,
};
pub use world::{AgentWorld, TickSummary, WorldStats};
