//! Agent lookup.
//!
//! Systems never own agents. Every call receives a registry by reference and
//! looks up the agents it needs through [`AgentRegistry`]. Pairwise
//! operations borrow both agents at once with [`AgentRegistry::get_pair_mut`].

use std::collections::HashMap;

use reynard_core::agent::{Agent, Identified};
use reynard_core::types::{AgentId, SimTime};

/// Lookup surface systems are written against.
pub trait AgentRegistry {
    /// The stored agent type.
    type Agent;

    /// Shared access to one agent.
    fn get_agent(&self, id: &AgentId) -> Option<&Self::Agent>;

    /// Exclusive access to one agent.
    fn get_agent_mut(&mut self, id: &AgentId) -> Option<&mut Self::Agent>;

    /// Exclusive access to two distinct agents at once.
    ///
    /// `None` if either is missing or `a == b`.
    fn get_pair_mut(
        &mut self,
        a: &AgentId,
        b: &AgentId,
    ) -> Option<(&mut Self::Agent, &mut Self::Agent)>;

    /// Every registered id, in a stable order.
    fn agent_ids(&self) -> Vec<AgentId>;

    /// Current simulation time.
    fn now(&self) -> SimTime;

    /// Whether `id` is registered.
    fn contains(&self, id: &AgentId) -> bool {
        self.get_agent(id).is_some()
    }
}

/// In-memory agent storage with a simulation clock.
///
/// Agents live in a `Vec` in insertion order so ticks visit them in a
/// reproducible order; an id index gives O(1) lookup.
#[derive(Debug, Clone)]
pub struct AgentStore<A = Agent> {
    agents: Vec<A>,
    index: HashMap<AgentId, usize>,
    clock: SimTime,
}

impl<A> Default for AgentStore<A> {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            index: HashMap::new(),
            clock: SimTime::zero(),
        }
    }
}

impl<A: Identified> AgentStore<A> {
    /// An empty store at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an agent, replacing any agent with the same id.
    pub fn insert(&mut self, agent: A) -> AgentId {
        let id = agent.agent_id();
        if let Some(&slot) = self.index.get(&id) {
            self.agents[slot] = agent;
        } else {
            self.index.insert(id, self.agents.len());
            self.agents.push(agent);
        }
        id
    }

    /// Remove an agent.
    pub fn remove(&mut self, id: &AgentId) -> Option<A> {
        let slot = self.index.remove(id)?;
        let removed = self.agents.swap_remove(slot);
        if let Some(moved) = self.agents.get(slot) {
            self.index.insert(moved.agent_id(), slot);
        }
        Some(removed)
    }

    /// Number of agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Iterate over agents in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.agents.iter()
    }

    /// Move the clock forward by `delta` simulated seconds.
    pub fn advance_clock(&mut self, delta: f64) -> SimTime {
        self.clock = self.clock.advanced(delta);
        self.clock
    }

    /// Set the clock, e.g. after loading a saved world.
    pub fn set_clock(&mut self, clock: SimTime) {
        self.clock = clock;
    }
}

impl<A: Identified> AgentRegistry for AgentStore<A> {
    type Agent = A;

    fn get_agent(&self, id: &AgentId) -> Option<&A> {
        self.index.get(id).map(|&slot| &self.agents[slot])
    }

    fn get_agent_mut(&mut self, id: &AgentId) -> Option<&mut A> {
        let slot = *self.index.get(id)?;
        self.agents.get_mut(slot)
    }

    fn get_pair_mut(&mut self, a: &AgentId, b: &AgentId) -> Option<(&mut A, &mut A)> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        if i == j {
            return None;
        }
        if i < j {
            let (low, high) = self.agents.split_at_mut(j);
            Some((&mut low[i], &mut high[0]))
        } else {
            let (low, high) = self.agents.split_at_mut(i);
            Some((&mut high[0], &mut low[j]))
        }
    }

    fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(Identified::agent_id).collect()
    }

    fn now(&self) -> SimTime {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(names: &[&str]) -> (AgentStore, Vec<AgentId>) {
        let mut store = AgentStore::new();
        let ids = names
            .iter()
            .map(|name| store.insert(Agent::bare(*name)))
            .collect();
        (store, ids)
    }

    #[test]
    fn pair_borrow_keeps_argument_order() {
        let (mut store, ids) = store_with(&["a", "b", "c"]);
        let (first, second) = store.get_pair_mut(&ids[2], &ids[0]).expect("pair");
        assert_eq!(first.name, "c");
        assert_eq!(second.name, "a");

        let (first, second) = store.get_pair_mut(&ids[0], &ids[1]).expect("pair");
        assert_eq!(first.name, "a");
        assert_eq!(second.name, "b");
    }

    #[test]
    fn pair_with_self_or_missing_is_none() {
        let (mut store, ids) = store_with(&["a"]);
        assert!(store.get_pair_mut(&ids[0], &ids[0]).is_none());
        assert!(store.get_pair_mut(&ids[0], &AgentId::new()).is_none());
    }

    #[test]
    fn remove_keeps_index_consistent() {
        let (mut store, ids) = store_with(&["a", "b", "c"]);
        let removed = store.remove(&ids[0]).expect("removed");
        assert_eq!(removed.name, "a");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_agent(&ids[2]).map(|a| a.name.as_str()), Some("c"));
        assert_eq!(store.get_agent(&ids[1]).map(|a| a.name.as_str()), Some("b"));
        assert!(!store.contains(&ids[0]));
        assert!(store.remove(&ids[0]).is_none());
    }

    #[test]
    fn insert_replaces_same_id() {
        let mut store = AgentStore::new();
        let mut agent = Agent::bare("first");
        let id = store.insert(agent.clone());
        agent.name = "second".to_string();
        store.insert(agent);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_agent(&id).map(|a| a.name.as_str()), Some("second"));
    }

    #[test]
    fn clock_advances() {
        let mut store: AgentStore = AgentStore::new();
        store.advance_clock(1.5);
        store.advance_clock(2.0);
        assert!((store.now().seconds - 3.5).abs() < f64::EPSILON);
    }
}
