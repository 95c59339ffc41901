//! Memory consolidation: merging weak, similar memories.
//!
//! Memories below the component's consolidation threshold are candidates.
//! Two candidates are similar when they share a type and either share an
//! associated agent or both have no associated agents. Similarity is
//! transitive within a pass, so candidates form clusters; each cluster with
//! at least `min_cluster_size` members is replaced by one merged memory.

use std::collections::{BTreeSet, HashMap};

use crate::memory::{Memory, MemoryComponent};
use crate::types::MemoryId;

/// Contents quoted verbatim in a merged memory's summary.
const MAX_QUOTED: usize = 3;

/// Outcome of a consolidation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsolidationReport {
    /// Ids of the merged memories created.
    pub created: Vec<MemoryId>,
    /// Number of source memories removed.
    pub merged_sources: usize,
}

/// Whether two memories may be merged.
#[must_use]
pub fn are_similar(a: &Memory, b: &Memory) -> bool {
    if a.memory_type != b.memory_type {
        return false;
    }
    match (a.associated_agents.is_empty(), b.associated_agents.is_empty()) {
        (true, true) => true,
        (false, false) => !a.associated_agents.is_disjoint(&b.associated_agents),
        _ => false,
    }
}

/// Group consolidation candidates into clusters of similar memories.
///
/// Returned clusters are ordered by their earliest member's insertion order and
/// only include clusters of at least `min_cluster_size`.
#[must_use]
pub fn find_clusters(component: &MemoryComponent, min_cluster_size: usize) -> Vec<Vec<MemoryId>> {
    let mut candidates: Vec<&Memory> = component
        .memories
        .values()
        .filter(|m| m.importance < component.consolidation_threshold)
        .collect();
    candidates.sort_by_key(|m| m.sequence);

    let mut parent: Vec<usize> = (0..candidates.len()).collect();
    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            if are_similar(candidates[i], candidates[j]) {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut clusters: HashMap<usize, Vec<MemoryId>> = HashMap::new();
    for i in 0..candidates.len() {
        let root = find_root(&mut parent, i);
        clusters.entry(root).or_default().push(candidates[i].id);
    }

    let mut ordered: Vec<(usize, Vec<MemoryId>)> = clusters
        .into_iter()
        .filter(|(_, members)| members.len() >= min_cluster_size.max(2))
        .collect();
    ordered.sort_by_key(|(root, _)| *root);
    ordered.into_iter().map(|(_, members)| members).collect()
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Build the merged memory for a cluster.
///
/// The merge keeps the shared type, the union of associated agents, the
/// earliest creation time, the latest access time and the summed access
/// count. Importance is the strongest member plus half of the rest.
#[must_use]
pub fn merge(members: &[&Memory]) -> Option<Memory> {
    let first = members.first()?;
    let max_importance = members.iter().map(|m| m.importance).fold(0.0_f32, f32::max);
    let total_importance: f32 = members.iter().map(|m| m.importance).sum();
    let importance = (max_importance + 0.5 * (total_importance - max_importance)).min(1.0);
    let emotional_weight =
        members.iter().map(|m| m.emotional_weight).sum::<f32>() / members.len() as f32;

    let created_at = members
        .iter()
        .map(|m| m.created_at)
        .min_by(|a, b| a.seconds.total_cmp(&b.seconds))
        .unwrap_or(first.created_at);
    let last_accessed = members
        .iter()
        .map(|m| m.last_accessed)
        .max_by(|a, b| a.seconds.total_cmp(&b.seconds))
        .unwrap_or(first.last_accessed);

    let quoted: Vec<&str> = members
        .iter()
        .take(MAX_QUOTED)
        .map(|m| m.content.as_str())
        .collect();
    let mut content = format!(
        "Consolidated memory of {} experiences: {}",
        members.len(),
        quoted.join("; ")
    );
    if members.len() > MAX_QUOTED {
        content.push_str("; ...");
    }

    let associated: BTreeSet<_> = members
        .iter()
        .flat_map(|m| m.associated_agents.iter().copied())
        .collect();

    let mut merged = Memory::new(first.memory_type, content, importance, emotional_weight, created_at)
        .with_agents(associated);
    merged.last_accessed = last_accessed;
    merged.access_count = members.iter().map(|m| m.access_count).sum();
    merged.consolidated_from = members.iter().map(|m| m.id).collect();
    Some(merged)
}

/// Run one consolidation pass over `component`.
pub fn consolidate(component: &mut MemoryComponent, min_cluster_size: usize) -> ConsolidationReport {
    let mut report = ConsolidationReport::default();

    for cluster in find_clusters(component, min_cluster_size) {
        let merged = {
            let members: Vec<&Memory> = cluster
                .iter()
                .filter_map(|id| component.memories.get(id))
                .collect();
            merge(&members)
        };
        let Some(merged) = merged else {
            continue;
        };

        for id in &cluster {
            component.memories.remove(id);
        }
        report.merged_sources += cluster.len();
        report.created.push(component.insert(merged));
    }

    component.total_memories_consolidated += report.merged_sources as u64;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryType;
    use crate::types::{AgentId, SimTime};

    fn weak(memory_type: MemoryType, content: &str, agents: &[AgentId]) -> Memory {
        Memory::new(memory_type, content, 0.1, 0.2, SimTime::at(0.0))
            .with_agents(agents.iter().copied())
    }

    #[test]
    fn similarity_needs_type_and_shared_agents() {
        let a = AgentId::new();
        let b = AgentId::new();
        assert!(are_similar(
            &weak(MemoryType::Social, "x", &[a]),
            &weak(MemoryType::Social, "y", &[a, b])
        ));
        assert!(!are_similar(
            &weak(MemoryType::Social, "x", &[a]),
            &weak(MemoryType::Social, "y", &[b])
        ));
        assert!(!are_similar(
            &weak(MemoryType::Social, "x", &[a]),
            &weak(MemoryType::Episodic, "y", &[a])
        ));
        assert!(are_similar(
            &weak(MemoryType::Episodic, "x", &[]),
            &weak(MemoryType::Episodic, "y", &[])
        ));
    }

    #[test]
    fn weak_similar_memories_merge() {
        let friend = AgentId::new();
        let mut component = MemoryComponent::new(10);
        component.store(weak(MemoryType::Social, "chatted at the well", &[friend]));
        component.store(weak(MemoryType::Social, "shared bread", &[friend]));
        component.store(
            Memory::new(MemoryType::Social, "strong", 0.9, 0.0, SimTime::zero()).with_agents([friend]),
        );

        let report = consolidate(&mut component, 2);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.merged_sources, 2);
        assert_eq!(component.len(), 2);
        assert_eq!(component.total_memories_consolidated, 2);

        let merged = component.get(&report.created[0]).expect("merged stored");
        assert_eq!(merged.consolidated_from.len(), 2);
        assert!(merged.associated_agents.contains(&friend));
        assert!(merged.importance > 0.1);
        assert!(merged.content.contains("shared bread"));
    }

    #[test]
    fn lone_candidates_stay() {
        let mut component = MemoryComponent::new(10);
        component.store(weak(MemoryType::Social, "a", &[AgentId::new()]));
        component.store(weak(MemoryType::Social, "b", &[AgentId::new()]));
        let report = consolidate(&mut component, 2);
        assert!(report.created.is_empty());
        assert_eq!(component.len(), 2);
    }

    #[test]
    fn clusters_are_transitive() {
        let (a, b, c) = (AgentId::new(), AgentId::new(), AgentId::new());
        let mut component = MemoryComponent::new(10);
        component.store(weak(MemoryType::Episodic, "1", &[a]));
        component.store(weak(MemoryType::Episodic, "2", &[a, b]));
        component.store(weak(MemoryType::Episodic, "3", &[b, c]));
        let clusters = find_clusters(&component, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn creation_counter_untouched_by_merge() {
        let mut component = MemoryComponent::new(10);
        component.store(weak(MemoryType::Emotional, "a", &[]));
        component.store(weak(MemoryType::Emotional, "b", &[]));
        consolidate(&mut component, 2);
        assert_eq!(component.total_memories_created, 2);
    }
}
