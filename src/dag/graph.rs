// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::TaskKind;
use crate::errors::{Result, ScrapedagError};

/// Kind-level view of a set of tasks: which kinds exist and which kinds each
/// one waits for.
///
/// Several tasks may share a kind; their requirements are merged. This is
/// only used for startup checks and diagnostics; the runner itself works off
/// the registry.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    requires: BTreeMap<TaskKind, BTreeSet<TaskKind>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one task's kind and its declared prerequisites.
    pub fn add(&mut self, kind: &str, requires: &[TaskKind]) {
        self.requires
            .entry(kind.to_string())
            .or_default()
            .extend(requires.iter().cloned());
    }

    /// Every known kind, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.requires.keys().map(|s| s.as_str())
    }

    /// Prerequisites declared for `kind`.
    pub fn dependencies_of(&self, kind: &str) -> Vec<&str> {
        self.requires
            .get(kind)
            .map(|deps| deps.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Kinds with no prerequisites: what the runner will seed first.
    pub fn roots(&self) -> Vec<&str> {
        self.requires
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(kind, _)| kind.as_str())
            .collect()
    }

    /// Check that every prerequisite names a known kind, that no kind waits
    /// for itself and that the graph has no cycle.
    ///
    /// Any of these would otherwise leave tasks blocked forever.
    pub fn validate(&self) -> Result<()> {
        for (kind, deps) in self.requires.iter() {
            for dep in deps.iter() {
                if dep == kind {
                    return Err(ScrapedagError::DagCycle(format!(
                        "task kind '{}' requires itself",
                        kind
                    )));
                }
                if !self.requires.contains_key(dep) {
                    return Err(ScrapedagError::UnknownDependency {
                        task: kind.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Edge direction: prerequisite -> dependent.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for kind in self.requires.keys() {
            graph.add_node(kind.as_str());
        }
        for (kind, deps) in self.requires.iter() {
            for dep in deps.iter() {
                graph.add_edge(dep.as_str(), kind.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(ScrapedagError::DagCycle(format!(
                "cycle detected in task graph involving kind '{}'",
                cycle.node_id()
            ))),
        }
    }
}
