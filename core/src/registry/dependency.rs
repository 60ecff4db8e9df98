use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::registry::ServiceRegistry;

/// A directed edge: `dependent` depends on `dependency`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependent: String,
    pub dependency: String,
}

impl DependencyEdge {
    pub fn new(dependent: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self { dependent: dependent.into(), dependency: dependency.into() }
    }
}

/// Directed acyclic graph over service ids.
///
/// Adjacency lists and the edge list keep insertion order. Every edge is
/// checked for reachability before insertion, so the graph never holds a cycle.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// service -> services it depends on
    outgoing: HashMap<String, Vec<String>>,
    /// service -> services depending on it
    incoming: HashMap<String, Vec<String>>,
    /// every edge, oldest first
    order: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// Creates a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `from -> to`. Returns `false` when the edge already existed.
    pub fn add_edge(&mut self, registry: &ServiceRegistry, from: &str, to: &str) -> Result<bool> {
        registry.get(from)?;
        registry.get(to)?;

        if self.has_edge(from, to) {
            return Ok(false);
        }

        // `to` reaching `from` means the new edge would close a loop
        if let Some(path) = self.find_path(to, from) {
            let mut cycle = Vec::with_capacity(path.len() + 1);
            cycle.push(from.to_string());
            cycle.extend(path);
            tracing::warn!("Rejected dependency '{}' -> '{}': cycle {}", from, to, cycle.join(" -> "));
            return Err(CatalogError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
                path: cycle,
            });
        }

        self.outgoing.entry(from.to_string()).or_default().push(to.to_string());
        self.incoming.entry(to.to_string()).or_default().push(from.to_string());
        self.order.push(DependencyEdge::new(from, to));
        tracing::info!("Dependency '{}' -> '{}' added", from, to);
        Ok(true)
    }

    /// Removes `from -> to`. Returns `false` when there was no such edge.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        let removed = remove_from(&mut self.outgoing, from, to);
        if removed {
            remove_from(&mut self.incoming, to, from);
            self.order.retain(|edge| edge.dependent != from || edge.dependency != to);
            tracing::info!("Dependency '{}' -> '{}' removed", from, to);
        }
        removed
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.dependencies(from).iter().any(|dep| dep == to)
    }

    /// Direct dependencies of `id`, in insertion order
    pub fn dependencies(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Services depending directly on `id`, in insertion order
    pub fn dependents(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drops every edge touching `id`
    pub fn remove_service(&mut self, id: &str) {
        for dep in self.outgoing.remove(id).unwrap_or_default() {
            remove_from(&mut self.incoming, &dep, id);
        }
        for dependent in self.incoming.remove(id).unwrap_or_default() {
            remove_from(&mut self.outgoing, &dependent, id);
        }
        self.order.retain(|edge| edge.dependent != id && edge.dependency != id);
    }

    pub fn edge_count(&self) -> usize {
        self.order.len()
    }

    /// All edges in insertion order. Re-adding them in this order rebuilds
    /// the same adjacency lists.
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.order.clone()
    }

    /// Depth-first search for a path `start -> ... -> goal`, both ends included
    pub fn find_path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if node == goal {
                let mut path = vec![node.to_string()];
                let mut current = node;
                while let Some(prev) = parent.get(current) {
                    path.push(prev.to_string());
                    current = prev;
                }
                path.reverse();
                return Some(path);
            }
            // Reverse so the first-inserted dependency is explored first
            for next in self.dependencies(node).iter().rev() {
                if !visited.contains(next.as_str()) {
                    parent.insert(next.as_str(), node);
                    stack.push(next.as_str());
                }
            }
        }

        None
    }

    /// Every service reachable from `id` through outgoing edges, depth-first
    pub fn transitive_dependencies(&self, id: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut order = Vec::new();
        let mut stack: Vec<&str> = self.dependencies(id).iter().rev().map(String::as_str).collect();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node.to_string());
            stack.extend(self.dependencies(node).iter().rev().map(String::as_str));
        }

        order
    }

    /// Every service that transitively depends on `id`, breadth-first
    pub fn transitive_dependents(&self, id: &str) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self.dependents(id).iter().map(String::as_str).collect();

        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            order.push(node.to_string());
            queue.extend(self.dependents(node).iter().map(String::as_str));
        }

        order
    }

    /// Orders `ids` and their transitive dependencies so that every service
    /// comes after everything it depends on
    pub fn resolve_order(&self, ids: &[String]) -> Vec<String> {
        let mut done: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();

        for root in ids {
            if done.contains(root.as_str()) {
                continue;
            }
            // (node, index of the next dependency to visit)
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            while let Some((node, next)) = stack.pop() {
                let deps = self.dependencies(node);
                if let Some(dep) = deps.get(next) {
                    stack.push((node, next + 1));
                    if !done.contains(dep.as_str()) {
                        stack.push((dep.as_str(), 0));
                    }
                } else if done.insert(node) {
                    order.push(node.to_string());
                }
            }
        }

        order
    }

    /// Looks for any cycle in the graph. Always `None` for graphs built
    /// through [`DependencyGraph::add_edge`].
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut sources: Vec<&str> = self.outgoing.keys().map(String::as_str).collect();
        sources.sort_unstable();

        let mut finished: HashSet<&str> = HashSet::new();
        for start in sources {
            if finished.contains(start) {
                continue;
            }
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashSet<&str> = HashSet::new();
            let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

            while let Some((node, next)) = stack.pop() {
                if next == 0 {
                    path.push(node);
                    on_path.insert(node);
                }
                match self.dependencies(node).get(next) {
                    Some(dep) if on_path.contains(dep.as_str()) => {
                        let begin = path.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[begin..].iter().map(|n| n.to_string()).collect();
                        cycle.push(dep.clone());
                        return Some(cycle);
                    }
                    Some(dep) => {
                        stack.push((node, next + 1));
                        if !finished.contains(dep.as_str()) {
                            stack.push((dep.as_str(), 0));
                        }
                    }
                    None => {
                        path.pop();
                        on_path.remove(node);
                        finished.insert(node);
                    }
                }
            }
        }

        None
    }
}

fn remove_from(map: &mut HashMap<String, Vec<String>>, key: &str, value: &str) -> bool {
    let Some(list) = map.get_mut(key) else {
        return false;
    };
    let Some(pos) = list.iter().position(|v| v == value) else {
        return false;
    };
    list.remove(pos);
    if list.is_empty() {
        map.remove(key);
    }
    true
}
