use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::{DependencyGraph, HealthStatus, ServiceRegistry};

/// Effective health of a service together with what caused it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Queried service
    pub service: String,
    /// Status reported by the service itself
    pub reported: HealthStatus,
    /// Worst status across the service and its transitive dependencies
    pub effective: HealthStatus,
    /// Dependency path from `service` to the first service found with the
    /// effective status. `[service]` when the service itself is the cause.
    pub cause: Vec<String>,
}

/// Computes effective health by walking the dependency graph
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthAggregator;

impl HealthAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Worst status among `id` and everything it transitively depends on
    pub fn effective_health(
        &self,
        registry: &ServiceRegistry,
        graph: &DependencyGraph,
        id: &str,
    ) -> Result<HealthStatus> {
        Ok(self.report(registry, graph, id)?.effective)
    }

    /// Builds a [`HealthReport`] for `id`.
    ///
    /// Depth-first over dependencies in insertion order; ties keep the first
    /// service visited and the walk stops as soon as `Unhealthy` is seen.
    pub fn report(
        &self,
        registry: &ServiceRegistry,
        graph: &DependencyGraph,
        id: &str,
    ) -> Result<HealthReport> {
        let reported = registry.get(id)?.health;

        let mut effective = reported;
        let mut culprit = id;
        let mut visited: HashSet<&str> = HashSet::from([id]);
        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut stack: Vec<&str> = Vec::new();

        push_dependencies(graph, id, &visited, &mut parent, &mut stack);

        while effective < HealthStatus::Unhealthy {
            let Some(node) = stack.pop() else {
                break;
            };
            if !visited.insert(node) {
                continue;
            }

            let status = registry.get(node)?.health;
            if status > effective {
                effective = status;
                culprit = node;
            }
            push_dependencies(graph, node, &visited, &mut parent, &mut stack);
        }

        let mut cause = vec![culprit.to_string()];
        let mut current = culprit;
        while let Some(prev) = parent.get(current) {
            cause.push(prev.to_string());
            current = prev;
        }
        cause.reverse();

        tracing::debug!(
            "Effective health of '{}' is {} (reported {}, cause {})",
            id,
            effective,
            reported,
            cause.join(" -> ")
        );

        Ok(HealthReport { service: id.to_string(), reported, effective, cause })
    }
}

fn push_dependencies<'a>(
    graph: &'a DependencyGraph,
    node: &'a str,
    visited: &HashSet<&'a str>,
    parent: &mut HashMap<&'a str, &'a str>,
    stack: &mut Vec<&'a str>,
) {
    for dep in graph.dependencies(node).iter().rev() {
        if !visited.contains(dep.as_str()) {
            parent.insert(dep.as_str(), node);
            stack.push(dep.as_str());
        }
    }
}
