use catalog_core::{CatalogError, DependencyGraph, NewService, Result, ServiceRegistry};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Create a registry holding services svc-0..svc-{count}
fn create_test_registry(count: usize) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    for i in 0..count {
        let id = format!("svc-{i}");
        registry.register(NewService::new(id.clone(), id)).unwrap();
    }
    registry
}

fn create_layered_graph() -> Result<(ServiceRegistry, DependencyGraph)> {
    let mut registry = ServiceRegistry::new();
    for id in ["web", "api", "auth", "cache", "db"] {
        registry.register(NewService::new(id, id.to_uppercase()))?;
    }

    let mut graph = DependencyGraph::new();
    graph.add_edge(&registry, "web", "api")?;
    graph.add_edge(&registry, "api", "auth")?;
    graph.add_edge(&registry, "api", "cache")?;
    graph.add_edge(&registry, "auth", "db")?;
    graph.add_edge(&registry, "cache", "db")?;
    Ok((registry, graph))
}

#[test]
fn test_random_insertions_keep_graph_acyclic() {
    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let registry = create_test_registry(12);
        let mut graph = DependencyGraph::new();
        let mut accepted = 0;

        for _ in 0..150 {
            let from = format!("svc-{}", rng.gen_range(0..12));
            let to = format!("svc-{}", rng.gen_range(0..12));

            match graph.add_edge(&registry, &from, &to) {
                Ok(true) => accepted += 1,
                Ok(false) => assert!(graph.has_edge(&from, &to)),
                Err(CatalogError::CycleDetected { path, .. }) => {
                    // The reported path starts at `from` and closes back on it via `to`
                    assert_eq!(path.first(), Some(&from));
                    assert_eq!(path.last(), Some(&from));
                    assert_eq!(path.get(1), Some(&to));
                    assert!(!graph.has_edge(&from, &to));
                }
                Err(err) => panic!("unexpected error for {from} -> {to}: {err}"),
            }

            assert_eq!(graph.detect_cycle(), None, "seed {seed} produced a cycle");
        }

        assert_eq!(graph.edge_count(), accepted);
    }
}

#[test]
fn test_random_resolve_order_respects_edges() {
    let mut rng = StdRng::seed_from_u64(7);
    let registry = create_test_registry(15);
    let mut graph = DependencyGraph::new();

    for _ in 0..80 {
        let from = format!("svc-{}", rng.gen_range(0..15));
        let to = format!("svc-{}", rng.gen_range(0..15));
        let _ = graph.add_edge(&registry, &from, &to);
    }

    let ids: Vec<String> = (0..15).map(|i| format!("svc-{i}")).collect();
    let order = graph.resolve_order(&ids);
    assert_eq!(order.len(), ids.len());

    let position = |id: &str| order.iter().position(|s| s == id).unwrap();
    for edge in graph.edges() {
        assert!(
            position(&edge.dependency) < position(&edge.dependent),
            "{} must start before {}",
            edge.dependency,
            edge.dependent
        );
    }
}

#[test]
fn test_transitive_queries() -> Result<()> {
    let (_, graph) = create_layered_graph()?;

    let mut deps = graph.transitive_dependencies("web");
    deps.sort();
    assert_eq!(deps, vec!["api", "auth", "cache", "db"]);

    let mut impacted = graph.transitive_dependents("db");
    impacted.sort();
    assert_eq!(impacted, vec!["api", "auth", "cache", "web"]);

    assert!(graph.transitive_dependents("web").is_empty());
    assert!(graph.transitive_dependencies("db").is_empty());
    Ok(())
}

#[test]
fn test_closing_edge_reports_cycle_path() -> Result<()> {
    let (registry, mut graph) = create_layered_graph()?;

    let err = graph.add_edge(&registry, "db", "web").unwrap_err();
    match err {
        CatalogError::CycleDetected { from, to, path } => {
            assert_eq!(from, "db");
            assert_eq!(to, "web");
            assert_eq!(path.first().map(String::as_str), Some("db"));
            assert_eq!(path.get(1).map(String::as_str), Some("web"));
            assert_eq!(path.last().map(String::as_str), Some("db"));
        }
        other => panic!("expected cycle, got {other:?}"),
    }

    // Removing an edge on the path makes the same insertion legal
    assert!(graph.remove_edge("web", "api"));
    assert!(graph.add_edge(&registry, "db", "web")?);
    assert_eq!(graph.detect_cycle(), None);
    Ok(())
}

#[test]
fn test_remove_service_drops_its_edges() -> Result<()> {
    let (_, mut graph) = create_layered_graph()?;

    graph.remove_service("cache");
    assert_eq!(graph.dependencies("api"), vec!["auth"]);
    assert_eq!(graph.dependents("db"), vec!["auth"]);
    assert_eq!(graph.edge_count(), 3);
    Ok(())
}
