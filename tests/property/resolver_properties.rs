//! Property tests for dependency resolution
//!
//! Invariants that must hold for any acyclic or cyclic requires graph.

use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;

use modkit::module::registry::{Manifest, ModuleDependencies};
use modkit::ModuleError;

fn module(name: &str, requires: &[String]) -> Manifest {
    let mut raw = Map::new();
    raw.insert("path".to_string(), Value::String(format!("/modules/{}", name)));
    raw.insert("entry".to_string(), Value::String(format!("{}::Module", name)));
    raw.insert(
        "requires".to_string(),
        Value::Object(
            requires
                .iter()
                .map(|r| (r.clone(), Value::String("*".to_string())))
                .collect(),
        ),
    );
    Manifest::normalize(name, &raw, true).unwrap()
}

/// Random DAG: module `i` may only require modules with a smaller index
fn dag() -> impl Strategy<Value = Vec<Manifest>> {
    (1usize..24)
        .prop_flat_map(|n| {
            prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..4), n)
        })
        .prop_map(|edges| {
            edges
                .iter()
                .enumerate()
                .map(|(i, targets)| {
                    let requires: Vec<String> = if i == 0 {
                        Vec::new()
                    } else {
                        targets.iter().map(|t| format!("m{}", t.index(i))).collect()
                    };
                    module(&format!("m{}", i), &requires)
                })
                .rev()
                .collect()
        })
}

proptest! {
    #[test]
    fn test_order_respects_every_edge(modules in dag()) {
        let order = ModuleDependencies::resolve_order(&modules).unwrap();

        // A permutation of the input
        prop_assert_eq!(order.len(), modules.len());
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        prop_assert_eq!(position.len(), modules.len());

        // Every module after everything it requires
        for m in &modules {
            for dep in m.required_modules() {
                prop_assert!(position[dep] < position[m.name.as_str()],
                    "{} placed before its dependency {}", m.name, dep);
            }
        }
    }

    #[test]
    fn test_ring_always_fails(n in 1usize..16) {
        let modules: Vec<Manifest> = (0..n)
            .map(|i| module(&format!("m{}", i), &[format!("m{}", (i + 1) % n)]))
            .collect();

        match ModuleDependencies::resolve_order(&modules) {
            Err(ModuleError::CircularDependency(cycle)) => {
                prop_assert!(cycle.starts_with("m0"));
                prop_assert!(cycle.ends_with("m0"));
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_deterministic(modules in dag()) {
        let first = ModuleDependencies::resolve_order(&modules).unwrap();
        let second = ModuleDependencies::resolve_order(&modules).unwrap();
        prop_assert_eq!(first, second);
    }
}
