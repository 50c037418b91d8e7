//! Module dependency resolution
//!
//! Computes the load order for a set of validated modules from their
//! inter-module `requires` edges.

use std::collections::HashMap;
use tracing::debug;

use crate::module::registry::manifest::Manifest;
use crate::module::traits::ModuleError;

/// DFS marking of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Resolve the load order of `modules` (dependencies first)
    ///
    /// Only `requires` entries naming another module in `modules` are graph
    /// edges; host and runtime constraints, and dependencies outside the
    /// set, are ignored here. Independent modules keep their input order.
    pub fn resolve_order(modules: &[Manifest]) -> Result<Vec<String>, ModuleError> {
        let index: HashMap<&str, usize> = modules
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.as_str(), i))
            .collect();

        // Adjacency in manifest order (BTreeMap keys), restricted to the set
        let edges: Vec<Vec<usize>> = modules
            .iter()
            .map(|m| {
                m.required_modules()
                    .filter_map(|dep| index.get(dep).copied())
                    .collect()
            })
            .collect();

        let mut marks = vec![Mark::Unvisited; modules.len()];
        let mut order = Vec::with_capacity(modules.len());

        for root in 0..modules.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // Each frame is (node, next edge to look at)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::InProgress;

            while let Some(frame) = stack.last_mut() {
                let (node, next) = *frame;

                if let Some(&dep) = edges[node].get(next) {
                    frame.1 += 1;
                    match marks[dep] {
                        Mark::Done => {}
                        Mark::InProgress => {
                            return Err(ModuleError::CircularDependency(Self::describe_cycle(
                                modules, &stack, dep,
                            )));
                        }
                        Mark::Unvisited => {
                            marks[dep] = Mark::InProgress;
                            stack.push((dep, 0));
                        }
                    }
                } else {
                    marks[node] = Mark::Done;
                    order.push(modules[node].name.clone());
                    stack.pop();
                }
            }
        }

        debug!("Dependency resolution complete: {:?}", order);
        Ok(order)
    }

    /// Render the cycle closing at `dep` as `a -> b -> a`
    fn describe_cycle(modules: &[Manifest], stack: &[(usize, usize)], dep: usize) -> String {
        let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
        let mut names: Vec<&str> = stack[start..]
            .iter()
            .map(|(n, _)| modules[*n].name.as_str())
            .collect();
        names.push(modules[dep].name.as_str());
        names.join(" -> ")
    }
}
