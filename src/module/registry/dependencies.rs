//! Module dependency ordering
//!
//! Determines the order modules are initialized in (dependencies first) and
//! rejects cyclic dependency graphs.

use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

use crate::module::traits::ModuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Topological sort of `name -> dependency names`.
    ///
    /// Depth-first, post-order: every dependency precedes its dependents,
    /// independent modules keep the graph's insertion order. Dependency names
    /// that are not keys of the graph are leaves. A cycle fails with
    /// [`ModuleError::CyclicDependency`] naming every module on it.
    ///
    /// The walk keeps its own stack, so chain depth is bounded by memory
    /// rather than by the thread stack.
    pub fn topological_sort(
        graph: &IndexMap<String, Vec<String>>,
    ) -> Result<Vec<String>, ModuleError> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        // (node, index of the next dependency to visit)
        let mut stack: Vec<(&str, usize)> = Vec::new();
        let mut result = Vec::with_capacity(graph.len());

        for root in graph.keys() {
            if marks.contains_key(root.as_str()) {
                continue;
            }
            marks.insert(root.as_str(), Mark::InProgress);
            stack.push((root.as_str(), 0));

            while let Some(&(node, next)) = stack.last() {
                let deps = graph.get(node).map(Vec::as_slice).unwrap_or(&[]);
                let Some(dep) = deps.get(next) else {
                    stack.pop();
                    marks.insert(node, Mark::Done);
                    result.push(node.to_string());
                    continue;
                };

                let top = stack.len() - 1;
                stack[top].1 += 1;

                let dep = dep.as_str();
                match marks.get(dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        let start = stack.iter().position(|(n, _)| *n == dep).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                        cycle.push(dep.to_string());
                        return Err(ModuleError::CyclicDependency { cycle });
                    }
                    None => {
                        marks.insert(dep, Mark::InProgress);
                        stack.push((dep, 0));
                    }
                }
            }
        }

        debug!("Dependency order: {:?}", result);
        Ok(result)
    }

    /// Reverse of [`ModuleDependencies::topological_sort`], for teardown
    pub fn teardown_order(
        graph: &IndexMap<String, Vec<String>>,
    ) -> Result<Vec<String>, ModuleError> {
        let mut order = Self::topological_sort(graph)?;
        order.reverse();
        Ok(order)
    }
}
