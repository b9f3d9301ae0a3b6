// src/registry/graph.rs

//! Dependency graph checks over the registry.
//!
//! Edge direction follows the data model: `task -> dependency`. Pure
//! functions, no IO.

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::registry::task::Task;
use crate::types::TaskName;

/// Would adding the edge `task -> depends_on` close a cycle?
///
/// Depth-first traversal from `depends_on` along existing dependency edges;
/// the new edge creates a cycle iff `task` is reachable. Self-edges are the
/// caller's concern and are reported as a cycle here too.
pub fn would_create_cycle(
    tasks: &BTreeMap<TaskName, Task>,
    task: &str,
    depends_on: &str,
) -> bool {
    let mut stack: Vec<&str> = vec![depends_on];
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(name) = stack.pop() {
        if name == task {
            return true;
        }
        if !visited.insert(name) {
            continue;
        }
        if let Some(info) = tasks.get(name) {
            stack.extend(info.dependencies.iter().map(|d| d.as_str()));
        }
    }

    false
}

/// Topological order of the whole registry (dependencies first), or the name
/// of a task involved in a cycle.
pub fn topological_order(tasks: &BTreeMap<TaskName, Task>) -> Result<Vec<TaskName>, TaskName> {
    // Edge direction here is dep -> task so the sort yields dependencies first.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in tasks.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in tasks.iter() {
        for dep in task.dependencies.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(|s| s.to_string()).collect()),
        Err(cycle) => Err(cycle.node_id().to_string()),
    }
}

/// Names of tasks that list `name` as a direct dependency.
pub fn dependents_of<'a>(
    tasks: &'a BTreeMap<TaskName, Task>,
    name: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    tasks
        .values()
        .filter(move |t| t.dependencies.contains(name))
        .map(|t| t.name.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::Priority;

    fn tasks(edges: &[(&str, &str)], names: &[&str]) -> BTreeMap<TaskName, Task> {
        let mut map = BTreeMap::new();
        for n in names {
            map.insert(n.to_string(), Task::new(*n, "true", Priority::Medium, Utc::now()));
        }
        for (task, dep) in edges {
            map.get_mut(*task).unwrap().dependencies.insert(dep.to_string());
        }
        map
    }

    #[test]
    fn detects_direct_back_edge() {
        let t = tasks(&[("B", "A")], &["A", "B"]);
        assert!(would_create_cycle(&t, "A", "B"));
        assert!(!would_create_cycle(&t, "B", "A"));
    }

    #[test]
    fn detects_transitive_cycle() {
        // C -> B -> A; adding A -> C closes the loop.
        let t = tasks(&[("C", "B"), ("B", "A")], &["A", "B", "C"]);
        assert!(would_create_cycle(&t, "A", "C"));
        assert!(!would_create_cycle(&t, "C", "A"));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let t = tasks(&[("B", "A"), ("C", "A")], &["A", "B", "C", "D"]);
        assert!(!would_create_cycle(&t, "D", "B"));
        let mut t = t;
        t.get_mut("D").unwrap().dependencies.insert("B".into());
        assert!(!would_create_cycle(&t, "D", "C"));
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let t = tasks(&[("C", "B"), ("B", "A")], &["A", "B", "C"]);
        assert_eq!(topological_order(&t).unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn topological_order_reports_cycle() {
        let t = tasks(&[("A", "B"), ("B", "A")], &["A", "B"]);
        let culprit = topological_order(&t).unwrap_err();
        assert!(culprit == "A" || culprit == "B");
    }

    #[test]
    fn dependents_lists_direct_children() {
        let t = tasks(&[("B", "A"), ("C", "A"), ("D", "B")], &["A", "B", "C", "D"]);
        let mut deps: Vec<_> = dependents_of(&t, "A").collect();
        deps.sort();
        assert_eq!(deps, vec!["B", "C"]);
    }
}
