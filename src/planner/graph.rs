//! Validated dependency structure of a plan, indexed by node position.
//!
//! Two edge sets are kept. Direct `depends_on` edges drive skip propagation.
//! The wait set adds join barriers: a node that depends on a member of a
//! different join group waits for every node in that group.

use crate::error::PlanningError;
use std::collections::{BTreeMap, BTreeSet};

/// Borrowed view of the fields the graph needs from a plan node.
#[derive(Debug, Clone, Copy)]
pub struct GraphNode<'a> {
    pub id: &'a str,
    pub depends_on: &'a [String],
    pub join_key: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanGraph {
    dependencies: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    wait_for: Vec<Vec<usize>>,
    order: Vec<usize>,
}

fn invalid(message: String) -> PlanningError {
    PlanningError::InvalidGraph(message)
}

impl PlanGraph {
    pub fn build(nodes: &[GraphNode<'_>]) -> Result<Self, PlanningError> {
        let index = index_nodes(nodes)?;
        let dependencies = resolve_dependencies(nodes, &index)?;

        let mut dependents = vec![Vec::new(); nodes.len()];
        for (node, deps) in dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(node);
            }
        }
        if let Some(path) = find_cycle(&dependents) {
            let names: Vec<&str> = path.iter().map(|&i| nodes[i].id).collect();
            return Err(invalid(format!("cycle detected: {}", names.join(" -> "))));
        }

        let wait_for = join_barriers(nodes, &dependencies);
        let mut waiters = vec![Vec::new(); nodes.len()];
        for (node, waits) in wait_for.iter().enumerate() {
            for &w in waits {
                waiters[w].push(node);
            }
        }
        if let Some(path) = find_cycle(&waiters) {
            let names: Vec<&str> = path.iter().map(|&i| nodes[i].id).collect();
            return Err(invalid(format!(
                "cycle detected through join barrier: {}",
                names.join(" -> ")
            )));
        }

        let order = topological_order(&wait_for, &waiters);
        Ok(Self {
            dependencies,
            dependents,
            wait_for,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Direct `depends_on` edges of `node`.
    pub fn dependencies(&self, node: usize) -> &[usize] {
        &self.dependencies[node]
    }

    pub fn dependents(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    /// Nodes that must finish before `node` may start, including join peers.
    pub fn wait_for(&self, node: usize) -> &[usize] {
        &self.wait_for[node]
    }

    /// Dependency-respecting order; ties keep plan position.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Every node reachable from `roots` through wait edges, roots included.
    pub fn downstream_closure(&self, roots: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        let mut waiters = vec![Vec::new(); self.len()];
        for (node, waits) in self.wait_for.iter().enumerate() {
            for &w in waits {
                waiters[w].push(node);
            }
        }
        let mut seen = BTreeSet::new();
        let mut queue: Vec<usize> = roots.into_iter().collect();
        while let Some(node) = queue.pop() {
            if seen.insert(node) {
                queue.extend(waiters[node].iter().copied());
            }
        }
        seen
    }
}

fn index_nodes<'a>(nodes: &[GraphNode<'a>]) -> Result<BTreeMap<&'a str, usize>, PlanningError> {
    let mut index = BTreeMap::new();
    for (position, node) in nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(invalid("node id cannot be empty".to_string()));
        }
        if index.insert(node.id, position).is_some() {
            return Err(invalid(format!("duplicate node id: {}", node.id)));
        }
    }
    Ok(index)
}

fn resolve_dependencies(
    nodes: &[GraphNode<'_>],
    index: &BTreeMap<&str, usize>,
) -> Result<Vec<Vec<usize>>, PlanningError> {
    let mut resolved = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut deps = Vec::with_capacity(node.depends_on.len());
        let mut seen = BTreeSet::new();
        for dep in node.depends_on {
            let Some(&position) = index.get(dep.as_str()) else {
                let known = index.keys().copied().collect::<Vec<_>>().join(", ");
                return Err(invalid(format!(
                    "node {} depends on unknown node {dep} (known nodes: [{known}])",
                    node.id
                )));
            };
            if dep == node.id {
                return Err(invalid(format!("node {} depends on itself", node.id)));
            }
            if !seen.insert(position) {
                return Err(invalid(format!("duplicate dependency: {dep} -> {}", node.id)));
            }
            deps.push(position);
        }
        resolved.push(deps);
    }
    Ok(resolved)
}

fn join_barriers(nodes: &[GraphNode<'_>], dependencies: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (position, node) in nodes.iter().enumerate() {
        groups.entry(node.join_key).or_default().push(position);
    }

    dependencies
        .iter()
        .enumerate()
        .map(|(node, deps)| {
            let mut waits: BTreeSet<usize> = deps.iter().copied().collect();
            for &dep in deps {
                let join_key = nodes[dep].join_key;
                if join_key != nodes[node].join_key
                    && let Some(peers) = groups.get(join_key)
                {
                    waits.extend(peers.iter().copied().filter(|&peer| peer != node));
                }
            }
            waits.into_iter().collect()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Visiting,
    Visited,
}

/// DFS over `edges` (node -> successors); returns the first cycle found.
fn find_cycle(edges: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut states = vec![None; edges.len()];
    let mut stack = Vec::new();
    (0..edges.len()).find_map(|node| {
        if states[node].is_some() {
            return None;
        }
        detect_cycle(node, edges, &mut states, &mut stack)
    })
}

fn detect_cycle(
    node: usize,
    edges: &[Vec<usize>],
    states: &mut [Option<NodeState>],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    states[node] = Some(NodeState::Visiting);
    stack.push(node);

    for &next in &edges[node] {
        match states[next] {
            Some(NodeState::Visiting) => {
                let start = stack.iter().position(|&entry| entry == next).unwrap_or(0);
                let mut cycle = stack[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Some(NodeState::Visited) => {}
            None => {
                if let Some(path) = detect_cycle(next, edges, states, stack) {
                    return Some(path);
                }
            }
        }
    }

    stack.pop();
    states[node] = Some(NodeState::Visited);
    None
}

fn topological_order(wait_for: &[Vec<usize>], waiters: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = wait_for.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = (0..wait_for.len())
        .filter(|&node| in_degree[node] == 0)
        .collect();

    let mut order = Vec::with_capacity(wait_for.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &waiter in &waiters[node] {
            in_degree[waiter] -= 1;
            if in_degree[waiter] == 0 {
                ready.insert(waiter);
            }
        }
    }
    order
}
