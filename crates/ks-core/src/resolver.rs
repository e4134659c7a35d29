//! Path resolution: from the current version and a target specification to a
//! deterministic ordered list of segments.

use crate::error::{CoreError, CoreResult};
use crate::graph::PatchGraph;
use petgraph::graph::NodeIndex;

/// The requested destination: an exact version or a wildcard prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Exact(String),
    /// Matches every version starting with the prefix; `"1.0.*"` is parsed
    /// as `Wildcard("1.0.")`.
    Wildcard(String),
}

impl TargetSpec {
    pub fn parse(text: &str) -> TargetSpec {
        match text.strip_suffix('*') {
            Some(prefix) => TargetSpec::Wildcard(prefix.to_string()),
            None => TargetSpec::Exact(text.to_string()),
        }
    }

    pub fn matches(&self, version: &str) -> bool {
        match self {
            TargetSpec::Exact(v) => version == v,
            TargetSpec::Wildcard(prefix) => version.starts_with(prefix.as_str()),
        }
    }
}

impl std::fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetSpec::Exact(v) => write!(f, "{v}"),
            TargetSpec::Wildcard(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Segment indices in execution order; adjacent segments chain
    /// contiguously.
    Path(Vec<usize>),
    /// The database is already at a version matching the target spec.
    AlreadyAtTarget(String),
}

fn current_display(current: Option<&str>) -> String {
    match current {
        Some(v) => format!("\"{v}\""),
        None => "no version".to_string(),
    }
}

fn path_not_found(current: Option<&str>, target: &str) -> CoreError {
    CoreError::PathNotFound {
        current: current_display(current),
        target: target.to_string(),
    }
}

/// Resolve a target spec against the graph. Never retried automatically: a
/// path-not-found error is final for this invocation.
pub fn resolve(
    graph: &PatchGraph,
    current: Option<&str>,
    spec: &TargetSpec,
) -> CoreResult<Resolution> {
    match spec {
        TargetSpec::Exact(target) => {
            if current == Some(target.as_str()) {
                return Ok(Resolution::AlreadyAtTarget(target.clone()));
            }
            let path = find_path(graph, current, target)
                .ok_or_else(|| path_not_found(current, target))?;
            Ok(Resolution::Path(path))
        }
        TargetSpec::Wildcard(_) => {
            // Deterministic pick: the greatest matching version of the whole
            // reachable frontier, never the first discovered.
            let mut candidates: Vec<String> = reachable_versions(graph, current)
                .into_iter()
                .filter(|v| spec.matches(v))
                .collect();
            if let Some(cur) = current {
                if spec.matches(cur) {
                    candidates.push(cur.to_string());
                }
            }
            let best = candidates
                .into_iter()
                .max()
                .ok_or_else(|| path_not_found(current, &spec.to_string()))?;
            if current == Some(best.as_str()) {
                return Ok(Resolution::AlreadyAtTarget(best));
            }
            let path = find_path(graph, current, &best)
                .ok_or_else(|| path_not_found(current, &best))?;
            Ok(Resolution::Path(path))
        }
    }
}

/// All versions reachable from `current` (excluding it), as a stable
/// insertion-ordered set in BFS order with declaration-ordered edges. Used to
/// prompt a human when no target spec was given.
pub fn reachable_versions(graph: &PatchGraph, current: Option<&str>) -> Vec<String> {
    let Some(start) = graph.node(current) else {
        return Vec::new();
    };

    let mut order: Vec<String> = Vec::new();
    let mut visited: Vec<NodeIndex> = vec![start];
    let mut queue: std::collections::VecDeque<NodeIndex> = [start].into();

    while let Some(node) = queue.pop_front() {
        for (_, next) in graph.outgoing(node) {
            if !visited.contains(&next) {
                visited.push(next);
                if let Some(version) = graph.version_of(next) {
                    order.push(version.to_string());
                }
                queue.push_back(next);
            }
        }
    }

    order
}

/// Find the best simple path from `current` to `target`.
///
/// Enumerates simple paths (a path never revisits a version) and picks the
/// one with the fewest branch segments, then the fewest segments, then the
/// first discovered in declaration order — so a path using no branch always
/// wins over one using a branch.
fn find_path(graph: &PatchGraph, current: Option<&str>, target: &str) -> Option<Vec<usize>> {
    let start = graph.node(current)?;
    let goal = graph.node(Some(target))?;

    let mut best: Option<(usize, usize, Vec<usize>)> = None;
    let mut path: Vec<usize> = Vec::new();
    let mut visited: Vec<NodeIndex> = vec![start];

    fn dfs(
        graph: &PatchGraph,
        node: NodeIndex,
        goal: NodeIndex,
        path: &mut Vec<usize>,
        visited: &mut Vec<NodeIndex>,
        best: &mut Option<(usize, usize, Vec<usize>)>,
    ) {
        if node == goal {
            let branches = path
                .iter()
                .filter(|&&seg| graph.segment(seg).branch.is_some())
                .count();
            let better = match best {
                Some((b, len, _)) => (branches, path.len()) < (*b, *len),
                None => true,
            };
            if better {
                *best = Some((branches, path.len(), path.clone()));
            }
            return;
        }
        for (segment, next) in graph.outgoing(node) {
            if visited.contains(&next) {
                continue;
            }
            visited.push(next);
            path.push(segment);
            dfs(graph, next, goal, path, visited, best);
            path.pop();
            visited.pop();
        }
    }

    dfs(graph, start, goal, &mut path, &mut visited, &mut best);
    best.map(|(_, _, path)| path)
}

#[cfg(test)]
#[path = "resolver_test.rs"]
mod tests;
