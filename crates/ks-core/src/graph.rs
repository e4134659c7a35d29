//! The patch graph: upgrade segments as edges between version nodes.

use crate::error::{CoreError, CoreResult};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Segment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Bootstraps the version-tracking state; its source is "no version yet".
    Init,
    /// An ordinary upgrade step between two declared versions.
    Upgrade,
}

impl SegmentKind {
    /// The block keyword for this kind, as it appears in the upgrade file.
    pub fn keyword(&self) -> &'static str {
        match self {
            SegmentKind::Init => "INIT",
            SegmentKind::Upgrade => "UPGRADE",
        }
    }
}

/// The line range of a segment body: `start` is the first body line, `end`
/// the line of the closing marker (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// One upgrade segment: a directed edge between two versions with an ordered
/// command body that is read lazily during execution.
#[derive(Debug, Clone)]
pub struct Segment {
    /// `None` means "no version yet" (INIT segments only).
    pub source: Option<String>,
    pub target: String,
    pub kind: SegmentKind,
    /// Branch id when the segment was declared inside a BRANCH group.
    pub branch: Option<String>,
    /// Line of the declaration in the definition section.
    pub declared_at: usize,
    pub body: LineRange,
}

impl Segment {
    /// `"a" --> "b"` display form used in messages and errors.
    pub fn pair_display(&self) -> String {
        pair_display(self.source.as_deref(), &self.target)
    }
}

/// Format a (source, target) pair the way the upgrade file writes it.
pub fn pair_display(source: Option<&str>, target: &str) -> String {
    format!("\"{}\" --> \"{}\"", source.unwrap_or(""), target)
}

/// The parsed, read-only graph of upgrade segments.
///
/// Nodes are versions (with a synthetic `None` root for INIT sources); each
/// edge carries the index of its segment. Built once per run by
/// [`crate::file::UpgradeFile::scan`].
#[derive(Debug)]
pub struct PatchGraph {
    segments: Vec<Segment>,
    graph: DiGraph<Option<String>, usize>,
    node_map: HashMap<Option<String>, NodeIndex>,
}

impl PatchGraph {
    /// Build the graph from scanned segments. Duplicate (source, target)
    /// pairs have already been rejected by the scan.
    pub(crate) fn build(segments: Vec<Segment>) -> CoreResult<Self> {
        let mut graph: DiGraph<Option<String>, usize> = DiGraph::new();
        let mut node_map: HashMap<Option<String>, NodeIndex> = HashMap::new();

        for (idx, segment) in segments.iter().enumerate() {
            let from = *node_map
                .entry(segment.source.clone())
                .or_insert_with(|| graph.add_node(segment.source.clone()));
            let to = *node_map
                .entry(Some(segment.target.clone()))
                .or_insert_with(|| graph.add_node(Some(segment.target.clone())));
            if from == to {
                return Err(CoreError::malformed(
                    segment.declared_at,
                    format!("segment {} upgrades a version to itself", segment.pair_display()),
                ));
            }
            graph.add_edge(from, to, idx);
        }

        Ok(Self {
            segments,
            graph,
            node_map,
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> &Segment {
        &self.segments[index]
    }

    /// Whether the version (or the null root) appears in the graph.
    pub fn contains_version(&self, version: Option<&str>) -> bool {
        self.node_map.contains_key(&version.map(str::to_string))
    }

    pub(crate) fn node(&self, version: Option<&str>) -> Option<NodeIndex> {
        self.node_map.get(&version.map(str::to_string)).copied()
    }

    pub(crate) fn version_of(&self, node: NodeIndex) -> Option<&str> {
        self.graph[node].as_deref()
    }

    /// Outgoing segments of a node in declaration order.
    ///
    /// petgraph iterates edges most-recently-added first, so the collected
    /// list is reversed to restore declaration order.
    pub(crate) fn outgoing(&self, node: NodeIndex) -> Vec<(usize, NodeIndex)> {
        let mut edges: Vec<(usize, NodeIndex)> = self
            .graph
            .edges(node)
            .map(|e| (*e.weight(), e.target()))
            .collect();
        edges.reverse();
        edges
    }
}
