//! Undirected network representation shared by samplers and scorers.
//!
//! Samples keep the node identifiers of the graph they were drawn from, so a
//! scorer can relate a sample back to its source.

use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::UnGraphMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::BufRead;

use crate::errors::{NsError, NsResult};

/// Node identifier as it appears in edge lists.
pub type NodeId = u64;

/// Undirected simple graph with an optional name.
#[derive(Clone)]
pub struct Graph {
    name: Option<String>,
    inner: UnGraphMap<NodeId, ()>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            name: None,
            inner: UnGraphMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build a graph from `(u, v)` pairs. Self-loops are dropped.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = Self::new();
        for (u, v) in edges {
            graph.add_edge(u, v);
        }
        graph
    }

    /// Parse a whitespace separated edge list.
    ///
    /// Each non-empty line holds two node ids; any further columns (weights,
    /// timestamps) are ignored. Lines starting with `#` or `%` are comments.
    pub fn from_edge_list<R: BufRead>(reader: R) -> NsResult<Self> {
        let mut graph = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') {
                continue;
            }

            let mut fields = trimmed.split(|c: char| c.is_whitespace() || c == ',');
            let mut next_id = |label: &str| -> NsResult<NodeId> {
                let raw = fields
                    .by_ref()
                    .find(|f| !f.is_empty())
                    .ok_or_else(|| NsError::Parse {
                        line: idx + 1,
                        message: format!("missing {label} node"),
                    })?;
                raw.parse::<NodeId>().map_err(|e| NsError::Parse {
                    line: idx + 1,
                    message: format!("invalid {label} node '{raw}': {e}"),
                })
            };

            let u = next_id("source")?;
            let v = next_id("target")?;
            if u == v {
                graph.add_node(u);
            } else {
                graph.add_edge(u, v);
            }
        }

        Ok(graph)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.inner.add_node(node);
    }

    /// Insert an undirected edge, adding missing endpoints. Self-loops are ignored.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) {
        if u == v {
            self.inner.add_node(u);
            return;
        }
        self.inner.add_edge(u, v, ());
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.inner.contains_node(node)
    }

    pub fn contains_edge(&self, u: NodeId, v: NodeId) -> bool {
        self.inner.contains_edge(u, v)
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.inner.nodes().collect();
        nodes.sort_unstable();
        nodes
    }

    /// Neighbours of `node` in ascending order; empty when the node is absent.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        if !self.inner.contains_node(node) {
            return Vec::new();
        }
        let mut out: Vec<NodeId> = self.inner.neighbors(node).collect();
        out.sort_unstable();
        out
    }

    pub fn degree(&self, node: NodeId) -> usize {
        if !self.inner.contains_node(node) {
            return 0;
        }
        self.inner.neighbors(node).count()
    }

    /// All edges as `(min, max)` pairs in ascending order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .inner
            .all_edges()
            .map(|(a, b, _)| if a <= b { (a, b) } else { (b, a) })
            .collect();
        edges.sort_unstable();
        edges
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Subgraph on `nodes` containing every edge of `self` between them.
    /// Ids not present in `self` are skipped.
    pub fn induced_subgraph<'a, I>(&self, nodes: I) -> Graph
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        let keep: BTreeSet<NodeId> = nodes
            .into_iter()
            .copied()
            .filter(|n| self.inner.contains_node(*n))
            .collect();

        let mut sub = Graph::new();
        for &node in &keep {
            sub.add_node(node);
        }
        for &node in &keep {
            for neighbor in self.neighbors(node) {
                if neighbor > node && keep.contains(&neighbor) {
                    sub.add_edge(node, neighbor);
                }
            }
        }
        sub
    }

    /// Edge density `2m / (n (n - 1))`; zero for graphs with fewer than two nodes.
    pub fn density(&self) -> f64 {
        let n = self.node_count() as f64;
        if n < 2.0 {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / (n * (n - 1.0))
    }

    pub fn average_degree(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / n as f64
    }

    /// Count of nodes per degree, indexed by degree.
    pub fn degree_histogram(&self) -> Vec<usize> {
        let mut histogram = Vec::new();
        for node in self.inner.nodes() {
            let degree = self.degree(node);
            if histogram.len() <= degree {
                histogram.resize(degree + 1, 0);
            }
            histogram[degree] += 1;
        }
        histogram
    }

    /// Local clustering coefficient of one node.
    pub fn clustering(&self, node: NodeId) -> f64 {
        let neighbors = self.neighbors(node);
        let k = neighbors.len();
        if k < 2 {
            return 0.0;
        }
        let mut links = 0usize;
        for (i, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[i + 1..] {
                if self.inner.contains_edge(a, b) {
                    links += 1;
                }
            }
        }
        2.0 * links as f64 / (k * (k - 1)) as f64
    }

    /// Mean local clustering coefficient over all nodes.
    pub fn average_clustering(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = self.inner.nodes().map(|node| self.clustering(node)).sum();
        total / n as f64
    }

    /// Connected components, each sorted, ordered by their smallest node.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut components = kosaraju_scc(&self.inner);
        for component in &mut components {
            component.sort_unstable();
        }
        components.sort_unstable_by_key(|component| component.first().copied());
        components
    }

    /// Degree of every node, keyed by node id.
    pub fn degrees(&self) -> BTreeMap<NodeId, usize> {
        self.inner
            .nodes()
            .map(|node| (node, self.degree(node)))
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(
                f,
                "{name} ({} nodes, {} edges)",
                self.node_count(),
                self.edge_count()
            ),
            None => write!(f, "graph ({} nodes, {} edges)", self.node_count(), self.edge_count()),
        }
    }
}
