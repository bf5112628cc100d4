//! The [`Graph`] container.
//!
//! Nodes live in a `Vec` in declaration order with an Fx-hashed id index next to it, so lookups
//! are O(1) and iteration order never depends on hashing.

use crate::{Direction, Edge, Node, NodeShape, Subgraph};
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphRepr")]
pub struct Graph {
    direction: Direction,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    subgraphs: Vec<Subgraph>,

    #[serde(skip)]
    node_index: HashMap<String, usize>,
    #[serde(skip)]
    subgraph_index: HashMap<String, usize>,
    /// Node id -> innermost subgraph index.
    #[serde(skip)]
    membership: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct GraphRepr {
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    subgraphs: Vec<Subgraph>,
}

impl From<GraphRepr> for Graph {
    fn from(repr: GraphRepr) -> Self {
        let mut g = Graph::new(repr.direction);
        for node in repr.nodes {
            g.add_node(node);
        }
        for edge in repr.edges {
            g.add_edge(edge);
        }
        for sg in repr.subgraphs {
            let members = sg.members.clone();
            let ix = g.push_subgraph(Subgraph {
                members: Vec::new(),
                ..sg
            });
            for m in members {
                g.add_member(ix, &m);
            }
        }
        g
    }
}

impl Graph {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts `node`, or merges it into the existing node with the same id.
    ///
    /// A merge only fills in missing information: the label is replaced when the existing one is
    /// empty or just echoes the id, the shape when the existing one is the default rectangle, and
    /// compartments when none were recorded yet. Returns the node's index.
    pub fn add_node(&mut self, node: Node) -> usize {
        if let Some(&ix) = self.node_index.get(node.id.as_str()) {
            let existing = &mut self.nodes[ix];
            let label_is_placeholder = existing.label.is_empty() || existing.label == existing.id;
            if label_is_placeholder && !node.label.is_empty() {
                existing.label = node.label;
            }
            if existing.shape == NodeShape::Rect && node.shape != NodeShape::Rect {
                existing.shape = node.shape;
            }
            if existing.compartments.is_empty() && !node.compartments.is_empty() {
                existing.compartments = node.compartments;
            }
            return ix;
        }
        let ix = self.nodes.len();
        self.node_index.insert(node.id.clone(), ix);
        self.nodes.push(node);
        ix
    }

    /// Returns the index of `id`, creating a plain node labelled with its id if missing.
    pub fn ensure_node(&mut self, id: &str) -> usize {
        match self.node_index.get(id) {
            Some(&ix) => ix,
            None => self.add_node(Node::plain(id)),
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|ix| &self.nodes[ix])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        let ix = self.node_index(id)?;
        Some(&mut self.nodes[ix])
    }

    pub fn node_at(&self, ix: usize) -> Option<&Node> {
        self.nodes.get(ix)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access for geometry writes. Ids must not be changed through this slice.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// Appends `edge`, creating plain nodes for endpoints that do not exist yet.
    pub fn add_edge(&mut self, edge: Edge) -> usize {
        self.ensure_node(&edge.from);
        self.ensure_node(&edge.to);
        self.edges.push(edge);
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// Declares a subgraph. Re-declaring an existing id returns its index and keeps its members;
    /// a non-empty title replaces the stored one.
    pub fn add_subgraph(&mut self, subgraph: Subgraph) -> usize {
        if let Some(&ix) = self.subgraph_index.get(subgraph.id.as_str()) {
            let existing = &mut self.subgraphs[ix];
            if !subgraph.title.is_empty() {
                existing.title = subgraph.title;
            }
            if subgraph.direction.is_some() {
                existing.direction = subgraph.direction;
            }
            return ix;
        }
        self.push_subgraph(subgraph)
    }

    fn push_subgraph(&mut self, subgraph: Subgraph) -> usize {
        let ix = self.subgraphs.len();
        self.subgraph_index.insert(subgraph.id.clone(), ix);
        self.subgraphs.push(subgraph);
        ix
    }

    /// Places `node_id` directly inside subgraph `ix`, creating the node if needed.
    ///
    /// A node has one innermost subgraph; the latest placement wins and removes the node from
    /// the member list of its previous subgraph. Out-of-range indices are ignored.
    pub fn add_member(&mut self, ix: usize, node_id: &str) {
        if ix >= self.subgraphs.len() {
            return;
        }
        self.ensure_node(node_id);
        if let Some(prev) = self.membership.insert(node_id.to_string(), ix) {
            if prev == ix {
                return;
            }
            self.subgraphs[prev].members.retain(|m| m != node_id);
        }
        self.subgraphs[ix].members.push(node_id.to_string());
    }

    pub fn subgraphs(&self) -> &[Subgraph] {
        &self.subgraphs
    }

    pub fn subgraphs_mut(&mut self) -> &mut [Subgraph] {
        &mut self.subgraphs
    }

    pub fn subgraph(&self, id: &str) -> Option<&Subgraph> {
        self.subgraph_index(id).map(|ix| &self.subgraphs[ix])
    }

    pub fn subgraph_index(&self, id: &str) -> Option<usize> {
        self.subgraph_index.get(id).copied()
    }

    /// Innermost subgraph containing `node_id`.
    pub fn parent_of(&self, node_id: &str) -> Option<usize> {
        self.membership.get(node_id).copied()
    }

    /// All subgraphs containing `node_id`, innermost first.
    pub fn subgraphs_of(&self, node_id: &str) -> Vec<usize> {
        let mut out = Vec::new();
        let mut cur = self.parent_of(node_id);
        while let Some(ix) = cur {
            // Guards against a malformed parent chain from deserialized input.
            if out.contains(&ix) {
                break;
            }
            out.push(ix);
            cur = self.subgraphs[ix].parent;
        }
        out
    }

    /// Direct child subgraphs of subgraph `ix`, in declaration order.
    pub fn child_subgraphs(&self, ix: usize) -> impl Iterator<Item = usize> + '_ {
        self.subgraphs
            .iter()
            .enumerate()
            .filter(move |(_, sg)| sg.parent == Some(ix))
            .map(|(i, _)| i)
    }

    /// Nesting depth of subgraph `ix` (top-level subgraphs are depth 0).
    pub fn subgraph_depth(&self, ix: usize) -> usize {
        let mut depth = 0;
        let mut cur = self.subgraphs.get(ix).and_then(|sg| sg.parent);
        while let Some(p) = cur {
            depth += 1;
            if depth > self.subgraphs.len() {
                break;
            }
            cur = self.subgraphs[p].parent;
        }
        depth
    }

    /// Builds a compact in/out adjacency index over the current edge list.
    pub fn adjacency(&self) -> Adjacency {
        let n = self.nodes.len();
        let mut out_count = vec![0usize; n + 1];
        let mut in_count = vec![0usize; n + 1];
        let mut ends = Vec::with_capacity(self.edges.len());
        for e in &self.edges {
            let (Some(v), Some(w)) = (self.node_index(&e.from), self.node_index(&e.to)) else {
                ends.push(None);
                continue;
            };
            out_count[v + 1] += 1;
            in_count[w + 1] += 1;
            ends.push(Some((v, w)));
        }
        for i in 0..n {
            out_count[i + 1] += out_count[i];
            in_count[i + 1] += in_count[i];
        }
        let mut out_edges = vec![0usize; out_count[n]];
        let mut in_edges = vec![0usize; in_count[n]];
        let mut out_fill = out_count.clone();
        let mut in_fill = in_count.clone();
        for (edge_ix, end) in ends.iter().enumerate() {
            let Some((v, w)) = *end else { continue };
            out_edges[out_fill[v]] = edge_ix;
            out_fill[v] += 1;
            in_edges[in_fill[w]] = edge_ix;
            in_fill[w] += 1;
        }
        Adjacency {
            ends,
            out_offsets: out_count,
            out_edges,
            in_offsets: in_count,
            in_edges,
        }
    }

    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from.as_str())
            .collect()
    }
}

/// Snapshot of edge incidence by node index. Edge lists keep declaration order.
#[derive(Debug, Clone)]
pub struct Adjacency {
    ends: Vec<Option<(usize, usize)>>,
    out_offsets: Vec<usize>,
    out_edges: Vec<usize>,
    in_offsets: Vec<usize>,
    in_edges: Vec<usize>,
}

impl Adjacency {
    pub fn out_edges(&self, v: usize) -> &[usize] {
        &self.out_edges[self.out_offsets[v]..self.out_offsets[v + 1]]
    }

    pub fn in_edges(&self, v: usize) -> &[usize] {
        &self.in_edges[self.in_offsets[v]..self.in_offsets[v + 1]]
    }

    /// `(from, to)` node indices of edge `edge_ix`.
    pub fn ends(&self, edge_ix: usize) -> Option<(usize, usize)> {
        self.ends.get(edge_ix).copied().flatten()
    }

    pub fn successors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges(v)
            .iter()
            .filter_map(|&e| self.ends(e).map(|(_, w)| w))
    }

    pub fn predecessors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.in_edges(v)
            .iter()
            .filter_map(|&e| self.ends(e).map(|(u, _)| u))
    }
}
