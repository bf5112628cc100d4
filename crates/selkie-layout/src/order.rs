//! Phase 2: ordering within ranks.
//!
//! Edges spanning more than one rank are split by virtual slots so every segment joins
//! adjacent ranks. Ranks are then reordered by alternating barycenter sweeps and the layering
//! with the fewest crossings is kept. Members of a subgraph stay contiguous in every rank.

use crate::{Error, Result};
use rustc_hash::FxHashMap;
use selkie_graph::Graph;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A graph node; the payload is its index in `Graph::nodes()`.
    Node(usize),
    /// A point a long edge passes through; the payload is the edge index.
    Virtual(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub kind: SlotKind,
    pub rank: usize,
    /// Enclosing subgraphs, outermost first.
    pub clusters: Vec<usize>,
}

/// Slots per rank plus the segments between adjacent ranks.
///
/// Slot `i` for `i < node_count` is node `i`; virtual slots follow in edge order.
#[derive(Debug, Clone)]
pub struct Layering {
    pub slots: Vec<Slot>,
    /// Slot ids per rank, in their current order.
    pub ranks: Vec<Vec<usize>>,
    /// Per edge: slots from the upper endpoint down to the lower one. Self-loops and edges
    /// whose endpoints share a rank have just their two endpoints.
    pub chains: Vec<Vec<usize>>,
    upper: Vec<Vec<usize>>,
    lower: Vec<Vec<usize>>,
}

impl Layering {
    /// Builds the slot table for a ranked graph.
    ///
    /// Fails with [`Error::TooManyLayoutItems`] before allocating when nodes plus virtual
    /// slots exceed `limit`.
    pub fn build(graph: &Graph, limit: usize) -> Result<Self> {
        let node_rank = |ix: usize| graph.nodes()[ix].rank.unwrap_or(0);
        let ends: Vec<Option<(usize, usize)>> = graph
            .edges()
            .iter()
            .map(|e| Some((graph.node_index(&e.from)?, graph.node_index(&e.to)?)))
            .collect();

        let virtual_count = ends
            .iter()
            .flatten()
            .map(|&(u, w)| node_rank(u).abs_diff(node_rank(w)).saturating_sub(1))
            .fold(0usize, usize::saturating_add);
        let count = graph.node_count().saturating_add(virtual_count);
        if count > limit {
            return Err(Error::TooManyLayoutItems { count, limit });
        }

        let mut slots: Vec<Slot> = Vec::new();
        slots.try_reserve(count)?;
        let mut paths: Vec<Vec<usize>> = Vec::with_capacity(graph.node_count());
        for (ix, node) in graph.nodes().iter().enumerate() {
            let mut clusters = graph.subgraphs_of(&node.id);
            clusters.reverse();
            paths.push(clusters.clone());
            slots.push(Slot {
                kind: SlotKind::Node(ix),
                rank: node_rank(ix),
                clusters,
            });
        }

        let mut chains: Vec<Vec<usize>> = Vec::with_capacity(ends.len());
        for (edge_ix, end) in ends.iter().enumerate() {
            let Some(&(u, w)) = end.as_ref() else {
                chains.push(Vec::new());
                continue;
            };
            let (top, bottom) = if node_rank(u) <= node_rank(w) {
                (u, w)
            } else {
                (w, u)
            };
            let shared: Vec<usize> = paths[top]
                .iter()
                .zip(&paths[bottom])
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| *a)
                .collect();

            let mut chain = vec![top];
            for r in node_rank(top) + 1..node_rank(bottom) {
                chain.push(slots.len());
                slots.push(Slot {
                    kind: SlotKind::Virtual(edge_ix),
                    rank: r,
                    clusters: shared.clone(),
                });
            }
            chain.push(bottom);
            chains.push(chain);
        }

        let rank_count = slots.iter().map(|s| s.rank + 1).max().unwrap_or(1);
        let mut ranks: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (id, slot) in slots.iter().enumerate() {
            ranks[slot.rank].push(id);
        }

        let mut upper = vec![Vec::new(); slots.len()];
        let mut lower = vec![Vec::new(); slots.len()];
        for chain in &chains {
            for pair in chain.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                if a != b && slots[a].rank + 1 == slots[b].rank {
                    lower[a].push(b);
                    upper[b].push(a);
                }
            }
        }

        let mut layering = Self {
            slots,
            ranks,
            chains,
            upper,
            lower,
        };
        for r in 0..layering.ranks.len() {
            let entries: Vec<(usize, f64)> = layering.ranks[r]
                .iter()
                .enumerate()
                .map(|(i, &s)| (s, i as f64))
                .collect();
            layering.ranks[r] = layering.sort_grouped(entries, 0);
        }
        Ok(layering)
    }

    pub fn virtual_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.kind, SlotKind::Virtual(_)))
            .count()
    }

    /// Position of every slot within its rank.
    pub fn positions(&self) -> Vec<usize> {
        let mut pos = vec![0usize; self.slots.len()];
        for rank in &self.ranks {
            for (i, &s) in rank.iter().enumerate() {
                pos[s] = i;
            }
        }
        pos
    }

    /// Writes `Node::order` from the current layering.
    pub fn assign_order(&self, graph: &mut Graph) {
        let pos = self.positions();
        let nodes = graph.nodes_mut();
        for (id, slot) in self.slots.iter().enumerate() {
            if let SlotKind::Node(ix) = slot.kind
                && let Some(node) = nodes.get_mut(ix)
            {
                node.order = Some(pos[id]);
            }
        }
    }

    /// Slots in the rank above `slot` that it is joined to.
    pub fn upper_neighbors(&self, slot: usize) -> &[usize] {
        &self.upper[slot]
    }

    /// Slots in the rank below `slot` that it is joined to.
    pub fn lower_neighbors(&self, slot: usize) -> &[usize] {
        &self.lower[slot]
    }

    /// Total number of segment crossings between all pairs of adjacent ranks.
    pub fn cross_count(&self) -> usize {
        let pos = self.positions();
        self.ranks
            .windows(2)
            .map(|pair| self.two_layer_cross_count(&pos, &pair[0], pair[1].len()))
            .sum()
    }

    /// Bilayer crossing count with an accumulator tree over the south positions.
    fn two_layer_cross_count(&self, pos: &[usize], north: &[usize], south_len: usize) -> usize {
        if south_len == 0 {
            return 0;
        }

        let mut south_entries: Vec<usize> = Vec::new();
        for &v in north {
            let mut entries: Vec<usize> = self.lower[v].iter().map(|&w| pos[w]).collect();
            entries.sort_unstable();
            south_entries.extend(entries);
        }

        let mut first_index: usize = 1;
        while first_index < south_len {
            first_index <<= 1;
        }
        let tree_size = 2 * first_index - 1;
        first_index -= 1;
        let mut tree = vec![0usize; tree_size];

        let mut cc = 0usize;
        for p in south_entries {
            let mut index = p + first_index;
            tree[index] += 1;
            let mut weight_sum = 0usize;
            while index > 0 {
                if index % 2 == 1 {
                    weight_sum += tree[index + 1];
                }
                index = (index - 1) >> 1;
                tree[index] += 1;
            }
            cc += weight_sum;
        }
        cc
    }

    /// Reorders rank `r` by the barycenter of each slot's neighbors in the adjacent rank.
    fn sweep_rank(&mut self, r: usize, downward: bool, pos: &mut [usize]) {
        let entries: Vec<(usize, f64)> = self.ranks[r]
            .iter()
            .map(|&s| {
                let neighbors = if downward {
                    &self.upper[s]
                } else {
                    &self.lower[s]
                };
                (s, barycenter(neighbors, pos).unwrap_or(pos[s] as f64))
            })
            .collect();
        let sorted = self.sort_grouped(entries, 0);
        for (i, &s) in sorted.iter().enumerate() {
            pos[s] = i;
        }
        self.ranks[r] = sorted;
    }

    /// Stable sort by key that keeps each subgraph's slots together, recursively.
    ///
    /// At nesting `depth` every subgraph present becomes one unit keyed by the mean of its
    /// members' keys; loose slots keep their own key.
    fn sort_grouped(&self, entries: Vec<(usize, f64)>, depth: usize) -> Vec<usize> {
        enum Unit {
            Loose(usize, f64),
            Cluster(Vec<(usize, f64)>),
        }

        let mut units: Vec<Unit> = Vec::new();
        let mut cluster_unit: FxHashMap<usize, usize> = FxHashMap::default();
        for (s, key) in entries {
            match self.slots[s].clusters.get(depth) {
                Some(&c) => {
                    let ix = *cluster_unit.entry(c).or_insert_with(|| {
                        units.push(Unit::Cluster(Vec::new()));
                        units.len() - 1
                    });
                    if let Unit::Cluster(members) = &mut units[ix] {
                        members.push((s, key));
                    }
                }
                None => units.push(Unit::Loose(s, key)),
            }
        }

        let unit_key = |u: &Unit| match u {
            Unit::Loose(_, key) => *key,
            Unit::Cluster(members) => {
                members.iter().map(|(_, k)| k).sum::<f64>() / members.len().max(1) as f64
            }
        };
        units.sort_by(|a, b| unit_key(a).total_cmp(&unit_key(b)));

        let mut out = Vec::new();
        for unit in units {
            match unit {
                Unit::Loose(s, _) => out.push(s),
                Unit::Cluster(members) => out.extend(self.sort_grouped(members, depth + 1)),
            }
        }
        out
    }
}

fn barycenter(neighbors: &[usize], pos: &[usize]) -> Option<f64> {
    if neighbors.is_empty() {
        return None;
    }
    let sum: usize = neighbors.iter().map(|&n| pos[n]).sum();
    Some(sum as f64 / neighbors.len() as f64)
}

/// Runs `passes` alternating sweeps (down, up, down, ...) and keeps the layering with the
/// fewest crossings; ties keep the earlier layering. Returns the final crossing count.
pub fn order(layering: &mut Layering, passes: usize) -> usize {
    let mut best = layering.ranks.clone();
    let mut best_cc = layering.cross_count();
    let mut pos = layering.positions();
    let rank_count = layering.ranks.len();

    for pass in 0..passes {
        if best_cc == 0 {
            break;
        }
        if pass % 2 == 0 {
            for r in 1..rank_count {
                layering.sweep_rank(r, true, &mut pos);
            }
        } else {
            for r in (0..rank_count.saturating_sub(1)).rev() {
                layering.sweep_rank(r, false, &mut pos);
            }
        }
        let cc = layering.cross_count();
        trace!(pass, crossings = cc, "order sweep");
        if cc < best_cc {
            best_cc = cc;
            best.clone_from(&layering.ranks);
        }
    }

    layering.ranks = best;
    best_cc
}
