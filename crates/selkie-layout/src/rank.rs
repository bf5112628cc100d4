//! Phase 1: rank assignment.
//!
//! Cycles are broken by a depth-first walk that tracks the nodes on the current path; an edge
//! into such a node closes a cycle and is marked as a back-edge. Back-edges and self-loops are
//! left out of ranking, the rest form a DAG that is layered by longest path.

use selkie_graph::{Adjacency, Graph};
use std::collections::VecDeque;
use tracing::trace;

/// Assigns `Node::rank` and `Edge::back_edge`. Returns the highest rank in use.
pub fn rank(graph: &mut Graph) -> usize {
    let adj = graph.adjacency();
    let back = find_back_edges(graph, &adj);
    let min_lens: Vec<usize> = graph.edges().iter().map(|e| e.min_len.max(1)).collect();
    let ranks = longest_path(graph.node_count(), &adj, &back, &min_lens);

    for (node, &r) in graph.nodes_mut().iter_mut().zip(&ranks) {
        node.rank = Some(r);
    }
    for (edge, &is_back) in graph.edges_mut().iter_mut().zip(&back) {
        edge.back_edge = is_back;
    }

    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    trace!(
        max_rank,
        back_edges = back.iter().filter(|b| **b).count(),
        "ranked"
    );
    max_rank
}

/// Classifies every edge: `true` when it points into a node on the current DFS path.
///
/// The walk starts from every root (no incoming edges other than self-loops) in insertion
/// order, then from each node still unvisited, which seeds components only reachable through
/// cycles.
pub fn find_back_edges(graph: &Graph, adj: &Adjacency) -> Vec<bool> {
    let n = graph.node_count();
    let mut back = vec![false; graph.edge_count()];
    let mut visited = vec![false; n];
    let mut on_path = vec![false; n];

    let is_root = |v: usize| {
        adj.in_edges(v)
            .iter()
            .all(|&e| adj.ends(e).is_none_or(|(u, _)| u == v))
    };
    for v in (0..n).filter(|&v| is_root(v)) {
        dfs(v, adj, &mut visited, &mut on_path, &mut back);
    }
    for v in 0..n {
        dfs(v, adj, &mut visited, &mut on_path, &mut back);
    }
    back
}

fn dfs(
    start: usize,
    adj: &Adjacency,
    visited: &mut [bool],
    on_path: &mut [bool],
    back: &mut [bool],
) {
    if visited[start] {
        return;
    }
    visited[start] = true;
    on_path[start] = true;

    // (node, index of the next out-edge to look at)
    let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
    while let Some(&(v, cursor)) = stack.last() {
        let Some(&e) = adj.out_edges(v).get(cursor) else {
            on_path[v] = false;
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.1 += 1;
        }
        let Some((_, w)) = adj.ends(e) else {
            continue;
        };
        if w == v {
            continue;
        }
        if on_path[w] {
            back[e] = true;
        } else if !visited[w] {
            visited[w] = true;
            on_path[w] = true;
            stack.push((w, 0));
        }
    }
}

/// Longest-path layering over the edges that are neither back-edges nor self-loops, so that
/// `rank(w) >= rank(v) + min_len` for every kept edge `v -> w`. Sources get rank 0.
pub fn longest_path(n: usize, adj: &Adjacency, back: &[bool], min_lens: &[usize]) -> Vec<usize> {
    let kept = |e: usize| !back[e] && adj.ends(e).is_some_and(|(u, w)| u != w);

    let mut in_degree: Vec<usize> = (0..n)
        .map(|v| adj.in_edges(v).iter().filter(|&&e| kept(e)).count())
        .collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&v| in_degree[v] == 0).collect();
    let mut ranks = vec![0usize; n];

    while let Some(v) = queue.pop_front() {
        for &e in adj.out_edges(v) {
            if !kept(e) {
                continue;
            }
            let Some((_, w)) = adj.ends(e) else {
                continue;
            };
            ranks[w] = ranks[w].max(ranks[v].saturating_add(min_lens[e]));
            in_degree[w] -= 1;
            if in_degree[w] == 0 {
                queue.push_back(w);
            }
        }
    }
    ranks
}
