//! Shortest-path computation over the town graph
//!
//! Classic Dijkstra with a binary min-heap. The search is stateless:
//! every call re-reads current edge weights, so results immediately
//! reflect the latest road conditions. Determinism is pinned down in two
//! places: equal-cost heap entries resolve by vertex creation order, and
//! outgoing edges are relaxed in road declaration order, so the
//! first-declared of several equal-cost routes always wins.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;
use petgraph::visit::EdgeRef;

use super::town::TownGraph;
use super::types::{EdgeId, VertexId};

/// Finds the minimum-total-weight path from `from` to `to`.
///
/// Returns the ordered edge sequence, or an empty vector when the
/// destination is unreachable (the caller decides whether that strands a
/// car or is reported as an error). `from == to` yields an empty path.
///
/// The search stops the moment the destination is popped from the heap,
/// not when it is first discovered; discovery order does not guarantee a
/// final shortest distance.
pub(crate) fn shortest_path(graph: &TownGraph, from: VertexId, to: VertexId) -> Vec<EdgeId> {
    if from == to {
        return Vec::new();
    }
    let Some(start) = graph.node_weight(from) else {
        return Vec::new();
    };

    // dist holds the best known cost per vertex; prev the edge that achieved it.
    let mut dist: HashMap<VertexId, OrderedFloat<f32>> = HashMap::new();
    let mut prev: HashMap<VertexId, EdgeId> = HashMap::new();

    // Min-heap of (cost, vertex creation seq, vertex). Reverse flips the
    // max-heap; seq breaks cost ties by insertion order.
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, u64, VertexId)>> = BinaryHeap::new();

    dist.insert(from, OrderedFloat(0.0));
    heap.push(Reverse((OrderedFloat(0.0), start.seq, from)));

    while let Some(Reverse((cost, _, vertex))) = heap.pop() {
        if vertex == to {
            return reconstruct(graph, &prev, from, to);
        }

        // Skip stale heap entries.
        if dist.get(&vertex).map_or(false, |&best| cost > best) {
            continue;
        }

        // Relax outgoing edges in the order the roads were declared.
        let mut outgoing: Vec<_> = graph.edges(vertex).collect();
        outgoing.sort_by_key(|edge| edge.weight().seq);

        for edge in outgoing {
            let next = edge.target();
            let next_cost = cost + OrderedFloat(edge.weight().weight);

            if dist.get(&next).map_or(true, |&best| next_cost < best) {
                dist.insert(next, next_cost);
                prev.insert(next, edge.id());
                if let Some(v) = graph.node_weight(next) {
                    heap.push(Reverse((next_cost, v.seq, next)));
                }
            }
        }
    }

    Vec::new()
}

/// Walk the predecessor edges back from the destination.
fn reconstruct(
    graph: &TownGraph,
    prev: &HashMap<VertexId, EdgeId>,
    from: VertexId,
    to: VertexId,
) -> Vec<EdgeId> {
    let mut edges = Vec::new();
    let mut current = to;

    while current != from {
        let Some(&edge) = prev.get(&current) else {
            break;
        };
        edges.push(edge);
        match graph.edge_endpoints(edge) {
            Some((source, _)) => current = source,
            None => break,
        }
    }

    edges.reverse();
    edges
}
