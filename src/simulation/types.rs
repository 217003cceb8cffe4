//! Core types for the town routing simulation

use std::collections::BTreeSet;

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for car IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CarId(pub SimId);

/// Identifier of a vertex in the town graph
///
/// Stable across vertex and edge removals, so ids held in car paths
/// stay valid until the vertex itself is removed.
pub type VertexId = petgraph::stable_graph::NodeIndex;

/// Identifier of a directed edge in the town graph
pub type EdgeId = petgraph::stable_graph::EdgeIndex;

/// A 2D position carried for external rendering
///
/// The routing core never reads coordinates; they are opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A named location in the town
#[derive(Debug, Clone)]
pub struct SimVertex {
    pub name: String,
    pub position: Position,
    /// Creation order, used as the deterministic tie-break in pathfinding
    pub(crate) seq: u64,
}

/// A directed road between two vertices
///
/// Two-way roads are modeled as two independent edges, each with its own
/// weight and car set. Endpoints live in the graph adjacency; mutation
/// goes through [`SimTown`](super::SimTown).
#[derive(Debug, Clone)]
pub struct SimEdge {
    /// Non-negative traversal cost
    pub weight: f32,
    /// Declaration order, used to relax outgoing edges deterministically
    pub(crate) seq: u64,
    /// Cars registered on this edge (planned next hop or mid-traversal)
    pub(crate) cars: BTreeSet<CarId>,
}

impl SimEdge {
    pub(crate) fn new(weight: f32, seq: u64) -> Self {
        Self {
            weight,
            seq,
            cars: BTreeSet::new(),
        }
    }

    /// Cars currently assigned to this edge, in id order
    pub fn cars(&self) -> impl Iterator<Item = CarId> + '_ {
        self.cars.iter().copied()
    }

    /// Number of cars currently assigned to this edge
    pub fn car_count(&self) -> usize {
        self.cars.len()
    }
}
