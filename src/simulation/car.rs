//! Car state for the town routing simulation
//!
//! A car is pure state; every transition (departure, edge crossing,
//! rerouting) goes through [`SimTown`](super::SimTown) so that edge car
//! sets and car paths never drift apart.

use std::collections::VecDeque;

use super::types::{CarId, EdgeId, VertexId};

/// Where a car currently is
///
/// Modeled as a tagged variant rather than nullable fields so the
/// rerouting logic can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarPosition {
    /// Standing at a vertex; the path front, if any, is a planned hop
    AtVertex(VertexId),
    /// Traversing an edge; the edge is the path front and cannot be
    /// abandoned until crossed
    OnEdge(EdgeId),
}

/// A car in the simulation
#[derive(Debug, Clone)]
pub struct SimCar {
    pub id: CarId,
    /// Fixed at creation
    pub origin: VertexId,
    /// Fixed at creation
    pub destination: VertexId,
    pub position: CarPosition,
    /// Ordered edges from the current position to the destination.
    /// Empty once arrived, or when the destination is unreachable.
    pub path: VecDeque<EdgeId>,
}

impl SimCar {
    pub fn new(id: CarId, origin: VertexId, destination: VertexId) -> Self {
        Self {
            id,
            origin,
            destination,
            position: CarPosition::AtVertex(origin),
            path: VecDeque::new(),
        }
    }

    /// The edge this car is traversing, if it is mid-edge
    pub fn current_edge(&self) -> Option<EdgeId> {
        match self.position {
            CarPosition::OnEdge(edge) => Some(edge),
            CarPosition::AtVertex(_) => None,
        }
    }

    /// Remaining path, front first
    pub fn remaining_path(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.path.iter().copied()
    }
}
