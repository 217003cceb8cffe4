//! Standalone town routing simulation module
//!
//! This module contains the routing core: the town graph, Dijkstra
//! pathfinding, and the bookkeeping that keeps in-flight cars consistent
//! with a graph that mutates while routes are in use. It has no rendering
//! or input concerns; collaborators drive it through `SimTown`'s mutation
//! surface and read state back through its query surface.

mod car;
mod error;
mod path_finder;
mod town;
mod types;

pub use car::{CarPosition, SimCar};
pub use error::SimError;
pub use town::SimTown;
pub use types::{CarId, EdgeId, Position, SimEdge, SimId, SimVertex, VertexId};
