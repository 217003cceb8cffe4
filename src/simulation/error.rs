//! Error kinds for the town routing simulation
//!
//! All conditions here are local and recoverable; none abort the
//! simulation. The binary funnels them through `anyhow` at its boundary.

use std::error::Error;
use std::fmt;

use super::types::{CarId, EdgeId};

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A vertex with this name already exists
    DuplicateName(String),
    /// Reference to a vertex name that does not exist
    UnknownVertex(String),
    /// Edge weights must be non-negative
    InvalidWeight(f32),
    /// No path exists between the two vertices
    ///
    /// The car is still added, with an empty path; `car` is its handle.
    Unreachable {
        car: CarId,
        from: String,
        to: String,
    },
    /// The car has no current edge (already arrived, or path empty)
    NotTraveling(CarId),
    /// Reference to an edge id that is no longer in the graph
    UnknownEdge(EdgeId),
    /// Reference to a car id that is not registered
    UnknownCar(CarId),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::DuplicateName(name) => {
                write!(f, "a vertex named '{}' already exists", name)
            }
            SimError::UnknownVertex(name) => write!(f, "no vertex named '{}'", name),
            SimError::InvalidWeight(weight) => {
                write!(f, "edge weight must be non-negative, got {}", weight)
            }
            SimError::Unreachable { car, from, to } => {
                write!(f, "car {:?} has no route from '{}' to '{}'", car, from, to)
            }
            SimError::NotTraveling(car) => {
                write!(f, "car {:?} has no edge left to traverse", car)
            }
            SimError::UnknownEdge(edge) => write!(f, "edge {:?} is not in the graph", edge),
            SimError::UnknownCar(car) => write!(f, "car {:?} is not registered", car),
        }
    }
}

impl Error for SimError {}
