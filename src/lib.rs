//! Town Routing Simulation Library
//!
//! Cars travel across a weighted graph of named locations, following
//! shortest paths that are recomputed whenever road conditions change.

pub mod simulation;
