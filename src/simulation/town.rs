//! The town: graph ownership, car registry, and the rerouting protocol
//!
//! `SimTown` owns every vertex, edge, and car, and is the only place
//! mutation happens. Edge car sets and car paths are kept consistent
//! here: a car is registered on exactly one edge at a time (the front of
//! its path), and every removal path sweeps stale registrations.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::car::{CarPosition, SimCar};
use super::error::SimError;
use super::path_finder;
use super::types::{CarId, EdgeId, Position, SimEdge, SimId, SimVertex, VertexId};

pub(crate) type TownGraph = StableDiGraph<SimVertex, SimEdge>;

/// A town of named vertices, weighted directed roads, and cars in transit
#[derive(Debug)]
pub struct SimTown {
    graph: TownGraph,
    /// Vertex names are unique; this is the only name directory
    vertex_names: HashMap<String, VertexId>,
    cars: HashMap<CarId, SimCar>,
    next_car: usize,
    next_seq: u64,
}

impl Default for SimTown {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTown {
    pub fn new() -> Self {
        Self {
            graph: TownGraph::default(),
            vertex_names: HashMap::new(),
            cars: HashMap::new(),
            next_car: 0,
            next_seq: 0,
        }
    }

    /// Build a town from an adjacency description and a coordinate map.
    ///
    /// Vertices are created first, in the order given, then edges in the
    /// order given; both orders feed the deterministic tie-breaks in
    /// pathfinding. Missing coordinates default to the origin; the core
    /// never reads them.
    pub fn build(
        adjacency: &[(String, Vec<(String, f32)>)],
        coordinates: &HashMap<String, Position>,
    ) -> Result<Self, SimError> {
        let mut town = Self::new();
        for (name, _) in adjacency {
            let position = coordinates.get(name).copied().unwrap_or_default();
            town.add_vertex(name, position)?;
        }
        for (name, roads) in adjacency {
            for (neighbor, weight) in roads {
                town.connect_vertices(name, neighbor, *weight)?;
            }
        }
        Ok(town)
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(SimId(self.next_car));
        self.next_car += 1;
        id
    }

    fn resolve(&self, name: &str) -> Result<VertexId, SimError> {
        self.vertex_names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownVertex(name.to_string()))
    }

    /// Add a named vertex to the town
    pub fn add_vertex(&mut self, name: &str, position: Position) -> Result<VertexId, SimError> {
        if self.vertex_names.contains_key(name) {
            return Err(SimError::DuplicateName(name.to_string()));
        }
        let seq = self.next_seq();
        let id = self.graph.add_node(SimVertex {
            name: name.to_string(),
            position,
            seq,
        });
        self.vertex_names.insert(name.to_string(), id);
        debug!("added vertex '{}' as {:?}", name, id);
        Ok(id)
    }

    /// Create one directed road from `from` to `to`
    pub fn connect_vertices(
        &mut self,
        from: &str,
        to: &str,
        weight: f32,
    ) -> Result<EdgeId, SimError> {
        if weight < 0.0 {
            return Err(SimError::InvalidWeight(weight));
        }
        let from_id = self.resolve(from)?;
        let to_id = self.resolve(to)?;
        let seq = self.next_seq();
        let id = self.graph.add_edge(from_id, to_id, SimEdge::new(weight, seq));
        debug!("connected '{}' -> '{}' with weight {}", from, to, weight);
        Ok(id)
    }

    /// Create a two-way road as two independent directed edges
    pub fn connect_vertices_two_way(
        &mut self,
        a: &str,
        b: &str,
        weight: f32,
    ) -> Result<(EdgeId, EdgeId), SimError> {
        let forward = self.connect_vertices(a, b, weight)?;
        let backward = self.connect_vertices(b, a, weight)?;
        Ok((forward, backward))
    }

    /// Remove a vertex and every road incident to it.
    ///
    /// Policy: cars standing at the vertex or destined for it are
    /// despawned; a car traversing a removed road is re-anchored at the
    /// road's surviving endpoint; every other car whose path used a
    /// removed road is rerouted from its current position, and stranded
    /// (empty continuation) when no route remains.
    pub fn remove_vertex(&mut self, name: &str) -> Result<(), SimError> {
        let vertex = self.resolve(name)?;

        let removed: BTreeSet<EdgeId> = self
            .graph
            .edges_directed(vertex, Direction::Outgoing)
            .map(|edge| edge.id())
            .chain(
                self.graph
                    .edges_directed(vertex, Direction::Incoming)
                    .map(|edge| edge.id()),
            )
            .collect();

        // Endpoints must be captured before the edges disappear.
        let endpoints: HashMap<EdgeId, (VertexId, VertexId)> = removed
            .iter()
            .filter_map(|&edge| self.graph.edge_endpoints(edge).map(|ends| (edge, ends)))
            .collect();

        let mut doomed: Vec<CarId> = Vec::new();
        let mut affected: Vec<CarId> = Vec::new();
        for (&id, car) in &self.cars {
            let standing_here = matches!(car.position, CarPosition::AtVertex(v) if v == vertex);
            if car.destination == vertex || standing_here {
                doomed.push(id);
            } else if car.path.iter().any(|edge| removed.contains(edge)) {
                affected.push(id);
            }
        }
        doomed.sort();
        affected.sort();

        self.graph.remove_node(vertex);
        self.vertex_names.remove(name);
        info!(
            "removed vertex '{}' and {} incident roads",
            name,
            removed.len()
        );

        for id in doomed {
            warn!("despawning car {:?}: vertex '{}' was removed", id, name);
            self.remove_car_internal(id)?;
        }

        for id in affected {
            if let Some(car) = self.cars.get_mut(&id) {
                if let CarPosition::OnEdge(edge) = car.position {
                    if removed.contains(&edge) {
                        // The road under the car is gone; put it back on
                        // the endpoint that still exists.
                        if let Some(&(source, target)) = endpoints.get(&edge) {
                            let anchor = if target == vertex { source } else { target };
                            car.position = CarPosition::AtVertex(anchor);
                        }
                    }
                }
            }
            self.reroute_car(id);
        }

        self.check_consistency();
        Ok(())
    }

    /// Register a car, compute its initial path, and put it on the first
    /// edge of that path.
    ///
    /// When the destination is unreachable the car is still added, with
    /// an empty path, and the returned error carries its id so the
    /// caller keeps a handle to the stranded car.
    pub fn add_car(&mut self, start: &str, destination: &str) -> Result<CarId, SimError> {
        let start_id = self.resolve(start)?;
        let dest_id = self.resolve(destination)?;

        let id = self.next_car_id();
        let mut car = SimCar::new(id, start_id, dest_id);
        car.path = path_finder::shortest_path(&self.graph, start_id, dest_id)
            .into_iter()
            .collect();
        let routed = !car.path.is_empty();
        self.cars.insert(id, car);
        self.register_front(id);
        self.check_consistency();

        if !routed && start_id != dest_id {
            warn!("car {:?} added without a route: '{}' -> '{}'", id, start, destination);
            return Err(SimError::Unreachable {
                car: id,
                from: start.to_string(),
                to: destination.to_string(),
            });
        }
        info!("car {:?} added: '{}' -> '{}'", id, start, destination);
        Ok(id)
    }

    /// Detach a car from every edge's car set and discard it
    pub fn remove_car(&mut self, id: CarId) -> Result<(), SimError> {
        self.remove_car_internal(id)?;
        self.check_consistency();
        Ok(())
    }

    fn remove_car_internal(&mut self, id: CarId) -> Result<(), SimError> {
        if self.cars.remove(&id).is_none() {
            return Err(SimError::UnknownCar(id));
        }
        // Full sweep rather than just the stored path, so a car can never
        // linger in bookkeeping.
        let edges: Vec<EdgeId> = self.graph.edge_indices().collect();
        for edge in edges {
            if let Some(data) = self.graph.edge_weight_mut(edge) {
                data.cars.remove(&id);
            }
        }
        debug!("car {:?} removed", id);
        Ok(())
    }

    /// Set a road's weight and reroute every car registered on it.
    ///
    /// An unchanged weight is a no-op: no car is notified, so paths and
    /// positions stay exactly as they were.
    pub fn update_weight(&mut self, edge: EdgeId, new_weight: f32) -> Result<(), SimError> {
        if new_weight < 0.0 {
            return Err(SimError::InvalidWeight(new_weight));
        }
        let data = self
            .graph
            .edge_weight_mut(edge)
            .ok_or(SimError::UnknownEdge(edge))?;
        if data.weight == new_weight {
            debug!("weight of {:?} unchanged at {}", edge, new_weight);
            return Ok(());
        }
        let old_weight = data.weight;
        data.weight = new_weight;

        let affected: Vec<CarId> = data.cars.iter().copied().collect();
        info!(
            "weight of {:?} changed {} -> {}, rerouting {} cars",
            edge,
            old_weight,
            new_weight,
            affected.len()
        );
        for id in affected {
            self.reroute_car(id);
        }
        self.check_consistency();
        Ok(())
    }

    /// Transition a car standing at a vertex onto the first edge of its
    /// path. No-op when already traversing; fails when there is nothing
    /// left to traverse.
    pub fn depart_car(&mut self, id: CarId) -> Result<(), SimError> {
        let car = self.cars.get_mut(&id).ok_or(SimError::UnknownCar(id))?;
        match car.position {
            CarPosition::OnEdge(_) => Ok(()),
            CarPosition::AtVertex(_) => {
                let Some(&front) = car.path.front() else {
                    return Err(SimError::NotTraveling(id));
                };
                car.position = CarPosition::OnEdge(front);
                debug!("car {:?} departed onto {:?}", id, front);
                Ok(())
            }
        }
    }

    /// Complete the car's current (first) edge: detach from it, pop it,
    /// move to its end vertex, and register on the next edge if any.
    pub fn advance_car(&mut self, id: CarId) -> Result<(), SimError> {
        let car = self.cars.get(&id).ok_or(SimError::UnknownCar(id))?;
        let Some(&front) = car.path.front() else {
            return Err(SimError::NotTraveling(id));
        };
        debug_assert!(
            car.current_edge().map_or(true, |edge| edge == front),
            "car {:?} traversing an edge that is not its path front",
            id
        );
        let Some((_, end)) = self.graph.edge_endpoints(front) else {
            return Err(SimError::UnknownEdge(front));
        };

        if let Some(data) = self.graph.edge_weight_mut(front) {
            data.cars.remove(&id);
        }
        let arrived = {
            // Registry membership was checked above.
            let car = self.cars.get_mut(&id).ok_or(SimError::UnknownCar(id))?;
            car.path.pop_front();
            car.position = CarPosition::AtVertex(end);
            car.path.is_empty()
        };
        self.register_front(id);

        if arrived {
            info!("car {:?} arrived at its destination", id);
        }
        self.check_consistency();
        Ok(())
    }

    /// Recompute a car's path from its current position.
    ///
    /// A car traversing an edge keeps that edge as the irrevocable first
    /// hop and gets a fresh continuation from its far endpoint; a car at
    /// a vertex gets an entirely fresh path. When the destination is no
    /// longer reachable the car is left with an empty continuation
    /// (stranded), never an error.
    fn reroute_car(&mut self, id: CarId) {
        let Some(car) = self.cars.get(&id) else {
            return;
        };
        let destination = car.destination;
        let old_path: Vec<EdgeId> = car.path.iter().copied().collect();

        match car.position {
            CarPosition::OnEdge(current) => {
                let Some((_, far_end)) = self.graph.edge_endpoints(current) else {
                    debug_assert!(false, "car {:?} traversing a missing edge", id);
                    return;
                };
                let tail = path_finder::shortest_path(&self.graph, far_end, destination);
                let stranded = tail.is_empty() && far_end != destination;
                self.detach_from_edges(id, &old_path, Some(current));
                if let Some(car) = self.cars.get_mut(&id) {
                    car.path = std::iter::once(current).chain(tail).collect();
                }
                if stranded {
                    warn!("car {:?} stranded: no route onward from {:?}", id, current);
                }
            }
            CarPosition::AtVertex(vertex) => {
                let fresh = path_finder::shortest_path(&self.graph, vertex, destination);
                let stranded = fresh.is_empty() && vertex != destination;
                self.detach_from_edges(id, &old_path, None);
                if let Some(car) = self.cars.get_mut(&id) {
                    car.path = fresh.into_iter().collect();
                }
                self.register_front(id);
                if stranded {
                    warn!("car {:?} stranded: no route from {:?}", id, vertex);
                }
            }
        }
    }

    /// Remove a car from the car set of every listed edge except `keep`
    fn detach_from_edges(&mut self, id: CarId, edges: &[EdgeId], keep: Option<EdgeId>) {
        for &edge in edges {
            if Some(edge) == keep {
                continue;
            }
            if let Some(data) = self.graph.edge_weight_mut(edge) {
                data.cars.remove(&id);
            }
        }
    }

    /// Register a car on the front edge of its path, if it has one
    fn register_front(&mut self, id: CarId) {
        let Some(&front) = self.cars.get(&id).and_then(|car| car.path.front()) else {
            return;
        };
        if let Some(data) = self.graph.edge_weight_mut(front) {
            data.cars.insert(id);
        }
    }

    // --- Query surface -----------------------------------------------------

    pub fn vertex_by_name(&self, name: &str) -> Option<VertexId> {
        self.vertex_names.get(name).copied()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&SimVertex> {
        self.graph.node_weight(id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &SimVertex)> {
        self.graph
            .node_indices()
            .filter_map(|id| self.graph.node_weight(id).map(|vertex| (id, vertex)))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&SimEdge> {
        self.graph.edge_weight(id)
    }

    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(VertexId, VertexId)> {
        self.graph.edge_endpoints(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &SimEdge)> {
        self.graph
            .edge_indices()
            .filter_map(|id| self.graph.edge_weight(id).map(|edge| (id, edge)))
    }

    /// Find the road from `from` to `to`; with parallel roads, the
    /// earliest declared wins
    pub fn find_edge(&self, from: &str, to: &str) -> Option<EdgeId> {
        let from_id = self.vertex_by_name(from)?;
        let to_id = self.vertex_by_name(to)?;
        self.graph
            .edges(from_id)
            .filter(|edge| edge.target() == to_id)
            .min_by_key(|edge| edge.weight().seq)
            .map(|edge| edge.id())
    }

    pub fn car(&self, id: CarId) -> Option<&SimCar> {
        self.cars.get(&id)
    }

    pub fn cars(&self) -> impl Iterator<Item = (CarId, &SimCar)> {
        self.cars.iter().map(|(&id, car)| (id, car))
    }

    /// Cars registered on a road, in id order
    pub fn cars_on_edge(&self, id: EdgeId) -> Vec<CarId> {
        self.graph
            .edge_weight(id)
            .map(|edge| edge.cars.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    /// Shortest path between two vertices under current weights
    pub fn shortest_path(&self, from: VertexId, to: VertexId) -> Vec<EdgeId> {
        path_finder::shortest_path(&self.graph, from, to)
    }

    /// True when the car has reached its destination
    pub fn has_arrived(&self, id: CarId) -> Result<bool, SimError> {
        let car = self.cars.get(&id).ok_or(SimError::UnknownCar(id))?;
        Ok(self.car_arrived(car))
    }

    /// True when the car's destination is unreachable from its current
    /// position (empty continuation)
    pub fn is_stranded(&self, id: CarId) -> Result<bool, SimError> {
        let car = self.cars.get(&id).ok_or(SimError::UnknownCar(id))?;
        Ok(self.car_stranded(car))
    }

    fn car_arrived(&self, car: &SimCar) -> bool {
        matches!(car.position, CarPosition::AtVertex(v) if v == car.destination)
    }

    fn car_stranded(&self, car: &SimCar) -> bool {
        match car.position {
            CarPosition::AtVertex(vertex) => vertex != car.destination && car.path.is_empty(),
            CarPosition::OnEdge(edge) => {
                car.path.len() == 1
                    && self
                        .graph
                        .edge_endpoints(edge)
                        .map_or(true, |(_, end)| end != car.destination)
            }
        }
    }

    /// Log a one-line status summary
    pub fn print_summary(&self) {
        let arrived = self.cars.values().filter(|car| self.car_arrived(car)).count();
        let stranded = self.cars.values().filter(|car| self.car_stranded(car)).count();
        info!(
            "town: {} vertices, {} roads, {} cars ({} arrived, {} stranded)",
            self.vertex_count(),
            self.edge_count(),
            self.car_count(),
            arrived,
            stranded
        );
    }

    // --- Consistency checks (debug builds) ---------------------------------

    #[cfg(debug_assertions)]
    fn check_consistency(&self) {
        for (id, car) in &self.cars {
            if let CarPosition::OnEdge(edge) = car.position {
                debug_assert_eq!(
                    car.path.front(),
                    Some(&edge),
                    "car {:?} traversing an edge that is not its path front",
                    id
                );
            }
            for (hop, &edge) in car.path.iter().enumerate() {
                let registered = self
                    .graph
                    .edge_weight(edge)
                    .map_or(false, |data| data.cars.contains(id));
                if hop == 0 {
                    debug_assert!(registered, "car {:?} not registered on its front edge", id);
                } else {
                    debug_assert!(
                        !registered,
                        "car {:?} registered on an edge it has not reached",
                        id
                    );
                }
            }
        }
        for edge in self.graph.edge_indices() {
            if let Some(data) = self.graph.edge_weight(edge) {
                for id in &data.cars {
                    let known = self
                        .cars
                        .get(id)
                        .map_or(false, |car| car.path.front() == Some(&edge));
                    debug_assert!(
                        known,
                        "edge {:?} holds car {:?} that is not headed onto it",
                        edge, id
                    );
                }
            }
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_consistency(&self) {}
}
