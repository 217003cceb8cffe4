//! Pathfinding and rerouting behavior
//!
//! Exercises the shortest-path engine and the weight-change reroute
//! protocol through the public `SimTown` API.

use town_sim::simulation::{CarPosition, EdgeId, Position, SimError, SimTown};

/// The five-vertex town used throughout: A-B(4), A-C(8), A-E(2), B-C(3),
/// C-D(5), D-E(2), all two-way with equal weights both ways.
fn scenario_town() -> SimTown {
    let mut town = SimTown::new();
    let layout = [
        ("A", 0.0, 0.0),
        ("B", 2.0, 2.0),
        ("C", 4.0, 2.0),
        ("D", 4.0, -2.0),
        ("E", 2.0, -2.0),
    ];
    for (name, x, y) in layout {
        town.add_vertex(name, Position::new(x, y)).unwrap();
    }
    let roads = [
        ("A", "B", 4.0),
        ("A", "C", 8.0),
        ("A", "E", 2.0),
        ("B", "C", 3.0),
        ("C", "D", 5.0),
        ("D", "E", 2.0),
    ];
    for (a, b, weight) in roads {
        town.connect_vertices_two_way(a, b, weight).unwrap();
    }
    town
}

fn edge_names(town: &SimTown, path: impl IntoIterator<Item = EdgeId>) -> Vec<(String, String)> {
    path.into_iter()
        .map(|edge| {
            let (start, end) = town.edge_endpoints(edge).expect("edge should exist");
            (
                town.vertex(start).expect("vertex should exist").name.clone(),
                town.vertex(end).expect("vertex should exist").name.clone(),
            )
        })
        .collect()
}

fn total_weight(town: &SimTown, path: impl IntoIterator<Item = EdgeId>) -> f32 {
    path.into_iter()
        .map(|edge| town.edge(edge).expect("edge should exist").weight)
        .sum()
}

fn names(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[test]
fn scenario_a_prefers_cheaper_two_hop_route() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();

    let path: Vec<EdgeId> = town.car(car).unwrap().remaining_path().collect();
    assert_eq!(
        edge_names(&town, path.iter().copied()),
        names(&[("A", "B"), ("B", "C")])
    );
    assert_eq!(total_weight(&town, path), 7.0);
}

#[test]
fn shortest_path_takes_the_ring_when_cheaper() {
    let town = scenario_town();
    let a = town.vertex_by_name("A").unwrap();
    let d = town.vertex_by_name("D").unwrap();

    let path = town.shortest_path(a, d);
    assert_eq!(
        edge_names(&town, path.iter().copied()),
        names(&[("A", "E"), ("E", "D")])
    );
    assert_eq!(total_weight(&town, path), 4.0);
}

#[test]
fn shortest_path_to_self_is_empty() {
    let town = scenario_town();
    let a = town.vertex_by_name("A").unwrap();
    assert!(town.shortest_path(a, a).is_empty());
}

#[test]
fn unreachable_destination_yields_empty_path_not_crash() {
    let mut town = scenario_town();
    town.add_vertex("F", Position::default()).unwrap();

    let a = town.vertex_by_name("A").unwrap();
    let f = town.vertex_by_name("F").unwrap();
    assert!(town.shortest_path(a, f).is_empty());

    // The car is still added, stranded at its origin.
    let car = match town.add_car("A", "F").unwrap_err() {
        SimError::Unreachable { car, from, to } => {
            assert_eq!((from.as_str(), to.as_str()), ("A", "F"));
            car
        }
        other => panic!("expected Unreachable, got {:?}", other),
    };

    let stranded = town.car(car).expect("car should be registered");
    assert!(stranded.path.is_empty());
    assert_eq!(stranded.position, CarPosition::AtVertex(a));
    assert!(town.is_stranded(car).unwrap());
}

#[test]
fn equal_cost_routes_resolve_by_declaration_order() {
    let mut town = SimTown::new();
    for name in ["S", "X", "Y", "T"] {
        town.add_vertex(name, Position::default()).unwrap();
    }
    town.connect_vertices("S", "X", 1.0).unwrap();
    town.connect_vertices("S", "Y", 1.0).unwrap();
    town.connect_vertices("X", "T", 1.0).unwrap();
    town.connect_vertices("Y", "T", 1.0).unwrap();

    let s = town.vertex_by_name("S").unwrap();
    let t = town.vertex_by_name("T").unwrap();

    // Both routes cost 2; the one through the first-declared vertex wins,
    // and repeat calls agree.
    let path = town.shortest_path(s, t);
    assert_eq!(
        edge_names(&town, path.iter().copied()),
        names(&[("S", "X"), ("X", "T")])
    );
    assert_eq!(town.shortest_path(s, t), path);
}

#[test]
fn scenario_b_car_cannot_abandon_edge_mid_traversal() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();
    let a_b = town.find_edge("A", "B").unwrap();

    town.depart_car(car).unwrap();
    assert_eq!(town.car(car).unwrap().position, CarPosition::OnEdge(a_b));

    town.update_weight(a_b, 100.0).unwrap();

    // Still traversing A->B; the continuation was recomputed from B.
    let after = town.car(car).unwrap();
    assert_eq!(after.position, CarPosition::OnEdge(a_b));
    assert_eq!(
        edge_names(&town, after.remaining_path()),
        names(&[("A", "B"), ("B", "C")])
    );
    assert_eq!(town.cars_on_edge(a_b), vec![car]);
}

#[test]
fn mid_traversal_reroute_recomputes_the_continuation() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();
    let a_b = town.find_edge("A", "B").unwrap();
    let b_c = town.find_edge("B", "C").unwrap();

    // The car is only registered on its front edge, so bumping B->C does
    // not disturb it yet.
    town.update_weight(b_c, 100.0).unwrap();
    assert_eq!(
        edge_names(&town, town.car(car).unwrap().remaining_path()),
        names(&[("A", "B"), ("B", "C")])
    );

    town.depart_car(car).unwrap();
    town.update_weight(a_b, 100.0).unwrap();

    // From B onward, doubling back through A is now cheaper than B->C.
    let after = town.car(car).unwrap();
    assert_eq!(
        edge_names(&town, after.remaining_path()),
        names(&[("A", "B"), ("B", "A"), ("A", "C")])
    );
    assert_eq!(after.position, CarPosition::OnEdge(a_b));
}

#[test]
fn reroute_while_parked_at_vertex_replaces_whole_path() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();
    let a_b = town.find_edge("A", "B").unwrap();
    let a_c = town.find_edge("A", "C").unwrap();

    // Still at A; the planned hop can be abandoned entirely.
    town.update_weight(a_b, 100.0).unwrap();

    let after = town.car(car).unwrap();
    assert_eq!(
        edge_names(&town, after.remaining_path()),
        names(&[("A", "C")])
    );
    let a = town.vertex_by_name("A").unwrap();
    assert_eq!(after.position, CarPosition::AtVertex(a));
    assert!(town.cars_on_edge(a_b).is_empty());
    assert_eq!(town.cars_on_edge(a_c), vec![car]);
}

#[test]
fn update_weight_with_unchanged_value_is_a_no_op() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();
    let a_b = town.find_edge("A", "B").unwrap();
    town.depart_car(car).unwrap();

    let path_before: Vec<EdgeId> = town.car(car).unwrap().remaining_path().collect();
    let position_before = town.car(car).unwrap().position;
    let cars_before = town.cars_on_edge(a_b);

    town.update_weight(a_b, 4.0).unwrap();

    let after = town.car(car).unwrap();
    assert_eq!(after.remaining_path().collect::<Vec<_>>(), path_before);
    assert_eq!(after.position, position_before);
    assert_eq!(town.cars_on_edge(a_b), cars_before);
}

#[test]
fn scenario_d_advance_consumes_one_edge_per_call() {
    let mut town = scenario_town();
    let car = town.add_car("A", "C").unwrap();
    assert_eq!(town.car(car).unwrap().path.len(), 2);

    town.advance_car(car).unwrap();
    let b = town.vertex_by_name("B").unwrap();
    assert_eq!(town.car(car).unwrap().position, CarPosition::AtVertex(b));
    assert_eq!(town.car(car).unwrap().path.len(), 1);

    town.advance_car(car).unwrap();
    let c = town.vertex_by_name("C").unwrap();
    assert_eq!(town.car(car).unwrap().position, CarPosition::AtVertex(c));
    assert!(town.car(car).unwrap().path.is_empty());
    assert!(town.has_arrived(car).unwrap());

    // One call past arrival must fail, consistently.
    assert_eq!(town.advance_car(car).unwrap_err(), SimError::NotTraveling(car));
    assert_eq!(town.advance_car(car).unwrap_err(), SimError::NotTraveling(car));
}

#[test]
fn weight_updates_are_read_fresh_on_every_search() {
    let mut town = scenario_town();
    let a = town.vertex_by_name("A").unwrap();
    let c = town.vertex_by_name("C").unwrap();

    let a_b = town.find_edge("A", "B").unwrap();
    town.update_weight(a_b, 10.0).unwrap();
    assert_eq!(
        edge_names(&town, town.shortest_path(a, c)),
        names(&[("A", "C")])
    );

    town.update_weight(a_b, 1.0).unwrap();
    assert_eq!(
        edge_names(&town, town.shortest_path(a, c)),
        names(&[("A", "B"), ("B", "C")])
    );
}
