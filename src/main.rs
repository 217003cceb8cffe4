use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use town_sim::simulation::{Position, SimError, SimTown};

#[derive(Parser)]
#[command(name = "town_sim")]
#[command(about = "Town routing simulation with live rerouting")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "20")]
    ticks: u32,

    /// Number of cars to spawn at start
    #[arg(long, default_value = "4")]
    cars: u32,

    /// Perturb one random road weight every N ticks (0 disables)
    #[arg(long, default_value = "5")]
    shake_every: u32,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut town = demo_town()?;
    let names: Vec<String> = town.vertices().map(|(_, v)| v.name.clone()).collect();

    let mut active = Vec::new();
    for _ in 0..cli.cars {
        let start = &names[rng.random_range(0..names.len())];
        let mut dest = &names[rng.random_range(0..names.len())];
        while dest == start {
            dest = &names[rng.random_range(0..names.len())];
        }
        match town.add_car(start, dest) {
            Ok(id) => active.push(id),
            Err(SimError::Unreachable { car, from, to }) => {
                warn!("car {:?} spawned stranded: '{}' -> '{}'", car, from, to);
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!("starting simulation: {} ticks, {} cars", cli.ticks, active.len());
    town.print_summary();

    for tick in 1..=cli.ticks {
        if cli.shake_every > 0 && tick % cli.shake_every == 0 {
            shake_weights(&mut town, &mut rng)?;
        }

        active.retain(|&id| {
            if town.has_arrived(id).unwrap_or(true) {
                return false;
            }
            if town.is_stranded(id).unwrap_or(true) {
                warn!("car {:?} is stranded, leaving it parked", id);
                return false;
            }
            if let Err(err) = town.depart_car(id) {
                warn!("car {:?} could not depart: {}", id, err);
                return false;
            }
            match town.advance_car(id) {
                Ok(()) => true,
                Err(err) => {
                    warn!("car {:?} could not advance: {}", id, err);
                    false
                }
            }
        });

        info!("--- tick {} ---", tick);
        town.print_summary();

        if active.is_empty() {
            info!("all cars settled after {} ticks", tick);
            break;
        }
    }

    let arrived = town
        .cars()
        .filter(|&(id, _)| town.has_arrived(id).unwrap_or(false))
        .count();
    info!(
        "done: {} of {} cars arrived, {} still en route",
        arrived,
        town.car_count(),
        active.len()
    );
    Ok(())
}

/// Scale one random road's weight by 0.5x-2x to trigger rerouting
fn shake_weights(town: &mut SimTown, rng: &mut StdRng) -> Result<()> {
    let roads: Vec<_> = town.edges().map(|(id, edge)| (id, edge.weight)).collect();
    if roads.is_empty() {
        return Ok(());
    }
    let (edge, weight) = roads[rng.random_range(0..roads.len())];
    let new_weight = (weight * rng.random_range(0.5..2.0)).max(0.1);
    town.update_weight(edge, new_weight)?;
    Ok(())
}

/// A small ring-and-spokes town for the demo loop
fn demo_town() -> Result<SimTown> {
    let mut town = SimTown::new();
    let layout = [
        ("Depot", 0.0, 0.0),
        ("Market", 4.0, 0.0),
        ("Harbor", 8.0, 2.0),
        ("Mill", 6.0, 5.0),
        ("Chapel", 2.0, 6.0),
        ("Gate", -2.0, 3.0),
    ];
    for (name, x, y) in layout {
        town.add_vertex(name, Position::new(x, y))?;
    }
    let roads = [
        ("Depot", "Market", 4.0),
        ("Market", "Harbor", 5.0),
        ("Harbor", "Mill", 3.0),
        ("Mill", "Chapel", 4.0),
        ("Chapel", "Gate", 4.0),
        ("Gate", "Depot", 3.0),
        ("Depot", "Mill", 9.0),
        ("Market", "Chapel", 7.0),
    ];
    for (a, b, weight) in roads {
        town.connect_vertices_two_way(a, b, weight)?;
    }
    Ok(town)
}
