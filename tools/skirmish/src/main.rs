//! skirmish: run the stock pirate raid headless and print a JSON summary.
//!
//! Usage:
//!   skirmish [--seed N] [--ticks N] [--catalog catalog.json]
//!
//! Log verbosity follows `RUST_LOG` (default: info).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process;

use glam::Vec2;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use starfray_core::catalog::CombatCatalog;
use starfray_core::enums::{MovementMode, NpcState, VisualKind};
use starfray_core::events::CombatEvent;
use starfray_core::interfaces::Locomotion;
use starfray_core::state::CombatSnapshot;
use starfray_core::types::{EntityHandle, FactionId, MoveTarget, VisualHandle};
use starfray_sim::world_setup;
use starfray_sim::{CombatEngine, EngineConfig};

/// Cruise speed of every hull in the demo, units per second.
const CRUISE_SPEED: f32 = 120.0;

struct Options {
    seed: u64,
    ticks: u64,
    catalog: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h" || a == "help") {
        print_usage();
        return;
    }
    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            process::exit(1);
        }
    };

    let catalog = match &options.catalog {
        Some(path) => match load_catalog(path) {
            Ok(catalog) => catalog,
            Err(msg) => {
                eprintln!("Error: {msg}");
                process::exit(1);
            }
        },
        None => CombatCatalog::default(),
    };

    match run(&options, catalog) {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: cannot encode summary: {e}");
                process::exit(1);
            }
        },
        Err(msg) => {
            eprintln!("Error: {msg}");
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "skirmish: STARFRAY headless combat demo\n\
         \n\
           --seed <N>        RNG seed (default: 42)\n\
           --ticks <N>       Ticks to simulate (default: 1800)\n\
           --catalog <path>  Load ships, weapons and profiles from JSON\n\
         \n\
         Example:\n\
         \n\
           RUST_LOG=starfray_sim=debug skirmish --seed 7 --ticks 600\n"
    );
}

fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        seed: 42,
        ticks: 1_800,
        catalog: None,
    };
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("Missing value for {flag}"))?;
        match flag.as_str() {
            "--seed" => {
                options.seed = value
                    .parse()
                    .map_err(|_| format!("Invalid seed: {value}"))?;
            }
            "--ticks" => {
                options.ticks = value
                    .parse()
                    .map_err(|_| format!("Invalid tick count: {value}"))?;
            }
            "--catalog" => options.catalog = Some(PathBuf::from(value)),
            other => return Err(format!("Unknown option: {other}")),
        }
    }
    Ok(options)
}

fn load_catalog(path: &PathBuf) -> Result<CombatCatalog, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    CombatCatalog::from_json(&json).map_err(|e| format!("{}: {e}", path.display()))
}

// ---- Host side: a toy flight model driven by the engine's movement orders ----

#[derive(Debug, Clone, Copy)]
struct Order {
    mode: MovementMode,
    distance: Option<f32>,
    target: MoveTarget,
}

#[derive(Debug, Default)]
struct SteeringHost {
    orders: BTreeMap<EntityHandle, Order>,
    next_visual: u32,
    visuals_spawned: BTreeMap<String, usize>,
}

impl SteeringHost {
    fn order(&mut self, entity: EntityHandle) -> &mut Order {
        self.orders.entry(entity).or_insert(Order {
            mode: MovementMode::MoveTo,
            distance: None,
            target: MoveTarget::default(),
        })
    }

    /// New position and velocity for every live combatant.
    fn fly(&self, snapshot: &CombatSnapshot, dt: f32) -> Vec<(EntityHandle, Vec2, Vec2)> {
        let positions: BTreeMap<EntityHandle, Vec2> = snapshot
            .combatants
            .iter()
            .map(|c| (c.handle, c.position))
            .collect();

        snapshot
            .combatants
            .iter()
            .filter(|c| c.state != NpcState::Destroyed)
            .map(|c| {
                let velocity = match self.orders.get(&c.handle) {
                    Some(order) => {
                        let goal = order
                            .target
                            .entity
                            .and_then(|e| positions.get(&e).copied())
                            .unwrap_or(order.target.position);
                        steer(order, c.position, goal, dt)
                    }
                    None => Vec2::ZERO,
                };
                (c.handle, c.position + velocity * dt, velocity)
            })
            .collect()
    }
}

fn steer(order: &Order, position: Vec2, goal: Vec2, dt: f32) -> Vec2 {
    let offset = position - goal;
    match order.mode {
        MovementMode::MoveTo | MovementMode::Pursue => {
            let gap = offset.length() - order.distance.unwrap_or(0.0);
            if gap <= 1.0 || dt <= 0.0 {
                Vec2::ZERO
            } else {
                -offset.normalize_or_zero() * CRUISE_SPEED.min(gap / dt)
            }
        }
        MovementMode::Flee => {
            if order.distance.is_some_and(|d| offset.length() >= d) {
                Vec2::ZERO
            } else {
                offset.normalize_or_zero() * CRUISE_SPEED
            }
        }
        MovementMode::Orbit => {
            let radius = order.distance.unwrap_or(offset.length());
            let radial = offset.normalize_or_zero();
            let correction = ((radius - offset.length()) / radius.max(1.0)).clamp(-1.0, 1.0);
            (radial.perp() + radial * correction).normalize_or_zero() * CRUISE_SPEED
        }
    }
}

impl Locomotion for SteeringHost {
    fn set_mode(&mut self, entity: EntityHandle, mode: MovementMode, distance: Option<f32>) {
        let order = self.order(entity);
        order.mode = mode;
        order.distance = distance;
    }

    fn set_target(&mut self, entity: EntityHandle, target: MoveTarget) {
        self.order(entity).target = target;
    }

    fn spawn_visual(&mut self, kind: VisualKind, _position: Vec2, _heading: f32) -> VisualHandle {
        *self.visuals_spawned.entry(format!("{kind:?}")).or_insert(0) += 1;
        self.next_visual += 1;
        VisualHandle(self.next_visual)
    }

    fn destroy_visual(&mut self, _visual: VisualHandle) {}
}

// ---- Run ----

#[derive(Debug, Serialize)]
struct Survivor {
    handle: EntityHandle,
    faction: FactionId,
    state: NpcState,
    hp: f32,
}

#[derive(Debug, Serialize)]
struct Summary {
    seed: u64,
    ticks: u64,
    elapsed_secs: f64,
    shots: usize,
    beams: usize,
    hits: usize,
    damage_dealt: f32,
    destroyed: Vec<EntityHandle>,
    visuals: BTreeMap<String, usize>,
    survivors: Vec<Survivor>,
}

fn run(options: &Options, catalog: CombatCatalog) -> Result<Summary, String> {
    let config = EngineConfig {
        seed: options.seed,
        ..EngineConfig::default()
    };
    let dt = config.tick_ms as f32 / 1000.0;
    let mut engine = CombatEngine::new(
        config,
        catalog,
        world_setup::skirmish_factions(),
        SteeringHost::default(),
    )
    .map_err(|e| e.to_string())?;

    for spawn in world_setup::skirmish_roster() {
        engine.spawn(spawn).map_err(|e| e.to_string())?;
    }
    info!(seed = options.seed, ticks = options.ticks, combatants = engine.handles().len(), "skirmish started");

    let mut summary = Summary {
        seed: options.seed,
        ticks: options.ticks,
        elapsed_secs: 0.0,
        shots: 0,
        beams: 0,
        hits: 0,
        damage_dealt: 0.0,
        destroyed: Vec::new(),
        visuals: BTreeMap::new(),
        survivors: Vec::new(),
    };

    let mut last = engine.snapshot();
    for _ in 0..options.ticks {
        for (handle, position, velocity) in engine.locomotion().fly(&last, dt) {
            engine
                .set_kinematics(handle, position, velocity)
                .map_err(|e| e.to_string())?;
        }
        last = engine.tick();
        for event in &last.events {
            match event {
                CombatEvent::WeaponFired { .. } => summary.shots += 1,
                CombatEvent::BeamActivated { .. } => summary.beams += 1,
                CombatEvent::Damaged { amount, .. } => {
                    summary.hits += 1;
                    summary.damage_dealt += amount;
                }
                CombatEvent::Destroyed { entity, .. } => summary.destroyed.push(*entity),
                _ => {}
            }
        }
    }

    summary.elapsed_secs = engine.time().elapsed_secs();
    summary.visuals = engine.locomotion().visuals_spawned.clone();
    summary.survivors = last
        .combatants
        .iter()
        .map(|c| Survivor {
            handle: c.handle,
            faction: c.faction.clone(),
            state: c.state,
            hp: c.hp,
        })
        .collect();
    info!(
        destroyed = summary.destroyed.len(),
        shots = summary.shots,
        "skirmish finished"
    );
    Ok(summary)
}
