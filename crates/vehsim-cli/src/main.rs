//! vehsim CLI - run and inspect vehicle simulation worlds

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use vehsim_physics::{DefaultFriction, DynamicsRegistry, OdometrySensor, VehicleLog, World, WorldDescriptor};
use vehsim_shape::Polygon2;

#[derive(Parser)]
#[command(name = "vehsim")]
#[command(about = "Multi-vehicle 2D simulator", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a world file and simulate it
    Run {
        /// World file (.toml or .json)
        world: PathBuf,
        /// Simulated time (s)
        #[arg(short, long, default_value_t = 10.0)]
        duration: f64,
        /// Time advanced per reported frame (s); defaults to the world timestep
        #[arg(long)]
        dt: Option<f64>,
        /// Record every vehicle and write the logs to this JSON file
        #[arg(long)]
        dump_log: Option<PathBuf>,
    },
    /// Print the collision footprints of a world
    Shape {
        /// World file (.toml or .json)
        world: PathBuf,
    },
    /// List the built-in models, or summarize a world file
    Info {
        /// World file (.toml or .json)
        world: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            world,
            duration,
            dt,
            dump_log,
        } => run_world(&world, duration, dt, dump_log.as_deref())?,
        Commands::Shape { world } => show_shapes(&world)?,
        Commands::Info { world } => show_info(world.as_deref())?,
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn load_world(path: &Path) -> Result<World> {
    World::from_path(path).with_context(|| format!("failed to load world {}", path.display()))
}

fn run_world(path: &Path, duration: f64, dt: Option<f64>, dump_log: Option<&Path>) -> Result<()> {
    if !(duration.is_finite() && duration >= 0.0) {
        anyhow::bail!("Duration must be a non-negative number, got {}", duration);
    }
    let mut world = load_world(path)?;
    let frame = dt.unwrap_or(world.params().timestep);
    if !(frame.is_finite() && frame > 0.0) {
        anyhow::bail!("Frame step must be positive, got {}", frame);
    }
    if dump_log.is_some() {
        world.set_recording(true);
    }

    let mut steps = 0;
    while world.simul_time() + frame <= duration + 1e-9 {
        steps += world.run_simulation(frame)?;
        log::trace!("t = {:.3} s", world.simul_time());
    }
    log::info!("simulated {:.3} s in {} steps", world.simul_time(), steps);

    println!("t = {:.3} s", world.simul_time());
    for vehicle in world.vehicles() {
        let q = vehicle.pose();
        let v = vehicle.velocity();
        println!(
            "  {:<16} x={:>9.4} y={:>9.4} yaw={:>8.2}°  vx={:>8.4} vy={:>8.4} ω={:>8.4}",
            vehicle.name(),
            q.x,
            q.y,
            q.yaw.to_degrees(),
            v.vx,
            v.vy,
            v.omega
        );
        for (sensor, obs) in vehicle.observations() {
            println!("    {}: {}", sensor, serde_json::to_string(&obs)?);
        }
    }

    if let Some(out) = dump_log {
        let logs: BTreeMap<&str, &VehicleLog> = world.vehicles().iter().map(|v| (v.name(), v.log())).collect();
        let file = File::create(out).with_context(|| format!("cannot create {}", out.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &logs)?;
        println!("Wrote logs of {} vehicles to {}", logs.len(), out.display());
    }

    Ok(())
}

#[derive(Serialize)]
struct FootprintReport<'a> {
    kind: &'static str,
    name: &'a str,
    area: f64,
    vertices: Vec<[f64; 2]>,
}

impl<'a> FootprintReport<'a> {
    fn new(kind: &'static str, name: &'a str, poly: &Polygon2) -> Self {
        Self {
            kind,
            name,
            area: poly.area(),
            vertices: poly.points.iter().map(|p| [p.x, p.y]).collect(),
        }
    }
}

fn show_shapes(path: &Path) -> Result<()> {
    let world = load_world(path)?;
    let mut reports: Vec<FootprintReport<'_>> = world
        .vehicles()
        .iter()
        .map(|v| FootprintReport::new("vehicle", v.name(), v.chassis_polygon()))
        .collect();
    reports.extend(
        world
            .blocks()
            .iter()
            .map(|b| FootprintReport::new("block", b.name(), b.footprint())),
    );

    println!("{}", serde_json::to_string_pretty(&reports)?);
    log::info!("{} collision shapes cached", world.shape_cache().len());
    Ok(())
}

fn show_info(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        println!("Drivetrains:     {}", DynamicsRegistry::with_builtin().names().join(", "));
        println!("Friction models: {}", DefaultFriction::NAME);
        println!("Sensors:         {}", OdometrySensor::NAME);
        return Ok(());
    };

    let desc = WorldDescriptor::from_path(path).with_context(|| format!("failed to read {}", path.display()))?;
    desc.validate()?;

    println!("World: {}", path.display());
    println!("  Timestep: {} s", desc.simulation.timestep);
    println!("  Gravity:  {} m/s²", desc.simulation.gravity);
    println!("  Classes:  {}", desc.vehicle_classes.len());
    for name in desc.vehicle_classes.keys() {
        println!("    - {}", name);
    }
    println!("  Vehicles: {}", desc.vehicles.len());
    for (i, v) in desc.vehicles.iter().enumerate() {
        let name = v.name.clone().unwrap_or_else(|| format!("veh{}", i + 1));
        let class = v.class.as_deref().unwrap_or("-");
        let dynamics = v.dynamics.as_ref().map(|d| d.class.as_str()).unwrap_or("(from class)");
        println!("    - {} (class: {}, dynamics: {})", name, class, dynamics);
    }
    println!("  Blocks:   {}", desc.blocks.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["vehsim", "-v", "run", "w.toml", "--duration", "2.5", "--dump-log", "out.json"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run {
                world,
                duration,
                dt,
                dump_log,
            } => {
                assert_eq!(world, PathBuf::from("w.toml"));
                assert_eq!(duration, 2.5);
                assert!(dt.is_none());
                assert_eq!(dump_log, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected run"),
        }
    }
}
