#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scenario through the tick loop and
//! reports where everything ended up.

mod layout_transfer;
mod runner;
mod scenario;
mod simulation;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tilemotion_core::CellCoord;
use tilemotion_world::{query, registry::describe, BlockRegistry, WorldSnapshot};

use crate::{
    layout_transfer::BlockLayout,
    runner::RunConfig,
    scenario::Scenario,
    simulation::Simulation,
};

/// Runs a grid-motion scenario headless or paced in real time.
#[derive(Debug, Parser)]
#[command(name = "tilemotion", version)]
struct Args {
    /// Scenario TOML file; the built-in meadow is used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u64,
    /// Duration of one tick in milliseconds.
    #[arg(long, default_value_t = 16)]
    tick_millis: u64,
    /// Interval between render samples in milliseconds.
    #[arg(long, default_value_t = 33)]
    render_millis: u64,
    /// Pace ticks against the wall clock and sample frames on a render thread.
    #[arg(long)]
    realtime: bool,
    /// Overrides the scenario's fox count.
    #[arg(long)]
    foxes: Option<usize>,
    /// Seed for scattering foxes.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Writes the final world as JSON to this path.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Resumes from a world previously written with `--save`.
    #[arg(long, conflicts_with = "layout")]
    resume: Option<PathBuf>,
    /// Replaces the scenario's blocks with a `grid:v1` layout string.
    #[arg(long)]
    layout: Option<String>,
    /// Prints the final layout as map rows and as a layout string.
    #[arg(long)]
    print_layout: bool,
}

/// Entry point for the tilemotion command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let registry = BlockRegistry::standard();

    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path, &registry)?,
        None => Scenario::builtin(&registry)?,
    };
    if let Some(foxes) = args.foxes {
        scenario.fox_count = foxes;
    }
    if let Some(layout) = &args.layout {
        let layout = BlockLayout::decode(layout).context("invalid --layout string")?;
        scenario.grid = layout.into_grid();
    }

    let simulation = match &args.resume {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read save {}", path.display()))?;
            let snapshot: WorldSnapshot = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse save {}", path.display()))?;
            Simulation::resume(snapshot, scenario)?
        }
        None => Simulation::new(scenario, args.seed),
    };

    let config = RunConfig {
        ticks: args.ticks,
        tick: Duration::from_millis(args.tick_millis),
        render: Duration::from_millis(args.render_millis),
        realtime: args.realtime,
    };
    info!(
        "running {} ticks of {:?}{}",
        config.ticks,
        config.tick,
        if config.realtime { " in real time" } else { "" }
    );
    let simulation = runner::run(simulation, config)?;
    let world = simulation.world();

    println!("tick {}", query::tick_index(world));
    for entity in query::entity_view(world).iter() {
        let ground = query::block_at(world, CellCoord::containing(entity.position))
            .map_or_else(|| "void".to_string(), describe);
        println!(
            "{:?} {} at {} on {ground}, moving {}, health {}",
            entity.kind,
            entity.id.get(),
            entity.position,
            entity.velocity,
            entity.health
        );
    }

    if args.print_layout {
        if let Some((origin, rows)) = registry.render_rows(query::grid(world)) {
            println!("origin {origin}");
            for row in rows {
                println!("{row}");
            }
        }
        let encoded = BlockLayout::capture(query::grid(world))
            .encode()
            .context("failed to encode layout")?;
        println!("{encoded}");
    }

    if let Some(path) = &args.save {
        let json = serde_json::to_string_pretty(&query::snapshot(world))
            .context("failed to serialise world")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("saved world to {}", path.display());
    }

    Ok(())
}
