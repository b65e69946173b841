#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a Lane Defence match headless.

mod scenario;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use lane_defence_core::{MatchState, TowerKind, TICK_INTERVAL};
use lane_defence_session::Session;
use lane_defence_world::query;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::{BuildAction, Scenario};

/// Runs a scenario tick by tick without a display and prints the outcome.
#[derive(Debug, Parser)]
#[command(name = "lane-defence", version, about)]
struct Cli {
    /// TOML scenario to play. The built-in map and waves are used when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Maximum number of 100 ms ticks to simulate.
    #[arg(long, default_value_t = 6_000)]
    ticks: u32,
    /// Game speed multiplier, clamped to 0.25..=4.
    #[arg(long)]
    speed: Option<f32>,
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Final state of a headless run.
#[derive(Debug, Serialize)]
struct Summary {
    map: String,
    state: MatchState,
    ticks: u32,
    run_time_secs: f32,
    waves_cleared: u32,
    total_waves: u32,
    base_hp: u32,
    money: u32,
    score: u32,
    towers: usize,
    walls: usize,
    enemies_alive: usize,
}

/// Entry point for the Lane Defence command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    install_logging(&cli.log_level)?;

    let scenario = match &cli.scenario {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario {}", path.display()))?;
            Scenario::from_toml(&text)
                .with_context(|| format!("invalid scenario {}", path.display()))?
        }
        None => Scenario::fallback(),
    };

    let mut session = Session::new(scenario.config);
    println!("{}", query::welcome_banner(session.world()));
    session.start();
    if let Some(speed) = cli.speed {
        session.set_speed(speed);
    }
    apply_build(&mut session, &scenario.build);

    let ticks = run(&mut session, cli.ticks);
    let summary = summarize(&session, ticks);

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode summary")?
        );
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn install_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to install log subscriber: {error}"))
}

fn apply_build(session: &mut Session, build: &[BuildAction]) {
    for action in build {
        match *action {
            BuildAction::Tower(cell) => {
                if let Err(reason) = session.place_tower_at(TowerKind::Basic, cell) {
                    warn!(?cell, %reason, "scripted tower skipped");
                }
            }
            BuildAction::Wall(a, b) => {
                if let Err(reason) = session.add_wall(a, b) {
                    warn!(?a, ?b, %reason, "scripted wall skipped");
                }
            }
        }
    }

    for path in session.trace_paths_for_next_wave() {
        info!(length = path.len(), "route to the base for the first wave");
    }
}

fn run(session: &mut Session, max_ticks: u32) -> u32 {
    let mut ticks = 0;
    while ticks < max_ticks && !query::match_state(session.world()).is_finished() {
        session.update(TICK_INTERVAL);
        ticks += 1;
    }
    ticks
}

fn summarize(session: &Session, ticks: u32) -> Summary {
    let world = session.world();
    Summary {
        map: query::map(world).name.clone(),
        state: query::match_state(world),
        ticks,
        run_time_secs: query::run_time(world).as_secs_f32(),
        waves_cleared: query::waves_cleared(world),
        total_waves: query::total_waves(world),
        base_hp: query::base_hp(world),
        money: query::money(world),
        score: query::score(world),
        towers: query::tower_count(world),
        walls: query::walls(world).len(),
        enemies_alive: session.enemies_alive(),
    }
}

fn print_summary(summary: &Summary) {
    println!("map:           {}", summary.map);
    println!("result:        {:?} after {} ticks", summary.state, summary.ticks);
    println!("run time:      {:.1}s", summary.run_time_secs);
    println!("waves cleared: {}/{}", summary.waves_cleared, summary.total_waves);
    println!("base hp:       {}", summary.base_hp);
    println!("money:         {}", summary.money);
    println!("score:         {}", summary.score);
    println!("towers/walls:  {}/{}", summary.towers, summary.walls);
    println!("enemies alive: {}", summary.enemies_alive);
}
