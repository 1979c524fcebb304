//! # QUARRY Headless
//!
//! Scripted run of the simulation without rendering or input.
//!
//! The player walks east and back across several chunk borders at 60 Hz,
//! tunnelling with a pickaxe and feeding the starter press on the way.
//! Useful as a soak test for streaming and persistence.
//!
//! ```bash
//! # Defaults: built-in config, 3600 ticks
//! ./quarry_headless
//!
//! # Custom config and length
//! RUST_LOG=quarry=debug ./quarry_headless game.toml 20000
//! ```

use std::path::PathBuf;
use std::time::Instant;

use quarry::economy::ItemKind;
use quarry::{EventBus, GameConfig, Simulation};
use tracing::info;

const TICK_DT: f32 = 1.0 / 60.0;
const DEFAULT_TICKS: u64 = 3600;
/// Walking speed in blocks per second.
const WALK_SPEED: f32 = 4.0;
/// Turn around after this far from spawn.
const WALK_RANGE: f32 = 60.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("quarry=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => GameConfig::load(&PathBuf::from(path))?,
        None => GameConfig::default(),
    };
    let ticks: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_TICKS);

    info!(save_dir = %config.world.save_dir.display(), ticks, "starting headless run");

    let bus = EventBus::new(config.event_capacity);
    let receiver = bus.receiver();
    let mut sim = Simulation::open(config, bus.sender())?;
    sim.load_inventory()?;
    sim.add_to_inventory(ItemKind::Pickaxe, 1);
    sim.add_to_inventory(ItemKind::Scrap, 8);

    let start = Instant::now();
    let [spawn_x, spawn_y] = sim.player().position;
    let mut direction = 1.0_f32;
    let mut x = spawn_x;
    let mut events_seen = 0usize;

    for tick in 0..ticks {
        x += direction * WALK_SPEED * TICK_DT;
        if (x - spawn_x).abs() > WALK_RANGE {
            direction = -direction;
        }
        sim.set_player_position(x, spawn_y);

        // Once a second: dig the tunnel ahead, and feed the press while home.
        if tick % 60 == 0 {
            let ahead = (x + direction).floor() as i32;
            sim.mine(ahead, spawn_y.floor() as i32, Some(ItemKind::Pickaxe));
            if (x - 2.5).abs() < 1.0 && sim.player().inventory.contains(ItemKind::Scrap) {
                sim.throw_from_inventory(ItemKind::Scrap, direction)?;
            }
        }

        let report = sim.tick(TICK_DT);
        if !report.streaming.is_empty() {
            info!(
                tick = report.tick,
                loaded = report.streaming.loaded.len(),
                unloaded = report.streaming.unloaded.len(),
                "chunks streamed"
            );
        }
        events_seen += receiver.drain().len();
    }

    sim.save_game()?;

    let elapsed = start.elapsed();
    let stats = sim.world().stats();
    info!(
        ticks,
        elapsed_ms = elapsed.as_millis(),
        ticks_per_sec = ticks as f64 / elapsed.as_secs_f64().max(1e-9),
        generated = stats.generated,
        loaded_from_store = stats.loaded_from_store,
        unloaded = stats.unloaded,
        save_failures = stats.save_failures,
        retained = sim.world().retained_count(),
        items = sim.items().len(),
        events = events_seen,
        "headless run complete"
    );
    Ok(())
}
