//! # Save/Load Integration Test
//!
//! A session is played, saved and dropped; a fresh simulation over the
//! same directory must see the same world and inventory.

use quarry::economy::ItemKind;
use quarry::procedural::{BlockType, FsChunkStore};
use quarry::{EventBus, GameConfig, Simulation, INVENTORY_BLOB};

const DT: f32 = 1.0 / 60.0;

fn config(dir: &std::path::Path, background: bool) -> GameConfig {
    let mut config = GameConfig::default();
    config.world.save_dir = dir.to_path_buf();
    config.world.background_persistence = background;
    config
}

fn play_session(config: GameConfig) {
    let (sender, _receiver) = EventBus::create_pair(4096);
    let mut sim = Simulation::open(config, sender).unwrap();
    sim.set_player_position(-4.5, 3.5);

    sim.add_to_inventory(ItemKind::Chest, 1);
    sim.add_to_inventory(ItemKind::Pickaxe, 1);
    sim.add_to_inventory(ItemKind::Dust, 7);
    assert!(sim.place_from_inventory(ItemKind::Chest, 6, 4).unwrap());

    sim.spawn_item(ItemKind::Shard, 6.5, 4.5, true, 0.0);
    sim.spawn_item(ItemKind::Shard, 6.5, 4.5, true, 0.0);
    sim.spawn_item(ItemKind::Scrap, 2.5, 3.5, true, 0.0);
    sim.tick(DT);

    let report = sim.mine(-1, 2, Some(ItemKind::Pickaxe));
    assert_eq!(report.broken, vec![((-1, 2), BlockType::Core)]);

    sim.save_game().unwrap();
}

fn check_session(config: GameConfig) {
    let (sender, _receiver) = EventBus::create_pair(4096);
    let mut sim = Simulation::open(config, sender).unwrap();
    assert!(sim.player().inventory.is_empty(), "Inventory is only restored on request");
    assert!(sim.load_inventory().unwrap());

    let inv = &sim.player().inventory;
    assert_eq!(inv.count(ItemKind::Dust), 7);
    assert_eq!(inv.count(ItemKind::Pickaxe), 1);
    assert_eq!(inv.count(ItemKind::Chest), 0);

    assert_eq!(sim.world().block_at(-1, 2), Some(BlockType::Empty));
    assert_eq!(sim.world().block_at(6, 4), Some(BlockType::Chest));
    assert_eq!(sim.hover_info(6, 4), Some(vec![(ItemKind::Shard, 2)]));
    assert_eq!(sim.hover_info(2, 3), Some(vec![(ItemKind::Scrap, 1)]));
}

#[test]
fn test_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    play_session(config(dir.path(), false));
    check_session(config(dir.path(), false));
}

#[test]
fn test_session_survives_restart_with_background_writer() {
    let dir = tempfile::tempdir().unwrap();
    play_session(config(dir.path(), true));
    check_session(config(dir.path(), true));
}

#[test]
fn test_inventory_file_is_flat_json() {
    let dir = tempfile::tempdir().unwrap();
    play_session(config(dir.path(), false));

    let raw = std::fs::read(dir.path().join(INVENTORY_BLOB)).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["dust"], 7);
    assert_eq!(value["pickaxe"], 1);
    assert!(value.get("chest").is_none());
}

#[test]
fn test_walking_away_and_back_keeps_changes() {
    let dir = tempfile::tempdir().unwrap();
    let (sender, _receiver) = EventBus::create_pair(4096);
    let mut sim = Simulation::open(config(dir.path(), false), sender).unwrap();

    sim.add_to_inventory(ItemKind::GlassBlock, 1);
    assert!(sim.place_from_inventory(ItemKind::GlassBlock, -6, 5).unwrap());

    sim.set_player_position(200.0, 4.5);
    sim.tick(DT);
    assert_eq!(sim.world().block_at(-6, 5), None, "Origin chunk streamed out");
    let store = FsChunkStore::open(dir.path()).unwrap();
    assert!(store.chunk_path(quarry::procedural::ChunkCoord::new(-1, 0)).exists());

    sim.set_player_position(0.5, 4.5);
    sim.tick(DT);
    assert_eq!(sim.world().block_at(-6, 5), Some(BlockType::Glass));
}
