//! # Persistence Integration Test
//!
//! Round-trips worlds through real save directories, with and without the
//! background writer.

use quarry_economy::{EconomyConfig, ItemKind, RecipeBook};
use quarry_procedural::{
    BackgroundStore, BlockType, ChunkCoord, ChunkStore, FsChunkStore, GeneratorConfig, World,
    WorldConfig, MANIFEST_BLOB,
};

fn config(dir: &std::path::Path, background: bool) -> WorldConfig {
    WorldConfig {
        save_dir: dir.to_path_buf(),
        background_persistence: background,
        ..WorldConfig::default()
    }
}

fn furnish(world: &mut World) {
    let recipes = RecipeBook::standard();
    let economy = EconomyConfig::default();
    world.update_streaming(0.0, 4.0);

    assert!(world.place_block(-6, 4, BlockType::Chest));
    for item in [ItemKind::Pickaxe, ItemKind::Dust, ItemKind::Dust] {
        world.feed_device(-6, 4, item, &recipes, &economy);
    }
    // Sanctuary assembler, half loaded.
    for item in [ItemKind::CopperIngot, ItemKind::Metal2Block] {
        world.feed_device(4, 3, item, &recipes, &economy);
    }
    world.remove_block(12, 5);
}

fn check(world: &mut World) {
    world.update_streaming(0.0, 4.0);
    assert_eq!(world.block_at(12, 5), Some(BlockType::Empty));

    let chest = world.cell_at(-6, 4).and_then(|c| c.device.as_ref()).unwrap();
    assert_eq!(chest.contents(), vec![(ItemKind::Dust, 2), (ItemKind::Pickaxe, 1)]);

    let assembler = world.cell_at(4, 3).and_then(|c| c.device.as_ref()).unwrap();
    assert_eq!(
        assembler.contents(),
        vec![(ItemKind::CopperIngot, 1), (ItemKind::Metal2Block, 1)]
    );
}

/// Test: Save, drop the world, reopen from disk.
#[test]
fn test_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut world = World::open(GeneratorConfig::default(), config(dir.path(), false)).unwrap();
        furnish(&mut world);
        world.save_all().unwrap();
        world.flush().unwrap();
    }

    let store = FsChunkStore::open(dir.path()).unwrap();
    assert!(store.chunk_path(ChunkCoord::new(0, 0)).exists());
    assert!(store.load_blob(MANIFEST_BLOB).unwrap().is_some());

    let mut world = World::open(GeneratorConfig::default(), config(dir.path(), false)).unwrap();
    check(&mut world);
    assert_eq!(world.stats().loaded_from_store, 9);
}

/// Test: Same round-trip through the background writer.
#[test]
fn test_reopen_with_background_writer() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut world = World::open(GeneratorConfig::default(), config(dir.path(), true)).unwrap();
        furnish(&mut world);
        // Unload by walking away; the writer may still be busy.
        world.update_streaming(400.0, 4.0);
        world.update_streaming(0.0, 4.0);
        check(&mut world);
        world.save_all().unwrap();
        world.flush().unwrap();
    }

    let mut world = World::open(GeneratorConfig::default(), config(dir.path(), false)).unwrap();
    check(&mut world);
}

/// Test: A chunk written through the background store is readable at once.
#[test]
fn test_background_store_read_after_unload() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackgroundStore::spawn(FsChunkStore::open(dir.path()).unwrap()).unwrap();
    let coord = ChunkCoord::new(-4, 2);

    for round in 0..20u8 {
        store.save_chunk(coord, format!("{{\"round\":{round}}}").into_bytes()).unwrap();
        let seen = store.load_chunk(coord).unwrap().unwrap();
        assert_eq!(seen, format!("{{\"round\":{round}}}").into_bytes());
    }
    store.flush().unwrap();
    let on_disk = std::fs::read(store.inner().chunk_path(coord)).unwrap();
    assert_eq!(on_disk, b"{\"round\":19}".to_vec());
}

/// Test: A save made with another seed still opens, keeping its manifest.
#[test]
fn test_manifest_mismatch_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    {
        let world = World::open(GeneratorConfig::default(), config(dir.path(), false)).unwrap();
        assert_eq!(world.manifest().seed, GeneratorConfig::default().seed);
    }
    let other = GeneratorConfig {
        seed: 17,
        ..GeneratorConfig::default()
    };
    let world = World::open(other, config(dir.path(), false)).unwrap();
    assert_eq!(world.manifest().seed, GeneratorConfig::default().seed);
}

/// Test: Hand-edited device counters load clamped and keep working.
#[test]
fn test_oversized_device_counters_reload() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = FsChunkStore::open(dir.path()).unwrap();
        let bytes = br#"{
            "10_4": { "type": "press", "meta": { "sc": 7, "du": 99999999999, "sh": 0 } },
            "11_4": { "type": "terminal", "meta": { "ur": 4000000000 } },
            "12_4": { "type": "chest", "meta": { "inv": { "scrap": 18446744073709551615 } } }
        }"#;
        store.save_chunk(ChunkCoord::new(-1, 0), bytes.to_vec()).unwrap();
    }

    let recipes = RecipeBook::standard();
    let economy = EconomyConfig::default();
    let cap = quarry_economy::MAX_STORED_UNITS;
    let mut world = World::open(GeneratorConfig::default(), config(dir.path(), false)).unwrap();
    world.update_streaming(0.0, 4.0);

    let press = world.cell_at(-6, 4).and_then(|c| c.device.as_ref()).unwrap();
    assert_eq!(press.contents(), vec![(ItemKind::Scrap, 7), (ItemKind::Dust, cap)]);

    // Scrap already past the plate threshold drains on the next feed.
    let plates = world.feed_device(-6, 4, ItemKind::Scrap, &recipes, &economy).unwrap();
    assert_eq!(plates.produced, vec![ItemKind::Metal2Block; 4]);
    let energy = world.feed_device(-6, 4, ItemKind::Shard, &recipes, &economy).unwrap();
    assert_eq!(energy.produced, vec![ItemKind::EnergyDust]);

    let drill = world.feed_device(-5, 4, ItemKind::UraniumRod, &recipes, &economy).unwrap();
    assert_eq!(drill.produced, vec![ItemKind::QuantumDrill]);

    let chest = world.dismantle(-4, 4).unwrap();
    assert_eq!(chest.block, BlockType::Chest);
    assert_eq!(chest.contents.len(), cap as usize);
}
