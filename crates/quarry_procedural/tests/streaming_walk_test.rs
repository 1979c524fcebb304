//! # Streaming Walk Integration Test
//!
//! Walks the player across many chunks and checks the active set never
//! drifts from the neighbourhood of the player's chunk.

use std::collections::BTreeSet;

use quarry_procedural::{
    BlockType, ChunkCoord, GeneratorConfig, MemoryChunkStore, World, WorldConfig, CHUNK_SIZE,
};

fn open(store: &MemoryChunkStore) -> World {
    World::with_store(
        GeneratorConfig::default(),
        WorldConfig::default(),
        Box::new(store.clone()),
    )
    .unwrap()
}

fn expected_window(x: f32, y: f32) -> BTreeSet<ChunkCoord> {
    ChunkCoord::from_block_pos(x.floor() as i32, y.floor() as i32)
        .neighborhood(1)
        .collect()
}

/// Test: Walk 2,000 blocks east then dive, checking the window each step.
#[test]
fn test_walk_keeps_window() {
    let store = MemoryChunkStore::new();
    let mut world = open(&store);

    let mut x = 0.0f32;
    let mut y = 4.0f32;
    for step in 0..2_000 {
        x += 1.0;
        if step % 10 == 0 {
            y -= 1.0;
        }
        world.update_streaming(x, y);

        let active: BTreeSet<ChunkCoord> = world.active_coords().into_iter().collect();
        assert_eq!(active, expected_window(x, y), "Window drifted at step {step}");
    }

    let stats = world.stats();
    assert_eq!(stats.save_failures, 0);
    assert_eq!(stats.unloaded as usize, store.chunk_count());
    assert_eq!(stats.generated - stats.unloaded, 9, "Exactly the window stays in memory");
}

/// Test: Pacing back and forth across a chunk border reloads saved chunks.
#[test]
fn test_border_pacing_reloads() {
    let store = MemoryChunkStore::new();
    let mut world = open(&store);
    let border = (CHUNK_SIZE * 3) as f32;

    world.update_streaming(0.0, 0.0);
    for _ in 0..5 {
        world.update_streaming(border + 0.5, 0.0);
        world.update_streaming(border - 0.5, 0.0);
        world.update_streaming(0.0, 0.0);
    }

    let stats = world.stats();
    assert!(stats.loaded_from_store > 0, "Returning should load from the store");
    assert_eq!(world.active_coords().len(), 9);
}

/// Test: A mined tunnel stays mined after walking far away and back.
#[test]
fn test_tunnel_persists_across_walk() {
    let store = MemoryChunkStore::new();
    let mut world = open(&store);
    world.update_streaming(30.0, -20.0);

    let tunnel: Vec<(i32, i32)> = (20..40).map(|x| (x, -20)).collect();
    for &(x, y) in &tunnel {
        world.remove_block(x, y);
    }
    world.place_block(25, -19, BlockType::Terminal);

    world.update_streaming(3_000.0, -20.0);
    for &(x, _) in &tunnel {
        assert_eq!(world.block_at(x, -20), None, "Tunnel chunk should be unloaded");
    }

    world.update_streaming(30.0, -20.0);
    for &(x, y) in &tunnel {
        assert_eq!(world.block_at(x, y), Some(BlockType::Empty), "Tunnel cell ({x}, {y}) refilled");
    }
    assert_eq!(world.block_at(25, -19), Some(BlockType::Terminal));
    assert!(world.cell_at(25, -19).and_then(|c| c.device.as_ref()).is_some());
}
