//! # Machine Scenario Tests
//!
//! Drives whole production chains through the simulation: items are thrown
//! into machines, outputs drop out above them and travel back to the
//! player.

use quarry::economy::ItemKind;
use quarry::procedural::{BlockType, MemoryChunkStore};
use quarry::{EventBus, EventReceiver, GameConfig, GameEvent, Simulation};

const DT: f32 = 1.0 / 60.0;

/// Far enough west of the starter machines not to collect their output,
/// close enough to keep the origin chunk active.
const BYSTANDER: (f32, f32) = (-4.5, 3.5);

fn setup() -> (Simulation, EventReceiver) {
    let (sender, receiver) = EventBus::create_pair(8192);
    let mut sim = Simulation::new(GameConfig::default(), Box::new(MemoryChunkStore::new()), sender).unwrap();
    sim.set_player_position(BYSTANDER.0, BYSTANDER.1);
    (sim, receiver)
}

fn throw_into(sim: &mut Simulation, cell: (i32, i32), items: &[ItemKind]) {
    for &item in items {
        sim.spawn_item(item, cell.0 as f32 + 0.5, cell.1 as f32 + 0.5, true, 0.0);
    }
    sim.tick(DT);
}

fn lying_items(sim: &Simulation) -> Vec<ItemKind> {
    sim.items().items().iter().map(|i| i.kind).collect()
}

#[test]
fn test_press_makes_plates_and_energy() {
    let (mut sim, _events) = setup();
    throw_into(
        &mut sim,
        (2, 3),
        &[ItemKind::Scrap, ItemKind::Scrap, ItemKind::Dust, ItemKind::Shard, ItemKind::Scrap],
    );

    assert_eq!(lying_items(&sim), vec![ItemKind::Metal2Block, ItemKind::EnergyDust]);
    assert_eq!(sim.hover_info(2, 3), Some(vec![(ItemKind::Scrap, 1)]));
}

#[test]
fn test_assembler_builds_pickaxe() {
    let (mut sim, events) = setup();
    throw_into(
        &mut sim,
        (4, 3),
        &[
            ItemKind::CopperIngot,
            ItemKind::Metal2Block,
            ItemKind::CopperIngot,
            ItemKind::Metal2Block,
            ItemKind::CopperIngot,
        ],
    );
    assert!(lying_items(&sim).is_empty());

    throw_into(&mut sim, (4, 3), &[ItemKind::EnergyDust]);
    assert_eq!(lying_items(&sim), vec![ItemKind::Pickaxe]);
    assert_eq!(sim.hover_info(4, 3), Some(Vec::new()));

    let consumed = events
        .drain()
        .iter()
        .filter(|e| matches!(e, GameEvent::ItemConsumed { device: BlockType::Assembler, .. }))
        .count();
    assert_eq!(consumed, 6);
}

#[test]
fn test_assembler_wastes_energy_on_bad_mix() {
    let (mut sim, _events) = setup();
    throw_into(&mut sim, (4, 3), &[ItemKind::Dust, ItemKind::EnergyDust]);
    assert_eq!(lying_items(&sim), vec![ItemKind::EnergyDust]);
    assert_eq!(sim.hover_info(4, 3), Some(vec![(ItemKind::Dust, 1)]));
}

#[test]
fn test_placed_furnace_smelts() {
    let (mut sim, _events) = setup();
    sim.add_to_inventory(ItemKind::Furnace, 1);
    assert!(sim.place_from_inventory(ItemKind::Furnace, -6, 3).unwrap());

    throw_into(&mut sim, (-6, 3), &[ItemKind::Copper, ItemKind::EnergyDust]);
    throw_into(&mut sim, (-6, 3), &[ItemKind::TitaniumOre, ItemKind::EnergyDust]);
    let smelted: Vec<ItemKind> = lying_items(&sim)
        .into_iter()
        .filter(|k| matches!(k, ItemKind::CopperIngot | ItemKind::TitaniumIngot))
        .collect();
    assert_eq!(smelted, vec![ItemKind::CopperIngot, ItemKind::TitaniumIngot]);
}

#[test]
fn test_terminal_prints_drill_on_fifth_rod() {
    let (mut sim, _events) = setup();
    assert!(sim.world_mut().place_block(6, 3, BlockType::Terminal));

    throw_into(&mut sim, (6, 3), &[ItemKind::UraniumRod; 4]);
    assert!(lying_items(&sim).is_empty());
    assert_eq!(sim.hover_info(6, 3), Some(vec![(ItemKind::UraniumRod, 4)]));

    throw_into(&mut sim, (6, 3), &[ItemKind::UraniumRod]);
    assert_eq!(lying_items(&sim), vec![ItemKind::QuantumDrill]);
    assert_eq!(sim.hover_info(6, 3), Some(Vec::new()));
}

#[test]
fn test_full_chest_leaves_new_kind_lying() {
    let (mut sim, _events) = setup();
    assert!(sim.world_mut().place_block(6, 3, BlockType::Chest));
    let limit = sim.config().economy.chest_distinct_limit;

    let kinds: Vec<ItemKind> = ItemKind::ALL.iter().copied().take(limit).collect();
    throw_into(&mut sim, (6, 3), &kinds);
    assert!(lying_items(&sim).is_empty());

    let extra = ItemKind::ALL[limit];
    throw_into(&mut sim, (6, 3), &[extra, kinds[0]]);
    assert_eq!(lying_items(&sim), vec![extra], "Only the new kind is refused");
    let contents = sim.hover_info(6, 3).unwrap();
    assert_eq!(contents.len(), limit);
    assert!(contents.contains(&(kinds[0], 2)));
}

#[test]
fn test_output_travels_to_player() {
    let (mut sim, events) = setup();
    throw_into(&mut sim, (2, 3), &[ItemKind::Scrap, ItemKind::Scrap]);
    assert_eq!(lying_items(&sim), vec![ItemKind::Metal2Block]);

    sim.set_player_position(2.5, 3.6);
    for _ in 0..180 {
        sim.tick(DT);
    }
    assert!(lying_items(&sim).is_empty());
    assert_eq!(sim.player().inventory.count(ItemKind::Metal2Block), 1);
    assert!(events
        .drain()
        .iter()
        .any(|e| matches!(e, GameEvent::ItemPickedUp { item: ItemKind::Metal2Block, total: 1 })));
}

#[test]
fn test_extractor_turns_dust_into_mana() {
    let (mut sim, _events) = setup();
    sim.player_mut().spend_mana(100);
    throw_into(&mut sim, (0, 3), &[ItemKind::Dust, ItemKind::Dust, ItemKind::Shard]);
    assert_eq!(sim.player().mana(), 200);
    assert_eq!(lying_items(&sim), vec![ItemKind::Shard]);
}

#[test]
fn test_thrown_acid_flask_clears_rock() {
    let (mut sim, events) = setup();
    for (x, y, block) in [
        (6, 4, BlockType::Metal),
        (6, 5, BlockType::Glass),
        (7, 4, BlockType::Monolith),
        (5, 4, BlockType::Chest),
        (7, 6, BlockType::DeepSlate),
    ] {
        assert!(sim.world_mut().place_block(x, y, block));
    }

    sim.add_to_inventory(ItemKind::AcidFlask, 1);
    sim.set_player_position(5.35, 5.5);
    sim.throw_from_inventory(ItemKind::AcidFlask, 1.0).unwrap();
    for _ in 0..3 {
        sim.tick(DT);
    }

    assert_eq!(sim.world().block_at(6, 4), Some(BlockType::Empty));
    assert_eq!(sim.world().block_at(6, 5), Some(BlockType::Empty));
    assert_eq!(sim.world().block_at(7, 6), Some(BlockType::Empty));
    assert_eq!(sim.world().block_at(7, 4), Some(BlockType::Monolith));
    assert_eq!(sim.world().block_at(5, 4), Some(BlockType::Chest));
    assert!(sim.items().is_empty());

    let removed = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, GameEvent::BlockRemoved { .. }))
        .count();
    assert_eq!(removed, 3);
}
