use crate::config::{Destination, SimConfig};
use anyhow::{Context, Result};
use hopperline_core::{blocks, items, BlockPos, Face, ItemStack, ItemType, SimTick};
use hopperline_testkit::{EventRecord, JsonlSink};
use hopperline_world::{
    capture_world, restore_world, Block, BlockEntityStore, BlockMap, BlockWorld, Chest,
    Furnace, Hopper, TickSummary,
};
use tracing::{debug, info};

const SOURCE_POS: BlockPos = BlockPos::new(0, 65, 0);
const HOPPER_POS: BlockPos = BlockPos::new(0, 64, 0);

/// Totals of a headless run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub ticks: u64,
    pub transfers: usize,
    pub blocked: usize,
    /// Item units still in the source chest.
    pub source_left: u64,
    /// Item units that reached the final container.
    pub delivered: u64,
}

/// Where the layout delivers to.
fn sink_pos(destination: Destination) -> BlockPos {
    match destination {
        Destination::Chest => HOPPER_POS.side(Face::East),
        // Furnace below the hopper, collector hopper below it, chest at the bottom.
        Destination::Furnace => HOPPER_POS.side(Face::Down).side(Face::Down).side(Face::Down),
    }
}

fn fill_chest(chest: &Chest, item: ItemType, mut count: u32) -> Result<()> {
    let stack_size = item.max_stack_size();
    while count > 0 {
        let moved = count.min(stack_size);
        chest
            .inventory()
            .add_item(ItemStack::new(item, moved))
            .context("source chest cannot hold the configured items")?;
        count -= moved;
    }
    Ok(())
}

/// Build the demo layout: a source chest above a hopper that feeds `cfg.destination`.
pub fn build_layout(cfg: &SimConfig) -> Result<BlockMap> {
    let mut world = BlockMap::new();

    let source = Chest::new();
    let item = match cfg.destination {
        Destination::Chest => ItemType::Block(blocks::STONE),
        Destination::Furnace => ItemType::Block(blocks::IRON_ORE),
    };
    fill_chest(&source, item, cfg.source_items)?;
    world.set_block(SOURCE_POS, Block::Chest(source));

    match cfg.destination {
        Destination::Chest => {
            world.set_block(HOPPER_POS, Block::Hopper(Hopper::new().with_facing(Face::East)));
            world.set_block(sink_pos(cfg.destination), Block::Chest(Chest::new()));
        }
        Destination::Furnace => {
            let furnace_pos = HOPPER_POS.side(Face::Down);
            world.set_block(HOPPER_POS, Block::Hopper(Hopper::new()));
            world.set_block(furnace_pos, Block::Furnace(Furnace::new()));

            let fueler = Hopper::new().with_facing(Face::West).with_name("Fuel");
            if cfg.fuel_items > 0 {
                fueler
                    .inventory()
                    .add_item(ItemStack::new(ItemType::Item(items::COAL), cfg.fuel_items))
                    .context("fuel hopper cannot hold the configured coal")?;
            }
            world.set_block(furnace_pos.side(Face::East), Block::Hopper(fueler));
            world.set_block(furnace_pos.side(Face::Down), Block::Hopper(Hopper::new()));
            world.set_block(sink_pos(cfg.destination), Block::Chest(Chest::new()));
        }
    }
    Ok(world)
}

fn units_at(world: &BlockMap, pos: BlockPos) -> u64 {
    world
        .block_at(pos)
        .as_container()
        .and_then(|container| container.inventory().map(|inv| inv.total_count()))
        .unwrap_or(0)
}

/// Run the configured layout and optionally save it.
pub fn run(cfg: &SimConfig) -> Result<RunReport> {
    let mut world = build_layout(cfg)?;
    let mut events = match &cfg.events_path {
        Some(path) => Some(JsonlSink::create(path)?),
        None => None,
    };

    let mut report = RunReport {
        ticks: cfg.ticks,
        ..RunReport::default()
    };
    for t in 1..=cfg.ticks {
        let tick = SimTick(t);
        let summary: TickSummary = world.tick_block_entities(tick);
        report.transfers += summary.transfers;
        report.blocked += summary.blocked;

        if summary.transfers > 0 {
            debug!(tick = t, transfers = summary.transfers, "transfers this tick");
            if let Some(sink) = events.as_mut() {
                let payload = format!("{summary:?}");
                sink.write(&EventRecord {
                    tick,
                    kind: "Transfer",
                    payload: &payload,
                })?;
            }
        }
    }

    report.source_left = units_at(&world, SOURCE_POS);
    report.delivered = units_at(&world, sink_pos(cfg.destination));
    info!(
        ticks = report.ticks,
        transfers = report.transfers,
        source_left = report.source_left,
        delivered = report.delivered,
        "headless run finished"
    );

    if let Some(dir) = &cfg.save_dir {
        save_and_verify(&world, dir, &cfg.save_name)?;
    }
    Ok(report)
}

fn save_and_verify(world: &BlockMap, dir: &std::path::Path, name: &str) -> Result<()> {
    let store = BlockEntityStore::new(dir)
        .with_context(|| format!("failed to open save dir {}", dir.display()))?;
    let records = capture_world(world);
    store.save(name, &records)?;

    let reloaded = restore_world(&store.load(name)?);
    if reloaded.len() != world.len() {
        anyhow::bail!(
            "reloaded save {} has {} blocks, expected {}",
            name,
            reloaded.len(),
            world.len()
        );
    }
    info!(path = %dir.display(), blocks = records.len(), "saved layout");
    Ok(())
}
