//! Block store and the per-tick driver for block entities.

use crate::chest::{Chest, EnderChest};
use crate::container::Container;
use crate::fields::{field_string, FieldMap};
use crate::furnace::Furnace;
use crate::hopper::{Hopper, HopperPhase};
use hopperline_core::{BlockPos, ItemStack, ItemType, SimTick};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A block occupying one position.
///
/// Block-entity variants own value state that is copied on every change and
/// share their inventory by reference, so cloning a `Block` is cheap and the
/// clone observes the same slots.
#[derive(Debug, Clone, Default)]
pub enum Block {
    #[default]
    Air,
    /// Any block without behaviour, by block id.
    Solid(u16),
    Hopper(Hopper),
    Chest(Chest),
    Furnace(Furnace),
    EnderChest(EnderChest),
}

impl Block {
    /// The container capability of this block, if it has one.
    pub fn as_container(&self) -> Option<&dyn Container> {
        match self {
            Block::Hopper(hopper) => Some(hopper as &dyn Container),
            Block::Chest(chest) => Some(chest as &dyn Container),
            Block::Furnace(furnace) => Some(furnace as &dyn Container),
            Block::EnderChest(ender) => Some(ender as &dyn Container),
            Block::Air | Block::Solid(_) => None,
        }
    }

    /// Whether placing a block here replaces this one.
    pub fn is_replaceable(&self) -> bool {
        matches!(self, Block::Air)
    }

    /// Persisted fields for block entities, `None` for plain blocks.
    pub fn encode_fields(&self) -> Option<FieldMap> {
        match self {
            Block::Hopper(hopper) => Some(hopper.encode_fields()),
            Block::Chest(chest) => Some(chest.encode_fields()),
            Block::Furnace(furnace) => Some(furnace.encode_fields()),
            Block::Air | Block::Solid(_) | Block::EnderChest(_) => None,
        }
    }

    /// Rebuild a block entity from persisted fields on top of this placed block.
    ///
    /// Fields whose type tag does not match the placed block are ignored and the
    /// block is returned unchanged.
    pub fn decode_fields(&self, fields: &FieldMap) -> Block {
        let tag = field_string(fields, "id");
        match (self, tag.as_str()) {
            (Block::Hopper(hopper), "Hopper") => Block::Hopper(hopper.decode_fields(fields)),
            (Block::Chest(chest), "Chest") => Block::Chest(chest.decode_fields(fields)),
            (Block::Furnace(furnace), "Furnace") => Block::Furnace(furnace.decode_fields(fields)),
            _ => {
                warn!(tag, "block entity fields do not match the placed block");
                self.clone()
            }
        }
    }

    /// Items dropped when the block is broken (the block itself plus its contents).
    fn drops(&self) -> Vec<ItemStack> {
        let mut drops = Vec::new();
        if let Block::Hopper(hopper) = self {
            drops.extend(hopper.break_info().drops);
        }
        if let Some(inventory) = self.as_container().and_then(|c| c.inventory()) {
            drops.extend(inventory.slots().into_iter().flatten());
        }
        if let Block::Solid(id) = self {
            drops.push(ItemStack::new(ItemType::Block(*id), 1));
        }
        drops
    }
}

/// World query/mutation used by block behaviour.
pub trait BlockWorld {
    /// The block at `pos` (air where nothing is stored).
    fn block_at(&self, pos: BlockPos) -> Block;

    /// Publish a new block value at `pos`.
    fn set_block(&mut self, pos: BlockPos, block: Block);
}

/// Outcome counts of one [`BlockMap::tick_block_entities`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub hoppers: usize,
    pub transfers: usize,
    pub cooling: usize,
    pub blocked: usize,
    pub furnaces_active: usize,
}

/// In-memory block store.
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Default)]
pub struct BlockMap {
    blocks: BTreeMap<BlockPos, Block>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-air blocks stored.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over stored blocks in position order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, &Block)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, block))
    }

    /// Tick every block entity once, in position order.
    ///
    /// Each entity is re-read right before it ticks, so it sees changes made by
    /// entities ticked earlier in the same pass.
    pub fn tick_block_entities(&mut self, current: SimTick) -> TickSummary {
        let positions: Vec<BlockPos> = self
            .blocks
            .iter()
            .filter(|(_, block)| matches!(block, Block::Hopper(_) | Block::Furnace(_)))
            .map(|(pos, _)| *pos)
            .collect();

        let mut summary = TickSummary::default();
        for pos in positions {
            match self.block_at(pos) {
                Block::Hopper(hopper) => {
                    summary.hoppers += 1;
                    match hopper.tick(current, pos, self) {
                        HopperPhase::Transferred { .. } => summary.transfers += 1,
                        HopperPhase::CoolingDown => summary.cooling += 1,
                        HopperPhase::Blocked => summary.blocked += 1,
                        HopperPhase::Idle => {}
                    }
                }
                Block::Furnace(furnace) => {
                    if furnace.tick(pos, self) {
                        summary.furnaces_active += 1;
                    }
                }
                _ => {}
            }
        }
        summary
    }

    /// Remove the block at `pos`, detach its viewers and return what it drops.
    pub fn break_block(&mut self, pos: BlockPos) -> Vec<ItemStack> {
        let Some(block) = self.blocks.remove(&pos) else {
            return Vec::new();
        };
        match &block {
            Block::Hopper(hopper) => hopper.viewers().clear(),
            Block::Chest(chest) => chest.viewers().clear(),
            Block::Furnace(furnace) => furnace.viewers().clear(),
            _ => {}
        }
        let drops = block.drops();
        debug!(?pos, drops = drops.len(), "block broken");
        drops
    }
}

impl BlockWorld for BlockMap {
    fn block_at(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).cloned().unwrap_or_default()
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) {
        if matches!(block, Block::Air) {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }
}
