//! Hopper block entity: a five-slot container that pulls items from the
//! container above it and pushes items into the container it faces.
//!
//! A hopper is a value. Every tick produces a new copy with updated counters
//! which is then published back into the world; only the inventory and the
//! viewer registry are shared between copies.

use crate::container::Container;
use crate::fields::{field_i32, field_list, field_string, inventory_from_fields, inventory_to_field, FieldMap, FieldValue};
use crate::inventory::Inventory;
use crate::viewer::{inventory_for, observed_inventory, ContainerViewer, ItemUser, ViewerId, ViewerRegistry};
use crate::world::{Block, BlockWorld};
use hopperline_core::{items, BlockPos, Face, ItemStack, ItemType, SimTick, ToolType};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Number of slots in a hopper inventory.
pub const HOPPER_SLOT_COUNT: usize = 5;

/// Ticks a hopper waits after moving an item.
pub const HOPPER_COOLDOWN_TICKS: i64 = 8;

/// Block name used for block and item encoding.
pub const HOPPER_BLOCK_NAME: &str = "minecraft:hopper";

/// What a single [`Hopper::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopperPhase {
    /// Cooldowns ran out but nothing could be moved; nothing was published.
    Idle,
    /// A cooldown is still pending.
    CoolingDown,
    /// The hopper is powered and does not transfer.
    Blocked,
    /// At least one transfer succeeded.
    Transferred { inserted: bool, extracted: bool },
}

/// Why a transfer attempt moved nothing. Never surfaced to callers; a failed
/// attempt just means no transfer this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("no adjacent container with slot storage")]
    NoAdjacentContainer,
    #[error("destination is full")]
    DestinationFull,
    #[error("source is empty")]
    SourceEmpty,
    #[error("stack at target slot is not compatible")]
    IncompatibleStack,
}

/// Mining and drop properties of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakInfo {
    pub hardness: f32,
    pub blast_resistance: f32,
    /// Tool required to harvest the block at all.
    pub harvest_tool: Option<ToolType>,
    pub drops: Vec<ItemStack>,
}

/// Hopper block entity.
#[derive(Debug, Clone)]
pub struct Hopper {
    /// Side items are pushed out of.
    pub facing: Face,
    /// Powered hoppers are locked and move nothing.
    pub powered: bool,
    /// Name shown when the hopper is opened. May be empty.
    pub custom_name: String,
    /// Last tick this hopper was ticked.
    pub last_tick: SimTick,
    /// Ticks until the hopper may transfer again.
    pub transfer_cooldown: i64,
    /// Ticks until the hopper may collect again.
    pub collect_cooldown: i64,
    inventory: Arc<Inventory>,
    viewers: Arc<ViewerRegistry>,
}

impl Default for Hopper {
    fn default() -> Self {
        Self::new()
    }
}

impl Hopper {
    /// Create a hopper facing down with an empty inventory and no viewers.
    pub fn new() -> Self {
        let (inventory, viewers) = observed_inventory(HOPPER_SLOT_COUNT);
        Self {
            facing: Face::Down,
            powered: false,
            custom_name: String::new(),
            last_tick: SimTick::ZERO,
            transfer_cooldown: 0,
            collect_cooldown: 0,
            inventory,
            viewers,
        }
    }

    pub fn with_facing(mut self, facing: Face) -> Self {
        self.facing = facing;
        self
    }

    pub fn with_powered(mut self, powered: bool) -> Self {
        self.powered = powered;
        self
    }

    /// Returns the hopper with a custom name applied.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = name.into();
        self
    }

    /// The hopper's own slots, shared by every copy of this hopper.
    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub fn viewers(&self) -> &Arc<ViewerRegistry> {
        &self.viewers
    }

    /// Register a viewer so it receives every slot change of this hopper.
    pub fn add_viewer(&self, viewer: &Arc<dyn ContainerViewer>) {
        self.viewers.add(viewer);
    }

    /// Stop sending slot changes to a viewer.
    pub fn remove_viewer(&self, id: ViewerId) {
        self.viewers.remove(id);
    }

    /// Open the hopper's UI for `user`, if the user is able to open containers.
    pub fn activate(&self, pos: BlockPos, user: &dyn ItemUser) -> bool {
        match user.as_container_opener() {
            Some(opener) => {
                opener.open_block_container(pos);
                true
            }
            None => false,
        }
    }

    /// Place a new hopper against `face` of the block at `pos`.
    ///
    /// The hopper lands at `pos` if that block is replaceable, otherwise next to
    /// it. It faces down when the underside of a block was clicked and back into
    /// the clicked block otherwise.
    pub fn use_on_block<W: BlockWorld + ?Sized>(&self, pos: BlockPos, face: Face, world: &mut W) -> bool {
        let target = if world.block_at(pos).is_replaceable() {
            pos
        } else {
            pos.side(face)
        };
        if !world.block_at(target).is_replaceable() {
            return false;
        }

        let facing = if face == Face::Down {
            Face::Down
        } else {
            face.opposite()
        };
        let placed = Hopper::new()
            .with_facing(facing)
            .with_name(self.custom_name.clone());
        world.set_block(target, Block::Hopper(placed));
        debug!(?target, ?facing, "placed hopper");
        true
    }

    /// Advance cooldowns by one tick and transfer when due.
    ///
    /// Every phase except [`HopperPhase::Idle`] publishes the updated hopper at `pos`.
    pub fn tick<W: BlockWorld + ?Sized>(&self, current: SimTick, pos: BlockPos, world: &mut W) -> HopperPhase {
        let mut next = self.clone();
        next.transfer_cooldown -= 1;
        next.collect_cooldown -= 1;
        next.last_tick = current;

        if next.transfer_cooldown >= 0 || next.collect_cooldown >= 0 {
            trace!(?pos, cooldown = next.transfer_cooldown, "hopper cooling down");
            world.set_block(pos, Block::Hopper(next));
            return HopperPhase::CoolingDown;
        }

        next.transfer_cooldown = 0;
        next.collect_cooldown = 0;
        if next.powered {
            trace!(?pos, "hopper is powered");
            world.set_block(pos, Block::Hopper(next));
            return HopperPhase::Blocked;
        }

        let inserted = next.insert_item(pos, &*world);
        let extracted = next.extract_item(pos, &*world);
        if !inserted && !extracted {
            trace!(?pos, "hopper idle");
            return HopperPhase::Idle;
        }

        next.transfer_cooldown = HOPPER_COOLDOWN_TICKS;
        next.collect_cooldown = HOPPER_COOLDOWN_TICKS;
        trace!(?pos, inserted, extracted, "hopper transferred");
        world.set_block(pos, Block::Hopper(next));
        HopperPhase::Transferred { inserted, extracted }
    }

    /// Push one item into the container this hopper faces.
    pub fn insert_item<W: BlockWorld + ?Sized>(&self, pos: BlockPos, world: &W) -> bool {
        match self.try_insert(pos, world) {
            Ok(()) => true,
            Err(err) => {
                trace!(?pos, %err, "hopper insert skipped");
                false
            }
        }
    }

    /// Pull one item from the container above this hopper.
    pub fn extract_item<W: BlockWorld + ?Sized>(&self, pos: BlockPos, world: &W) -> bool {
        match self.try_extract(pos, world) {
            Ok(()) => true,
            Err(err) => {
                trace!(?pos, %err, "hopper extract skipped");
                false
            }
        }
    }

    fn try_insert<W: BlockWorld + ?Sized>(&self, pos: BlockPos, world: &W) -> Result<(), TransferError> {
        let dest_block = world.block_at(pos.side(self.facing));
        let dest = dest_block
            .as_container()
            .ok_or(TransferError::NoAdjacentContainer)?;
        let dest_inventory = dest.inventory().ok_or(TransferError::NoAdjacentContainer)?;

        let mut outcome = Err(TransferError::SourceEmpty);
        for (slot, source) in self.inventory.slots().into_iter().enumerate() {
            let Some(source) = source else {
                continue;
            };

            let offered = match dest.as_insertable() {
                Some(insertable) => {
                    let (accepted, target) = insertable.insert_item(&source.single(), self.facing);
                    if accepted {
                        place_one(dest_inventory, target, &source)
                    } else {
                        Err(TransferError::DestinationFull)
                    }
                }
                None => dest_inventory
                    .add_item(source.single())
                    .map_err(|_| TransferError::DestinationFull),
            };

            match offered {
                Ok(()) => {
                    let _ = self.inventory.decrement(slot);
                    return Ok(());
                }
                Err(err) => outcome = Err(err),
            }
        }
        outcome
    }

    fn try_extract<W: BlockWorld + ?Sized>(&self, pos: BlockPos, world: &W) -> Result<(), TransferError> {
        let origin_block = world.block_at(pos.side(Face::Up));
        let origin = origin_block
            .as_container()
            .ok_or(TransferError::NoAdjacentContainer)?;
        let origin_inventory = origin.inventory().ok_or(TransferError::NoAdjacentContainer)?;

        pull_one(&self.inventory, origin, origin_inventory)
    }

    /// Persisted fields of this hopper.
    pub fn encode_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("Items".into(), inventory_to_field(&self.inventory));
        fields.insert(
            "TransferCooldown".into(),
            FieldValue::Int(self.transfer_cooldown.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32),
        );
        fields.insert("id".into(), FieldValue::String("Hopper".into()));
        if !self.custom_name.is_empty() {
            fields.insert("CustomName".into(), FieldValue::String(self.custom_name.clone()));
        }
        fields
    }

    /// Rebuild the hopper from persisted fields.
    ///
    /// Facing and powered state come from this (placed) hopper. The contents are
    /// replayed into a fresh inventory that stays wired to the current viewer
    /// registry, so open UIs keep receiving slot changes.
    pub fn decode_fields(&self, fields: &FieldMap) -> Self {
        let inventory = inventory_for(HOPPER_SLOT_COUNT, &self.viewers);
        inventory_from_fields(&inventory, field_list(fields, "Items"));
        Self {
            facing: self.facing,
            powered: self.powered,
            custom_name: field_string(fields, "CustomName"),
            last_tick: SimTick::ZERO,
            transfer_cooldown: i64::from(field_i32(fields, "TransferCooldown")),
            collect_cooldown: 0,
            inventory,
            viewers: Arc::clone(&self.viewers),
        }
    }

    /// Block name and state properties.
    pub fn encode_block(&self) -> (&'static str, FieldMap) {
        let mut properties = FieldMap::new();
        properties.insert(
            "facing_direction".into(),
            FieldValue::Int(i32::from(self.facing.index())),
        );
        properties.insert("toggle_bit".into(), FieldValue::Byte(i8::from(self.powered)));
        (HOPPER_BLOCK_NAME, properties)
    }

    /// Item name and metadata value.
    pub fn encode_item(&self) -> (&'static str, i16) {
        (HOPPER_BLOCK_NAME, 0)
    }

    pub fn break_info(&self) -> BreakInfo {
        BreakInfo {
            hardness: 3.0,
            blast_resistance: 24.0,
            harvest_tool: Some(ToolType::Pickaxe),
            drops: vec![ItemStack::new(ItemType::Item(items::HOPPER), 1)],
        }
    }
}

/// Move one unit from the slot `origin` nominates into `own`.
///
/// The nomination is checked against the origin's slot before anything moves, so
/// a stale or bogus nomination never duplicates items.
fn pull_one(own: &Inventory, origin: &dyn Container, origin_inventory: &Inventory) -> Result<(), TransferError> {
    let nominated = match origin.as_extractable() {
        Some(extractable) => extractable.extract_item(),
        None => origin_inventory.first_filled().map(|(slot, stack)| (stack, slot)),
    };
    let Some((stack, slot)) = nominated.filter(|(stack, _)| !stack.is_empty()) else {
        return Err(TransferError::SourceEmpty);
    };
    match origin_inventory.item(slot) {
        Ok(Some(held)) if held.comparable(&stack) => {}
        _ => return Err(TransferError::SourceEmpty),
    }

    own.add_item(stack.single())
        .map_err(|_| TransferError::DestinationFull)?;
    origin_inventory
        .decrement(slot)
        .map_err(|_| TransferError::SourceEmpty)?;
    Ok(())
}

/// Put one unit of `source` into `slot`, growing a comparable stack or filling an empty slot.
fn place_one(inventory: &Inventory, slot: usize, source: &ItemStack) -> Result<(), TransferError> {
    let existing = inventory
        .item(slot)
        .map_err(|_| TransferError::DestinationFull)?;
    let placed = match existing {
        None => source.single(),
        Some(existing) if !existing.comparable(source) => {
            return Err(TransferError::IncompatibleStack)
        }
        Some(existing) if existing.is_full() => return Err(TransferError::DestinationFull),
        Some(existing) => existing.with_count(existing.count + 1),
    };
    inventory
        .set_item(slot, Some(placed))
        .map_err(|_| TransferError::DestinationFull)
}

impl Container for Hopper {
    fn inventory(&self) -> Option<&Arc<Inventory>> {
        Some(&self.inventory)
    }
}

/// Every registered hopper block state: one per facing, unpowered and powered.
pub fn all_hoppers() -> Vec<Hopper> {
    Face::ALL
        .iter()
        .flat_map(|&facing| {
            [false, true].map(|powered| Hopper::new().with_facing(facing).with_powered(powered))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chest::Chest;
    use crate::container::HopperExtractable;
    use crate::viewer::ContainerOpener;
    use crate::world::BlockMap;
    use hopperline_core::blocks;
    use std::cell::Cell;

    const POS: BlockPos = BlockPos::new(0, 64, 0);

    fn stone(count: u32) -> ItemStack {
        ItemStack::new(ItemType::Block(blocks::STONE), count)
    }

    fn current_hopper(world: &BlockMap, pos: BlockPos) -> Hopper {
        match world.block_at(pos) {
            Block::Hopper(hopper) => hopper,
            other => panic!("expected hopper, found {other:?}"),
        }
    }

    #[test]
    fn cooldown_counts_down_then_idles() {
        let mut world = BlockMap::new();
        let hopper = Hopper::new();
        hopper.clone().tick(SimTick(1), POS, &mut world);
        // Nothing to move: the idle tick publishes nothing.
        assert!(matches!(world.block_at(POS), Block::Air));

        let mut cooling = Hopper::new();
        cooling.transfer_cooldown = 2;
        world.set_block(POS, Block::Hopper(cooling));

        let phases: Vec<HopperPhase> = (1..=4)
            .map(|t| current_hopper(&world, POS).tick(SimTick(t), POS, &mut world))
            .collect();
        assert_eq!(
            phases,
            vec![
                HopperPhase::CoolingDown,
                HopperPhase::CoolingDown,
                HopperPhase::Idle,
                HopperPhase::Idle,
            ]
        );
        let stored = current_hopper(&world, POS);
        assert_eq!(stored.transfer_cooldown, 0);
        assert_eq!(stored.last_tick, SimTick(2));
    }

    #[test]
    fn powered_hopper_is_blocked_after_cooldown() {
        let mut world = BlockMap::new();
        let hopper = Hopper::new().with_facing(Face::East).with_powered(true);
        hopper.inventory().set_item(0, Some(stone(3))).unwrap();
        world.set_block(POS.side(Face::East), Block::Chest(Chest::new()));

        assert_eq!(hopper.tick(SimTick(1), POS, &mut world), HopperPhase::Blocked);
        assert_eq!(hopper.inventory().total_count(), 3);
        assert_eq!(current_hopper(&world, POS).last_tick, SimTick(1));
    }

    #[test]
    fn transfer_resets_both_cooldowns() {
        let mut world = BlockMap::new();
        let hopper = Hopper::new().with_facing(Face::North);
        hopper.inventory().set_item(4, Some(stone(1))).unwrap();
        world.set_block(POS.side(Face::North), Block::Chest(Chest::new()));

        let phase = hopper.tick(SimTick(7), POS, &mut world);
        assert_eq!(
            phase,
            HopperPhase::Transferred {
                inserted: true,
                extracted: false
            }
        );
        let stored = current_hopper(&world, POS);
        assert_eq!(stored.transfer_cooldown, HOPPER_COOLDOWN_TICKS);
        assert_eq!(stored.collect_cooldown, HOPPER_COOLDOWN_TICKS);
        assert!(hopper.inventory().is_empty());
    }

    #[test]
    fn placement_faces_back_into_clicked_block() {
        let mut world = BlockMap::new();
        let clicked = BlockPos::new(5, 64, 5);
        world.set_block(clicked, Block::Solid(blocks::STONE));
        let item = Hopper::new().with_name("Sorter");

        assert!(item.use_on_block(clicked, Face::West, &mut world));
        let placed = current_hopper(&world, clicked.side(Face::West));
        assert_eq!(placed.facing, Face::East);
        assert_eq!(placed.custom_name, "Sorter");

        assert!(item.use_on_block(clicked, Face::Up, &mut world));
        assert_eq!(current_hopper(&world, clicked.side(Face::Up)).facing, Face::Down);

        assert!(item.use_on_block(clicked, Face::Down, &mut world));
        assert_eq!(current_hopper(&world, clicked.side(Face::Down)).facing, Face::Down);

        // Occupied on both sides.
        assert!(!item.use_on_block(clicked, Face::West, &mut world));
    }

    #[test]
    fn activate_requires_an_opener() {
        struct Player {
            opened: Cell<Option<BlockPos>>,
        }
        impl ContainerOpener for Player {
            fn open_block_container(&self, pos: BlockPos) {
                self.opened.set(Some(pos));
            }
        }
        impl ItemUser for Player {
            fn as_container_opener(&self) -> Option<&dyn ContainerOpener> {
                Some(self)
            }
        }
        struct Zombie;
        impl ItemUser for Zombie {}

        let hopper = Hopper::new();
        let player = Player {
            opened: Cell::new(None),
        };
        assert!(hopper.activate(POS, &player));
        assert_eq!(player.opened.get(), Some(POS));
        assert!(!hopper.activate(POS, &Zombie));
    }

    #[test]
    fn block_encoding_carries_facing_and_power() {
        let (name, props) = Hopper::new().with_facing(Face::South).with_powered(true).encode_block();
        assert_eq!(name, "minecraft:hopper");
        assert_eq!(props.get("facing_direction"), Some(&FieldValue::Int(3)));
        assert_eq!(props.get("toggle_bit"), Some(&FieldValue::Byte(1)));
        assert_eq!(Hopper::new().encode_item(), ("minecraft:hopper", 0));
    }

    #[test]
    fn twelve_block_states_are_registered() {
        let states = all_hoppers();
        assert_eq!(states.len(), 12);
        assert_eq!(states.iter().filter(|h| h.powered).count(), 6);
        for face in Face::ALL {
            assert_eq!(states.iter().filter(|h| h.facing == face).count(), 2);
        }
    }

    #[test]
    fn break_info_drops_the_hopper() {
        let info = Hopper::new().break_info();
        assert_eq!(info.hardness, 3.0);
        assert_eq!(info.blast_resistance, 24.0);
        assert_eq!(info.harvest_tool, Some(ToolType::Pickaxe));
        assert_eq!(info.drops, vec![ItemStack::new(ItemType::Item(items::HOPPER), 1)]);
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let placed = Hopper::new().with_facing(Face::West).with_powered(true);
        placed.inventory().set_item(0, Some(stone(9))).unwrap();

        let decoded = placed.decode_fields(&FieldMap::new());
        assert_eq!(decoded.facing, Face::West);
        assert!(decoded.powered);
        assert_eq!(decoded.custom_name, "");
        assert_eq!(decoded.transfer_cooldown, 0);
        assert!(decoded.inventory().is_empty());
        assert!(!Arc::ptr_eq(decoded.inventory(), placed.inventory()));
        assert!(Arc::ptr_eq(decoded.viewers(), placed.viewers()));
    }

    #[test]
    fn place_one_grows_fills_or_rejects_without_changes() {
        let coal = ItemStack::new(ItemType::Item(items::COAL), 4);
        let inv = Inventory::new(3);
        inv.set_item(1, Some(coal.clone())).unwrap();
        inv.set_item(2, Some(stone(64))).unwrap();

        assert_eq!(place_one(&inv, 0, &stone(5)), Ok(()));
        assert_eq!(inv.item(0).unwrap(), Some(stone(1)));
        assert_eq!(place_one(&inv, 0, &stone(5)), Ok(()));
        assert_eq!(inv.item(0).unwrap(), Some(stone(2)));

        let before = inv.slots();
        assert_eq!(place_one(&inv, 1, &stone(5)), Err(TransferError::IncompatibleStack));
        assert_eq!(place_one(&inv, 2, &stone(5)), Err(TransferError::DestinationFull));
        assert_eq!(place_one(&inv, 7, &stone(5)), Err(TransferError::DestinationFull));
        assert_eq!(inv.slots(), before);
        assert_eq!(inv.item(1).unwrap(), Some(coal));
    }

    struct Nominating {
        inventory: Arc<Inventory>,
        nominated: (ItemStack, usize),
    }

    impl Container for Nominating {
        fn inventory(&self) -> Option<&Arc<Inventory>> {
            Some(&self.inventory)
        }

        fn as_extractable(&self) -> Option<&dyn HopperExtractable> {
            Some(self)
        }
    }

    impl HopperExtractable for Nominating {
        fn extract_item(&self) -> Option<(ItemStack, usize)> {
            Some(self.nominated.clone())
        }
    }

    #[test]
    fn bogus_nominations_never_duplicate_items() {
        let origin = Arc::new(Inventory::new(2));
        origin.set_item(0, Some(stone(3))).unwrap();
        let own = Inventory::new(HOPPER_SLOT_COUNT);

        let coal = ItemStack::new(ItemType::Item(items::COAL), 3);
        for nominated in [(stone(3), 5), (stone(3), 1), (coal, 0)] {
            let container = Nominating {
                inventory: Arc::clone(&origin),
                nominated,
            };
            assert_eq!(
                pull_one(&own, &container, &origin),
                Err(TransferError::SourceEmpty)
            );
        }
        assert!(own.is_empty());
        assert_eq!(origin.total_count(), 3);

        let honest = Nominating {
            inventory: Arc::clone(&origin),
            nominated: (stone(3), 0),
        };
        assert_eq!(pull_one(&own, &honest, &origin), Ok(()));
        assert_eq!(own.total_count(), 1);
        assert_eq!(origin.item(0).unwrap(), Some(stone(2)));
    }

    #[test]
    fn basic_origin_gives_up_its_first_filled_slot() {
        let origin = Arc::new(Inventory::new(4));
        origin.set_item(2, Some(stone(5))).unwrap();
        let chest = Chest::new();
        let own = Inventory::new(HOPPER_SLOT_COUNT);

        assert_eq!(pull_one(&own, &chest, &origin), Ok(()));
        assert_eq!(origin.item(2).unwrap(), Some(stone(4)));
        assert_eq!(own.item(0).unwrap(), Some(stone(1)));
    }

    #[test]
    fn oversized_stored_stack_transfers_without_loss() {
        let mut entry = FieldMap::new();
        entry.insert("Name".into(), FieldValue::String(ItemType::Block(blocks::STONE).key()));
        entry.insert("Count".into(), FieldValue::Byte(100));
        entry.insert("Slot".into(), FieldValue::Byte(0));
        let mut fields = FieldMap::new();
        fields.insert("Items".into(), FieldValue::List(vec![FieldValue::Compound(entry)]));
        fields.insert("id".into(), FieldValue::String("Hopper".into()));

        let hopper = Hopper::new().with_facing(Face::East).decode_fields(&fields);
        let loaded = hopper.inventory().total_count();
        assert_eq!(loaded, 64);

        let mut world = BlockMap::new();
        let chest = Chest::new();
        world.set_block(POS.side(Face::East), Block::Chest(chest.clone()));
        hopper.tick(SimTick(1), POS, &mut world);

        assert_eq!(hopper.inventory().item(0).unwrap(), Some(stone(63)));
        assert_eq!(hopper.inventory().total_count() + chest.inventory().total_count(), loaded);
    }
}
