//! Furnace block entity and smelting.
//!
//! The furnace is the stock example of a container with its own transfer
//! rules: hoppers above it feed the input slot, hoppers at its sides feed the
//! fuel slot, and hoppers below it only ever pull from the output slot.

use crate::container::{Container, HopperExtractable, HopperInsertable};
use crate::fields::{field_i32, field_list, inventory_from_fields, inventory_to_field, FieldMap, FieldValue};
use crate::inventory::Inventory;
use crate::viewer::{inventory_for, observed_inventory, ContainerViewer, ViewerId, ViewerRegistry};
use crate::world::{Block, BlockWorld};
use hopperline_core::{blocks, items, BlockPos, Face, ItemStack, ItemType};
use std::sync::Arc;
use tracing::trace;

/// Number of slots in a furnace.
pub const FURNACE_SLOT_COUNT: usize = 3;
/// Slot holding the item being smelted.
pub const FURNACE_INPUT_SLOT: usize = 0;
/// Slot holding fuel.
pub const FURNACE_FUEL_SLOT: usize = 1;
/// Slot receiving smelted items.
pub const FURNACE_OUTPUT_SLOT: usize = 2;

/// Ticks needed to smelt one item (10 seconds at 20 TPS).
pub const SMELT_TICKS: u32 = 200;

/// A smelting recipe: input item -> output item.
#[derive(Debug, Clone, Copy)]
pub struct SmeltRecipe {
    pub input: ItemType,
    pub output: ItemType,
}

/// All available smelting recipes.
pub const SMELT_RECIPES: &[SmeltRecipe] = &[
    SmeltRecipe {
        input: ItemType::Block(blocks::IRON_ORE),
        output: ItemType::Item(items::IRON_INGOT),
    },
    SmeltRecipe {
        input: ItemType::Block(blocks::GOLD_ORE),
        output: ItemType::Item(items::GOLD_INGOT),
    },
];

/// Get the smelting output for an input item.
pub fn get_smelt_output(input: ItemType) -> Option<ItemType> {
    SMELT_RECIPES
        .iter()
        .find(|r| r.input == input)
        .map(|r| r.output)
}

/// Burn time of a fuel item in ticks (0 if not valid fuel).
pub fn fuel_burn_ticks(item: ItemType) -> u32 {
    match item {
        ItemType::Item(items::COAL) => 8 * SMELT_TICKS,
        ItemType::Block(blocks::OAK_PLANKS) => 3 * SMELT_TICKS / 2,
        ItemType::Item(items::STICK) => SMELT_TICKS / 2,
        _ => 0,
    }
}

/// Check if an item is valid fuel.
pub fn is_fuel(item: ItemType) -> bool {
    fuel_burn_ticks(item) > 0
}

/// Furnace block entity.
#[derive(Debug, Clone)]
pub struct Furnace {
    /// Remaining ticks of the fuel item currently burning.
    pub burn_ticks: u32,
    /// Progress on the item currently smelting.
    pub cook_ticks: u32,
    inventory: Arc<Inventory>,
    viewers: Arc<ViewerRegistry>,
}

impl Default for Furnace {
    fn default() -> Self {
        Self::new()
    }
}

impl Furnace {
    pub fn new() -> Self {
        let (inventory, viewers) = observed_inventory(FURNACE_SLOT_COUNT);
        Self {
            burn_ticks: 0,
            cook_ticks: 0,
            inventory,
            viewers,
        }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub fn viewers(&self) -> &Arc<ViewerRegistry> {
        &self.viewers
    }

    pub fn add_viewer(&self, viewer: &Arc<dyn ContainerViewer>) {
        self.viewers.add(viewer);
    }

    pub fn remove_viewer(&self, id: ViewerId) {
        self.viewers.remove(id);
    }

    /// Whether the current input can be smelted into the output slot.
    fn smelt_target(&self) -> Option<ItemStack> {
        let input = self.inventory.item(FURNACE_INPUT_SLOT).ok()??;
        let output = ItemStack::new(get_smelt_output(input.item_type)?, 1);
        match self.inventory.item(FURNACE_OUTPUT_SLOT).ok()? {
            None => Some(output),
            Some(existing) if existing.comparable(&output) && !existing.is_full() => {
                existing.grow(1)
            }
            Some(_) => None,
        }
    }

    /// Advance burning and smelting by one tick, publishing the new state when it changed.
    pub fn tick<W: BlockWorld + ?Sized>(&self, pos: BlockPos, world: &mut W) -> bool {
        let mut next = self.clone();
        let target = next.smelt_target();

        if next.burn_ticks == 0 && target.is_some() {
            if let Ok(Some(fuel)) = next.inventory.item(FURNACE_FUEL_SLOT) {
                let burn = fuel_burn_ticks(fuel.item_type);
                if burn > 0 {
                    next.burn_ticks = burn;
                    let _ = next.inventory.decrement(FURNACE_FUEL_SLOT);
                }
            }
        }

        if next.burn_ticks > 0 {
            next.burn_ticks -= 1;
            match target {
                Some(output) => {
                    next.cook_ticks += 1;
                    if next.cook_ticks >= SMELT_TICKS {
                        next.cook_ticks = 0;
                        let _ = next.inventory.decrement(FURNACE_INPUT_SLOT);
                        let _ = next.inventory.set_item(FURNACE_OUTPUT_SLOT, Some(output));
                        trace!(?pos, "furnace finished smelting");
                    }
                }
                None => next.cook_ticks = 0,
            }
        } else {
            next.cook_ticks = 0;
        }

        let changed = next.burn_ticks != self.burn_ticks || next.cook_ticks != self.cook_ticks;
        if changed {
            world.set_block(pos, Block::Furnace(next));
        }
        changed
    }

    pub fn encode_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("Items".into(), inventory_to_field(&self.inventory));
        fields.insert("BurnTime".into(), FieldValue::Int(self.burn_ticks as i32));
        fields.insert("CookTime".into(), FieldValue::Int(self.cook_ticks as i32));
        fields.insert("id".into(), FieldValue::String("Furnace".into()));
        fields
    }

    /// Rebuild the furnace from persisted fields, keeping the current viewers attached.
    pub fn decode_fields(&self, fields: &FieldMap) -> Self {
        let inventory = inventory_for(FURNACE_SLOT_COUNT, &self.viewers);
        inventory_from_fields(&inventory, field_list(fields, "Items"));
        Self {
            burn_ticks: field_i32(fields, "BurnTime").max(0) as u32,
            cook_ticks: field_i32(fields, "CookTime").max(0) as u32,
            inventory,
            viewers: Arc::clone(&self.viewers),
        }
    }
}

impl Container for Furnace {
    fn inventory(&self) -> Option<&Arc<Inventory>> {
        Some(&self.inventory)
    }

    fn as_insertable(&self) -> Option<&dyn HopperInsertable> {
        Some(self)
    }

    fn as_extractable(&self) -> Option<&dyn HopperExtractable> {
        Some(self)
    }
}

impl HopperInsertable for Furnace {
    fn insert_item(&self, stack: &ItemStack, face: Face) -> (bool, usize) {
        // A hopper facing down sits on top of the furnace and feeds the input;
        // anything else arrives from the side and may only add fuel.
        let slot = if face == Face::Down {
            FURNACE_INPUT_SLOT
        } else if is_fuel(stack.item_type) {
            FURNACE_FUEL_SLOT
        } else {
            return (false, FURNACE_FUEL_SLOT);
        };

        let accepted = match self.inventory.item(slot) {
            Ok(None) => true,
            Ok(Some(existing)) => existing.comparable(stack) && !existing.is_full(),
            Err(_) => false,
        };
        (accepted, slot)
    }
}

impl HopperExtractable for Furnace {
    fn extract_item(&self) -> Option<(ItemStack, usize)> {
        let output = self.inventory.item(FURNACE_OUTPUT_SLOT).ok()??;
        Some((output, FURNACE_OUTPUT_SLOT))
    }
}
