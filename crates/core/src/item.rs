//! Item system - item identities and the stacks that fill container slots.

use serde::{Deserialize, Serialize};

/// Maximum stack size for stackable items.
pub const DEFAULT_STACK_SIZE: u32 = 64;

/// Well-known item identifiers used by the stock containers.
pub mod items {
    /// Coal (furnace fuel).
    pub const COAL: u16 = 263;
    /// Stick (furnace fuel).
    pub const STICK: u16 = 280;
    /// Iron ingot.
    pub const IRON_INGOT: u16 = 265;
    /// Gold ingot.
    pub const GOLD_INGOT: u16 = 266;
    /// Hopper, as an item.
    pub const HOPPER: u16 = 410;
}

/// Well-known block identifiers.
pub mod blocks {
    /// Stone.
    pub const STONE: u16 = 1;
    /// Oak planks (furnace fuel).
    pub const OAK_PLANKS: u16 = 5;
    /// Iron ore.
    pub const IRON_ORE: u16 = 15;
    /// Gold ore.
    pub const GOLD_ORE: u16 = 14;
}

/// Item type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemType {
    /// A tool (pickaxe, axe, etc.)
    Tool(ToolType, ToolMaterial),
    /// A placeable block
    Block(u16),
    /// Generic item
    Item(u16),
}

/// Tool types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolType {
    /// Pickaxe - mines stone, ores
    Pickaxe,
    /// Axe - chops wood
    Axe,
    /// Shovel - digs dirt, sand, gravel
    Shovel,
}

/// Tool material tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolMaterial {
    /// Wooden tools (tier 0)
    Wood = 0,
    /// Stone tools (tier 1)
    Stone = 1,
    /// Iron tools (tier 2)
    Iron = 2,
    /// Diamond tools (tier 3)
    Diamond = 3,
}

impl ToolType {
    fn key(self) -> &'static str {
        match self {
            ToolType::Pickaxe => "pickaxe",
            ToolType::Axe => "axe",
            ToolType::Shovel => "shovel",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "pickaxe" => Some(ToolType::Pickaxe),
            "axe" => Some(ToolType::Axe),
            "shovel" => Some(ToolType::Shovel),
            _ => None,
        }
    }
}

impl ToolMaterial {
    /// Get the maximum durability for tools of this material
    pub fn durability(self) -> u32 {
        match self {
            ToolMaterial::Wood => 59,
            ToolMaterial::Stone => 131,
            ToolMaterial::Iron => 250,
            ToolMaterial::Diamond => 1561,
        }
    }

    fn key(self) -> &'static str {
        match self {
            ToolMaterial::Wood => "wood",
            ToolMaterial::Stone => "stone",
            ToolMaterial::Iron => "iron",
            ToolMaterial::Diamond => "diamond",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "wood" => Some(ToolMaterial::Wood),
            "stone" => Some(ToolMaterial::Stone),
            "iron" => Some(ToolMaterial::Iron),
            "diamond" => Some(ToolMaterial::Diamond),
            _ => None,
        }
    }
}

impl ItemType {
    /// Stable textual key used by the persisted field set (e.g. `block:15`, `tool:pickaxe:iron`).
    pub fn key(self) -> String {
        match self {
            ItemType::Tool(tool, material) => format!("tool:{}:{}", tool.key(), material.key()),
            ItemType::Block(id) => format!("block:{id}"),
            ItemType::Item(id) => format!("item:{id}"),
        }
    }

    /// Parse a key produced by [`ItemType::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        let mut parts = key.split(':');
        let kind = parts.next()?;
        let item = match kind {
            "block" => ItemType::Block(parts.next()?.parse().ok()?),
            "item" => ItemType::Item(parts.next()?.parse().ok()?),
            "tool" => {
                let tool = ToolType::from_key(parts.next()?)?;
                let material = ToolMaterial::from_key(parts.next()?)?;
                ItemType::Tool(tool, material)
            }
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(item)
    }

    /// Maximum stack size for this item type
    pub fn max_stack_size(self) -> u32 {
        match self {
            ItemType::Tool(_, _) => 1, // Tools don't stack
            ItemType::Block(_) | ItemType::Item(_) => DEFAULT_STACK_SIZE,
        }
    }
}

/// An item stack in a container slot. Empty slots are represented as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Type of item
    pub item_type: ItemType,
    /// Quantity in stack
    pub count: u32,
    /// Durability for tools (None for non-tools)
    pub durability: Option<u32>,
    /// Opaque item metadata (custom data attached by other systems).
    pub metadata: Option<Vec<u8>>,
}

impl ItemStack {
    /// Create a new item stack
    pub fn new(item_type: ItemType, count: u32) -> Self {
        let durability = match item_type {
            ItemType::Tool(_, material) => Some(material.durability()),
            _ => None,
        };

        Self {
            item_type,
            count,
            durability,
            metadata: None,
        }
    }

    /// Create an item stack carrying metadata.
    pub fn with_metadata(item_type: ItemType, count: u32, metadata: Vec<u8>) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(item_type, count)
        }
    }

    /// Maximum stack size for this item type
    pub fn max_stack_size(&self) -> u32 {
        self.item_type.max_stack_size()
    }

    /// True when the stack holds no items.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// True when the stack cannot grow any further.
    pub fn is_full(&self) -> bool {
        self.count >= self.max_stack_size()
    }

    /// Check if this stack can accept more items
    pub fn can_add(&self, count: u32) -> bool {
        self.count + count <= self.max_stack_size()
    }

    /// Whether two stacks hold the same item: identity, durability and metadata all match.
    /// Counts are ignored.
    pub fn comparable(&self, other: &ItemStack) -> bool {
        self.item_type == other.item_type
            && self.durability == other.durability
            && self.metadata == other.metadata
    }

    /// A copy of this stack with exactly one unit.
    pub fn single(&self) -> ItemStack {
        self.with_count(1)
    }

    /// A copy of this stack with the count replaced.
    pub fn with_count(&self, count: u32) -> ItemStack {
        ItemStack {
            count,
            ..self.clone()
        }
    }

    /// A copy of this stack with the count changed by `delta`. Growing stops at
    /// the maximum stack size; shrinking never removes more than `delta`.
    /// Returns `None` once the count reaches zero.
    pub fn grow(&self, delta: i64) -> Option<ItemStack> {
        let current = i64::from(self.count);
        let ceiling = i64::from(self.max_stack_size()).max(current);
        let count = (current + delta).clamp(0, ceiling);
        if count == 0 {
            return None;
        }
        Some(self.with_count(count as u32))
    }
}

/// Total number of units across a slice of slots.
pub fn total_count(slots: &[Option<ItemStack>]) -> u64 {
    slots.iter().flatten().map(|stack| u64::from(stack.count)).sum()
}
