//! Container capabilities negotiated by transfer blocks.
//!
//! Every container exposes generic slot storage through [`Container`]. Some
//! containers additionally decide themselves where a hopper may insert or what
//! it may extract; they advertise this through [`Container::as_insertable`] and
//! [`Container::as_extractable`]. Transfer code dispatches on whichever
//! capability the neighbour actually offers.

use crate::inventory::Inventory;
use hopperline_core::{Face, ItemStack};
use std::sync::Arc;

/// A block exposing indexed item-slot storage.
pub trait Container {
    /// Slot storage of this block. `None` when the block has no block-local storage.
    fn inventory(&self) -> Option<&Arc<Inventory>>;

    /// Specialized insertion protocol, if the container implements one.
    fn as_insertable(&self) -> Option<&dyn HopperInsertable> {
        None
    }

    /// Specialized extraction protocol, if the container implements one.
    fn as_extractable(&self) -> Option<&dyn HopperExtractable> {
        None
    }
}

/// A container that chooses the slot a hopper inserts into.
pub trait HopperInsertable: Container {
    /// Decide whether a single unit `stack`, arriving from a hopper facing `face`,
    /// may be inserted, and into which slot. Must not modify the container.
    fn insert_item(&self, stack: &ItemStack, face: Face) -> (bool, usize);
}

/// A container that nominates the slot a hopper extracts from.
pub trait HopperExtractable: Container {
    /// Nominate the stack and slot a hopper may take one unit from.
    /// Must not modify the container.
    fn extract_item(&self) -> Option<(ItemStack, usize)>;
}
