//! Fixed-size container storage shared between a block and its observers.
//!
//! An [`Inventory`] is the single mutable resource of a container block: block
//! values are cloned freely, but every clone shares the same `Arc<Inventory>`.
//! Every mutation reports the changed slot through the change callback while the
//! slot lock is still held, so observers see slot changes in mutation order.

use hopperline_core::ItemStack;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::warn;

/// Callback invoked for every slot change with the slot index and its new content.
///
/// Runs while the inventory lock is held; it must not call back into the same inventory.
pub type SlotChangeFn = Box<dyn Fn(usize, Option<&ItemStack>) + Send + Sync>;

/// Errors returned by inventory mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The slot index is outside the inventory.
    #[error("slot {slot} out of range for inventory of size {size}")]
    SlotOutOfRange { slot: usize, size: usize },
    /// The stack does not fit; nothing was added.
    #[error("inventory is full")]
    Full,
}

/// Container inventory with a fixed number of slots.
pub struct Inventory {
    slots: Mutex<Vec<Option<ItemStack>>>,
    on_change: Option<SlotChangeFn>,
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("slots", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl Inventory {
    /// Create an empty inventory without an observer.
    pub fn new(size: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; size]),
            on_change: None,
        }
    }

    /// Create an empty inventory reporting every slot change to `on_change`.
    pub fn with_observer<F>(size: usize, on_change: F) -> Self
    where
        F: Fn(usize, Option<&ItemStack>) + Send + Sync + 'static,
    {
        Self {
            slots: Mutex::new(vec![None; size]),
            on_change: Some(Box::new(on_change)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<ItemStack>>> {
        // Slot state is never left half-written, so a poisoned lock is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, slot: usize, stack: Option<&ItemStack>) {
        if let Some(on_change) = &self.on_change {
            on_change(slot, stack);
        }
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of every slot in index order.
    pub fn slots(&self) -> Vec<Option<ItemStack>> {
        self.lock().clone()
    }

    /// Content of a single slot.
    pub fn item(&self, slot: usize) -> Result<Option<ItemStack>, InventoryError> {
        let slots = self.lock();
        match slots.get(slot) {
            Some(stack) => Ok(stack.clone()),
            None => Err(InventoryError::SlotOutOfRange {
                slot,
                size: slots.len(),
            }),
        }
    }

    /// Replace the content of a slot. Empty stacks are stored as `None`; stacks
    /// above their maximum size are clamped to it.
    pub fn set_item(&self, slot: usize, stack: Option<ItemStack>) -> Result<(), InventoryError> {
        let mut slots = self.lock();
        let size = slots.len();
        let entry = slots
            .get_mut(slot)
            .ok_or(InventoryError::SlotOutOfRange { slot, size })?;
        *entry = stack.filter(|s| !s.is_empty()).map(|s| {
            if s.count > s.max_stack_size() {
                warn!(slot, count = s.count, max = s.max_stack_size(), "clamping oversized stack");
                s.with_count(s.max_stack_size())
            } else {
                s
            }
        });
        self.notify(slot, entry.as_ref());
        Ok(())
    }

    /// Add a whole stack, merging into comparable stacks first and then filling
    /// empty slots in index order.
    ///
    /// The operation is all-or-nothing: if the stack does not fit completely the
    /// inventory is left untouched and [`InventoryError::Full`] is returned.
    pub fn add_item(&self, stack: ItemStack) -> Result<(), InventoryError> {
        if stack.is_empty() {
            return Ok(());
        }

        let mut slots = self.lock();
        let max = u64::from(stack.max_stack_size());
        let capacity: u64 = slots
            .iter()
            .map(|slot| match slot {
                None => max,
                Some(existing) if existing.comparable(&stack) => {
                    max.saturating_sub(u64::from(existing.count))
                }
                Some(_) => 0,
            })
            .sum();
        if capacity < u64::from(stack.count) {
            return Err(InventoryError::Full);
        }

        let mut remaining = stack.count;
        for idx in 0..slots.len() {
            if remaining == 0 {
                break;
            }
            let Some(existing) = slots[idx].as_mut() else {
                continue;
            };
            if !existing.comparable(&stack) || existing.is_full() {
                continue;
            }
            let moved = remaining.min(existing.max_stack_size() - existing.count);
            existing.count += moved;
            remaining -= moved;
            self.notify(idx, slots[idx].as_ref());
        }

        for idx in 0..slots.len() {
            if remaining == 0 {
                break;
            }
            if slots[idx].is_some() {
                continue;
            }
            let moved = remaining.min(stack.max_stack_size());
            slots[idx] = Some(stack.with_count(moved));
            remaining -= moved;
            self.notify(idx, slots[idx].as_ref());
        }

        debug_assert_eq!(remaining, 0);
        Ok(())
    }

    /// Remove one unit from a slot, returning the new content of the slot.
    /// Decrementing an empty slot is a no-op.
    pub fn decrement(&self, slot: usize) -> Result<Option<ItemStack>, InventoryError> {
        let mut slots = self.lock();
        let size = slots.len();
        let entry = slots
            .get_mut(slot)
            .ok_or(InventoryError::SlotOutOfRange { slot, size })?;
        let Some(stack) = entry.as_ref() else {
            return Ok(None);
        };
        *entry = stack.grow(-1);
        self.notify(slot, entry.as_ref());
        Ok(entry.clone())
    }

    /// Empty every slot, reporting each slot that held something.
    pub fn clear(&self) {
        let mut slots = self.lock();
        for idx in 0..slots.len() {
            if slots[idx].take().is_some() {
                self.notify(idx, None);
            }
        }
    }

    /// True when every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().iter().all(Option::is_none)
    }

    /// Total number of item units held.
    pub fn total_count(&self) -> u64 {
        hopperline_core::total_count(&self.lock())
    }

    /// Index and content of the first non-empty slot.
    pub fn first_filled(&self) -> Option<(usize, ItemStack)> {
        self.lock()
            .iter()
            .enumerate()
            .find_map(|(idx, slot)| slot.clone().map(|stack| (idx, stack)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopperline_core::{items, ItemType, ToolMaterial, ToolType};
    use std::sync::{Arc, Mutex};

    fn coal(count: u32) -> ItemStack {
        ItemStack::new(ItemType::Item(items::COAL), count)
    }

    #[test]
    fn add_merges_before_filling_empty_slots() {
        let inv = Inventory::new(3);
        inv.set_item(2, Some(coal(10))).unwrap();

        inv.add_item(coal(5)).unwrap();

        assert_eq!(inv.item(2).unwrap().map(|s| s.count), Some(15));
        assert!(inv.item(0).unwrap().is_none());
    }

    #[test]
    fn add_spills_over_into_empty_slots() {
        let inv = Inventory::new(2);
        inv.set_item(1, Some(coal(60))).unwrap();

        inv.add_item(coal(10)).unwrap();

        assert_eq!(inv.item(1).unwrap().map(|s| s.count), Some(64));
        assert_eq!(inv.item(0).unwrap().map(|s| s.count), Some(6));
    }

    #[test]
    fn add_is_all_or_nothing() {
        let inv = Inventory::new(1);
        inv.set_item(0, Some(coal(63))).unwrap();

        assert_eq!(inv.add_item(coal(2)), Err(InventoryError::Full));
        assert_eq!(inv.item(0).unwrap().map(|s| s.count), Some(63));

        let pick = ItemStack::new(ItemType::Tool(ToolType::Pickaxe, ToolMaterial::Stone), 1);
        assert_eq!(inv.add_item(pick), Err(InventoryError::Full));
    }

    #[test]
    fn decrement_clears_last_unit() {
        let inv = Inventory::new(1);
        inv.set_item(0, Some(coal(2))).unwrap();

        assert_eq!(inv.decrement(0).unwrap().map(|s| s.count), Some(1));
        assert_eq!(inv.decrement(0).unwrap(), None);
        assert_eq!(inv.decrement(0).unwrap(), None);
        assert!(inv.is_empty());
    }

    #[test]
    fn out_of_range_slots_are_rejected() {
        let inv = Inventory::new(5);
        assert_eq!(
            inv.item(5),
            Err(InventoryError::SlotOutOfRange { slot: 5, size: 5 })
        );
        assert!(inv.set_item(9, Some(coal(1))).is_err());
        assert!(inv.decrement(5).is_err());
    }

    #[test]
    fn oversized_stacks_are_clamped_to_max() {
        let inv = Inventory::new(2);
        inv.set_item(0, Some(coal(100))).unwrap();
        assert_eq!(inv.item(0).unwrap(), Some(coal(64)));

        let pick = ItemStack::new(ItemType::Tool(ToolType::Pickaxe, ToolMaterial::Wood), 3);
        inv.set_item(1, Some(pick)).unwrap();
        assert_eq!(inv.item(1).unwrap().map(|s| s.count), Some(1));
        assert_eq!(inv.total_count(), 65);
    }

    #[test]
    fn empty_stacks_are_stored_as_none() {
        let inv = Inventory::new(1);
        inv.set_item(0, Some(coal(0))).unwrap();
        assert!(inv.item(0).unwrap().is_none());
    }

    #[test]
    fn observer_sees_every_change_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let inv = Inventory::with_observer(2, move |slot, stack| {
            log.lock()
                .unwrap()
                .push((slot, stack.map(|s| s.count).unwrap_or(0)));
        });

        inv.set_item(1, Some(coal(3))).unwrap();
        inv.add_item(coal(62)).unwrap();
        inv.decrement(0).unwrap();
        inv.clear();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(1, 3), (1, 64), (0, 1), (0, 0), (1, 0)]
        );
    }
}
