//! Viewer registry: the observers currently watching a container's slots.
//!
//! Locking discipline:
//! - membership changes (`add`, `remove`, `clear`) take the write lock;
//! - notification fan-out holds the read lock for the whole fan-out, so a
//!   viewer is never added or removed halfway through a slot change.
//!
//! The registry is wired into an [`Inventory`] change callback by
//! [`observed_inventory`]. The inventory lock is always taken before the
//! registry lock, never the other way round.

use crate::inventory::Inventory;
use hopperline_core::{BlockPos, ItemStack};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Stable identity of a viewer (e.g. an open UI session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub u64);

/// An external actor observing a container's contents.
pub trait ContainerViewer: Send + Sync {
    /// Identity used as the registry key.
    fn viewer_id(&self) -> ViewerId;

    /// Called for every slot change while the viewer is registered.
    fn view_slot_change(&self, slot: usize, stack: Option<&ItemStack>);
}

/// Something that can open a block's container UI.
pub trait ContainerOpener {
    /// Open the container of the block at `pos`.
    fn open_block_container(&self, pos: BlockPos);
}

/// The actor using an item or activating a block.
pub trait ItemUser {
    /// The container-opening capability of this user, if it has one.
    fn as_container_opener(&self) -> Option<&dyn ContainerOpener> {
        None
    }
}

/// Set of viewers for one container instance. Viewers are held weakly.
#[derive(Default)]
pub struct ViewerRegistry {
    viewers: RwLock<BTreeMap<ViewerId, Weak<dyn ContainerViewer>>>,
}

impl std::fmt::Debug for ViewerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerRegistry")
            .field("viewers", &self.len())
            .finish()
    }
}

impl ViewerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer. Re-registering the same id replaces the old entry.
    pub fn add(&self, viewer: &Arc<dyn ContainerViewer>) {
        let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
        viewers.insert(viewer.viewer_id(), Arc::downgrade(viewer));
    }

    /// Unregister a viewer. Returns whether it was registered.
    pub fn remove(&self, id: ViewerId) -> bool {
        let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
        viewers.remove(&id).is_some()
    }

    /// Drop every registration (block destroyed).
    pub fn clear(&self) {
        let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
        viewers.clear();
    }

    /// Number of registrations whose viewer is still alive.
    pub fn len(&self) -> usize {
        let viewers = self.viewers.read().unwrap_or_else(PoisonError::into_inner);
        viewers.values().filter(|v| v.strong_count() > 0).count()
    }

    /// True when no live viewer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ViewerId) -> bool {
        let viewers = self.viewers.read().unwrap_or_else(PoisonError::into_inner);
        viewers.get(&id).is_some_and(|v| v.strong_count() > 0)
    }

    /// Fan a slot change out to every live viewer, in viewer id order.
    pub fn notify(&self, slot: usize, stack: Option<&ItemStack>) {
        let mut dead = Vec::new();
        {
            let viewers = self.viewers.read().unwrap_or_else(PoisonError::into_inner);
            for (id, viewer) in viewers.iter() {
                match viewer.upgrade() {
                    Some(viewer) => viewer.view_slot_change(slot, stack),
                    None => dead.push(*id),
                }
            }
        }

        if !dead.is_empty() {
            tracing::trace!(count = dead.len(), "pruning dropped container viewers");
            let mut viewers = self.viewers.write().unwrap_or_else(PoisonError::into_inner);
            for id in dead {
                if viewers.get(&id).is_some_and(|v| v.strong_count() == 0) {
                    viewers.remove(&id);
                }
            }
        }
    }
}

/// Create an inventory whose slot changes are fanned out to `viewers`.
pub fn inventory_for(size: usize, viewers: &Arc<ViewerRegistry>) -> Arc<Inventory> {
    let registry = Arc::clone(viewers);
    Arc::new(Inventory::with_observer(size, move |slot, stack| {
        registry.notify(slot, stack)
    }))
}

/// Create a fresh registry together with an inventory wired to it.
pub fn observed_inventory(size: usize) -> (Arc<Inventory>, Arc<ViewerRegistry>) {
    let viewers = Arc::new(ViewerRegistry::new());
    (inventory_for(size, &viewers), viewers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hopperline_core::{blocks, ItemType};
    use std::sync::Mutex;

    struct Recorder {
        id: ViewerId,
        seen: Mutex<Vec<(usize, u32)>>,
    }

    impl Recorder {
        fn new(id: u64) -> Arc<Self> {
            Arc::new(Self {
                id: ViewerId(id),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl ContainerViewer for Recorder {
        fn viewer_id(&self) -> ViewerId {
            self.id
        }

        fn view_slot_change(&self, slot: usize, stack: Option<&ItemStack>) {
            self.seen
                .lock()
                .unwrap()
                .push((slot, stack.map(|s| s.count).unwrap_or(0)));
        }
    }

    fn stone(count: u32) -> ItemStack {
        ItemStack::new(ItemType::Block(blocks::STONE), count)
    }

    #[test]
    fn registered_viewers_receive_changes() {
        let (inv, viewers) = observed_inventory(5);
        let a = Recorder::new(1);
        let b = Recorder::new(2);
        let a_dyn: Arc<dyn ContainerViewer> = a.clone();
        let b_dyn: Arc<dyn ContainerViewer> = b.clone();
        viewers.add(&a_dyn);
        viewers.add(&b_dyn);

        inv.set_item(3, Some(stone(7))).unwrap();
        assert!(viewers.remove(ViewerId(2)));
        inv.decrement(3).unwrap();

        assert_eq!(*a.seen.lock().unwrap(), vec![(3, 7), (3, 6)]);
        assert_eq!(*b.seen.lock().unwrap(), vec![(3, 7)]);
        assert!(!viewers.remove(ViewerId(2)));
    }

    #[test]
    fn dropped_viewers_are_pruned() {
        let (inv, viewers) = observed_inventory(1);
        let viewer: Arc<dyn ContainerViewer> = Recorder::new(9);
        viewers.add(&viewer);
        assert_eq!(viewers.len(), 1);

        drop(viewer);
        assert!(viewers.is_empty());
        inv.set_item(0, Some(stone(1))).unwrap();
        assert!(!viewers.contains(ViewerId(9)));
    }

    #[test]
    fn clear_removes_everyone() {
        let (_inv, viewers) = observed_inventory(1);
        let viewer: Arc<dyn ContainerViewer> = Recorder::new(4);
        viewers.add(&viewer);
        viewers.clear();
        assert!(viewers.is_empty());
    }
}
