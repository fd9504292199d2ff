use crate::container::Container;
use crate::fields::{field_list, field_string, inventory_from_fields, inventory_to_field, FieldMap, FieldValue};
use crate::inventory::Inventory;
use crate::viewer::{inventory_for, observed_inventory, ContainerViewer, ViewerId, ViewerRegistry};
use std::sync::Arc;

/// Number of slots in a single chest inventory (3 rows × 9 columns).
pub const CHEST_SLOT_COUNT: usize = 27;

/// Chest block entity: plain slot storage with no transfer preferences.
#[derive(Debug, Clone)]
pub struct Chest {
    /// Name shown when the chest is opened. May be empty.
    pub custom_name: String,
    inventory: Arc<Inventory>,
    viewers: Arc<ViewerRegistry>,
}

impl Default for Chest {
    fn default() -> Self {
        Self::new()
    }
}

impl Chest {
    pub fn new() -> Self {
        let (inventory, viewers) = observed_inventory(CHEST_SLOT_COUNT);
        Self {
            custom_name: String::new(),
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

    pub fn encode_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("Items".into(), inventory_to_field(&self.inventory));
        fields.insert("id".into(), FieldValue::String("Chest".into()));
        if !self.custom_name.is_empty() {
            fields.insert("CustomName".into(), FieldValue::String(self.custom_name.clone()));
        }
        fields
    }

    /// Rebuild the chest from persisted fields, keeping the current viewers attached.
    pub fn decode_fields(&self, fields: &FieldMap) -> Self {
        let inventory = inventory_for(CHEST_SLOT_COUNT, &self.viewers);
        inventory_from_fields(&inventory, field_list(fields, "Items"));
        Self {
            custom_name: field_string(fields, "CustomName"),
            inventory,
            viewers: Arc::clone(&self.viewers),
        }
    }
}

impl Container for Chest {
    fn inventory(&self) -> Option<&Arc<Inventory>> {
        Some(&self.inventory)
    }
}

/// Ender chest: a container whose contents live with the player, not the block.
/// Transfer blocks cannot reach into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnderChest;

impl Container for EnderChest {
    fn inventory(&self) -> Option<&Arc<Inventory>> {
        None
    }
}
