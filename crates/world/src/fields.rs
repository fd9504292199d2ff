//! Structured field set used to persist block entities.
//!
//! A block entity is stored as a flat [`FieldMap`] of named primitive values.
//! Readers are lenient: a missing or mistyped field reads as the zero value,
//! so older or partial records still load.

use crate::inventory::Inventory;
use hopperline_core::{ItemStack, ItemType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Named fields of one block entity.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// A single persisted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    String(String),
    ByteArray(Vec<u8>),
    List(Vec<FieldValue>),
    Compound(FieldMap),
}

/// Read a string field, defaulting to `""`.
pub fn field_string(fields: &FieldMap, key: &str) -> String {
    match fields.get(key) {
        Some(FieldValue::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Read an integer field, accepting any integer width, defaulting to 0.
pub fn field_i32(fields: &FieldMap, key: &str) -> i32 {
    match fields.get(key) {
        Some(FieldValue::Byte(v)) => i32::from(*v),
        Some(FieldValue::Short(v)) => i32::from(*v),
        Some(FieldValue::Int(v)) => *v,
        Some(FieldValue::Long(v)) => (*v).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32,
        _ => 0,
    }
}

/// Read a list field, defaulting to an empty slice.
pub fn field_list<'a>(fields: &'a FieldMap, key: &str) -> &'a [FieldValue] {
    match fields.get(key) {
        Some(FieldValue::List(values)) => values,
        _ => &[],
    }
}

/// Encode one stack (without its slot index).
pub fn stack_to_fields(stack: &ItemStack) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("Name".into(), FieldValue::String(stack.item_type.key()));
    fields.insert(
        "Count".into(),
        FieldValue::Byte(stack.count.min(i8::MAX as u32) as i8),
    );
    if let Some(durability) = stack.durability {
        fields.insert(
            "Damage".into(),
            FieldValue::Int(durability.min(i32::MAX as u32) as i32),
        );
    }
    if let Some(metadata) = &stack.metadata {
        fields.insert("tag".into(), FieldValue::ByteArray(metadata.clone()));
    }
    fields
}

/// Decode one stack. Returns `None` for unknown items or non-positive counts;
/// counts above the item's maximum stack size are clamped to it.
pub fn stack_from_fields(fields: &FieldMap) -> Option<ItemStack> {
    let item_type = ItemType::from_key(&field_string(fields, "Name"))?;
    let count = field_i32(fields, "Count");
    if count <= 0 {
        return None;
    }

    let max = item_type.max_stack_size();
    let count = if count as u32 > max {
        warn!(count, max, item = %item_type.key(), "clamping oversized stored stack");
        max
    } else {
        count as u32
    };

    let mut stack = ItemStack::new(item_type, count);
    if let Some(FieldValue::Int(damage)) = fields.get("Damage") {
        stack.durability = u32::try_from(*damage).ok();
    }
    if let Some(FieldValue::ByteArray(tag)) = fields.get("tag") {
        stack.metadata = Some(tag.clone());
    }
    Some(stack)
}

/// Encode every non-empty slot as a compound carrying its `Slot` index.
pub fn inventory_to_field(inventory: &Inventory) -> FieldValue {
    let entries = inventory
        .slots()
        .into_iter()
        .enumerate()
        .filter_map(|(slot, stack)| {
            let stack = stack?;
            let mut fields = stack_to_fields(&stack);
            fields.insert("Slot".into(), FieldValue::Byte(slot as i8));
            Some(FieldValue::Compound(fields))
        })
        .collect();
    FieldValue::List(entries)
}

/// Replay encoded slot entries into `inventory`. Malformed entries are skipped.
pub fn inventory_from_fields(inventory: &Inventory, entries: &[FieldValue]) {
    for entry in entries {
        let FieldValue::Compound(fields) = entry else {
            warn!("skipping non-compound inventory entry");
            continue;
        };
        let Ok(slot) = usize::try_from(field_i32(fields, "Slot")) else {
            warn!("skipping inventory entry with negative slot");
            continue;
        };
        let Some(stack) = stack_from_fields(fields) else {
            warn!(slot, "skipping unreadable inventory entry");
            continue;
        };
        if let Err(err) = inventory.set_item(slot, Some(stack)) {
            warn!(%err, "skipping inventory entry");
        }
    }
}
