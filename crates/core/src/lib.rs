#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod item;
pub mod pos;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use item::{blocks, items, total_count, ItemStack, ItemType, ToolMaterial, ToolType};
pub use pos::{BlockPos, Face};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}
