//! Container-transfer engine: hoppers moving items between neighbouring
//! containers of a block world.

mod chest;
mod container;
mod fields;
mod furnace;
mod hopper;
mod inventory;
mod persist;
mod viewer;
mod world;

pub use chest::*;
pub use container::*;
pub use fields::*;
pub use furnace::*;
pub use hopper::*;
pub use inventory::*;
pub use persist::*;
pub use viewer::*;
pub use world::*;
