//! Shared containers for the `loupe` reflection workspace.
//!
//! Provides deterministic hash containers (built on *hashbrown* and
//! *foldhash*), a [`TypeIdMap`] specialized for `TypeId` keys, and the
//! name-sorted [`Dictionary`] used for metaclass member tables.

// -----------------------------------------------------------------------------
// Modules

pub mod dictionary;
pub mod hash;

mod typeid_map;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use dictionary::Dictionary;
pub use typeid_map::TypeIdMap;
