//! Tabletop Gen: procedural content generation for tabletop RPG prep.
//!
//! Three independent generators share one random source and one read-only
//! settings snapshot: NPC statblocks from race/class tables, dungeon maps
//! from dungeon-type profiles, and random text from weighted token tables.

pub mod core;
pub mod schema;
