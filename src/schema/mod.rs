pub mod ability;
pub mod class;
pub mod dungeon;
pub mod npc;
pub mod race;
pub mod settings;
