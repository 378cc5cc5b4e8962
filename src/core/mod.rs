pub mod character;
pub mod dungeon;
pub mod random;
pub mod render;
pub mod statblock;
pub mod template;
pub mod toolkit;
