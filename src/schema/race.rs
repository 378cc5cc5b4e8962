use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ability::Ability;

/// Creature size category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Size {
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tiny => "Tiny",
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
            Self::Huge => "Huge",
            Self::Gargantuan => "Gargantuan",
        };
        f.write_str(s)
    }
}

/// Given and family names an NPC of this race is drawn from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NameTable {
    #[serde(default)]
    pub given: Vec<String>,
    #[serde(default)]
    pub family: Vec<String>,
}

/// A playable race. Reference data, never mutated by the generators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    pub name: String,
    #[serde(default)]
    pub ability_adjustments: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub traits: Vec<String>,
    /// Trait name → rules text. Traits without an entry fall back to a
    /// generic description when formatted.
    #[serde(default)]
    pub trait_descriptions: BTreeMap<String, String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_speed")]
    pub speed: u32,
    #[serde(default)]
    pub innate_spellcasting: Option<String>,
    #[serde(default)]
    pub names: NameTable,
}

fn default_speed() -> u32 {
    30
}

impl Race {
    pub fn adjustment(&self, ability: Ability) -> i32 {
        self.ability_adjustments.get(&ability).copied().unwrap_or(0)
    }

    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t == name)
    }
}
