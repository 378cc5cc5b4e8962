use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ability::{Ability, AbilityModifiers, AbilityScores, Skill};

/// The nine canonical alignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    #[serde(rename = "Lawful Good")]
    LawfulGood,
    #[serde(rename = "Neutral Good")]
    NeutralGood,
    #[serde(rename = "Chaotic Good")]
    ChaoticGood,
    #[serde(rename = "Lawful Neutral")]
    LawfulNeutral,
    #[serde(rename = "True Neutral")]
    TrueNeutral,
    #[serde(rename = "Chaotic Neutral")]
    ChaoticNeutral,
    #[serde(rename = "Lawful Evil")]
    LawfulEvil,
    #[serde(rename = "Neutral Evil")]
    NeutralEvil,
    #[serde(rename = "Chaotic Evil")]
    ChaoticEvil,
}

impl Alignment {
    pub const ALL: [Alignment; 9] = [
        Alignment::LawfulGood,
        Alignment::NeutralGood,
        Alignment::ChaoticGood,
        Alignment::LawfulNeutral,
        Alignment::TrueNeutral,
        Alignment::ChaoticNeutral,
        Alignment::LawfulEvil,
        Alignment::NeutralEvil,
        Alignment::ChaoticEvil,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::LawfulGood => "Lawful Good",
            Self::NeutralGood => "Neutral Good",
            Self::ChaoticGood => "Chaotic Good",
            Self::LawfulNeutral => "Lawful Neutral",
            Self::TrueNeutral => "True Neutral",
            Self::ChaoticNeutral => "Chaotic Neutral",
            Self::LawfulEvil => "Lawful Evil",
            Self::NeutralEvil => "Neutral Evil",
            Self::ChaoticEvil => "Chaotic Evil",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An item an NPC carries, optionally with a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Possession {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Possession {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: None,
        }
    }
}

/// Spellcasting numbers and the spells picked for one NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellcastingSummary {
    pub ability: Ability,
    pub save_dc: i32,
    pub attack_bonus: i32,
    pub cantrips_known: u32,
    /// Spell level → slot count, zero entries omitted.
    pub slots: BTreeMap<u32, u32>,
    pub cantrips: Vec<String>,
    /// Spell level → prepared spell names.
    pub spells: BTreeMap<u32, Vec<String>>,
}

/// A generated NPC. Built once by the character generator and only read
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub name: String,
    pub level: u32,
    pub race: String,
    pub class: String,
    pub subclass: Option<String>,
    pub alignment: Alignment,
    pub ability_scores: AbilityScores,
    pub ability_modifiers: AbilityModifiers,
    pub hit_points: u32,
    pub proficiency_bonus: i32,
    /// Skill → total bonus. Zero bonuses are not stored.
    pub skills: BTreeMap<Skill, i32>,
    pub traits: Vec<String>,
    pub possessions: Vec<Possession>,
    pub spellcasting: Option<SpellcastingSummary>,
}

impl Npc {
    pub fn modifier(&self, ability: Ability) -> i32 {
        self.ability_modifiers.get(ability)
    }

    pub fn skill_bonus(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }
}
