use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ability::{Ability, Skill};
use super::npc::Possession;

/// Highest spell level tracked in slot tables.
pub const MAX_SPELL_LEVEL: u32 = 9;

/// A class or subclass feature gained at `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub level: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subclass {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// How a class casts spells.
///
/// `slots[n]` and `cantrips_known[n]` describe character level `n + 1`.
/// Tables shorter than twenty rows repeat their last row for higher levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellcastingProfile {
    pub ability: Ability,
    #[serde(default)]
    pub slots: Vec<Vec<u32>>,
    #[serde(default)]
    pub cantrips_known: Vec<u32>,
    /// Spell level → spell names. Level 0 holds cantrips.
    #[serde(default)]
    pub spell_lists: BTreeMap<u32, Vec<String>>,
}

impl SpellcastingProfile {
    /// Slot counts at a character level, keyed by spell level. Zero-count
    /// spell levels are omitted.
    pub fn slots_at(&self, level: u32) -> BTreeMap<u32, u32> {
        let Some(row) = row_at(&self.slots, level) else {
            return BTreeMap::new();
        };
        row.iter()
            .take(MAX_SPELL_LEVEL as usize)
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, count)| (i as u32 + 1, *count))
            .collect()
    }

    pub fn cantrips_at(&self, level: u32) -> u32 {
        row_at(&self.cantrips_known, level).copied().unwrap_or(0)
    }

    pub fn spells_of_level(&self, spell_level: u32) -> &[String] {
        self.spell_lists
            .get(&spell_level)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn row_at<T>(table: &[T], level: u32) -> Option<&T> {
    let index = (level.max(1) - 1) as usize;
    table.get(index).or_else(|| table.last())
}

/// Starting gear: everything in `guaranteed`, plus between
/// `extra_count.0` and `extra_count.1` distinct picks from `extras`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentProfile {
    #[serde(default)]
    pub guaranteed: Vec<Possession>,
    #[serde(default)]
    pub extras: Vec<Possession>,
    #[serde(default = "default_extra_count")]
    pub extra_count: (u32, u32),
}

fn default_extra_count() -> (u32, u32) {
    (1, 2)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterClass {
    pub name: String,
    pub hit_die: u32,
    pub primary_ability: Ability,
    #[serde(default)]
    pub saving_throws: Vec<Ability>,
    #[serde(default)]
    pub skill_proficiencies: Vec<Skill>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub subclasses: Vec<Subclass>,
    /// Character level at which a random subclass is assigned.
    #[serde(default = "default_subclass_level")]
    pub subclass_level: u32,
    #[serde(default)]
    pub spellcasting: Option<SpellcastingProfile>,
    #[serde(default)]
    pub equipment: EquipmentProfile,
}

fn default_subclass_level() -> u32 {
    3
}

impl CharacterClass {
    pub fn subclass(&self, name: &str) -> Option<&Subclass> {
        self.subclasses.iter().find(|s| s.name == name)
    }

    pub fn is_proficient(&self, skill: Skill) -> bool {
        self.skill_proficiencies.contains(&skill)
    }

    pub fn saves_with(&self, ability: Ability) -> bool {
        self.saving_throws.contains(&ability)
    }

    pub fn is_spellcaster(&self) -> bool {
        self.spellcasting.is_some()
    }

    /// Features unlocked at or below `level`.
    pub fn features_up_to(&self, level: u32) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(move |f| f.level <= level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caster() -> SpellcastingProfile {
        SpellcastingProfile {
            ability: Ability::Intelligence,
            slots: vec![vec![2], vec![3], vec![4, 2]],
            cantrips_known: vec![3, 3, 3, 4],
            spell_lists: BTreeMap::from([(0, vec!["Light".to_string()])]),
        }
    }

    #[test]
    fn slots_skip_empty_levels() {
        let profile = caster();
        assert_eq!(profile.slots_at(1), BTreeMap::from([(1, 2)]));
        assert_eq!(profile.slots_at(3), BTreeMap::from([(1, 4), (2, 2)]));
    }

    #[test]
    fn short_tables_repeat_last_row() {
        let profile = caster();
        assert_eq!(profile.slots_at(20), BTreeMap::from([(1, 4), (2, 2)]));
        assert_eq!(profile.cantrips_at(20), 4);
    }

    #[test]
    fn missing_spell_level_is_empty() {
        let profile = caster();
        assert_eq!(profile.spells_of_level(0), ["Light".to_string()]);
        assert!(profile.spells_of_level(5).is_empty());
    }

    #[test]
    fn class_defaults() {
        let class: CharacterClass = serde_json::from_str(
            r#"{"name": "Fighter", "hitDie": 10, "primaryAbility": "str"}"#,
        )
        .unwrap();
        assert_eq!(class.subclass_level, 3);
        assert!(!class.is_spellcaster());
        assert_eq!(class.equipment.extra_count, (1, 2));
    }
}
