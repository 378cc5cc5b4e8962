/// NPC generation from race and class tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::core::random::{RandomError, RandomSource};
use crate::schema::ability::{Ability, AbilityModifiers, AbilityScores, Skill};
use crate::schema::class::{CharacterClass, SpellcastingProfile, Subclass};
use crate::schema::npc::{Alignment, Npc, Possession, SpellcastingSummary};
use crate::schema::race::Race;
use crate::schema::settings::NpcSettings;

/// Subclass option that suppresses subclass assignment.
pub const NO_SUBCLASS: &str = "None";

pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 20;

/// Leveled spells listed per spell level, at most.
const MAX_SPELLS_SHOWN: u32 = 4;

#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("race not found: {0}")]
    RaceNotFound(String),
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("subclass {subclass} not found for class {class}")]
    SubclassNotFound { class: String, subclass: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("random source error: {0}")]
    Random(#[from] RandomError),
}

impl CharacterError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RaceNotFound(_) | Self::ClassNotFound(_) | Self::SubclassNotFound { .. }
        )
    }
}

/// What the caller pinned down. Anything left `None` is drawn at random.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterOptions {
    pub level: Option<u32>,
    pub race: Option<String>,
    pub class: Option<String>,
    /// A subclass name, or [`NO_SUBCLASS`].
    pub subclass: Option<String>,
    pub alignment: Option<Alignment>,
}

/// Build a complete NPC.
pub fn generate<R: RandomSource>(
    options: &CharacterOptions,
    settings: &NpcSettings,
    rng: &mut R,
) -> Result<Npc, CharacterError> {
    let level = match options.level {
        Some(level) if (MIN_LEVEL..=MAX_LEVEL).contains(&level) => level,
        Some(level) => {
            return Err(CharacterError::InvalidInput(format!(
                "level {level} outside {MIN_LEVEL}..={MAX_LEVEL}"
            )))
        }
        None => rng.uniform_int(MIN_LEVEL as i32, MAX_LEVEL as i32) as u32,
    };

    let race = match options.race.as_deref() {
        Some(name) => settings
            .races
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| CharacterError::RaceNotFound(name.to_string()))?,
        None => rng
            .choose(&settings.races)
            .ok_or_else(|| CharacterError::InvalidInput("no races configured".to_string()))?,
    };

    let class = match options.class.as_deref() {
        Some(name) => settings
            .classes
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| CharacterError::ClassNotFound(name.to_string()))?,
        None => rng
            .choose(&settings.classes)
            .ok_or_else(|| CharacterError::InvalidInput("no classes configured".to_string()))?,
    };

    let alignment = match options.alignment {
        Some(alignment) => alignment,
        None => *rng
            .choose(&Alignment::ALL)
            .unwrap_or(&Alignment::TrueNeutral),
    };

    let subclass = resolve_subclass(class, options.subclass.as_deref(), level, rng)?;

    let ability_scores = roll_ability_scores(race, rng);
    let ability_modifiers = ability_scores.modifiers();
    let hit_points = hit_points(
        class.hit_die,
        ability_modifiers.get(Ability::Constitution),
        level,
    );
    let proficiency_bonus = proficiency_bonus(level);
    let skills = skill_bonuses(class, &ability_modifiers, proficiency_bonus);
    let name = generate_name(race, rng);
    let possessions = generate_possessions(class, rng);
    let spellcasting = class.spellcasting.as_ref().map(|profile| {
        generate_spellcasting(profile, &ability_modifiers, proficiency_bonus, level, rng)
    });

    debug!(
        %name,
        race = %race.name,
        class = %class.name,
        level,
        hit_points,
        "generated npc"
    );

    Ok(Npc {
        name,
        level,
        race: race.name.clone(),
        class: class.name.clone(),
        subclass: subclass.map(|s| s.name.clone()),
        alignment,
        ability_scores,
        ability_modifiers,
        hit_points,
        proficiency_bonus,
        skills,
        traits: race.traits.clone(),
        possessions,
        spellcasting,
    })
}

/// A named subclass is honoured at any level; otherwise one is drawn once
/// the class's unlock level is reached.
fn resolve_subclass<'a, R: RandomSource>(
    class: &'a CharacterClass,
    requested: Option<&str>,
    level: u32,
    rng: &mut R,
) -> Result<Option<&'a Subclass>, CharacterError> {
    match requested {
        Some(NO_SUBCLASS) => Ok(None),
        Some(name) => class.subclass(name).map(Some).ok_or_else(|| {
            CharacterError::SubclassNotFound {
                class: class.name.clone(),
                subclass: name.to_string(),
            }
        }),
        None if level >= class.subclass_level => Ok(rng.choose(&class.subclasses)),
        None => Ok(None),
    }
}

/// 4d6, drop the lowest die. Always in `[3, 18]`.
pub fn roll_ability_score<R: RandomSource>(rng: &mut R) -> i32 {
    let dice: [i32; 4] = std::array::from_fn(|_| rng.roll(1, 6) as i32);
    let lowest = dice.iter().copied().min().unwrap_or(0);
    dice.iter().sum::<i32>() - lowest
}

/// Roll all six scores and apply the race's adjustments, clamped to
/// `[AbilityScores::MIN, AbilityScores::MAX]`.
pub fn roll_ability_scores<R: RandomSource>(race: &Race, rng: &mut R) -> AbilityScores {
    AbilityScores::from_fn(|ability| {
        let base = roll_ability_score(rng);
        (base + race.adjustment(ability)).clamp(AbilityScores::MIN, AbilityScores::MAX)
    })
}

/// Average hit points: `hit_die / 2 + 1` at first level, then
/// `hit_die / 2 + 1 + con_mod` per further level, never below 1 per level.
pub fn hit_points(hit_die: u32, con_mod: i32, level: u32) -> u32 {
    let average = (hit_die / 2 + 1) as i32;
    let per_level = (average + con_mod).max(1);
    let extra_levels = level.max(1) as i32 - 1;
    (average + per_level * extra_levels) as u32
}

pub fn proficiency_bonus(level: u32) -> i32 {
    2 + (level.max(1) as i32 - 1) / 4
}

/// Modifier plus proficiency for class skills; zero totals are dropped.
pub fn skill_bonuses(
    class: &CharacterClass,
    modifiers: &AbilityModifiers,
    proficiency_bonus: i32,
) -> BTreeMap<Skill, i32> {
    Skill::ALL
        .iter()
        .map(|&skill| {
            let proficiency = if class.is_proficient(skill) {
                proficiency_bonus
            } else {
                0
            };
            (skill, modifiers.get(skill.ability()) + proficiency)
        })
        .filter(|(_, bonus)| *bonus != 0)
        .collect()
}

fn generate_name<R: RandomSource>(race: &Race, rng: &mut R) -> String {
    let given = rng.choose(&race.names.given);
    let family = rng.choose(&race.names.family);
    match (given, family) {
        (Some(given), Some(family)) => format!("{given} {family}"),
        (Some(name), None) | (None, Some(name)) => name.clone(),
        (None, None) => format!("{} Stranger", race.name),
    }
}

fn generate_possessions<R: RandomSource>(class: &CharacterClass, rng: &mut R) -> Vec<Possession> {
    let equipment = &class.equipment;
    let (min, max) = equipment.extra_count;
    let count = rng.uniform_int(min as i32, max as i32).max(0) as usize;

    let mut possessions = equipment.guaranteed.clone();
    possessions.extend(
        rng.pick_distinct(&equipment.extras, count)
            .into_iter()
            .cloned(),
    );
    possessions
}

fn generate_spellcasting<R: RandomSource>(
    profile: &SpellcastingProfile,
    modifiers: &AbilityModifiers,
    proficiency_bonus: i32,
    level: u32,
    rng: &mut R,
) -> SpellcastingSummary {
    let ability_mod = modifiers.get(profile.ability);
    let cantrips_known = profile.cantrips_at(level);
    let slots = profile.slots_at(level);

    let cantrips = rng
        .pick_distinct(profile.spells_of_level(0), cantrips_known as usize)
        .into_iter()
        .cloned()
        .collect();

    let mut spells = BTreeMap::new();
    for (&spell_level, &count) in &slots {
        let shown = MAX_SPELLS_SHOWN.min(count + 1) as usize;
        let picked: Vec<String> = rng
            .pick_distinct(profile.spells_of_level(spell_level), shown)
            .into_iter()
            .cloned()
            .collect();
        if !picked.is_empty() {
            spells.insert(spell_level, picked);
        }
    }

    SpellcastingSummary {
        ability: profile.ability,
        save_dc: 8 + proficiency_bonus + ability_mod,
        attack_bonus: proficiency_bonus + ability_mod,
        cantrips_known,
        slots,
        cantrips,
        spells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::class::{EquipmentProfile, Feature};
    use crate::schema::race::NameTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings() -> NpcSettings {
        let human = Race {
            name: "Human".to_string(),
            ability_adjustments: Ability::ALL.iter().map(|&a| (a, 1)).collect(),
            traits: vec!["Versatile".to_string()],
            trait_descriptions: BTreeMap::new(),
            languages: vec!["Common".to_string()],
            size: Default::default(),
            speed: 30,
            innate_spellcasting: None,
            names: NameTable {
                given: vec!["Ada".to_string()],
                family: vec!["Brightwater".to_string()],
            },
        };
        let fighter = CharacterClass {
            name: "Fighter".to_string(),
            hit_die: 10,
            primary_ability: Ability::Strength,
            saving_throws: vec![Ability::Strength, Ability::Constitution],
            skill_proficiencies: vec![Skill::Athletics, Skill::Perception],
            features: vec![Feature {
                level: 1,
                name: "Second Wind".to_string(),
                description: String::new(),
            }],
            subclasses: vec![Subclass {
                name: "Champion".to_string(),
                description: String::new(),
                features: Vec::new(),
            }],
            subclass_level: 3,
            spellcasting: None,
            equipment: EquipmentProfile {
                guaranteed: vec![Possession::named("Longsword")],
                extras: vec![
                    Possession::named("Dice"),
                    Possession::named("Rope"),
                    Possession::named("Lantern"),
                ],
                extra_count: (1, 2),
            },
        };
        let wizard = CharacterClass {
            name: "Wizard".to_string(),
            hit_die: 6,
            primary_ability: Ability::Intelligence,
            saving_throws: vec![Ability::Intelligence, Ability::Wisdom],
            skill_proficiencies: vec![Skill::Arcana],
            features: Vec::new(),
            subclasses: vec![Subclass {
                name: "Evocation".to_string(),
                description: String::new(),
                features: Vec::new(),
            }],
            subclass_level: 2,
            spellcasting: Some(SpellcastingProfile {
                ability: Ability::Intelligence,
                slots: vec![vec![2], vec![3], vec![4, 2]],
                cantrips_known: vec![3],
                spell_lists: BTreeMap::from([
                    (
                        0,
                        vec!["Light".to_string(), "Mage Hand".to_string(), "Ray of Frost".to_string(), "Prestidigitation".to_string()],
                    ),
                    (
                        1,
                        vec!["Shield".to_string(), "Magic Missile".to_string(), "Sleep".to_string(), "Grease".to_string(), "Identify".to_string()],
                    ),
                    (2, vec!["Misty Step".to_string()]),
                ]),
            }),
            equipment: EquipmentProfile::default(),
        };
        NpcSettings {
            races: vec![human],
            classes: vec![fighter, wizard],
            statblock_format: Default::default(),
        }
    }

    fn pinned(level: u32, class: &str) -> CharacterOptions {
        CharacterOptions {
            level: Some(level),
            race: Some("Human".to_string()),
            class: Some(class.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn proficiency_bonus_table() {
        let expected = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 6];
        for (i, bonus) in expected.iter().enumerate() {
            assert_eq!(proficiency_bonus(i as u32 + 1), *bonus);
        }
    }

    #[test]
    fn hit_points_formula() {
        assert_eq!(hit_points(10, 2, 1), 6);
        assert_eq!(hit_points(10, 2, 5), 6 + 4 * 8);
        // A harsh constitution still yields one point per level.
        assert_eq!(hit_points(6, -5, 4), 4 + 3);
    }

    #[test]
    fn ability_scores_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let score = roll_ability_score(&mut rng);
            assert!((3..=18).contains(&score));
        }
        let mut race = settings().races.remove(0);
        race.ability_adjustments.insert(Ability::Strength, 40);
        race.ability_adjustments.insert(Ability::Charisma, -40);
        let scores = roll_ability_scores(&race, &mut rng);
        assert_eq!(scores.strength, AbilityScores::MAX);
        assert_eq!(scores.charisma, AbilityScores::MIN);
    }

    #[test]
    fn pinned_options_are_honoured() {
        let mut rng = StdRng::seed_from_u64(1);
        let npc = generate(&pinned(5, "Fighter"), &settings(), &mut rng).unwrap();
        assert_eq!(npc.level, 5);
        assert_eq!(npc.race, "Human");
        assert_eq!(npc.class, "Fighter");
        assert_eq!(npc.proficiency_bonus, 3);
        assert_eq!(npc.name, "Ada Brightwater");
        assert_eq!(npc.possessions[0], Possession::named("Longsword"));
        assert!((2..=3).contains(&npc.possessions.len()));
        assert!(npc.spellcasting.is_none());
    }

    #[test]
    fn skill_bonuses_match_modifiers() {
        let settings = settings();
        let class = &settings.classes[0];
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..50 {
            let npc = generate(&pinned(9, "Fighter"), &settings, &mut rng).unwrap();
            for skill in Skill::ALL {
                let mut expected = npc.modifier(skill.ability());
                if class.is_proficient(skill) {
                    expected += npc.proficiency_bonus;
                }
                assert_eq!(npc.skill_bonus(skill), expected);
                assert_ne!(npc.skills.get(&skill), Some(&0));
            }
        }
    }

    #[test]
    fn subclass_waits_for_unlock_level() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(2);
        let low = generate(&pinned(2, "Fighter"), &settings, &mut rng).unwrap();
        assert!(low.subclass.is_none());
        let high = generate(&pinned(3, "Fighter"), &settings, &mut rng).unwrap();
        assert_eq!(high.subclass.as_deref(), Some("Champion"));
        let wizard = generate(&pinned(2, "Wizard"), &settings, &mut rng).unwrap();
        assert_eq!(wizard.subclass.as_deref(), Some("Evocation"));
    }

    #[test]
    fn named_subclass_skips_gate_and_none_disables() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(2);

        let mut options = pinned(1, "Fighter");
        options.subclass = Some("Champion".to_string());
        let npc = generate(&options, &settings, &mut rng).unwrap();
        assert_eq!(npc.subclass.as_deref(), Some("Champion"));

        let mut options = pinned(20, "Fighter");
        options.subclass = Some(NO_SUBCLASS.to_string());
        let npc = generate(&options, &settings, &mut rng).unwrap();
        assert!(npc.subclass.is_none());
    }

    #[test]
    fn unknown_names_are_not_found() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(2);

        let mut options = pinned(1, "Fighter");
        options.race = Some("Dragonborn".to_string());
        let err = generate(&options, &settings, &mut rng).unwrap_err();
        assert!(matches!(err, CharacterError::RaceNotFound(ref r) if r == "Dragonborn"));

        let err = generate(&pinned(1, "Bard"), &settings, &mut rng).unwrap_err();
        assert!(err.is_not_found());

        let mut options = pinned(1, "Fighter");
        options.subclass = Some("Battle Master".to_string());
        let err = generate(&options, &settings, &mut rng).unwrap_err();
        assert!(matches!(err, CharacterError::SubclassNotFound { .. }));
    }

    #[test]
    fn level_out_of_range_is_invalid() {
        let mut rng = StdRng::seed_from_u64(2);
        let err = generate(&pinned(21, "Fighter"), &settings(), &mut rng).unwrap_err();
        assert!(matches!(err, CharacterError::InvalidInput(_)));
        let err = generate(&pinned(0, "Fighter"), &settings(), &mut rng).unwrap_err();
        assert!(matches!(err, CharacterError::InvalidInput(_)));
    }

    #[test]
    fn empty_tables_are_invalid_input() {
        let mut rng = StdRng::seed_from_u64(2);
        let err = generate(&CharacterOptions::default(), &NpcSettings::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, CharacterError::InvalidInput(_)));
    }

    #[test]
    fn wizard_spellcasting() {
        let mut rng = StdRng::seed_from_u64(4);
        let npc = generate(&pinned(3, "Wizard"), &settings(), &mut rng).unwrap();
        let spells = npc.spellcasting.as_ref().unwrap();
        let int_mod = npc.modifier(Ability::Intelligence);

        assert_eq!(spells.save_dc, 8 + 2 + int_mod);
        assert_eq!(spells.attack_bonus, 2 + int_mod);
        assert_eq!(spells.cantrips_known, 3);
        assert_eq!(spells.cantrips.len(), 3);
        assert_eq!(spells.slots, BTreeMap::from([(1, 4), (2, 2)]));

        // min(4, slots + 1) capped by list length, drawn without replacement.
        let first = &spells.spells[&1];
        assert_eq!(first.len(), 4);
        let mut unique = first.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        assert_eq!(spells.spells[&2], vec!["Misty Step".to_string()]);
    }

    #[test]
    fn hit_points_at_least_level() {
        let settings = settings();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let npc = generate(&CharacterOptions::default(), &settings, &mut rng).unwrap();
            assert!(npc.hit_points >= npc.level);
            assert!((1..=20).contains(&npc.level));
        }
    }
}
