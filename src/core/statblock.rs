/// Statblock formatting: turns a generated NPC into display text.
///
/// Formatting is two steps: [`Statblock::build`] resolves everything the
/// output needs from the NPC and its race/class definitions into a plain
/// value, then a renderer writes that value in one of the supported
/// layouts. Neither step draws random numbers or touches the NPC.
///
/// Text that comes from user-editable tables (names, traits, features,
/// possessions, spells) passes through [`sanitize`], which drops `'`, `"`
/// and backticks and turns line breaks into spaces so it cannot break the
/// YAML-like fenced block.

use serde::Serialize;

use crate::core::character::CharacterError;
use crate::schema::ability::{Ability, Skill};
use crate::schema::class::CharacterClass;
use crate::schema::npc::{Npc, Possession};
use crate::schema::race::Race;
use crate::schema::settings::{NpcSettings, StatblockFormat};

const SOURCE: &str = "NPC Generator";
const DARKVISION: &str = "Darkvision";

/// Strip characters that would break the structured output.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '`'))
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

fn signed(value: i32) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// `1d8 + 2`, `1d8 - 1`, or `1d8` for a zero bonus.
fn dice_with_bonus(count: u32, die: u32, bonus: i32) -> String {
    match bonus {
        0 => format!("{count}d{die}"),
        b if b > 0 => format!("{count}d{die} + {b}"),
        b => format!("{count}d{die} - {}", -b),
    }
}

pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn builtin_trait_description(name: &str) -> Option<&'static str> {
    match name {
        DARKVISION => Some(
            "Can see in dim light within 60 feet as if it were bright light, and in darkness as if it were dim light.",
        ),
        "Fey Ancestry" => Some("Has advantage on saving throws against being charmed, and magic cannot put it to sleep."),
        "Lucky" => Some("When it rolls a 1 on an attack roll, ability check, or saving throw, it can reroll the die and must use the new roll."),
        "Dwarven Resilience" => Some("Has advantage on saving throws against poison and resistance against poison damage."),
        "Relentless Endurance" => Some("When reduced to 0 hit points but not killed outright, it can drop to 1 hit point instead, once per long rest."),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attack {
    pub name: String,
    pub desc: String,
    pub attack_bonus: i32,
    pub damage_dice: String,
    pub damage_bonus: i32,
}

/// Everything a statblock shows, already sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statblock {
    pub name: String,
    pub size: String,
    pub subtype: String,
    pub alignment: String,
    pub ac: i32,
    pub hp: u32,
    pub hit_dice: String,
    pub speed: u32,
    pub stats: [i32; 6],
    pub modifiers: [i32; 6],
    /// Every ability's save, proficiency included where the class has it.
    pub saves: Vec<(Ability, i32, bool)>,
    pub skills: Vec<(Skill, i32)>,
    pub darkvision: bool,
    pub passive_perception: i32,
    pub languages: String,
    pub cr: u32,
    pub traits: Vec<Entry>,
    pub actions: Vec<Attack>,
    pub spells: Vec<String>,
    pub possessions: Vec<Possession>,
}

impl Statblock {
    /// Resolve a statblock from an NPC and the definitions it was built from.
    pub fn build(npc: &Npc, race: &Race, class: &CharacterClass) -> Statblock {
        let stats = Ability::ALL.map(|a| npc.ability_scores.get(a));
        let modifiers = Ability::ALL.map(|a| npc.modifier(a));
        let con = npc.modifier(Ability::Constitution);

        let saves = Ability::ALL
            .iter()
            .map(|&ability| {
                let proficient = class.saves_with(ability);
                let bonus = npc.modifier(ability) + if proficient { npc.proficiency_bonus } else { 0 };
                (ability, bonus, proficient)
            })
            .collect();

        let languages = if race.languages.is_empty() {
            "Common".to_string()
        } else {
            sanitize(&race.languages.join(", "))
        };

        Statblock {
            name: sanitize(&npc.name),
            size: race.size.to_string(),
            subtype: sanitize(&npc.race.to_lowercase()),
            alignment: npc.alignment.name().to_lowercase(),
            ac: 10 + npc.modifier(Ability::Dexterity),
            hp: npc.hit_points,
            hit_dice: dice_with_bonus(npc.level, class.hit_die, npc.level as i32 * con),
            speed: race.speed,
            stats,
            modifiers,
            saves,
            skills: npc.skills.iter().map(|(s, b)| (*s, *b)).collect(),
            darkvision: race.has_trait(DARKVISION),
            passive_perception: 10 + npc.skill_bonus(Skill::Perception),
            languages,
            cr: (npc.level / 4).max(1),
            traits: Self::traits(npc, race, class),
            actions: vec![Self::primary_attack(npc, class)],
            spells: Self::spell_lines(npc),
            possessions: npc
                .possessions
                .iter()
                .map(|p| Possession {
                    name: sanitize(&p.name),
                    desc: p.desc.as_deref().map(sanitize),
                })
                .collect(),
        }
    }

    /// Racial traits, then class features, then subclass features, each
    /// limited to what the NPC's level has unlocked.
    fn traits(npc: &Npc, race: &Race, class: &CharacterClass) -> Vec<Entry> {
        let mut traits: Vec<Entry> = npc
            .traits
            .iter()
            .map(|name| {
                let desc = race
                    .trait_descriptions
                    .get(name)
                    .map(String::as_str)
                    .or_else(|| builtin_trait_description(name))
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Racial trait of {}.", race.name));
                Entry {
                    name: sanitize(name),
                    desc: sanitize(&desc),
                }
            })
            .collect();

        if let Some(innate) = &race.innate_spellcasting {
            traits.push(Entry {
                name: "Innate Spellcasting".to_string(),
                desc: sanitize(innate),
            });
        }

        traits.extend(class.features_up_to(npc.level).map(|f| Entry {
            name: sanitize(&f.name),
            desc: sanitize(&f.description),
        }));

        let subclass = npc.subclass.as_deref().and_then(|name| class.subclass(name));
        if let Some(subclass) = subclass {
            traits.extend(
                subclass
                    .features
                    .iter()
                    .filter(|f| f.level <= npc.level)
                    .map(|f| Entry {
                        name: format!("{} ({})", sanitize(&f.name), sanitize(&subclass.name)),
                        desc: sanitize(&f.description),
                    }),
            );
        }

        traits
    }

    /// A longsword for strength fighters, a shortsword otherwise.
    fn primary_attack(npc: &Npc, class: &CharacterClass) -> Attack {
        let str_mod = npc.modifier(Ability::Strength);
        let dex_mod = npc.modifier(Ability::Dexterity);
        let uses_strength = class.primary_ability == Ability::Strength || str_mod > dex_mod;

        let (name, die, ability_mod) = if uses_strength {
            ("Longsword", 8, str_mod)
        } else {
            ("Shortsword", 6, dex_mod)
        };
        let attack_bonus = ability_mod + npc.proficiency_bonus;
        let average = (die / 2 + 1) as i32 + ability_mod;
        let damage = dice_with_bonus(1, die, ability_mod);

        Attack {
            name: name.to_string(),
            desc: format!(
                "Melee Weapon Attack: {} to hit, reach 5 ft., one target. Hit: {} ({}) slashing damage.",
                signed(attack_bonus),
                average.max(1),
                damage
            ),
            attack_bonus,
            damage_dice: format!("1d{die}"),
            damage_bonus: ability_mod,
        }
    }

    fn spell_lines(npc: &Npc) -> Vec<String> {
        let Some(spells) = &npc.spellcasting else {
            return Vec::new();
        };

        let mut lines = vec![format!(
            "The {} is a level {} spellcaster. Its spellcasting ability is {} (spell save DC {}, {} to hit with spell attacks).",
            sanitize(&npc.name),
            npc.level,
            spells.ability,
            spells.save_dc,
            signed(spells.attack_bonus)
        )];
        if !spells.cantrips.is_empty() {
            lines.push(format!(
                "Cantrips (at will): {}",
                sanitize(&spells.cantrips.join(", "))
            ));
        }
        for (level, slots) in &spells.slots {
            let names = spells
                .spells
                .get(level)
                .map(|names| sanitize(&names.join(", ")))
                .unwrap_or_default();
            lines.push(format!(
                "{} level ({} slots): {}",
                ordinal(*level),
                slots,
                names
            ));
        }
        lines
    }

    /// Fenced ```statblock block.
    pub fn render_fantasy(&self) -> String {
        let mut lines = Vec::new();
        lines.push("```statblock".to_string());
        lines.push(format!("name: {}", self.name));
        lines.push(format!("source: {SOURCE}"));
        lines.push(format!("size: {}", self.size));
        lines.push("type: humanoid".to_string());
        lines.push(format!("subtype: {}", self.subtype));
        lines.push(format!("alignment: {}", self.alignment));
        lines.push(format!("ac: {}", self.ac));
        lines.push(format!("hp: {}", self.hp));
        lines.push(format!("hit_dice: {}", self.hit_dice));
        lines.push(format!("speed: {} ft.", self.speed));
        lines.push("stats:".to_string());
        for stat in self.stats {
            lines.push(format!("  - {stat}"));
        }
        lines.push("saves:".to_string());
        for (ability, bonus, _) in &self.saves {
            lines.push(format!("  - {}: {}", ability.name().to_lowercase(), bonus));
        }
        lines.push("skillsaves:".to_string());
        for (skill, bonus) in &self.skills {
            lines.push(format!("  - {}: {}", skill.name().to_lowercase(), bonus));
        }
        lines.push("damage_vulnerabilities: \"\"".to_string());
        lines.push("damage_resistances: \"\"".to_string());
        lines.push("damage_immunities: \"\"".to_string());
        lines.push("condition_immunities: \"\"".to_string());
        lines.push(format!("senses: {}", self.senses()));
        lines.push(format!("languages: {}", self.languages));
        lines.push(format!("cr: \"{}\"", self.cr));
        lines.push("bestiary: true".to_string());
        lines.push("traits:".to_string());
        for entry in &self.traits {
            lines.push(format!("  - name: {}", entry.name));
            lines.push(format!("    desc: {}", entry.desc));
            lines.push("    attack_bonus: 0".to_string());
        }
        lines.push("actions:".to_string());
        for attack in &self.actions {
            lines.push(format!("  - name: {}", attack.name));
            lines.push(format!("    desc: \"{}\"", attack.desc));
            lines.push(format!("    attack_bonus: {}", attack.attack_bonus));
            lines.push(format!("    damage_dice: {}", attack.damage_dice));
            lines.push(format!("    damage_bonus: {}", attack.damage_bonus));
        }
        if let Some((intro, rest)) = self.spells.split_first() {
            lines.push("spells:".to_string());
            lines.push(format!("  - \"{intro}\""));
            for line in rest {
                lines.push(format!("  - {line}"));
            }
        }
        lines.push("possessions:".to_string());
        for item in &self.possessions {
            lines.push(format!("  - name: {}", item.name));
            if let Some(desc) = &item.desc {
                lines.push(format!("    desc: {desc}"));
            }
        }
        lines.push("```".to_string());
        lines.join("\n")
    }

    /// Markdown sheet for notes without a statblock renderer.
    pub fn render_basic(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("## {}", self.name));
        lines.push(format!(
            "*{} humanoid ({}), {}*",
            self.size, self.subtype, self.alignment
        ));
        lines.push(String::new());
        lines.push(format!("**Armor Class** {}  ", self.ac));
        lines.push(format!("**Hit Points** {} ({})  ", self.hp, self.hit_dice));
        lines.push(format!("**Speed** {} ft.", self.speed));
        lines.push(String::new());
        let header: Vec<String> = Ability::ALL
            .iter()
            .map(|a| a.abbreviation().to_uppercase())
            .collect();
        lines.push(format!("| {} |", header.join(" | ")));
        lines.push(format!("|{}", ":---:|".repeat(header.len())));
        let cells: Vec<String> = self
            .stats
            .iter()
            .zip(self.modifiers)
            .map(|(score, m)| format!("{score} ({})", signed(m)))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        lines.push(String::new());

        let saves: Vec<String> = self
            .saves
            .iter()
            .filter(|(_, _, proficient)| *proficient)
            .map(|(ability, bonus, _)| format!("{} {}", ability.name(), signed(*bonus)))
            .collect();
        if !saves.is_empty() {
            lines.push(format!("**Saving Throws** {}  ", saves.join(", ")));
        }
        if !self.skills.is_empty() {
            let skills: Vec<String> = self
                .skills
                .iter()
                .map(|(skill, bonus)| format!("{skill} {}", signed(*bonus)))
                .collect();
            lines.push(format!("**Skills** {}  ", skills.join(", ")));
        }
        lines.push(format!("**Senses** {}  ", self.senses()));
        lines.push(format!("**Languages** {}  ", self.languages));
        lines.push(format!("**Challenge** {}", self.cr));

        if !self.traits.is_empty() {
            lines.push("\n### Traits".to_string());
            for entry in &self.traits {
                lines.push(format!("***{}.*** {}", entry.name, entry.desc));
            }
        }
        lines.push("\n### Actions".to_string());
        for attack in &self.actions {
            lines.push(format!("***{}.*** {}", attack.name, attack.desc));
        }
        if !self.spells.is_empty() {
            lines.push("\n### Spellcasting".to_string());
            for line in &self.spells {
                lines.push(format!("- {line}"));
            }
        }
        if !self.possessions.is_empty() {
            lines.push("\n### Possessions".to_string());
            for item in &self.possessions {
                match &item.desc {
                    Some(desc) => lines.push(format!("- {}: {}", item.name, desc)),
                    None => lines.push(format!("- {}", item.name)),
                }
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }

    fn senses(&self) -> String {
        let darkvision = if self.darkvision { "darkvision 60 ft., " } else { "" };
        format!("{darkvision}passive Perception {}", self.passive_perception)
    }
}

/// Format an NPC using the settings' chosen layout.
///
/// The NPC's race and class are looked up again, since settings may have
/// changed since the NPC was generated.
pub fn format_statblock(npc: &Npc, settings: &NpcSettings) -> Result<String, CharacterError> {
    let race = settings
        .races
        .iter()
        .find(|r| r.name == npc.race)
        .ok_or_else(|| CharacterError::RaceNotFound(npc.race.clone()))?;
    let class = settings
        .classes
        .iter()
        .find(|c| c.name == npc.class)
        .ok_or_else(|| CharacterError::ClassNotFound(npc.class.clone()))?;

    let statblock = Statblock::build(npc, race, class);
    Ok(match settings.statblock_format {
        StatblockFormat::FantasyStatblock => statblock.render_fantasy(),
        StatblockFormat::Basic => statblock.render_basic(),
    })
}
