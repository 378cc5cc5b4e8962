/// Settings store: the configuration document the generators read from.
///
/// The document has three sections, `npc`, `dungeon` and `random`, each
/// importable and exportable on its own as JSON with the same shape it has
/// inside the whole document. Built-in defaults ship as RON and are
/// overlaid section by section with whatever a user document provides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::class::CharacterClass;
use super::dungeon::{DungeonType, MapStyle};
use super::race::Race;
use crate::core::template::GeneratorTemplate;

const BUILTIN_NPC: &str = include_str!("../../data/npc.ron");
const BUILTIN_DUNGEON: &str = include_str!("../../data/dungeon.ron");
const BUILTIN_RANDOM: &str = include_str!("../../data/random.ron");

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown settings section: {0}")]
    UnknownSection(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatblockFormat {
    /// Fenced `statblock` block understood by fantasy statblock renderers.
    #[default]
    #[serde(rename = "fantasyStatblock")]
    FantasyStatblock,
    /// Plain markdown sheet.
    #[serde(rename = "basic")]
    Basic,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcSettings {
    #[serde(default)]
    pub races: Vec<Race>,
    #[serde(default)]
    pub classes: Vec<CharacterClass>,
    #[serde(default)]
    pub statblock_format: StatblockFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonSettings {
    /// Keyed by type id; each profile also carries a display name.
    #[serde(default)]
    pub dungeon_types: BTreeMap<String, DungeonType>,
    #[serde(default)]
    pub default_dungeon_type: String,
    #[serde(default)]
    pub map_style: MapStyle,
}

impl DungeonSettings {
    /// Look up a dungeon type by id, falling back to its display name.
    pub fn find_type(&self, name: &str) -> Option<&DungeonType> {
        self.dungeon_types
            .get(name)
            .or_else(|| self.dungeon_types.values().find(|t| t.name == name))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomSettings {
    #[serde(default)]
    pub generators: Vec<GeneratorTemplate>,
}

/// One of the three top-level sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Npc,
    Dungeon,
    Random,
}

impl FromStr for Section {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npc" => Ok(Self::Npc),
            "dungeon" => Ok(Self::Dungeon),
            "random" => Ok(Self::Random),
            _ => Err(SettingsError::UnknownSection(s.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Npc => "npc",
            Self::Dungeon => "dungeon",
            Self::Random => "random",
        };
        f.write_str(s)
    }
}

/// The whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub npc: NpcSettings,
    #[serde(default)]
    pub dungeon: DungeonSettings,
    #[serde(default)]
    pub random: RandomSettings,
}

/// A user document may omit any section.
#[derive(Debug, Default, Deserialize)]
struct PartialSettings {
    npc: Option<NpcSettings>,
    dungeon: Option<DungeonSettings>,
    random: Option<RandomSettings>,
}

impl Settings {
    /// The defaults compiled into the crate.
    pub fn builtin() -> Result<Settings, SettingsError> {
        Ok(Settings {
            npc: ron::from_str(BUILTIN_NPC)?,
            dungeon: ron::from_str(BUILTIN_DUNGEON)?,
            random: ron::from_str(BUILTIN_RANDOM)?,
        })
    }

    /// Parse a JSON document, filling missing sections from the built-in
    /// defaults.
    pub fn from_json_str(input: &str) -> Result<Settings, SettingsError> {
        let partial: PartialSettings = serde_json::from_str(input)?;
        let mut settings = Settings::builtin()?;
        if let Some(npc) = partial.npc {
            settings.npc = npc;
        }
        if let Some(dungeon) = partial.dungeon {
            settings.dungeon = dungeon;
        }
        if let Some(random) = partial.random {
            settings.random = random;
        }
        Ok(settings)
    }

    pub fn load_json(path: &Path) -> Result<Settings, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), "loaded settings document");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "saved settings document");
        Ok(())
    }

    /// Serialize a single section.
    pub fn export_section(&self, section: Section) -> Result<String, SettingsError> {
        let json = match section {
            Section::Npc => serde_json::to_string_pretty(&self.npc)?,
            Section::Dungeon => serde_json::to_string_pretty(&self.dungeon)?,
            Section::Random => serde_json::to_string_pretty(&self.random)?,
        };
        Ok(json)
    }

    /// Replace a single section. The document is untouched if parsing fails.
    pub fn import_section(&mut self, section: Section, json: &str) -> Result<(), SettingsError> {
        match section {
            Section::Npc => self.npc = serde_json::from_str(json)?,
            Section::Dungeon => self.dungeon = serde_json::from_str(json)?,
            Section::Random => self.random = serde_json::from_str(json)?,
        }
        debug!(%section, "imported settings section");
        Ok(())
    }

    pub fn race(&self, name: &str) -> Option<&Race> {
        self.npc.races.iter().find(|r| r.name == name)
    }

    pub fn class(&self, name: &str) -> Option<&CharacterClass> {
        self.npc.classes.iter().find(|c| c.name == name)
    }

    pub fn dungeon_type(&self, name: &str) -> Option<&DungeonType> {
        self.dungeon.find_type(name)
    }

    pub fn template(&self, name: &str) -> Option<&GeneratorTemplate> {
        self.random.generators.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_parse() {
        let settings = Settings::builtin().unwrap();
        assert!(settings.race("Human").is_some());
        assert!(settings.class("Fighter").is_some());
        assert!(settings.dungeon_type("Cave").is_some());
        assert!(settings.template("tavernName").is_some());
        assert_eq!(settings.npc.statblock_format, StatblockFormat::FantasyStatblock);
        assert!(settings
            .dungeon_type(&settings.dungeon.default_dungeon_type)
            .is_some());
    }

    #[test]
    fn dungeon_type_found_by_id_or_name() {
        let settings = Settings::builtin().unwrap();
        let by_id = settings.dungeon_type("crypt").unwrap();
        let by_name = settings.dungeon_type("Crypt").unwrap();
        assert_eq!(by_id.name, by_name.name);
        assert!(settings.dungeon_type("Volcano").is_none());
    }

    #[test]
    fn partial_document_keeps_other_sections() {
        let settings = Settings::from_json_str(
            r#"{"random": {"generators": [{"name": "one", "root": "x", "tokens": {}}]}}"#,
        )
        .unwrap();
        assert_eq!(settings.random.generators.len(), 1);
        assert!(settings.race("Human").is_some());
        assert!(settings.dungeon_type("Cave").is_some());
    }

    #[test]
    fn section_export_import_round_trip() {
        let source = Settings::builtin().unwrap();
        let exported = source.export_section(Section::Dungeon).unwrap();

        let mut target = Settings::default();
        target.import_section(Section::Dungeon, &exported).unwrap();
        assert_eq!(
            target.dungeon.dungeon_types.len(),
            source.dungeon.dungeon_types.len()
        );
        assert!(target.npc.races.is_empty());
    }

    #[test]
    fn failed_import_leaves_section_intact() {
        let mut settings = Settings::builtin().unwrap();
        let before = settings.npc.races.len();
        assert!(settings.import_section(Section::Npc, "{not json").is_err());
        assert_eq!(settings.npc.races.len(), before);
    }

    #[test]
    fn section_names_parse() {
        assert_eq!("NPC".parse::<Section>().unwrap(), Section::Npc);
        assert!(matches!(
            "weather".parse::<Section>(),
            Err(SettingsError::UnknownSection(_))
        ));
    }
}
