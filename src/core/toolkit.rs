/// The toolkit facade: one settings snapshot, one seed, every generator.
///
/// Each call seeds its own RNG from the toolkit seed plus a running
/// generation counter, so a toolkit built with the same seed and settings
/// replays the same sequence of results.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

use crate::core::character::{self, CharacterError, CharacterOptions};
use crate::core::dungeon::{self, DungeonError, DungeonOptions};
use crate::core::statblock;
use crate::core::template::{Expansion, TemplateError, DEFAULT_MAX_DEPTH};
use crate::schema::dungeon::Dungeon;
use crate::schema::npc::Npc;
use crate::schema::settings::{Settings, SettingsError};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("character error: {0}")]
    Character(#[from] CharacterError),
    #[error("dungeon error: {0}")]
    Dungeon(#[from] DungeonError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

impl ToolkitError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Character(e) => e.is_not_found(),
            Self::Template(TemplateError::NotFound(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateOptions {
    /// Defaults to [`DEFAULT_MAX_DEPTH`].
    pub max_depth: Option<usize>,
}

/// Entry point for all generation. Built via `Toolkit::builder()`.
pub struct Toolkit {
    settings: Settings,
    seed: u64,
    generation_count: u64,
}

/// Builder for constructing a `Toolkit`.
pub struct ToolkitBuilder {
    seed: Option<u64>,
    settings_path: Option<PathBuf>,
    /// Directly provided settings (for hosts that keep their own document).
    settings: Option<Settings>,
}

impl Toolkit {
    pub fn builder() -> ToolkitBuilder {
        ToolkitBuilder {
            seed: None,
            settings_path: None,
            settings: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Mutable access for section imports. Later calls see the change.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn next_rng(&mut self) -> StdRng {
        let rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.generation_count));
        self.generation_count += 1;
        rng
    }

    pub fn generate_character(&mut self, options: &CharacterOptions) -> Result<Npc, ToolkitError> {
        let mut rng = self.next_rng();
        Ok(character::generate(options, &self.settings.npc, &mut rng)?)
    }

    /// Statblock text in the format the settings select.
    pub fn format_statblock(&self, npc: &Npc) -> Result<String, ToolkitError> {
        Ok(statblock::format_statblock(npc, &self.settings.npc)?)
    }

    pub fn generate_dungeon(&mut self, options: &DungeonOptions) -> Result<Dungeon, ToolkitError> {
        let mut rng = self.next_rng();
        Ok(dungeon::generate(options, &self.settings.dungeon, &mut rng)?)
    }

    /// Expand the template called `name`.
    pub fn expand_template(
        &mut self,
        name: &str,
        options: &TemplateOptions,
    ) -> Result<Expansion, ToolkitError> {
        let mut rng = self.next_rng();
        let template = self
            .settings
            .template(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        let max_depth = options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        Ok(template.expand(max_depth, &mut rng)?)
    }
}

impl ToolkitBuilder {
    /// Fixed seed. Without one the toolkit draws a random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// JSON settings document, overlaid on the built-in defaults.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Use these settings as they are. Takes precedence over `settings_path`.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> Result<Toolkit, ToolkitError> {
        let settings = match (self.settings, self.settings_path) {
            (Some(settings), _) => settings,
            (None, Some(path)) => Settings::load_json(&path)?,
            (None, None) => Settings::builtin()?,
        };
        let seed = self.seed.unwrap_or_else(rand::random);

        info!(
            seed,
            races = settings.npc.races.len(),
            classes = settings.npc.classes.len(),
            dungeon_types = settings.dungeon.dungeon_types.len(),
            templates = settings.random.generators.len(),
            "toolkit ready"
        );
        Ok(Toolkit {
            settings,
            seed,
            generation_count: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::dungeon::DungeonSize;

    fn toolkit(seed: u64) -> Toolkit {
        Toolkit::builder().seed(seed).build().unwrap()
    }

    #[test]
    fn same_seed_replays_the_same_results() {
        let mut a = toolkit(99);
        let mut b = toolkit(99);
        for _ in 0..5 {
            let npc_a = a.generate_character(&CharacterOptions::default()).unwrap();
            let npc_b = b.generate_character(&CharacterOptions::default()).unwrap();
            assert_eq!(npc_a, npc_b);
        }
        let options = DungeonOptions {
            dungeon_type: None,
            size: DungeonSize::Small,
        };
        assert_eq!(
            a.generate_dungeon(&options).unwrap(),
            b.generate_dungeon(&options).unwrap()
        );
    }

    #[test]
    fn successive_calls_use_fresh_draws() {
        let mut toolkit = toolkit(4);
        let names: Vec<String> = (0..8)
            .map(|_| {
                toolkit
                    .generate_character(&CharacterOptions::default())
                    .unwrap()
                    .name
            })
            .collect();
        assert!(names.iter().any(|n| n != &names[0]));
    }

    #[test]
    fn unknown_template_is_not_found() {
        let mut toolkit = toolkit(1);
        let err = toolkit
            .expand_template("weatherReport", &TemplateOptions::default())
            .unwrap_err();
        assert!(matches!(err, ToolkitError::Template(TemplateError::NotFound(_))));
        assert!(err.is_not_found());
    }

    #[test]
    fn builtin_templates_expand_fully() {
        let mut toolkit = toolkit(12);
        let names: Vec<String> = toolkit
            .settings()
            .random
            .generators
            .iter()
            .map(|g| g.name.clone())
            .collect();
        for name in names {
            let expansion = toolkit
                .expand_template(&name, &TemplateOptions::default())
                .unwrap();
            assert!(expansion.is_complete(), "{name}: {:?}", expansion.issues);
            assert!(!expansion.text.contains('{'));
        }
    }

    #[test]
    fn statblock_uses_toolkit_settings() {
        let mut toolkit = toolkit(3);
        let npc = toolkit
            .generate_character(&CharacterOptions::default())
            .unwrap();
        let text = toolkit.format_statblock(&npc).unwrap();
        assert!(text.contains(&npc.name));
    }

    #[test]
    fn with_settings_wins_over_path() {
        let mut settings = Settings::builtin().unwrap();
        settings.random.generators.clear();
        let mut toolkit = Toolkit::builder()
            .seed(0)
            .settings_path("/nonexistent/settings.json")
            .with_settings(settings)
            .build()
            .unwrap();
        assert!(toolkit
            .expand_template("tavernName", &TemplateOptions::default())
            .is_err());
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let result = Toolkit::builder()
            .settings_path("/nonexistent/settings.json")
            .build();
        assert!(matches!(result, Err(ToolkitError::Settings(SettingsError::Io(_)))));
    }
}
