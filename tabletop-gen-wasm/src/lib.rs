//! WASM bindings for tabletop-gen: the generators behind a JavaScript host.
//!
//! Everything crosses the boundary as JSON or plain text. The host owns the
//! settings document; it passes it in at construction and can read sections
//! back out after importing changes.

use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use tabletop_gen::core::character::CharacterOptions;
use tabletop_gen::core::dungeon::DungeonOptions;
use tabletop_gen::core::toolkit::{TemplateOptions, Toolkit};
use tabletop_gen::schema::settings::{Section, Settings};

/// Blank input means "all defaults".
fn parse_options<T: DeserializeOwned + Default>(json: &str) -> Result<T, JsError> {
    if json.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(json).map_err(|e| JsError::new(&format!("Invalid options JSON: {e}")))
}

fn parse_section(section: &str) -> Result<Section, JsError> {
    section
        .parse()
        .map_err(|e| JsError::new(&format!("{e}")))
}

#[wasm_bindgen]
pub struct TabletopForge {
    toolkit: Toolkit,
}

#[wasm_bindgen]
impl TabletopForge {
    /// Create a generator. `settings_json` is a full or partial settings
    /// document; missing sections come from the built-in defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64, settings_json: Option<String>) -> Result<TabletopForge, JsError> {
        let settings = match settings_json {
            Some(json) => Settings::from_json_str(&json),
            None => Settings::builtin(),
        }
        .map_err(|e| JsError::new(&format!("Settings error: {e}")))?;

        let toolkit = Toolkit::builder()
            .seed(seed)
            .with_settings(settings)
            .build()
            .map_err(|e| JsError::new(&format!("Toolkit build error: {e}")))?;
        Ok(TabletopForge { toolkit })
    }

    /// Generate an NPC and return its statblock text.
    ///
    /// Expected JSON shape (every field optional):
    /// ```json
    /// { "level": 5, "race": "Elf", "class": "Wizard", "subclass": "None", "alignment": "Chaotic Good" }
    /// ```
    pub fn generate_npc(&mut self, options_json: &str) -> Result<String, JsError> {
        let options: CharacterOptions = parse_options(options_json)?;
        let npc = self
            .toolkit
            .generate_character(&options)
            .map_err(|e| JsError::new(&format!("NPC generation error: {e}")))?;
        self.toolkit
            .format_statblock(&npc)
            .map_err(|e| JsError::new(&format!("Statblock error: {e}")))
    }

    /// Same as `generate_npc`, but returns the NPC record as JSON.
    pub fn generate_npc_json(&mut self, options_json: &str) -> Result<String, JsError> {
        let options: CharacterOptions = parse_options(options_json)?;
        let npc = self
            .toolkit
            .generate_character(&options)
            .map_err(|e| JsError::new(&format!("NPC generation error: {e}")))?;
        serde_json::to_string(&npc).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Generate a dungeon. Returns the full record, SVG and guide included, as JSON.
    ///
    /// ```json
    /// { "dungeonType": "crypt", "size": "Large" }
    /// ```
    pub fn generate_dungeon(&mut self, options_json: &str) -> Result<String, JsError> {
        let options: DungeonOptions = parse_options(options_json)?;
        let dungeon = self
            .toolkit
            .generate_dungeon(&options)
            .map_err(|e| JsError::new(&format!("Dungeon generation error: {e}")))?;
        serde_json::to_string(&dungeon)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// Expand a named template with the default depth limit.
    ///
    /// Returns the text plus anything left unresolved, so the host can tell
    /// a partial result from a complete one:
    /// ```json
    /// { "text": "The Rusty {noun}", "issues": [{ "kind": "unknownToken", "token": "noun" }] }
    /// ```
    pub fn expand_template(&mut self, name: &str) -> Result<String, JsError> {
        let expansion = self
            .toolkit
            .expand_template(name, &TemplateOptions::default())
            .map_err(|e| JsError::new(&format!("Template error: {e}")))?;
        serde_json::to_string(&expansion)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// JSON array of template names.
    pub fn list_templates(&self) -> Result<String, JsError> {
        let names: Vec<&str> = self
            .toolkit
            .settings()
            .random
            .generators
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        serde_json::to_string(&names).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// One settings section (`npc`, `dungeon` or `random`) as JSON.
    pub fn export_section(&self, section: &str) -> Result<String, JsError> {
        let section = parse_section(section)?;
        self.toolkit
            .settings()
            .export_section(section)
            .map_err(|e| JsError::new(&format!("Export error: {e}")))
    }

    /// Replace one settings section. Later generations use it.
    pub fn import_section(&mut self, section: &str, json: &str) -> Result<(), JsError> {
        let section = parse_section(section)?;
        self.toolkit
            .settings_mut()
            .import_section(section, json)
            .map_err(|e| JsError::new(&format!("Import error: {e}")))
    }

    /// The whole settings document as JSON, for the host to persist.
    pub fn settings_json(&self) -> Result<String, JsError> {
        self.toolkit
            .settings()
            .to_json()
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}
