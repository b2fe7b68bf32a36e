//! Outline options with TOML preset support.
//!
//! Options serialize to/from TOML presets stored in
//! `assets/outline_presets/`. [`OutlineOptions::resolve`] turns them into
//! the configuration the outline feature is built from.

mod outline;

use std::path::Path;

pub use outline::{MaterialPassOptions, OutlineOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::OutlineError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `outline.layer_mask`) work.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Outline effect parameters.
    pub outline: OutlineOptions,
}

impl Options {
    /// Generate JSON Schema describing the editor-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`OutlineError::Io`] when the file cannot be read,
    /// [`OutlineError::OptionsParse`] when it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, OutlineError> {
        let content =
            std::fs::read_to_string(path).map_err(OutlineError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// [`OutlineError::OptionsParse`] when `content` is not valid options
    /// TOML.
    pub fn from_toml(content: &str) -> Result<Self, OutlineError> {
        toml::from_str(content)
            .map_err(|e| OutlineError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`OutlineError::OptionsParse`] on serialization failure,
    /// [`OutlineError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), OutlineError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OutlineError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(OutlineError::Io)?;
        }
        std::fs::write(path, content).map_err(OutlineError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::filter::LayerMask;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed: Options = toml::from_str(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[outline]
layer_mask = 256
";
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.outline.layer_mask, LayerMask::from_layer(8));
        // Everything else should be default
        assert_eq!(opts.outline.render_target_name, "_RenderOutlineRT");
        assert_eq!(opts.outline.blit_material.pass_index, 1);
    }

    #[test]
    fn nested_material_table_parses() {
        let toml_str = r#"
[outline.sobel_material]
material = "Outline/Sobel"
pass_index = 1
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(
            opts.outline.sobel_material,
            MaterialPassOptions::new("Outline/Sobel", 1)
        );
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let result = Options::from_toml("[outline\nlayer_mask = ");
        assert!(matches!(result, Err(OutlineError::OptionsParse(_))));
    }

    #[test]
    fn bundled_presets_parse() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("assets/outline_presets");
        let presets = Options::list_presets(&dir);
        assert!(presets.contains(&"default".to_owned()));
        for name in presets {
            let path = dir.join(format!("{name}.toml"));
            assert!(Options::load(&path).is_ok(), "preset {name}");
        }
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        assert!(props.contains_key("outline"));

        let outline = &props["outline"]["properties"];
        assert!(outline.get("layer_mask").is_some());
        assert!(outline.get("sobel_material").is_some());
        assert!(outline.get("blit_material").is_some());
        assert!(outline.get("outline_color").is_some());
        // Target name is internal plumbing, not editor-exposed
        assert!(outline.get("render_target_name").is_none());
    }
}
