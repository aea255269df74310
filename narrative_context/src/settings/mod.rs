//! Engine settings, read from TOML.
//!
//! ```toml
//! categories_dir = "data/categories"
//! import_dir = "data/import"
//! field_config = "config/context_fields.json"
//! max_tokens = 6000
//! format = "tag_tree"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ContextError;
use crate::fields::DEFAULT_PRIORITY_LEVEL;
use crate::serializer::OutputFormat;
use world_bible::{LoaderConfig, DEFAULT_VISION_SUBDIR};

/// Default share of the budget given to the previous dialogue.
pub const DEFAULT_DIALOGUE_SHARE: f64 = 0.25;

/// Settings of a [`PromptEngine`](crate::engine::PromptEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Directory holding the category files.
    pub categories_dir: PathBuf,

    /// Directory holding the vision document.
    pub import_dir: Option<PathBuf>,

    /// Subdirectory of `import_dir` tried for the vision document.
    pub vision_subdir: String,

    /// Field configuration document (JSON).
    pub field_config: Option<PathBuf>,

    /// Token budget of the whole prompt; `None` means unlimited.
    pub max_tokens: Option<usize>,

    /// Share of `max_tokens` available to the previous dialogue.
    pub dialogue_share: f64,

    /// Highest priority level of default field paths.
    pub priority_level: u8,

    /// Minimum seconds between two repeated summary logs.
    pub log_throttle_secs: u64,

    /// Default output format.
    pub format: OutputFormat,

    /// Emit a numbered banner per entity in flat text.
    pub include_item_markers: bool,

    /// `tokenizer.json` used for exact counts (`hf-tokenizer` feature).
    pub tokenizer: Option<PathBuf>,

    /// Text of the global contract section.
    pub global_contract: Option<String>,

    /// Text of the technical instructions section.
    pub technical_instructions: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            categories_dir: PathBuf::from("categories"),
            import_dir: None,
            vision_subdir: DEFAULT_VISION_SUBDIR.to_string(),
            field_config: None,
            max_tokens: None,
            dialogue_share: DEFAULT_DIALOGUE_SHARE,
            priority_level: DEFAULT_PRIORITY_LEVEL,
            log_throttle_secs: 60,
            format: OutputFormat::FlatText,
            include_item_markers: true,
            tokenizer: None,
            global_contract: None,
            technical_instructions: None,
        }
    }
}

impl EngineSettings {
    /// Create default settings reading categories from a directory.
    pub fn new(categories_dir: impl Into<PathBuf>) -> Self {
        Self {
            categories_dir: categories_dir.into(),
            ..Self::default()
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(toml: &str) -> Result<Self, ContextError> {
        let settings: Self = toml::from_str(toml)?;
        Ok(settings.sanitized())
    }

    /// Read settings from a TOML file.
    ///
    /// Relative paths in the file are resolved against its directory.
    pub fn from_file(path: &Path) -> Result<Self, ContextError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ContextError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml_str(&raw)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        info!(path = %path.display(), "Engine settings loaded");
        Ok(settings.relative_to(base))
    }

    /// Read settings from a file, falling back to defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Engine settings unusable, using defaults");
                Self::default()
            }
        }
    }

    /// Loader configuration for these settings.
    pub fn loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::new(&self.categories_dir).with_vision_subdir(&self.vision_subdir);
        if let Some(dir) = &self.import_dir {
            config = config.with_import_dir(dir);
        }
        config
    }

    /// Throttle interval for repeated summary logs.
    pub fn log_throttle_interval(&self) -> Duration {
        Duration::from_secs(self.log_throttle_secs)
    }

    /// Budget available to the previous dialogue.
    pub fn dialogue_budget(&self) -> Option<usize> {
        self.max_tokens
            .map(|max| (max as f64 * self.dialogue_share).floor() as usize)
    }

    fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.dialogue_share) {
            warn!(share = self.dialogue_share, "Dialogue share out of range, using default");
            self.dialogue_share = DEFAULT_DIALOGUE_SHARE;
        }
        self.priority_level = self.priority_level.max(1);
        self
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: &Path| if p.is_relative() { base.join(p) } else { p.to_path_buf() };
        self.categories_dir = resolve(&self.categories_dir);
        self.import_dir = self.import_dir.as_deref().map(resolve);
        self.field_config = self.field_config.as_deref().map(resolve);
        self.tokenizer = self.tokenizer.as_deref().map(resolve);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.dialogue_share, DEFAULT_DIALOGUE_SHARE);
        assert_eq!(settings.priority_level, DEFAULT_PRIORITY_LEVEL);
        assert_eq!(settings.format, OutputFormat::FlatText);
        assert!(settings.include_item_markers);
        assert_eq!(settings.dialogue_budget(), None);
    }

    #[test]
    fn test_from_toml() {
        let settings = EngineSettings::from_toml_str(
            r#"
            categories_dir = "data/categories"
            max_tokens = 1000
            dialogue_share = 0.5
            format = "tag_tree"
            priority_level = 0
            "#,
        )
        .unwrap();
        assert_eq!(settings.categories_dir, PathBuf::from("data/categories"));
        assert_eq!(settings.dialogue_budget(), Some(500));
        assert_eq!(settings.format, OutputFormat::TagTree);
        assert_eq!(settings.priority_level, 1);
        assert_eq!(settings.vision_subdir, DEFAULT_VISION_SUBDIR);
    }

    #[test]
    fn test_out_of_range_share() {
        let settings = EngineSettings::from_toml_str("dialogue_share = 3.0").unwrap();
        assert_eq!(settings.dialogue_share, DEFAULT_DIALOGUE_SHARE);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineSettings::from_toml_str("max_tokens = \"beaucoup\"").unwrap_err();
        assert!(matches!(err, ContextError::Settings(_)));
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "categories_dir = \"cats\"\nfield_config = \"/abs/fields.json\"").unwrap();
        let settings = EngineSettings::from_file(file.path()).unwrap();
        let base = file.path().parent().unwrap();
        assert_eq!(settings.categories_dir, base.join("cats"));
        assert_eq!(settings.field_config, Some(PathBuf::from("/abs/fields.json")));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineSettings::from_file(Path::new("/nonexistent/engine.toml")).unwrap_err();
        assert!(matches!(err, ContextError::Config { .. }));
        assert_eq!(
            EngineSettings::load_or_default(Path::new("/nonexistent/engine.toml")),
            EngineSettings::default()
        );
    }
}
