//! Reads the knowledge-base files into a [`Snapshot`].

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{CacheKey, Snapshot, SnapshotCache};
use crate::category::Category;
use crate::error::LoadError;

/// File name of the vision document.
pub const VISION_FILE: &str = "Vision.json";

/// Default subdirectory of the import root that may hold the vision document.
pub const DEFAULT_VISION_SUBDIR: &str = "Vision";

/// Where and how to read the knowledge base.
#[derive(Clone)]
pub struct LoaderConfig {
    /// Directory containing `<category>.json` files.
    pub categories_dir: PathBuf,

    /// Import root holding the vision document.
    pub import_dir: Option<PathBuf>,

    /// Subdirectory of the import root searched for the vision document.
    pub vision_subdir: String,

    /// Optional parsed-file cache.
    pub cache: Option<Arc<dyn SnapshotCache>>,
}

impl LoaderConfig {
    /// Create a configuration reading categories from `categories_dir`.
    pub fn new(categories_dir: impl Into<PathBuf>) -> Self {
        Self {
            categories_dir: categories_dir.into(),
            import_dir: None,
            vision_subdir: DEFAULT_VISION_SUBDIR.to_string(),
            cache: None,
        }
    }

    /// Set the import root.
    pub fn with_import_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.import_dir = Some(dir.into());
        self
    }

    /// Set the vision subdirectory name.
    pub fn with_vision_subdir(mut self, name: impl Into<String>) -> Self {
        self.vision_subdir = name.into();
        self
    }

    /// Attach a parsed-file cache.
    pub fn with_cache(mut self, cache: Arc<dyn SnapshotCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

impl std::fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("categories_dir", &self.categories_dir)
            .field("import_dir", &self.import_dir)
            .field("vision_subdir", &self.vision_subdir)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

/// Loads category files and the vision document.
///
/// Per-file failures never abort a load: a missing or malformed file is
/// logged and replaced by the category's empty default.
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a loader.
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// The loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load every category and the vision document.
    pub fn load_all(&self) -> Snapshot {
        let mut builder = Snapshot::builder();

        for category in Category::ALL {
            let data = self.load_category(category);
            builder = if category.is_structure() {
                builder.with_structure(category, data)
            } else {
                let entities = match data {
                    Value::Array(items) => items,
                    _ => Vec::new(),
                };
                builder.with_entities(category, entities)
            };
        }

        let snapshot = builder.with_vision(self.load_vision()).build();
        info!(
            entities = snapshot.entity_count(),
            dir = %self.config.categories_dir.display(),
            "Knowledge base loaded"
        );
        snapshot
    }

    /// Load one category.
    ///
    /// Returns a JSON array for list categories and a JSON object for
    /// structure categories; the empty default on any failure.
    pub fn load_category(&self, category: Category) -> Value {
        let Some(path) = self.category_path(category) else {
            warn!(
                category = %category,
                dir = %self.config.categories_dir.display(),
                "Category file not found, using empty default"
            );
            return empty_default(category);
        };

        match self.read_json(&path).and_then(|doc| extract_category(category, &doc, &path)) {
            Ok(data) => {
                debug!(category = %category, path = %path.display(), "Category loaded");
                data
            }
            Err(err) => {
                error!(category = %category, error = %err, "Failed to load category, using empty default");
                empty_default(category)
            }
        }
    }

    /// Load the vision document from the import root, or from the vision
    /// subdirectory one level below it.
    pub fn load_vision(&self) -> Value {
        let Some(path) = self.vision_path() else {
            debug!("No vision document found");
            return Value::Object(Map::new());
        };

        match self.read_json(&path) {
            Ok(doc) if doc.is_object() => doc.as_ref().clone(),
            Ok(_) => {
                warn!(path = %path.display(), "Vision document is not an object, ignoring");
                Value::Object(Map::new())
            }
            Err(err) => {
                error!(error = %err, "Failed to load vision document");
                Value::Object(Map::new())
            }
        }
    }

    /// Resolve the file for a category, preferring `<stem>_full.json`.
    pub fn category_path(&self, category: Category) -> Option<PathBuf> {
        let dir = &self.config.categories_dir;
        let full = dir.join(format!("{}_full.json", category.file_stem()));
        if full.is_file() {
            return Some(full);
        }
        let plain = dir.join(format!("{}.json", category.file_stem()));
        plain.is_file().then_some(plain)
    }

    /// Resolve the vision document path.
    pub fn vision_path(&self) -> Option<PathBuf> {
        let root = self.config.import_dir.as_ref()?;
        let direct = root.join(VISION_FILE);
        if direct.is_file() {
            return Some(direct);
        }
        let nested = root.join(&self.config.vision_subdir).join(VISION_FILE);
        nested.is_file().then_some(nested)
    }

    fn read_json(&self, path: &Path) -> Result<Arc<Value>, LoadError> {
        let key = self.config.cache.as_ref().and_then(|_| CacheKey::for_file(path));

        if let (Some(cache), Some(key)) = (&self.config.cache, &key) {
            if let Some(hit) = cache.get(key) {
                debug!(path = %path.display(), "Cache hit");
                return Ok(hit);
            }
        }

        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed: Value = serde_json::from_str(raw.trim_start_matches('\u{FEFF}')).map_err(|source| {
            LoadError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let parsed = Arc::new(parsed);

        if let (Some(cache), Some(key)) = (&self.config.cache, key) {
            cache.put(key, Arc::clone(&parsed));
        }
        Ok(parsed)
    }
}

/// Empty default for a category: `{}` for structures, `[]` otherwise.
pub fn empty_default(category: Category) -> Value {
    if category.is_structure() {
        Value::Object(Map::new())
    } else {
        Value::Array(Vec::new())
    }
}

/// Accept the supported file shapes for a category.
///
/// Lists: an object wrapping the list under the category key, an object
/// with exactly one list value, or a bare list. Structures: a bare object,
/// or an object wrapping one under the category key.
fn extract_category(category: Category, doc: &Value, path: &Path) -> Result<Value, LoadError> {
    let shape_error = |message: &str| LoadError::Shape {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    if category.is_structure() {
        return match doc {
            Value::Object(map) => match map.get(category.wrapper_key()) {
                Some(inner @ Value::Object(_)) => Ok(inner.clone()),
                _ => Ok(doc.clone()),
            },
            _ => Err(shape_error("expected an object")),
        };
    }

    match doc {
        Value::Array(_) => Ok(doc.clone()),
        Value::Object(map) => {
            if let Some(list @ Value::Array(_)) = map.get(category.wrapper_key()) {
                return Ok(list.clone());
            }
            let mut lists = map.values().filter(|v| v.is_array());
            match (lists.next(), lists.next()) {
                (Some(only), None) => Ok(only.clone()),
                _ => Err(shape_error(&format!(
                    "expected a list or an object with a '{}' list",
                    category.wrapper_key()
                ))),
            }
        }
        _ => Err(shape_error("expected a list")),
    }
}
