use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Directory holding Tessera state inside a workspace.
pub const TESSERA_DIR: &str = ".tessera";
/// Config file name inside [`TESSERA_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// Ignore file at the workspace root.
pub const IGNORE_FILE: &str = ".tesseraignore";

/// Top-level Tessera configuration, matching `.tessera/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TesseraConfig {
    #[serde(default)]
    pub index: IndexSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSection {
    /// Files processed per pass-1 batch.
    pub batch_size: usize,
    /// Size cap passed to the extractor.
    pub max_file_bytes: usize,
    /// Cooperative pause between batches.
    pub batch_pause_ms: u64,
    pub exclude_dirs: Vec<String>,
    pub languages: LanguageConfig,
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_file_bytes: tessera_graphs::MAX_SOURCE_BYTES,
            batch_pause_ms: 10,
            exclude_dirs: [
                "node_modules",
                ".git",
                "target",
                "dist",
                "build",
                "out",
                "bin",
                "obj",
                "vendor",
                "__pycache__",
                ".venv",
                "venv",
                ".next",
                ".gradle",
                ".idea",
                ".vscode",
                TESSERA_DIR,
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            languages: LanguageConfig::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Database path, relative to the workspace root unless absolute.
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(TESSERA_DIR).join("graph.db"),
        }
    }
}

/// Which languages to index: `"auto"` (everything registered) or an explicit list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LanguageConfig {
    #[default]
    Auto,
    Explicit(Vec<String>),
}

impl LanguageConfig {
    pub fn allows(&self, language_id: &str) -> bool {
        match self {
            Self::Auto => true,
            Self::Explicit(ids) => ids.iter().any(|id| id == language_id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLanguages {
    Keyword(String),
    List(Vec<String>),
}

impl<'de> Deserialize<'de> for LanguageConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawLanguages::deserialize(deserializer)? {
            RawLanguages::Keyword(word) if word.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            RawLanguages::Keyword(word) => Err(serde::de::Error::custom(format!(
                "expected \"auto\" or a list of language ids, got \"{word}\""
            ))),
            RawLanguages::List(ids) => Ok(Self::Explicit(ids)),
        }
    }
}

impl Serialize for LanguageConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Explicit(ids) => ids.serialize(serializer),
        }
    }
}

impl TesseraConfig {
    /// Path of the config file for a workspace root.
    pub fn path_for(root: &Path) -> PathBuf {
        root.join(TESSERA_DIR).join(CONFIG_FILE)
    }

    /// Load the workspace config, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_for(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit file path. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.display().to_string())
            } else {
                ConfigError::Invalid(format!("{}: {e}", path.display()))
            }
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config to `.tessera/config.toml`, creating the directory if needed.
    pub fn save(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let path = Self::path_for(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Invalid(format!("{}: {e}", parent.display())))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(&path, text)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index.batch_size == 0 {
            return Err(ConfigError::Invalid("index.batch_size must be at least 1".into()));
        }
        if self.index.max_file_bytes == 0 {
            return Err(ConfigError::Invalid("index.max_file_bytes must be at least 1".into()));
        }
        Ok(())
    }

    /// Absolute database path for a workspace root.
    pub fn db_path(&self, root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            root.join(&self.store.path)
        }
    }
}
