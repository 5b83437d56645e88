//! Configuration management for zipsight.
//!
//! This module handles loading and saving configuration from/to TOML files.
//! Configuration covers which file categories are sent to the model, the
//! extension to MIME type tables, Gemini connection settings, upload
//! concurrency, traversal limits and UI preferences. On first run a default
//! configuration is written automatically.
//!
//! The loaded [`Config`] is passed by reference into every operation; nothing
//! in the crate reads configuration from globals.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::categories::{Category, default_mime_types};

/// Environment variable that overrides `gemini.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main configuration structure for zipsight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub include: IncludeConfig,
    pub file_types: FileTypesConfig,
    pub gemini: GeminiConfig,
    pub upload: UploadConfig,
    pub scan: ScanConfig,
    pub extract: ExtractConfig,
    pub ui: UIConfig,
}

/// Per-category switches deciding which files are classified and uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    pub docs: bool,
    pub audio: bool,
    pub images: bool,
    pub videos: bool,
}

/// Extension to MIME type tables, one per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTypesConfig {
    pub docs: BTreeMap<String, String>,
    pub audio: BTreeMap<String, String>,
    pub image: BTreeMap<String, String>,
    pub video: BTreeMap<String, String>,
}

/// Gemini connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; `GEMINI_API_KEY` takes precedence when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub system_instruction: String,
}

/// Upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Number of uploads in flight at once; 1 uploads strictly one after another
    pub max_concurrent_uploads: usize,
}

/// Directory traversal settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Deepest directory level listed in the file tree; `0` lists nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
}

/// Archive extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Scratch directory, relative to the working directory unless absolute
    pub scratch_dir: PathBuf,
}

/// User interface configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UIConfig {
    pub color: ColorConfig,
}

/// Color theme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Theme name: "default", "cyan", "magenta", "yellow", "green", "red", "blue", "white"
    pub theme: String,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            docs: true,
            audio: true,
            images: true,
            videos: true,
        }
    }
}

impl IncludeConfig {
    pub fn enabled(&self, category: Category) -> bool {
        match category {
            Category::Docs => self.docs,
            Category::Audio => self.audio,
            Category::Image => self.images,
            Category::Video => self.videos,
        }
    }

    /// Turns off every category whose `--no-*` flag was passed.
    pub fn disable(&mut self, docs: bool, audio: bool, images: bool, videos: bool) {
        self.docs &= !docs;
        self.audio &= !audio;
        self.images &= !images;
        self.videos &= !videos;
    }
}

impl Default for FileTypesConfig {
    fn default() -> Self {
        let table = |category| {
            default_mime_types(category)
                .iter()
                .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
                .collect()
        };

        Self {
            docs: table(Category::Docs),
            audio: table(Category::Audio),
            image: table(Category::Image),
            video: table(Category::Video),
        }
    }
}

impl FileTypesConfig {
    pub fn table(&self, category: Category) -> &BTreeMap<String, String> {
        match category {
            Category::Docs => &self.docs,
            Category::Audio => &self.audio,
            Category::Image => &self.image,
            Category::Video => &self.video,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            system_instruction: "You are an AI that analyzes Zip files, and you analyze the contents of the zip file.".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 1,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from("extracted_files"),
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// Typically `~/.config/zipsight` on Unix systems or `%USERPROFILE%/.config/zipsight` on Windows.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn get_config_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| color_eyre::eyre::eyre!("Could not determine home directory"))?;

        Ok(PathBuf::from(home).join(".config").join("zipsight"))
    }

    /// Returns the configuration file path.
    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// Loads configuration from file, creating default if it doesn't exist.
    ///
    /// After reading the file, `GEMINI_API_KEY` is applied on top.
    ///
    /// # Errors
    ///
    /// Returns an error if file I/O fails or if the TOML is malformed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use zipsight::config::Config;
    ///
    /// # fn main() -> color_eyre::Result<()> {
    /// let config = Config::load()?;
    /// println!("Using model: {}", config.gemini.model);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        let mut config = if !config_path.exists() {
            println!("INFO: Config file not found, creating default config...");
            let config = Self::default();
            config.save()?;
            println!("INFO: Default config created at: {}", config_path.display());
            config
        } else {
            let contents = fs::read_to_string(&config_path)?;
            Self::from_toml(&contents)?
        };

        config.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves the configuration to file.
    ///
    /// Creates the configuration directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::get_config_dir()?;
        fs::create_dir_all(&config_dir)?;

        let config_path = Self::get_config_path()?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&config_path, contents)?;

        Ok(())
    }

    /// Replaces the configured API key with `key` when it is set and non-empty.
    pub fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            self.gemini.api_key = Some(key);
        }
    }

    pub fn api_key(&self) -> Option<&str> {
        self.gemini
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
