//! File categorization and MIME type lookup.
//!
//! Every supported file belongs to one of four categories: documents, audio,
//! images and videos. Each category carries its own extension to MIME type
//! table. Lookups walk the categories in the fixed order of [`Category::ALL`],
//! so the first category that registers an extension wins.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::FileTypesConfig;

/// The four kinds of files that can be sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Docs,
    Audio,
    Image,
    Video,
}

impl Category {
    /// All categories in lookup and upload order.
    pub const ALL: [Category; 4] = [
        Category::Docs,
        Category::Audio,
        Category::Image,
        Category::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Docs => "docs",
            Category::Audio => "audio",
            Category::Image => "image",
            Category::Video => "video",
        }
    }

    /// Capitalized name used for console headings.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Docs => "Docs",
            Category::Audio => "Audio",
            Category::Image => "Image",
            Category::Video => "Video",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in extension table for a category.
///
/// These are the defaults written to a fresh `config.toml`; users can edit
/// the `[file_types.*]` sections afterwards.
pub fn default_mime_types(category: Category) -> &'static [(&'static str, &'static str)] {
    match category {
        Category::Docs => &[
            (".pdf", "application/pdf"),
            (".js", "text/javascript"),
            (".py", "text/x-python"),
            (".txt", "text/plain"),
            (".html", "text/html"),
            (".css", "text/css"),
            (".md", "text/md"),
            (".csv", "text/csv"),
            (".xml", "text/xml"),
            (".rtf", "text/rtf"),
        ],
        Category::Audio => &[
            (".wav", "audio/wav"),
            (".mp3", "audio/mp3"),
            (".aiff", "audio/aiff"),
            (".aac", "audio/aac"),
            (".ogg", "audio/ogg"),
            (".flac", "audio/flac"),
        ],
        Category::Image => &[
            (".png", "image/png"),
            (".jpeg", "image/jpeg"),
            (".jpg", "image/jpeg"),
            (".webp", "image/webp"),
            (".heic", "image/heic"),
            (".heif", "image/heif"),
        ],
        Category::Video => &[
            (".mp4", "video/mp4"),
            (".mpeg", "video/mpeg"),
            (".mpg", "video/mpg"),
            (".mov", "video/mov"),
            (".avi", "video/avi"),
            (".flv", "video/x-flv"),
            (".webm", "video/webm"),
            (".wmv", "video/wmv"),
            (".3gp", "video/3gpp"),
        ],
    }
}

/// Immutable extension registry, one table per category.
#[derive(Debug, Clone)]
pub struct FileTypeRegistry {
    tables: Vec<(Category, BTreeMap<String, String>)>,
}

impl Default for FileTypeRegistry {
    fn default() -> Self {
        Self::from_config(&FileTypesConfig::default())
    }
}

impl FileTypeRegistry {
    /// Builds the registry from the `[file_types]` configuration.
    ///
    /// Extensions are lowercased so that lookups only ever deal with one case.
    /// A missing leading dot is added.
    pub fn from_config(file_types: &FileTypesConfig) -> Self {
        let tables = Category::ALL
            .iter()
            .map(|&category| {
                let table = file_types
                    .table(category)
                    .iter()
                    .map(|(ext, mime)| (normalize_extension(ext), mime.clone()))
                    .collect();
                (category, table)
            })
            .collect();

        Self { tables }
    }

    /// Finds the category and MIME type registered for an extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use zipsight::categories::{Category, FileTypeRegistry};
    ///
    /// let registry = FileTypeRegistry::default();
    /// assert_eq!(registry.lookup(".png"), Some((Category::Image, "image/png")));
    /// assert_eq!(registry.lookup(".exe"), None);
    /// ```
    pub fn lookup(&self, extension: &str) -> Option<(Category, &str)> {
        let ext = extension.to_lowercase();
        self.tables.iter().find_map(|(category, table)| {
            table.get(&ext).map(|mime| (*category, mime.as_str()))
        })
    }

    pub fn mime_type(&self, extension: &str) -> Option<&str> {
        self.lookup(extension).map(|(_, mime)| mime)
    }

    /// Whether `extension` is registered under `category`.
    pub fn contains(&self, category: Category, extension: &str) -> bool {
        let ext = extension.to_lowercase();
        self.tables
            .iter()
            .any(|(c, table)| *c == category && table.contains_key(&ext))
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Extracts the file extension from a path.
///
/// Returns the extension lowercased with a leading dot, or an empty string if
/// the path has none. Dotfiles such as `.bashrc` have no extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use zipsight::categories::get_extension;
///
/// assert_eq!(get_extension(Path::new("/tmp/report.PDF")), ".pdf");
/// assert_eq!(get_extension(Path::new("/tmp/README")), "");
/// ```
pub fn get_extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| format!(".{}", s.to_lowercase()))
        .unwrap_or_default()
}
