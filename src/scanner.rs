//! File classification.
//!
//! This module walks an extracted archive and buckets every supported file
//! into its category. Unlike the [`tree`](crate::tree) renderer, which sorts
//! for display, the classifier keeps the order in which the walk discovers
//! files; the lists feed the uploader, not a human.

use std::path::{Path, PathBuf};
use tokio::task;
use walkdir::WalkDir;

use crate::categories::{Category, FileTypeRegistry, get_extension};
use crate::config::IncludeConfig;

/// Supported files found under a directory, grouped by category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifiedFiles {
    pub docs: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
    pub image: Vec<PathBuf>,
    pub video: Vec<PathBuf>,
    /// Walk errors; each one cost at most the subtree it happened in
    pub errors: Vec<String>,
}

impl ClassifiedFiles {
    /// Creates a new empty `ClassifiedFiles` instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: Category) -> &[PathBuf] {
        match category {
            Category::Docs => &self.docs,
            Category::Audio => &self.audio,
            Category::Image => &self.image,
            Category::Video => &self.video,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut Vec<PathBuf> {
        match category {
            Category::Docs => &mut self.docs,
            Category::Audio => &mut self.audio,
            Category::Image => &mut self.image,
            Category::Video => &mut self.video,
        }
    }

    /// Adds a file to a category list.
    pub fn add_file(&mut self, category: Category, path: PathBuf) {
        self.get_mut(category).push(path);
    }

    /// Records an error encountered during the walk.
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Iterates over the categories in upload order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[PathBuf])> {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// All paths as one list: docs, then audio, image and video, each in walk order.
    pub fn flatten(&self) -> Vec<PathBuf> {
        self.iter()
            .flat_map(|(_, files)| files.iter().cloned())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.iter().map(|(_, files)| files.len()).sum()
    }

    /// Returns `(category, count)` pairs in upload order.
    pub fn get_summary(&self) -> Vec<(Category, usize)> {
        self.iter().map(|(c, files)| (c, files.len())).collect()
    }
}

/// Classifies every file under `root`.
///
/// Each file's lowercased extension is tested against the registry once per
/// enabled category, so a file lands in every enabled category that lists its
/// extension. Paths are reported as they come out of the walk; pass an
/// absolute `root` to get absolute paths.
///
/// Unreadable directories are recorded in [`ClassifiedFiles::errors`] and the
/// walk carries on with the rest of the tree.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zipsight::categories::FileTypeRegistry;
/// use zipsight::config::IncludeConfig;
/// use zipsight::scanner::classify_files;
///
/// let files = classify_files(
///     Path::new("/tmp/extracted_files"),
///     &IncludeConfig::default(),
///     &FileTypeRegistry::default(),
/// );
/// println!("{} supported files", files.total());
/// ```
pub fn classify_files(
    root: &Path,
    include: &IncludeConfig,
    registry: &FileTypeRegistry,
) -> ClassifiedFiles {
    let mut files = ClassifiedFiles::new();

    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.path();
                let extension = get_extension(path);

                for category in Category::ALL {
                    if include.enabled(category) && registry.contains(category, &extension) {
                        files.add_file(category, path.to_path_buf());
                    }
                }
            }
            Err(e) => {
                let location = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| root.display().to_string());
                files.add_error(format!("Error walking {}: {}", location, e));
            }
            _ => {}
        }
    }

    files
}

/// Runs [`classify_files`] on the blocking thread pool.
pub async fn scan_directory(
    root: &Path,
    include: IncludeConfig,
    registry: FileTypeRegistry,
) -> color_eyre::Result<ClassifiedFiles> {
    let root = root.to_path_buf();
    let files = task::spawn_blocking(move || classify_files(&root, &include, &registry)).await?;
    Ok(files)
}
