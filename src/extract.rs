//! Archive extraction utilities.
//!
//! This module opens and validates a ZIP archive, owns the scratch directory
//! the archive is unpacked into, and extracts entries with progress tracking.
//! Opening happens before any directory is created, so a missing or broken
//! archive leaves nothing behind to clean up.

use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task;
use zip::ZipArchive;
use zip::result::ZipError;

/// Why an archive could not be opened.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("ZIP file not found at '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid or corrupted ZIP file at '{}': {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    #[error("Could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Opens `path` and checks that it is a readable ZIP archive.
pub fn open_archive(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ArchiveError::NotFound(path.to_path_buf()),
        _ => ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    ZipArchive::new(file).map_err(|source| match source {
        ZipError::Io(source) => ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => ArchiveError::Corrupt {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Counts from an extraction run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    /// Entries left out because their names would escape the scratch directory
    pub skipped: Vec<String>,
}

/// Extracts every entry of `archive` into `dest`.
///
/// Entry names are resolved with [`zip::read::ZipFile::enclosed_name`];
/// absolute names or names containing `..` are skipped and reported in
/// [`ExtractStats::skipped`].
///
/// Damage that only shows up while reading entries (bad local headers,
/// checksum mismatches, truncated data) fails with [`ArchiveError::Corrupt`]
/// for `source`, the archive's path. Failures writing into `dest` are
/// [`ArchiveError::Io`] for the file being written.
pub async fn extract_archive(
    archive: ZipArchive<File>,
    source: &Path,
    dest: &Path,
    pb: ProgressBar,
) -> color_eyre::Result<ExtractStats> {
    let source = source.to_path_buf();
    let dest = dest.to_path_buf();

    let stats = task::spawn_blocking(move || {
        let result = extract_entries(archive, &source, &dest, &pb);
        pb.finish_and_clear();
        result
    })
    .await??;

    Ok(stats)
}

fn extract_entries(
    mut archive: ZipArchive<File>,
    source: &Path,
    dest: &Path,
    pb: &ProgressBar,
) -> Result<ExtractStats, ArchiveError> {
    let corrupt = |source_err: ZipError| ArchiveError::Corrupt {
        path: source.to_path_buf(),
        source: source_err,
    };
    let write_error = |path: &Path, source_err: io::Error| ArchiveError::Io {
        path: path.to_path_buf(),
        source: source_err,
    };

    let mut stats = ExtractStats::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(corrupt)?;
        pb.inc(1);

        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            stats.skipped.push(entry.name().to_string());
            continue;
        };
        let out_path = dest.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| write_error(&out_path, e))?;
            stats.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
        }
        let file = File::create(&out_path).map_err(|e| write_error(&out_path, e))?;
        let mut out = BufWriter::with_capacity(128 * 1024, file);

        // Read and write separately so a bad entry is told apart from a full disk.
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = match entry.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(corrupt(ZipError::Io(e))),
            };
            out.write_all(&buf[..n])
                .map_err(|e| write_error(&out_path, e))?;
        }
        out.flush().map_err(|e| write_error(&out_path, e))?;
        stats.files += 1;
    }

    Ok(stats)
}

/// Directory holding the extracted archive for the length of one run.
///
/// Call [`ScratchDir::cleanup`] to remove it and observe failures. If the
/// value is dropped without that, removal is still attempted and a failure is
/// printed as a warning.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    released: bool,
}

impl ScratchDir {
    /// Creates the scratch directory, replacing leftovers from an earlier run.
    ///
    /// Relative paths are resolved against the working directory, so every
    /// path found inside is absolute.
    pub fn create(path: &Path) -> io::Result<Self> {
        let path = std::path::absolute(path)?;
        remove_scratch_dir(&path)?;
        fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and everything in it.
    pub fn cleanup(&mut self) -> io::Result<()> {
        self.released = true;
        remove_scratch_dir(&self.path)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_scratch_dir(&self.path) {
            eprintln!(
                "WARNING: Could not delete scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Recursively deletes `path`. A path that does not exist is not an error.
pub fn remove_scratch_dir(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_open_missing_archive() {
        let dir = TempDir::new().unwrap();
        let err = open_archive(&dir.path().join("missing.zip")).unwrap_err();

        assert!(matches!(err, ArchiveError::NotFound(_)));
        assert!(err.to_string().starts_with("ZIP file not found at"));
    }

    #[test]
    fn test_open_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"this is not a zip archive at all").unwrap();

        let err = open_archive(&path).unwrap_err();

        assert!(matches!(err, ArchiveError::Corrupt { .. }));
        assert!(err.to_string().starts_with("Invalid or corrupted ZIP file at"));
    }

    #[tokio::test]
    async fn test_extract_archive() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("input.zip");
        write_zip(
            &zip_path,
            &[
                ("a.txt", b"alpha"),
                ("empty/", b""),
                ("notes/c.pdf", b"%PDF"),
            ],
        );
        let dest = dir.path().join("out");

        let archive = open_archive(&zip_path).unwrap();
        let stats = extract_archive(archive, &zip_path, &dest, ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.directories, 1);
        assert!(stats.skipped.is_empty());
        assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(dest.join("notes/c.pdf")).unwrap(), b"%PDF");
        assert!(dest.join("empty").is_dir());
    }

    #[tokio::test]
    async fn test_extract_skips_escaping_names() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("evil.zip");
        write_zip(&zip_path, &[("../escape.txt", b"nope"), ("ok.txt", b"fine")]);
        let dest = dir.path().join("out");

        let archive = open_archive(&zip_path).unwrap();
        let stats = extract_archive(archive, &zip_path, &dest, ProgressBar::hidden())
            .await
            .unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(stats.skipped, vec!["../escape.txt".to_string()]);
        assert!(!dir.path().join("escape.txt").exists());
        assert!(dest.join("ok.txt").exists());
    }

    #[tokio::test]
    async fn test_extract_reports_checksum_mismatch_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let zip_path = dir.path().join("damaged.zip");
        let payload = b"payload that will be damaged";

        let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("doc.txt", stored).unwrap();
        zip.write_all(payload).unwrap();
        zip.finish().unwrap();

        // Flip one byte of the stored data; the central directory stays intact.
        let mut bytes = fs::read(&zip_path).unwrap();
        let at = bytes
            .windows(payload.len())
            .position(|w| w == payload)
            .unwrap();
        bytes[at] ^= 0xff;
        fs::write(&zip_path, bytes).unwrap();

        let archive = open_archive(&zip_path).unwrap();
        let dest = dir.path().join("out");
        let err = extract_archive(archive, &zip_path, &dest, ProgressBar::hidden())
            .await
            .unwrap_err();

        let archive_err = err.downcast_ref::<ArchiveError>().unwrap();
        assert!(matches!(archive_err, ArchiveError::Corrupt { path, .. } if *path == zip_path));
        assert!(
            archive_err
                .to_string()
                .starts_with("Invalid or corrupted ZIP file at")
        );
    }

    #[test]
    fn test_scratch_dir_lifecycle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch");

        let mut scratch = ScratchDir::create(&path).unwrap();
        assert!(scratch.path().is_absolute());
        fs::write(scratch.path().join("leftover.txt"), b"x").unwrap();

        scratch.cleanup().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dir_replaces_stale_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch");
        fs::create_dir_all(path.join("old")).unwrap();

        let scratch = ScratchDir::create(&path).unwrap();

        assert!(path.is_dir());
        assert!(!path.join("old").exists());
        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_cleanup_twice_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut scratch = ScratchDir::create(&dir.path().join("scratch")).unwrap();

        scratch.cleanup().unwrap();
        scratch.cleanup().unwrap();
    }

    #[test]
    fn test_remove_missing_scratch_dir() {
        let dir = TempDir::new().unwrap();
        remove_scratch_dir(&dir.path().join("never-created")).unwrap();
    }
}
