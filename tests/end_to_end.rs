use indicatif::ProgressBar;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::FileOptions;

use zipsight::categories::FileTypeRegistry;
use zipsight::config::IncludeConfig;
use zipsight::extract::{ScratchDir, extract_archive, open_archive, remove_scratch_dir};
use zipsight::scanner::scan_directory;
use zipsight::tree::{TreeOptions, render_tree};

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[tokio::test]
async fn test_extract_render_and_classify() {
    let dir = TempDir::new().unwrap();
    let zip_path = dir.path().join("bundle.zip");
    write_zip(
        &zip_path,
        &[
            ("a.txt", b"alpha"),
            ("img/b.png", b"\x89PNG"),
            ("notes/c.pdf", b"%PDF"),
        ],
    );

    let archive = open_archive(&zip_path).unwrap();
    let mut scratch = ScratchDir::create(&dir.path().join("extracted_files")).unwrap();
    let stats = extract_archive(archive, &zip_path, scratch.path(), ProgressBar::hidden())
        .await
        .unwrap();
    assert_eq!(stats.files, 3);

    let tree = render_tree(scratch.path(), &TreeOptions::default());
    assert_eq!(tree, "- a.txt\n+ img/\n  - b.png\n+ notes/\n  - c.pdf\n");

    let include = IncludeConfig {
        images: false,
        ..IncludeConfig::default()
    };
    let files = scan_directory(scratch.path(), include, FileTypeRegistry::default())
        .await
        .unwrap();

    let mut docs = files.docs.clone();
    docs.sort();
    assert_eq!(
        docs,
        vec![
            scratch.path().join("a.txt"),
            scratch.path().join("notes").join("c.pdf"),
        ]
    );
    assert!(docs.iter().all(|p| p.is_absolute()));
    assert!(files.image.is_empty());
    assert!(files.audio.is_empty());
    assert!(files.video.is_empty());

    let scratch_path = scratch.path().to_path_buf();
    scratch.cleanup().unwrap();
    assert!(!scratch_path.exists());

    // Removing it again is a no-op.
    remove_scratch_dir(&scratch_path).unwrap();
}

#[test]
fn test_missing_archive_creates_no_scratch_dir() {
    let dir = TempDir::new().unwrap();

    assert!(open_archive(&dir.path().join("nope.zip")).is_err());
    assert!(!dir.path().join("extracted_files").exists());
}
