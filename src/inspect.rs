//! Archive inspection workflow.
//!
//! This module implements the inspect command and the shared first half of
//! the analyze command: open the archive, extract it into the scratch
//! directory, render the tree and classify the supported files.

use std::io;
use std::path::{Path, PathBuf};
use tokio::task;

use crate::categories::{Category, FileTypeRegistry};
use crate::config::Config;
use crate::extract::{ArchiveError, ExtractStats, ScratchDir, extract_archive, open_archive};
use crate::log::write_inspect_log;
use crate::scanner::{ClassifiedFiles, scan_directory};
use crate::tree::{TreeOptions, render_tree};
use crate::tui::{Mode, UI};

/// An extracted and classified archive.
///
/// Owns the scratch directory; call [`Inspection::finish`] once done with the
/// extracted files.
#[derive(Debug)]
pub struct Inspection {
    pub source: PathBuf,
    pub scratch: ScratchDir,
    pub tree: String,
    pub files: ClassifiedFiles,
    pub extract_stats: ExtractStats,
}

impl Inspection {
    /// Removes the scratch directory. A failure is only reported as a warning.
    pub fn finish(mut self, ui: &UI) -> io::Result<()> {
        if let Err(e) = self.scratch.cleanup() {
            ui.print_warning(&format!(
                "Could not delete temp directory {}: {}",
                self.scratch.path().display(),
                e
            ))?;
        }
        Ok(())
    }
}

/// Takes the archive path from the command line, or asks for it.
pub fn resolve_zip_path(ui: &UI, zip: Option<String>) -> color_eyre::Result<PathBuf> {
    let zip = match zip {
        Some(z) => z,
        None => ui.prompt_input("Enter the path to the ZIP file", false)?,
    };
    Ok(PathBuf::from(zip))
}

/// Extracts, renders and classifies the archive at `zip_path`.
///
/// Returns `Ok(None)` after printing an error when the archive is missing,
/// unreadable or damaged. A missing or unreadable archive never creates the
/// scratch directory; one found damaged during extraction has it removed
/// before returning.
pub async fn inspect_archive(
    ui: &UI,
    zip_path: &Path,
    config: &Config,
) -> color_eyre::Result<Option<Inspection>> {
    let archive = match open_archive(zip_path) {
        Ok(archive) => archive,
        Err(e) => {
            ui.print_error(&e.to_string())?;
            return Ok(None);
        }
    };
    ui.print_success(&format!(
        "Opened {} ({} entries)",
        zip_path.display(),
        archive.len()
    ))?;

    let mut scratch = ScratchDir::create(&config.extract.scratch_dir)?;
    ui.print_info(&format!("Extracting to {}", scratch.path().display()))?;

    let pb = ui.create_progress_bar(archive.len() as u64, "Extracting");
    let extract_stats = match extract_archive(archive, zip_path, scratch.path(), pb).await {
        Ok(stats) => stats,
        Err(e) => {
            let e = e.downcast::<ArchiveError>()?;
            ui.print_error(&e.to_string())?;
            if let Err(cleanup_err) = scratch.cleanup() {
                ui.print_warning(&format!(
                    "Could not delete temp directory {}: {}",
                    scratch.path().display(),
                    cleanup_err
                ))?;
            }
            return Ok(None);
        }
    };
    for name in &extract_stats.skipped {
        ui.print_warning(&format!("Skipped entry with unsafe name: {}", name))?;
    }
    ui.print_success(&format!(
        "Extracted {} files, {} directories",
        extract_stats.files, extract_stats.directories
    ))?;

    let spinner = ui.create_spinner("Building file tree...");
    let root = scratch.path().to_path_buf();
    let options = TreeOptions {
        max_depth: config.scan.max_depth,
    };
    let tree = task::spawn_blocking(move || render_tree(&root, &options)).await?;
    spinner.finish_and_clear();

    let registry = FileTypeRegistry::from_config(&config.file_types);
    let files = scan_directory(scratch.path(), config.include, registry).await?;

    let disabled: Vec<Category> = Category::ALL
        .into_iter()
        .filter(|c| !config.include.enabled(*c))
        .collect();
    ui.print_disabled_categories(&disabled)?;
    ui.print_tree(&tree)?;
    ui.print_classified(&files)?;

    if !files.errors.is_empty() {
        ui.print_warning(&format!(
            "{} location(s) could not be read while classifying",
            files.errors.len()
        ))?;
        for error in &files.errors {
            println!("  {}", error);
        }
    }

    Ok(Some(Inspection {
        source: zip_path.to_path_buf(),
        scratch,
        tree,
        files,
        extract_stats,
    }))
}

pub async fn handle_inspect(
    zip: Option<String>,
    write_log: bool,
    config: &Config,
) -> color_eyre::Result<()> {
    let ui = UI::new().with_color_theme(config.ui.color.theme.clone());
    ui.init(&Mode::Inspect, "")?;

    let zip_path = resolve_zip_path(&ui, zip)?;
    let Some(inspection) = inspect_archive(&ui, &zip_path, config).await? else {
        ui.cleanup()?;
        return Ok(());
    };

    let counts: Vec<String> = inspection
        .files
        .get_summary()
        .into_iter()
        .map(|(category, count)| format!("{} {}", count, category))
        .collect();
    ui.print_success(&format!("Inspection complete: {}", counts.join(", ")))?;

    if write_log {
        ui.print_info("Writing log file...")?;
        match write_inspect_log(&inspection).await {
            Ok(log_path) => ui.print_success(&format!("Log written to: {}", log_path.display()))?,
            Err(e) => ui.print_warning(&format!("Failed to write log file: {}", e))?,
        }
    }

    inspection.finish(&ui)?;
    ui.cleanup()?;
    Ok(())
}
