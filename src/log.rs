//! Log file generation.
//!
//! This module writes the plain-text run report requested with `--log`: the
//! archive's tree, the categorized file listing and, for the analyze command,
//! the upload results and the model's response.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::analyze::AnalysisReport;
use crate::inspect::Inspection;
use crate::tui::relative_display;

const WIDTH: usize = 70;

/// Builds the log file name: `zipsight_<archive>_<YYYYmmdd_HHMMSS>.txt`.
pub fn log_file_name(source: &Path, timestamp: &chrono::DateTime<chrono::Local>) -> String {
    let source_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    format!(
        "zipsight_{}_{}.txt",
        source_name,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

fn push_heading(content: &mut String, title: &str) {
    content.push('\n');
    content.push_str(title);
    content.push('\n');
    content.push_str(&"─".repeat(WIDTH));
    content.push('\n');
}

fn push_inspection(content: &mut String, inspection: &Inspection) {
    content.push_str(&format!("Source: {}\n", inspection.source.display()));
    content.push_str(&format!(
        "Extracted: {} files, {} directories\n",
        inspection.extract_stats.files, inspection.extract_stats.directories
    ));
    content.push_str(&format!(
        "Supported files: {}\n",
        inspection.files.total()
    ));

    if !inspection.extract_stats.skipped.is_empty() {
        push_heading(content, "SKIPPED ENTRIES");
        for name in &inspection.extract_stats.skipped {
            content.push_str(&format!("{}\n", name));
        }
    }

    push_heading(content, "FILE TREE STRUCTURE");
    content.push_str(&inspection.tree);

    push_heading(content, "FILES BY CATEGORY");
    let root = inspection.scratch.path();
    for (category, paths) in inspection.files.iter() {
        content.push_str(&format!("{}: {} files\n", category.label(), paths.len()));
        for path in paths {
            content.push_str(&format!("  - {}\n", relative_display(path, root)));
        }
    }

    if !inspection.files.errors.is_empty() {
        push_heading(content, "SCAN ERRORS");
        for error in &inspection.files.errors {
            content.push_str(&format!("{}\n", error));
        }
    }
}

fn push_analysis(
    content: &mut String,
    root: &Path,
    prompt: &str,
    report: Option<&AnalysisReport>,
) {
    push_heading(content, "PROMPT");
    content.push_str(prompt);
    content.push('\n');

    let Some(report) = report else {
        push_heading(content, "GEMINI API RESPONSE");
        content.push_str("(analysis skipped: no API key)\n");
        return;
    };

    push_heading(content, "UPLOADS");
    content.push_str(&format!("Uploaded: {}\n", report.uploaded.len()));
    for (path, file) in &report.uploaded {
        content.push_str(&format!(
            "  - {} -> {}\n",
            relative_display(path, root),
            file.uri
        ));
    }
    content.push_str(&format!("Failed: {}\n", report.failed.len()));
    for (path, error) in &report.failed {
        content.push_str(&format!("  - {}: {}\n", relative_display(path, root), error));
    }
    content.push_str(&format!("Skipped (no MIME type): {}\n", report.skipped.len()));
    for path in &report.skipped {
        content.push_str(&format!("  - {}\n", relative_display(path, root)));
    }

    if let Some(error) = &report.generation_error {
        push_heading(content, "GENERATION ERROR");
        content.push_str(&format!("{}\n", error));
    }

    push_heading(content, "GEMINI API RESPONSE");
    content.push_str(&report.response);
    content.push('\n');
}

fn wrap(title: &str, timestamp: &chrono::DateTime<chrono::Local>, body: &str) -> String {
    let mut content = String::new();
    content.push_str(title);
    content.push('\n');
    content.push_str(&"═".repeat(WIDTH));
    content.push_str("\n\n");
    content.push_str(&format!(
        "Timestamp: {}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S")
    ));
    content.push_str(body);
    content.push('\n');
    content.push_str(&"═".repeat(WIDTH));
    content.push_str("\nEnd of log\n");
    content
}

/// Renders the report for the inspect command.
pub fn format_inspect_log(
    inspection: &Inspection,
    timestamp: &chrono::DateTime<chrono::Local>,
) -> String {
    let mut body = String::new();
    push_inspection(&mut body, inspection);
    wrap("ZIPSIGHT INSPECTION LOG", timestamp, &body)
}

/// Renders the report for the analyze command. `report` is `None` when the
/// run ended before anything was sent.
pub fn format_analyze_log(
    inspection: &Inspection,
    prompt: &str,
    report: Option<&AnalysisReport>,
    timestamp: &chrono::DateTime<chrono::Local>,
) -> String {
    let mut body = String::new();
    push_inspection(&mut body, inspection);
    push_analysis(&mut body, inspection.scratch.path(), prompt, report);
    wrap("ZIPSIGHT ANALYSIS LOG", timestamp, &body)
}

async fn write_log_file(dir: &Path, file_name: &str, content: &str) -> color_eyre::Result<PathBuf> {
    let log_path = dir.join(file_name);
    let mut file = tokio::fs::File::create(&log_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    Ok(log_path)
}

/// Writes the inspect report into the current directory.
///
/// # Returns
///
/// The path where the log file was written
pub async fn write_inspect_log(inspection: &Inspection) -> color_eyre::Result<PathBuf> {
    let now = chrono::Local::now();
    let content = format_inspect_log(inspection, &now);
    write_log_file(
        Path::new("."),
        &log_file_name(&inspection.source, &now),
        &content,
    )
    .await
}

/// Writes the analyze report into the current directory.
pub async fn write_analyze_log(
    inspection: &Inspection,
    prompt: &str,
    report: Option<&AnalysisReport>,
) -> color_eyre::Result<PathBuf> {
    let now = chrono::Local::now();
    let content = format_analyze_log(inspection, prompt, report, &now);
    write_log_file(
        Path::new("."),
        &log_file_name(&inspection.source, &now),
        &content,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::SERVICE_ERROR_RESPONSE;
    use crate::categories::Category;
    use crate::extract::{ExtractStats, ScratchDir};
    use crate::gemini::{GeminiError, UploadedFile};
    use crate::scanner::ClassifiedFiles;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn timestamp() -> chrono::DateTime<chrono::Local> {
        chrono::Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap()
    }

    fn inspection(dir: &TempDir) -> Inspection {
        let scratch = ScratchDir::create(&dir.path().join("scratch")).unwrap();
        let mut files = ClassifiedFiles::new();
        files.add_file(Category::Docs, scratch.path().join("a.txt"));
        files.add_file(Category::Docs, scratch.path().join("notes/c.pdf"));

        Inspection {
            source: PathBuf::from("/data/bundle.zip"),
            scratch,
            tree: "- a.txt\n+ notes/\n  - c.pdf\n".to_string(),
            files,
            extract_stats: ExtractStats {
                files: 2,
                directories: 1,
                skipped: Vec::new(),
            },
        }
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name(Path::new("/data/bundle.zip"), &timestamp()),
            "zipsight_bundle_20240309_140507.txt"
        );
        assert_eq!(
            log_file_name(Path::new(""), &timestamp()),
            "zipsight_unknown_20240309_140507.txt"
        );
    }

    #[test]
    fn test_inspect_log_contents() {
        let dir = TempDir::new().unwrap();
        let inspection = inspection(&dir);

        let content = format_inspect_log(&inspection, &timestamp());

        assert!(content.starts_with("ZIPSIGHT INSPECTION LOG\n"));
        assert!(content.contains("Timestamp: 2024-03-09 14:05:07\n"));
        assert!(content.contains("Source: /data/bundle.zip\n"));
        assert!(content.contains("- a.txt\n+ notes/\n  - c.pdf\n"));
        assert!(content.contains("Docs: 2 files\n  - a.txt\n  - notes/c.pdf\n"));
        assert!(content.contains("Video: 0 files\n"));
        assert!(!content.contains("SCAN ERRORS"));
        assert!(content.ends_with("End of log\n"));
    }

    #[test]
    fn test_analyze_log_contents() {
        let dir = TempDir::new().unwrap();
        let inspection = inspection(&dir);
        let root = inspection.scratch.path().to_path_buf();

        let report = AnalysisReport {
            response: SERVICE_ERROR_RESPONSE.to_string(),
            uploaded: vec![(
                root.join("a.txt"),
                UploadedFile {
                    name: "files/abc".to_string(),
                    uri: "https://files.test/abc".to_string(),
                    mime_type: "text/plain".to_string(),
                },
            )],
            skipped: Vec::new(),
            failed: vec![(root.join("notes/c.pdf"), "timed out".to_string())],
            generation_error: Some(GeminiError::Api {
                status: 500,
                message: "internal".to_string(),
            }),
        };

        let content = format_analyze_log(&inspection, "describe it", Some(&report), &timestamp());

        assert!(content.starts_with("ZIPSIGHT ANALYSIS LOG\n"));
        assert!(content.contains("PROMPT\n"));
        assert!(content.contains("describe it\n"));
        assert!(content.contains("  - a.txt -> https://files.test/abc\n"));
        assert!(content.contains("  - notes/c.pdf: timed out\n"));
        assert!(content.contains("GENERATION ERROR\n"));
        assert!(content.contains(SERVICE_ERROR_RESPONSE));
    }

    #[test]
    fn test_analyze_log_without_report() {
        let dir = TempDir::new().unwrap();
        let inspection = inspection(&dir);

        let content = format_analyze_log(&inspection, "", None, &timestamp());

        assert!(content.contains("(analysis skipped: no API key)"));
        assert!(!content.contains("UPLOADS"));
    }

    #[tokio::test]
    async fn test_write_log_file() {
        let dir = TempDir::new().unwrap();

        let path = write_log_file(dir.path(), "zipsight_x.txt", "hello\n")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("zipsight_x.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello\n");
    }
}
