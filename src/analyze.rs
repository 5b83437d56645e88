//! Upload and analysis workflow.
//!
//! This module uploads the classified files to Gemini and asks for an
//! analysis of the archive. [`upload_and_generate`] is the pipeline itself;
//! [`handle_analyze`] wires it to the terminal for the `analyze` command.

use futures::stream::{self, StreamExt};
use std::io;
use std::path::{Path, PathBuf};

use crate::categories::{FileTypeRegistry, get_extension};
use crate::config::{API_KEY_ENV, Config};
use crate::gemini::{
    ContentPart, GeminiClient, GeminiError, GenerateRequest, GenerativeService, UploadedFile,
};
use crate::inspect::{Inspection, inspect_archive, resolve_zip_path};
use crate::log::write_analyze_log;
use crate::scanner::ClassifiedFiles;
use crate::tui::{Mode, UI, relative_display, safe_truncate_path};

/// Response text used when the service itself rejected the generation request.
pub const SERVICE_ERROR_RESPONSE: &str = "ERROR: Gemini API request failed (see above for details).";

/// Progress notifications from [`upload_and_generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// No MIME type is registered for the file; it is not uploaded
    MissingMimeType(PathBuf),
    Started(PathBuf),
    Uploaded(PathBuf),
    /// The upload failed; the file is left out of the request
    Failed { path: PathBuf, error: String },
    /// Uploads are done and the generation request is about to be sent
    Generating { files: usize },
}

/// Outcome of one upload and generation run.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Model output, [`SERVICE_ERROR_RESPONSE`] on a service error, or empty
    pub response: String,
    /// Successful uploads in request order
    pub uploaded: Vec<(PathBuf, UploadedFile)>,
    /// Files without a registered MIME type
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub generation_error: Option<GeminiError>,
}

/// Builds the single generation request: prompt, tree, then the files.
pub fn build_request(
    user_input: &str,
    file_tree: &str,
    files: Vec<UploadedFile>,
    system_instruction: &str,
) -> GenerateRequest {
    let mut parts = vec![
        ContentPart::Text(format!("User's Prompt:{}", user_input)),
        ContentPart::Text(format!("Zip file structure: {}", file_tree)),
    ];
    parts.extend(files.into_iter().map(ContentPart::File));

    GenerateRequest {
        system_instruction: system_instruction.to_string(),
        parts,
    }
}

/// Uploads the classified files and requests an analysis of the archive.
///
/// Files are taken in category order (docs, audio, image, video). A file
/// whose MIME type cannot be resolved, or whose upload fails, is reported
/// through `progress_callback` and left out; neither stops the run. Exactly
/// one generation request is sent afterwards, even when no file made it.
///
/// This function never fails. A generation error is kept in
/// [`AnalysisReport::generation_error`] and the response is set to
/// [`SERVICE_ERROR_RESPONSE`] for errors reported by the service, or left
/// empty for anything else.
///
/// With `upload.max_concurrent_uploads` above 1 several uploads are in flight
/// at once; the request still lists files in category order.
pub async fn upload_and_generate<S, F>(
    service: &S,
    registry: &FileTypeRegistry,
    files: &ClassifiedFiles,
    file_tree: &str,
    user_input: &str,
    config: &Config,
    progress_callback: F,
) -> AnalysisReport
where
    S: GenerativeService + ?Sized,
    F: Fn(UploadEvent),
{
    let mut report = AnalysisReport::default();

    let mut pending = Vec::new();
    for path in files.flatten() {
        match registry.mime_type(&get_extension(&path)) {
            Some(mime) => pending.push((path, mime.to_string())),
            None => {
                progress_callback(UploadEvent::MissingMimeType(path.clone()));
                report.skipped.push(path);
            }
        }
    }

    let callback = &progress_callback;
    let results: Vec<(PathBuf, Result<UploadedFile, GeminiError>)> = stream::iter(pending)
        .map(move |(path, mime)| async move {
            callback(UploadEvent::Started(path.clone()));
            let result = service.upload_file(&path, &mime).await;
            match &result {
                Ok(_) => callback(UploadEvent::Uploaded(path.clone())),
                Err(e) => callback(UploadEvent::Failed {
                    path: path.clone(),
                    error: e.to_string(),
                }),
            }
            (path, result)
        })
        .buffered(config.upload.max_concurrent_uploads.max(1))
        .collect()
        .await;

    for (path, result) in results {
        match result {
            Ok(file) => report.uploaded.push((path, file)),
            Err(e) => report.failed.push((path, e.to_string())),
        }
    }

    progress_callback(UploadEvent::Generating {
        files: report.uploaded.len(),
    });

    let handles = report.uploaded.iter().map(|(_, f)| f.clone()).collect();
    let request = build_request(
        user_input,
        file_tree,
        handles,
        &config.gemini.system_instruction,
    );

    match service.generate(request).await {
        Ok(text) => report.response = text,
        Err(e) => {
            report.response = if e.is_service_error() {
                SERVICE_ERROR_RESPONSE.to_string()
            } else {
                String::new()
            };
            report.generation_error = Some(e);
        }
    }

    report
}

/// Prints the error from a failed generation request with any diagnostics it carries.
pub fn print_generation_error(ui: &UI, error: &GeminiError) -> io::Result<()> {
    if error.is_service_error() {
        ui.print_error(&format!("Gemini API returned an error: {}", error))?;
    } else {
        ui.print_error(&format!("An unexpected error occurred: {}", error))?;
    }

    for candidate in error.candidates() {
        if let Some(reason) = &candidate.finish_reason {
            ui.print_info(&format!("Finish Reason: {}", reason))?;
        }
        if !candidate.safety_ratings.is_empty() {
            ui.print_info("Safety Ratings:")?;
            for rating in &candidate.safety_ratings {
                println!("  - {}: {}", rating.category, rating.probability);
            }
        }
    }

    Ok(())
}

async fn upload_with_progress<S: GenerativeService + ?Sized>(
    ui: &UI,
    service: &S,
    inspection: &Inspection,
    user_input: &str,
    config: &Config,
) -> AnalysisReport {
    let registry = FileTypeRegistry::from_config(&config.file_types);
    let root = inspection.scratch.path();
    let pb = ui.create_progress_bar(inspection.files.total() as u64, "Uploading");

    let report = upload_and_generate(
        service,
        &registry,
        &inspection.files,
        &inspection.tree,
        user_input,
        config,
        |event| match event {
            UploadEvent::Started(path) => {
                pb.set_message(safe_truncate_path(&relative_display(&path, root), 40));
            }
            UploadEvent::Uploaded(_) => pb.inc(1),
            UploadEvent::MissingMimeType(path) => {
                pb.inc(1);
                pb.suspend(|| {
                    let _ = ui.print_warning(&format!(
                        "Could not find mime_type {}",
                        path.display()
                    ));
                });
            }
            UploadEvent::Failed { path, error } => {
                pb.inc(1);
                pb.suspend(|| {
                    let _ = ui.print_warning(&format!(
                        "Error uploading {}: {}",
                        path.display(),
                        error
                    ));
                });
            }
            UploadEvent::Generating { .. } => {
                pb.set_message("Waiting for Gemini response...");
            }
        },
    )
    .await;

    pb.finish_and_clear();
    report
}

/// Connects to the analysis service, or returns `None` to skip analysis.
pub type Connect = fn(&UI, &Config) -> color_eyre::Result<Option<Box<dyn GenerativeService>>>;

/// Builds a [`GeminiClient`], asking for the API key when none is configured.
pub fn connect_gemini(
    ui: &UI,
    config: &Config,
) -> color_eyre::Result<Option<Box<dyn GenerativeService>>> {
    let api_key = match config.api_key() {
        Some(key) => key.to_string(),
        None => {
            ui.print_warning(&format!("{} not set.", API_KEY_ENV))?;
            ui.prompt_secret(&format!(
                "Enter {} (hidden, or press Enter to skip)",
                API_KEY_ENV
            ))?
        }
    };

    match GeminiClient::new(&config.gemini, &api_key) {
        Ok(client) => {
            ui.print_info(&format!("Using model {}", client.model()))?;
            Ok(Some(Box::new(client)))
        }
        Err(e) => {
            ui.print_error(&e.to_string())?;
            Ok(None)
        }
    }
}

async fn run_analysis(
    ui: &UI,
    inspection: &Inspection,
    prompt: Option<String>,
    write_log: bool,
    config: &Config,
    connect: Connect,
) -> color_eyre::Result<Option<AnalysisReport>> {
    let user_input = match prompt {
        Some(p) => p,
        None => ui.prompt_input("Enter your prompt for gemini", true)?,
    };

    let report = match connect(ui, config)? {
        Some(service) => {
            ui.print_info(&format!(
                "Uploading {} file(s)",
                inspection.files.total()
            ))?;
            let report =
                upload_with_progress(ui, service.as_ref(), inspection, &user_input, config).await;
            print_upload_summary(ui, &report)?;
            Some(report)
        }
        None => None,
    };

    if let Some(error) = report.as_ref().and_then(|r| r.generation_error.as_ref()) {
        print_generation_error(ui, error)?;
    }

    let response = report.as_ref().map(|r| r.response.as_str()).unwrap_or("");
    ui.print_response(response)?;

    if write_log {
        ui.print_info("Writing log file...")?;
        match write_analyze_log(inspection, &user_input, report.as_ref()).await {
            Ok(log_path) => ui.print_success(&format!("Log written to: {}", log_path.display()))?,
            Err(e) => ui.print_warning(&format!("Failed to write log file: {}", e))?,
        }
    }

    Ok(report)
}

fn print_upload_summary(ui: &UI, report: &AnalysisReport) -> io::Result<()> {
    let attempted = report.uploaded.len() + report.failed.len();
    ui.print_success(&format!(
        "Uploaded {} of {} file(s)",
        report.uploaded.len(),
        attempted
    ))?;

    if !report.failed.is_empty() {
        ui.print_warning(&format!(
            "{} file(s) left out after failed uploads",
            report.failed.len()
        ))?;
    }
    if !report.skipped.is_empty() {
        ui.print_warning(&format!(
            "{} file(s) skipped without a MIME type",
            report.skipped.len()
        ))?;
    }

    Ok(())
}

pub async fn handle_analyze(
    zip: Option<String>,
    prompt: Option<String>,
    write_log: bool,
    config: &Config,
) -> color_eyre::Result<()> {
    let ui = UI::new().with_color_theme(config.ui.color.theme.clone());
    ui.init(&Mode::Analyze, "")?;

    let zip_path = resolve_zip_path(&ui, zip)?;
    analyze_zip(&ui, &zip_path, prompt, write_log, config, connect_gemini).await?;

    ui.cleanup()?;
    Ok(())
}

/// Runs the analyze pipeline on one archive with the service from `connect`.
///
/// Returns `Ok(None)` when the archive could not be extracted or `connect`
/// skipped the analysis. The scratch directory is removed before returning on
/// every path.
pub async fn analyze_zip(
    ui: &UI,
    zip_path: &Path,
    prompt: Option<String>,
    write_log: bool,
    config: &Config,
    connect: Connect,
) -> color_eyre::Result<Option<AnalysisReport>> {
    let Some(inspection) = inspect_archive(ui, zip_path, config).await? else {
        return Ok(None);
    };

    let result = run_analysis(ui, &inspection, prompt, write_log, config, connect).await;
    inspection.finish(ui)?;
    result
}
