//! # zipsight - ZIP Archive Analysis with Gemini
//!
//! zipsight extracts a ZIP archive into a scratch directory, prints its file
//! tree, sorts the supported files into documents, audio, images and videos,
//! uploads them to the Gemini API and prints the model's analysis of the
//! whole archive. The scratch directory is removed before the program exits.
//!
//! ## Features
//!
//! - **Archive Extraction**: Entries whose names would escape the scratch
//!   directory are skipped and reported
//! - **File Tree Rendering**: Indented listing, sorted, safe against symlink
//!   cycles and unreadable directories
//! - **File Classification**: Extension to MIME type tables per category,
//!   configurable and switchable per run
//! - **Gemini Upload and Analysis**: Resumable file uploads followed by a single
//!   `generateContent` request carrying the prompt, the tree and the files
//! - **Run Logs**: Optional plain-text report of each run
//!
//! ## Command Line Usage
//!
//! ### Analyze an Archive
//!
//! ```bash
//! # Prompts for the archive path and the question
//! zipsight analyze
//!
//! # Everything on the command line
//! zipsight analyze ./bundle.zip --prompt "What is this project?"
//!
//! # Leave videos out and write a log file
//! zipsight analyze ./bundle.zip --no-videos --log
//! ```
//!
//! ### Inspect Without Uploading
//!
//! ```bash
//! zipsight inspect ./bundle.zip
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zipsight::categories::FileTypeRegistry;
//! use zipsight::config::Config;
//! use zipsight::scanner::scan_directory;
//! use zipsight::tree::{render_tree, TreeOptions};
//!
//! #[tokio::main]
//! async fn main() -> color_eyre::Result<()> {
//!     let config = Config::load()?;
//!     let root = Path::new("./extracted_files");
//!
//!     print!("{}", render_tree(root, &TreeOptions::default()));
//!
//!     let registry = FileTypeRegistry::from_config(&config.file_types);
//!     let files = scan_directory(root, config.include, registry).await?;
//!     println!("Found {} supported files", files.total());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! zipsight uses a TOML configuration file located at
//! `~/.config/zipsight/config.toml`. On first run, a default configuration is
//! created automatically. The `GEMINI_API_KEY` environment variable takes
//! precedence over the key stored in the file.
//!
//! ## Module Organization
//!
//! - [`analyze`]: Upload and generation pipeline, analyze command
//! - [`categories`]: Categories and extension to MIME type mapping
//! - [`cli`]: Command-line argument parsing
//! - [`config`]: Configuration management
//! - [`extract`]: Archive opening, extraction and the scratch directory
//! - [`gemini`]: Gemini REST client behind the [`gemini::GenerativeService`] trait
//! - [`inspect`]: Archive inspection workflow
//! - [`log`]: Log file generation
//! - [`scanner`]: File classification
//! - [`tree`]: File tree rendering
//! - [`tui`]: Terminal user interface components

pub mod analyze;
pub mod categories;
pub mod cli;
pub mod config;
pub mod extract;
pub mod gemini;
pub mod inspect;
pub mod log;
pub mod scanner;
pub mod tree;
pub mod tui;

// Re-export commonly used types
pub use analyze::{AnalysisReport, upload_and_generate};
pub use config::Config;
pub use scanner::ClassifiedFiles;
