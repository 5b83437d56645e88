//! Command-line interface definitions.
//!
//! This module defines the CLI structure using clap, including all commands
//! and their arguments.

use crate::config::IncludeConfig;
use crate::tui::BANNER;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "zipsight")]
#[command(about = "Extract a ZIP archive and have Gemini analyze its contents")]
#[command(before_help = BANNER)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an archive, upload its supported files and ask Gemini about them
    Analyze {
        /// Path to the ZIP file (asked for when omitted)
        zip: Option<String>,

        /// Prompt sent along with the files (asked for when omitted)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Write a text log file of the run
        #[arg(long)]
        log: bool,

        #[command(flatten)]
        include: IncludeArgs,
    },
    /// Extract an archive and show its tree and supported files without uploading
    Inspect {
        /// Path to the ZIP file (asked for when omitted)
        zip: Option<String>,

        /// Write a text log file summarizing the inspection results
        #[arg(long)]
        log: bool,

        #[command(flatten)]
        include: IncludeArgs,
    },
}

/// Category switches that override the `[include]` config section.
#[derive(ClapArgs, Debug, Default, Clone, Copy)]
pub struct IncludeArgs {
    /// Leave out documents
    #[arg(long)]
    pub no_docs: bool,

    /// Leave out audio files
    #[arg(long)]
    pub no_audio: bool,

    /// Leave out images
    #[arg(long)]
    pub no_images: bool,

    /// Leave out videos
    #[arg(long)]
    pub no_videos: bool,
}

impl IncludeArgs {
    pub fn apply(&self, include: &mut IncludeConfig) {
        include.disable(self.no_docs, self.no_audio, self.no_images, self.no_videos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let args = Args::try_parse_from([
            "zipsight",
            "analyze",
            "bundle.zip",
            "--prompt",
            "what is this?",
            "--no-videos",
            "--log",
        ])
        .unwrap();

        match args.command {
            Commands::Analyze {
                zip,
                prompt,
                log,
                include,
            } => {
                assert_eq!(zip.as_deref(), Some("bundle.zip"));
                assert_eq!(prompt.as_deref(), Some("what is this?"));
                assert!(log);
                assert!(include.no_videos);
                assert!(!include.no_docs);
            }
            Commands::Inspect { .. } => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_inspect_without_path() {
        let args = Args::try_parse_from(["zipsight", "inspect", "--no-images"]).unwrap();

        match args.command {
            Commands::Inspect { zip, log, include } => {
                assert!(zip.is_none());
                assert!(!log);
                assert!(include.no_images);
            }
            Commands::Analyze { .. } => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_include_args_override_config() {
        let mut include = IncludeConfig::default();
        let flags = IncludeArgs {
            no_audio: true,
            no_images: true,
            ..IncludeArgs::default()
        };

        flags.apply(&mut include);

        assert!(include.docs);
        assert!(!include.audio);
        assert!(!include.images);
        assert!(include.videos);
    }
}
