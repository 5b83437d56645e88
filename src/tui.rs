//! Terminal user interface components.
//!
//! This module provides themed status lines, progress bars, interactive
//! prompts and the printers for the file tree, the categorized file listing
//! and the model's response.

use console::{Style, Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;

use crate::categories::Category;
use crate::scanner::ClassifiedFiles;

pub const BANNER: &str = r#"
 ┌─┐┬┌─┐┌─┐┬┌─┐┬ ┬┌┬┐
 ┌─┘│├─┘└─┐││ ┬├─┤ │
 └─┘┴┴  └─┘┴└─┘┴ ┴ ┴ "#;

pub enum Mode {
    Inspect,
    Analyze,
}

impl Mode {
    pub fn as_str(&self) -> &str {
        match self {
            Mode::Inspect => "INSPECT",
            Mode::Analyze => "ANALYZE",
        }
    }
}

pub struct UI {
    pub term: Term,
    pub color_theme: String,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
            color_theme: "default".to_string(),
        }
    }

    pub fn with_color_theme(mut self, theme: String) -> Self {
        self.color_theme = theme;
        self
    }

    /// Get the console::Style for the configured theme
    fn get_style(&self) -> Style {
        match self.color_theme.as_str() {
            "cyan" => Style::new().cyan(),
            "magenta" => Style::new().magenta(),
            "yellow" => Style::new().yellow(),
            "green" => Style::new().green(),
            "red" => Style::new().red(),
            "blue" => Style::new().blue(),
            _ => Style::new().white(),
        }
    }

    /// Get different shades for status codes based on theme
    /// Returns (info_style, warning_style, error_style, success_style)
    fn get_status_styles(&self) -> (Style, Style, Style, Style) {
        match self.color_theme.as_str() {
            "cyan" => (
                Style::new().cyan(),        // info - base
                Style::new().color256(51),  // warning - bright cyan
                Style::new().color256(87),  // error - darker cyan
                Style::new().color256(123), // success - lighter cyan
            ),
            "magenta" => (
                Style::new().magenta(),
                Style::new().color256(201),
                Style::new().color256(126),
                Style::new().color256(213),
            ),
            "yellow" => (
                Style::new().yellow(),
                Style::new().color256(226),
                Style::new().color256(178),
                Style::new().color256(227),
            ),
            "green" => (
                Style::new().green(),
                Style::new().color256(46),
                Style::new().color256(28),
                Style::new().color256(120),
            ),
            "red" => (
                Style::new().red(),
                Style::new().color256(196),
                Style::new().color256(124),
                Style::new().color256(210),
            ),
            "blue" => (
                Style::new().blue(),
                Style::new().color256(39),
                Style::new().color256(25),
                Style::new().color256(117),
            ),
            _ => (
                Style::new().white(),
                Style::new().color256(255),
                Style::new().color256(250),
                Style::new().color256(255),
            ),
        }
    }

    /// Get bar colors (spinner_color, bar_color) for progress bar templates
    fn get_bar_colors(&self) -> (&str, &str) {
        match self.color_theme.as_str() {
            "cyan" => (".cyan", "bright_cyan/bright_cyan"),
            "magenta" => (".magenta", "bright_magenta/bright_magenta"),
            "yellow" => (".yellow", "bright_yellow/bright_yellow"),
            "green" => (".green", "bright_green/bright_green"),
            "red" => (".red", "bright_red/bright_red"),
            "blue" => (".blue", "bright_blue/bright_blue"),
            _ => (".white", "bright_white/bright_white"),
        }
    }

    /// Get a ColorfulTheme for dialoguer prompts based on theme string
    pub fn get_colorful_theme(theme: &str) -> ColorfulTheme {
        let base = match theme {
            "cyan" => Style::new().cyan(),
            "magenta" => Style::new().magenta(),
            "yellow" => Style::new().yellow(),
            "green" => Style::new().green(),
            "red" => Style::new().red(),
            "blue" => Style::new().blue(),
            "white" => Style::new().white(),
            _ => return ColorfulTheme::default(),
        };

        ColorfulTheme {
            values_style: base.clone(),
            active_item_style: base.clone().bold(),
            active_item_prefix: base.apply_to("❯".to_string()).bold(),
            ..ColorfulTheme::default()
        }
    }

    /// Print banner with mode
    pub fn print_banner_with_mode(&self, mode: &Mode) -> io::Result<()> {
        let style = self.get_style();
        let white_bold = Style::new().white().bold();

        println!("{}", style.apply_to(BANNER).bold());
        println!();
        println!("{}", white_bold.apply_to("=".repeat(70)));

        // "MODE:" is themed and bold, mode name is white, bold, and italic
        println!(
            "{} {}",
            style.apply_to("MODE:").bold(),
            white_bold.apply_to(mode.as_str()).italic()
        );

        println!("{}", white_bold.apply_to("=".repeat(70)));

        Ok(())
    }

    /// Init the UI with banner and mode
    pub fn init(&self, mode: &Mode, message: &str) -> io::Result<()> {
        let white_bold = Style::new().white().bold();

        self.print_banner_with_mode(mode)?;

        if !message.is_empty() {
            println!();
            println!("{}", white_bold.apply_to(message));
        }
        println!();

        Ok(())
    }

    /// Ask for a line of text. Empty answers are re-prompted unless `allow_empty`.
    pub fn prompt_input(&self, prompt: &str, allow_empty: bool) -> color_eyre::Result<String> {
        let theme = Self::get_colorful_theme(&self.color_theme);
        let value: String = Input::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()?;
        Ok(value.trim().to_string())
    }

    /// Ask for a secret without echoing it.
    pub fn prompt_secret(&self, prompt: &str) -> color_eyre::Result<String> {
        let theme = Self::get_colorful_theme(&self.color_theme);
        let value = Password::with_theme(&theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(value.trim().to_string())
    }

    /// Create a spinner for work of unknown length
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        let (spinner_color, _) = self.get_bar_colors();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template(&format!("{{spinner:{}}} {{msg}}", spinner_color))
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Create a progress bar with known total
    pub fn create_progress_bar(&self, total: u64, message: &str) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let (spinner_color, bar_color) = self.get_bar_colors();
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:{}}} {{bar:40.{}}} {{pos}}/{{len}} ({{percent}}%) {{msg}}",
                    spinner_color, bar_color
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█ ")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Print a themed section heading
    pub fn print_section(&self, title: &str) -> io::Result<()> {
        let style = self.get_style();
        let white_bold = Style::new().white().bold();

        println!();
        println!("{}", white_bold.apply_to("=".repeat(70)));
        println!("{}", style.apply_to(title).bold());
        println!("{}", white_bold.apply_to("=".repeat(70)));
        Ok(())
    }

    /// Print the rendered file tree
    pub fn print_tree(&self, tree: &str) -> io::Result<()> {
        self.print_section("FILE TREE STRUCTURE")?;
        if tree.is_empty() {
            println!("{}", style("(archive is empty)").dim());
        } else {
            print!("{}", tree);
        }
        Ok(())
    }

    /// Print the supported files grouped by category
    pub fn print_classified(&self, files: &ClassifiedFiles) -> io::Result<()> {
        let style = self.get_style();

        self.print_section("SUPPORTED FILES")?;
        for (category, paths) in files.iter() {
            println!();
            println!("{}", style.apply_to(format!("{}:", category.label())).bold());
            if paths.is_empty() {
                println!("{}", console::style("  (none)").dim());
            }
            for path in paths {
                println!("  - {}", path.display());
            }
        }
        println!();
        Ok(())
    }

    /// Print which categories are switched off
    pub fn print_disabled_categories(&self, disabled: &[Category]) -> io::Result<()> {
        if disabled.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = disabled.iter().map(|c| c.as_str()).collect();
        self.print_info(&format!("Skipping categories: {}", names.join(", ")))
    }

    /// Print the model's response
    pub fn print_response(&self, response: &str) -> io::Result<()> {
        self.print_section("GEMINI API RESPONSE")?;
        println!("{}", response);
        println!();
        Ok(())
    }

    /// Print an info message
    pub fn print_info(&self, message: &str) -> io::Result<()> {
        let (info_style, _, _, _) = self.get_status_styles();
        let white_bold = Style::new().white().bold();
        println!(
            "{} {}",
            info_style.apply_to("[*]").bold(),
            white_bold.apply_to(message)
        );
        Ok(())
    }

    /// Print an error message
    pub fn print_error(&self, message: &str) -> io::Result<()> {
        let (_, _, error_style, _) = self.get_status_styles();
        let white_bold = Style::new().white().bold();
        println!(
            "{} {}",
            error_style.apply_to("[!] ERROR:").bold(),
            white_bold.apply_to(message)
        );
        Ok(())
    }

    /// Print a success message
    pub fn print_success(&self, message: &str) -> io::Result<()> {
        let (_, _, _, success_style) = self.get_status_styles();
        let white_bold = Style::new().white().bold();
        println!(
            "{} {}",
            success_style.apply_to("[✓]").bold(),
            white_bold.apply_to(message)
        );
        Ok(())
    }

    /// Print a warning message
    pub fn print_warning(&self, message: &str) -> io::Result<()> {
        let (_, warning_style, _, _) = self.get_status_styles();
        let white_bold = Style::new().white().bold();
        println!(
            "{} {}",
            warning_style.apply_to("[!] WARNING:").bold(),
            white_bold.apply_to(message)
        );
        Ok(())
    }

    /// Cleanup the terminal (show cursor, etc.)
    pub fn cleanup(&self) -> io::Result<()> {
        self.term.show_cursor()?;
        Ok(())
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Safely truncate a path for display, respecting UTF-8 character boundaries
pub fn safe_truncate_path(path: &str, max_len: usize) -> String {
    let chars: Vec<char> = path.chars().collect();
    if chars.len() <= max_len || max_len < 5 {
        return path.to_string();
    }

    // Keep the start and the end, the end usually holds the file name
    let suffix_len = (max_len - 3) / 2 + (max_len - 3) % 2;
    let prefix_len = max_len - 3 - suffix_len;

    let prefix: String = chars.iter().take(prefix_len).collect();
    let suffix: String = chars.iter().skip(chars.len() - suffix_len).collect();

    format!("{}...{}", prefix, suffix)
}

/// Display form of a path relative to `root`, falling back to the full path.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
