// src/main.rs
use clap::Parser;

use zipsight::analyze::handle_analyze;
use zipsight::cli::{Args, Commands};
use zipsight::config::Config;
use zipsight::inspect::handle_inspect;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Load configuration
    let mut config = Config::load()?;

    let args = Args::parse();

    match args.command {
        Commands::Analyze {
            zip,
            prompt,
            log,
            include,
        } => {
            include.apply(&mut config.include);
            handle_analyze(zip, prompt, log, &config).await?;
        }
        Commands::Inspect { zip, log, include } => {
            include.apply(&mut config.include);
            handle_inspect(zip, log, &config).await?;
        }
    }

    Ok(())
}
