pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod lead;
pub mod output;
pub mod pipeline;
pub mod processing;
pub mod retrieval;
pub mod seen;

pub async fn run() -> anyhow::Result<()> {
    use anyhow::Context;
    use clap::Parser;

    let args = cli::Cli::parse();

    // Configure logger based on debug flag
    if args.debug {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::debug!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    // Enable colors if not in quiet mode
    if !args.quiet {
        console::set_colors_enabled(true);
        log::debug!("Console colors enabled");
    }

    let config = config::Config::from_env().context("Failed to load configuration")?;
    let options = pipeline::RunOptions::from_cli(&args, &config)
        .context("Invalid command line options")?;

    log::info!(
        "Exporting new leads as {:?} to {}",
        options.format,
        options.output_path.display()
    );

    let summary = pipeline::run_pipeline(&config, &options).await?;
    log::debug!("Run summary: {:?}", summary);
    Ok(())
}
