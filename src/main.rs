//! kiln - static site build pipeline with a live-reloading dev server.

mod cli;
mod config;
mod core;
mod embed;
mod freshness;
mod layout;
mod logger;
mod pipeline;
mod reload;
mod serve;
mod task;
mod transform;
mod utils;
mod watch;

use anyhow::{Context, Result, bail};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PipelineConfig;
use pipeline::{Pipeline, WatchTask, task_by_name};
use task::Step;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PipelineConfig::load(&cli).context("Failed to load configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(cli.selected_command(), config))
}

async fn run(command: Commands, config: PipelineConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config);
    let watch = || Step::task(WatchTask::until_shutdown());

    let name = match command {
        Commands::Build { .. } => {
            if let Err(e) = pipeline.build(watch()).await {
                log!("error"; "build stopped while {}", pipeline.phase());
                return Err(e.into());
            }
            return Ok(());
        }
        Commands::Watch { .. } => {
            pipeline.watch(watch()).await?;
            return Ok(());
        }
        Commands::Clean => "clean",
        Commands::Pug => "pug",
        Commands::Styles => "styles",
        Commands::Scripts => "scripts",
        Commands::Img => "img",
    };

    let task = task_by_name(name).with_context(|| format!("unknown task `{name}`"))?;
    let report = pipeline.run_task(task.as_ref()).await?;
    if report.suppressed {
        bail!("{name} failed, previous output kept");
    }
    Ok(())
}
