use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

mod config;
mod error;

use config::{Config, PurgeMode};
use error::{print_error_and_exit, CliError};
use synbrowse_core::{purge_output, Orchestrator, SystemRunner};

#[derive(Parser)]
#[command(name = "synbrowse")]
#[command(about = "Prepare MERS / SARS-CoV-2 comparative data for JBrowse 2")]
#[command(version)]
#[command(long_about = "
synbrowse downloads genomes and annotations, turns them into sorted,
bgzip-compressed and indexed files, aligns the two genomes with LAST and
writes a JBrowse 2 config.json with assemblies, annotation tracks and a
synteny track. Re-running is safe: finished steps are skipped.

Examples:
  synbrowse
  synbrowse --clean -v
  synbrowse --config synbrowse.toml --keep
  synbrowse --example-config > synbrowse.toml
")]
pub struct Cli {
    /// Configuration file path (defaults to ./synbrowse.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Remove previous output without asking
    #[arg(long, conflicts_with = "keep")]
    pub clean: bool,

    /// Keep previous output without asking
    #[arg(long)]
    pub keep: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub example_config: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    pub quiet: bool,
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read a yes/no answer; anything other than `y`/`yes` counts as no
fn ask_yes_no<R: BufRead, W: Write>(mut input: R, mut output: W, question: &str) -> io::Result<bool> {
    write!(output, "{} (yes/no): ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn should_purge(cli: &Cli, mode: PurgeMode) -> io::Result<bool> {
    if cli.clean {
        return Ok(true);
    }
    if cli.keep {
        return Ok(false);
    }
    match mode {
        PurgeMode::Always => Ok(true),
        PurgeMode::Never => Ok(false),
        PurgeMode::Ask => ask_yes_no(
            io::stdin().lock(),
            io::stdout(),
            "Do you want to clean existing directories before running?",
        ),
    }
}

fn run(cli: &Cli) -> Result<()> {
    if cli.example_config {
        print!("{}", Config::example_toml()?);
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let settings = config.to_settings();

    if should_purge(cli, config.general.purge).map_err(CliError::from)? {
        purge_output(&settings.output_dir).map_err(CliError::from)?;
    }

    let summary = Orchestrator::new(settings, SystemRunner::new())
        .run()
        .map_err(CliError::from)?;

    if let Some(alignment) = &summary.alignment {
        log::info!("Synteny track built from {} alignment records", alignment.total_records);
    }
    log::info!(
        "Done: {} external commands, {} steps already complete",
        summary.stages.invocations,
        summary.stages.skipped
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(&cli) {
        match err.downcast_ref::<CliError>() {
            Some(cli_err) => print_error_and_exit(cli_err),
            None => {
                eprintln!("Error: {:#}", err);
                std::process::exit(1);
            }
        }
    }
}
