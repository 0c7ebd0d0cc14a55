use alert_reducer::{
    config::Config,
    reducer::{Reducer, ReducerKind},
    report::Reporter,
    series::load_series_file,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use glob::glob;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reduce every series in a file with a single reducer.
    Reduce {
        #[arg(long)]
        mode: ReducerKind,

        file: PathBuf,
    },

    /// Reduce every series in the files matching a pattern with the configured reducers.
    Report {
        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        output: PathBuf,

        pattern: String,
    },

    /// List the supported reducer modes.
    Modes,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::debug!("{args:#?}");

    match args.command {
        Command::Reduce { mode, file } => run_reduce(mode, file)?,
        Command::Report {
            config,
            output,
            pattern,
        } => run_report(config, output, &pattern)?,
        Command::Modes => {
            for kind in ReducerKind::ALL {
                println!("{kind}");
            }
        }
    }

    Ok(())
}

fn run_reduce(mode: ReducerKind, file: PathBuf) -> Result<()> {
    let reducer = Reducer::new(mode);
    let series_vec = load_series_file(&file).context("failed to load series")?;

    for series in &series_vec {
        let result = reducer.reduce(series);
        let line = serde_json::json!({
            "name": series.name,
            "mode": mode,
            "value": result.value,
            "valid": result.valid,
        });
        println!("{line}");
    }

    Ok(())
}

fn run_report(config: PathBuf, output: PathBuf, pattern: &str) -> Result<()> {
    let cfg = Config::from_file(&config).context("failed to construct cfg")?;
    log::info!("{cfg:#?}");

    let mut files: Vec<PathBuf> = glob(pattern)
        .context("failed to glob series files")?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    if files.is_empty() {
        bail!("no series files match {pattern:?}");
    }
    files.sort();

    let mut reporter = Reporter::new(cfg);
    for file in &files {
        reporter.add_file(file).context("failed to add file")?;
    }

    reporter
        .save_results(&output)
        .context("failed to save results")?;
    log::info!("saved {} reports to {output:?}", reporter.reports().len());

    Ok(())
}
