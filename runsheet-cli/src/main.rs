//! Command line front end for runsheet: validate run files, render
//! announcements and sequence driver stops.

mod commands;
mod config;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{RunFiles, TemplateChoice};
use crate::config::Config;

/// Prepare volunteer delivery runs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./runsheet.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overriding the config file (RUST_LOG wins over both)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Run file exported as CSV
    run: PathBuf,

    /// Restaurant catalog CSV
    #[arg(short, long)]
    restaurants: Option<PathBuf>,
}

impl From<RunArgs> for RunFiles {
    fn from(args: RunArgs) -> Self {
        RunFiles {
            run: args.run,
            restaurants: args.restaurants,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a run file and list its warnings
    Check {
        #[command(flatten)]
        files: RunArgs,
    },
    /// Render a message template over a run
    Render {
        #[command(flatten)]
        files: RunArgs,

        /// Template file, taking precedence over --format
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Named format from the config file; defaults to the run's MessageFormat
        #[arg(short, long)]
        format: Option<String>,

        /// Render once per driver instead of once for the whole run
        #[arg(long)]
        per_driver: bool,
    },
    /// Order each driver's deliveries and rewrite the run file
    Sequence {
        #[command(flatten)]
        files: RunArgs,

        /// Write the rewritten CSV here instead of to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::discover(cli.config.as_deref())?;
    setup_logging(cli.log.as_deref().unwrap_or(&config.log_filter))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Check { files } => commands::check(&mut out, &files.into()),
        Command::Render {
            files,
            template,
            format,
            per_driver,
        } => {
            let choice = TemplateChoice {
                path: template,
                format,
            };
            commands::render(&mut out, &config, &files.into(), &choice, per_driver)
        }
        Command::Sequence { files, output } => {
            commands::sequence(&mut out, &config, &files.into(), output.as_deref()).await
        }
    }
}

/// Log to stderr so stdout stays clean for CSV and rendered text.
fn setup_logging(fallback: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_flags_parse() {
        let cli = Cli::try_parse_from([
            "runsheet",
            "render",
            "run.csv",
            "--restaurants",
            "restaurants.csv",
            "--format",
            "weekly",
            "--per-driver",
        ])
        .expect("valid arguments");
        let Command::Render {
            files,
            format,
            per_driver,
            template,
        } = cli.command
        else {
            unreachable!("render subcommand expected");
        };
        assert_eq!(files.run, PathBuf::from("run.csv"));
        assert_eq!(files.restaurants, Some(PathBuf::from("restaurants.csv")));
        assert_eq!(format.as_deref(), Some("weekly"));
        assert!(per_driver);
        assert!(template.is_none());
    }
}
