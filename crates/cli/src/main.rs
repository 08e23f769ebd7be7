mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tabula_core::config::{load_dotenv, Config};

use crate::cli::{CliArgs, Command};
use crate::commands::{ChartArgs, Workspace};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = Config::from_env();
    if let Some(dir) = args.dir {
        config.definitions.dir = dir;
    }
    config.log_summary();

    let workspace = Workspace::open(config)?;
    match args.command {
        Command::List => workspace.list(),
        Command::Eval {
            id,
            bindings,
            compact,
        } => workspace.eval(&id, &bindings, compact),
        Command::Chart {
            ids,
            bindings,
            order,
            title,
            columns,
            format,
        } => workspace.chart(
            &ids,
            &bindings,
            ChartArgs {
                order,
                title,
                columns,
                format,
            },
        ),
    }
}
