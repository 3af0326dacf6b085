// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tend: continuous dependency management.
//!
//! `tend run` starts the supervisor in the foreground; the supervisor
//! spawns and watches the tendd daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backoff;
mod daemon_process;
mod supervisor;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "tend", version, about = "Continuous dependency management service")]
struct Cli {
    /// Override the config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the supervisor in the foreground (default)
    Run,
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

async fn run(config: Option<PathBuf>) -> anyhow::Result<()> {
    let supervisor = Supervisor::new(config).context("failed to start supervisor")?;
    supervisor.run().await.context("supervisor failed")?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging();

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
