// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tend daemon (tendd)
//!
//! Inner process of the supervisor/daemon pair. Watches the workspace,
//! reconciles manifests, and writes the heartbeat the supervisor
//! observes. Normally spawned by `tend run`; stdout/stderr are redirected
//! to the service log files by the supervisor.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::process::ExitCode;
use tend_daemon::lifecycle;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn print_help() {
    println!("tendd {}", env!("CARGO_PKG_VERSION"));
    println!("tend daemon - watches a workspace and reconciles dependency manifests");
    println!();
    println!("USAGE:");
    println!("    tendd [--config <path>]");
    println!();
    println!("The daemon is normally started by `tend run` and should not");
    println!("be invoked directly.");
    println!();
    println!("OPTIONS:");
    println!("        --config <path>  Override the config file location");
    println!("    -h, --help           Print help information");
    println!("    -v, --version        Print version information");
}

/// Parse the minimal argument surface: `--config <path>`.
fn parse_args() -> Result<Option<PathBuf>, ExitCode> {
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("tendd {}", env!("CARGO_PKG_VERSION"));
                return Err(ExitCode::SUCCESS);
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Err(ExitCode::SUCCESS);
            }
            "--config" => match args.next() {
                Some(path) => config = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config requires a path");
                    return Err(ExitCode::from(1));
                }
            },
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: tendd [--config <path>]");
                return Err(ExitCode::from(1));
            }
        }
    }
    Ok(config)
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // The supervisor redirects stdout to service.log; write there through
    // a non-blocking appender so slow disks never stall the daemon.
    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_override = match parse_args() {
        Ok(config) => config,
        Err(code) => return code,
    };

    let _log_guard = setup_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "starting tend daemon");

    let service = match lifecycle::startup(config_override) {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            eprintln!("error: failed to start daemon: {e}");
            return ExitCode::from(1);
        }
    };

    let cancel = CancellationToken::new();
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            return ExitCode::from(1);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGINT handler");
            return ExitCode::from(1);
        }
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
            }
            cancel.cancel();
        });
    }

    match service.run(cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "daemon exited with error");
            ExitCode::from(1)
        }
    }
}
