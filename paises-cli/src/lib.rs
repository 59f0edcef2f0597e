//! Command-line interface for the offline country catalogue.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

mod error;
mod show;
mod sync;

pub use error::CliError;

use show::{ShowArgs, run_show};
use sync::{HttpServices, SyncArgs, load_catalogue};

const ARG_DATA_DIR: &str = "data-dir";
const ARG_API_URL: &str = "api-url";
const ARG_PROBE_URL: &str = "probe-url";
const ARG_KNOWN_BAD: &str = "known-bad";
const ARG_FLAG_TIMEOUT: &str = "flag-timeout-secs";
const ARG_SHOW_CODE: &str = "code";
const ENV_SHOW_CODE: &str = "PAISES_CMDS_SHOW_CODE";

/// Default data directory, relative to the working directory.
const DEFAULT_DATA_DIR: &str = "paises-data";

/// Run the CLI with the current process arguments and environment.
///
/// Status lines go to standard output. Ctrl-C cancels a running sync at its
/// next suspension point.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Sync(args) => run_sync(args, &mut stdout),
        Command::Show(args) => run_show(args, &mut stdout),
    }
}

fn run_sync(args: SyncArgs, out: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let services = HttpServices::new(&config)?;
    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let cancel = CancellationToken::new();

    let watcher = cancel.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            watcher.cancel();
        }
    });

    let summary = runtime.block_on(load_catalogue(&config, &services.borrowed(), cancel, out))?;
    let flag_failures = summary.flags.as_ref().map_or(0, |report| {
        report.fetch.failures().count() + report.convert.failures().count()
    });
    info!(
        "loaded {} countries from {:?} with {flag_failures} flag failures",
        summary.countries, summary.source
    );
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "paises",
    about = "Offline country catalogue with flag images",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load the catalogue, preferring the remote source when reachable.
    Sync(SyncArgs),
    /// Print one stored country.
    Show(ShowArgs),
}

#[cfg(test)]
mod tests;
