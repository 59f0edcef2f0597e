//! Error types emitted by the paises CLI.
//!
//! Library errors are wrapped rather than flattened so `main` can print the
//! full source chain.

use std::sync::Arc;

use camino::Utf8PathBuf;
use paises_core::StoreError;
use paises_data::{Cancelled, CountryFetchError, TransportError};
use thiserror::Error;

/// Errors emitted by the paises CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The data directory could not be prepared.
    #[error("failed to create data directory {path}: {source}")]
    CreateDataDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An HTTP collaborator could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] TransportError),
    /// The local country store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The background persistence task panicked or was aborted.
    #[error("persistence task failed: {0}")]
    PersistTask(#[source] tokio::task::JoinError),
    /// Neither the remote source nor the local database produced countries.
    #[error("Could not load data. Please try after connecting to the internet.")]
    NoData {
        /// The remote failure, when the list could not be fetched at all.
        #[source]
        cause: Option<CountryFetchError>,
    },
    /// No stored country has the requested code.
    #[error("no stored country has code {code}")]
    CountryNotFound { code: String },
    /// The run was interrupted.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
