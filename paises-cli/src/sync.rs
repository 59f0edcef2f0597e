//! `sync` command: decide between the remote source and the local database,
//! then persist countries and fetch flags concurrently.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use log::{debug, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use paises_core::{
    Country, CountryStore, ProgressEvent, ProgressReporter, ProgressSink, ProgressSource,
    SqliteCountryStore, StoreError,
};
use paises_data::flags::DEFAULT_KNOWN_BAD;
use paises_data::{
    ConnectivityProbe, CountrySource, DEFAULT_COUNTRIES_URL, DEFAULT_PROBE_URL, FlagPipeline,
    FlagSource, HttpConnectivityProbe, HttpCountrySource, HttpFlagSource, PipelineReport,
    Rasteriser, SvgRasteriser,
};
use paises_fs::DataLayout;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;

use crate::{
    ARG_API_URL, ARG_DATA_DIR, ARG_FLAG_TIMEOUT, ARG_KNOWN_BAD, ARG_PROBE_URL, CliError,
    DEFAULT_DATA_DIR,
};

const DEFAULT_FLAG_TIMEOUT: Duration = Duration::from_secs(30);

/// CLI arguments for the `sync` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sync",
    long_about = "Check connectivity, then either download the country list, \
                 store it locally and fetch every flag, or fall back to the \
                 countries already stored. Options can come from CLI flags, \
                 the [cmds.sync] configuration section, or PAISES_CMDS_SYNC_* \
                 environment variables.",
    about = "Load the country catalogue"
)]
#[ortho_config(prefix = "PAISES")]
pub(crate) struct SyncArgs {
    /// Directory holding the database and flag images.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
    /// Endpoint returning the full country list.
    #[arg(long = ARG_API_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) api_url: Option<String>,
    /// Endpoint used to check connectivity.
    #[arg(long = ARG_PROBE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) probe_url: Option<String>,
    /// Skip the connectivity check and load from the local database.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "bool")]
    #[serde(default)]
    pub(crate) offline: Option<bool>,
    /// Country codes whose flags are known not to render.
    #[arg(long = ARG_KNOWN_BAD, value_name = "codes", value_delimiter = ',')]
    #[serde(default, deserialize_with = "deserialize_codes")]
    pub(crate) known_bad: Option<Vec<String>>,
    /// Per-request timeout for flag downloads.
    #[arg(long = ARG_FLAG_TIMEOUT, value_name = "seconds")]
    #[serde(default)]
    pub(crate) flag_timeout_secs: Option<u64>,
}

/// Environment variables arrive as a single comma-separated string.
fn deserialize_codes<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Codes {
        Joined(String),
        Listed(Vec<String>),
    }

    Ok(
        Option::<Codes>::deserialize(deserializer)?.map(|codes| match codes {
            Codes::Joined(joined) => joined.split(',').map(str::to_owned).collect(),
            Codes::Listed(listed) => listed,
        }),
    )
}

impl SyncArgs {
    pub(crate) fn into_config(self) -> Result<SyncConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(SyncConfig::from(merged))
    }
}

/// Resolved `sync` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncConfig {
    pub(crate) data_dir: Utf8PathBuf,
    pub(crate) api_url: String,
    pub(crate) probe_url: String,
    pub(crate) offline: bool,
    /// Upper-cased, blank entries removed.
    pub(crate) known_bad: Vec<String>,
    pub(crate) flag_timeout: Duration,
}

impl From<SyncArgs> for SyncConfig {
    fn from(args: SyncArgs) -> Self {
        let known_bad = args.known_bad.map_or_else(
            || DEFAULT_KNOWN_BAD.iter().map(|code| (*code).to_owned()).collect(),
            |codes| {
                codes
                    .iter()
                    .map(|code| code.trim().to_ascii_uppercase())
                    .filter(|code| !code.is_empty())
                    .collect()
            },
        );
        Self {
            data_dir: args
                .data_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATA_DIR)),
            api_url: args
                .api_url
                .unwrap_or_else(|| DEFAULT_COUNTRIES_URL.to_owned()),
            probe_url: args
                .probe_url
                .unwrap_or_else(|| DEFAULT_PROBE_URL.to_owned()),
            offline: args.offline.unwrap_or(false),
            known_bad,
            flag_timeout: args
                .flag_timeout_secs
                .map_or(DEFAULT_FLAG_TIMEOUT, Duration::from_secs),
        }
    }
}

/// Collaborators the sync routine talks to.
pub(crate) struct SyncServices<'a> {
    pub(crate) probe: &'a dyn ConnectivityProbe,
    pub(crate) countries: &'a dyn CountrySource,
    pub(crate) flags: &'a dyn FlagSource,
    pub(crate) rasteriser: &'a dyn Rasteriser,
}

/// Production collaborators built from the configuration.
#[derive(Debug)]
pub(crate) struct HttpServices {
    probe: HttpConnectivityProbe,
    countries: HttpCountrySource,
    flags: HttpFlagSource,
    rasteriser: SvgRasteriser,
}

impl HttpServices {
    pub(crate) fn new(config: &SyncConfig) -> Result<Self, CliError> {
        Ok(Self {
            probe: HttpConnectivityProbe::new(config.probe_url.clone())?,
            countries: HttpCountrySource::new(config.api_url.clone())?,
            flags: HttpFlagSource::new(config.flag_timeout)?,
            rasteriser: SvgRasteriser,
        })
    }

    pub(crate) fn borrowed(&self) -> SyncServices<'_> {
        SyncServices {
            probe: &self.probe,
            countries: &self.countries,
            flags: &self.flags,
            rasteriser: &self.rasteriser,
        }
    }
}

/// Where the catalogue came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadSource {
    Remote,
    Local,
}

/// Outcome of a successful sync.
#[derive(Debug)]
pub(crate) struct SyncSummary {
    pub(crate) source: LoadSource,
    pub(crate) countries: usize,
    /// Present only when the remote path ran.
    pub(crate) flags: Option<PipelineReport>,
}

/// Run the startup routine, writing status lines to `out`.
///
/// Fails with [`CliError::NoData`] when the chosen path yields no countries.
pub(crate) async fn load_catalogue(
    config: &SyncConfig,
    services: &SyncServices<'_>,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> Result<SyncSummary, CliError> {
    let layout = DataLayout::new(config.data_dir.clone());
    layout
        .ensure_dirs()
        .map_err(|source| CliError::CreateDataDir {
            path: layout.flags_dir(),
            source,
        })?;

    if config.offline {
        status(out, "Offline mode. Loading from local database.")?;
        return load_local(&layout, out);
    }

    status(out, "Checking connection.")?;
    match services.probe.check().await {
        Ok(()) => {
            status(out, "Connection successful. Loading from the internet.")?;
            load_remote(config, services, &layout, cancel, out).await
        }
        Err(err) => {
            debug!("connectivity probe failed: {:?}", err.source);
            status(out, "Connection not available. Loading from local database.")?;
            load_local(&layout, out)
        }
    }
}

async fn load_remote(
    config: &SyncConfig,
    services: &SyncServices<'_>,
    layout: &DataLayout,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> Result<SyncSummary, CliError> {
    let countries = match services.countries.fetch_countries().await {
        Ok(countries) if !countries.is_empty() => countries,
        Ok(_) => {
            warn!("remote source returned no countries");
            return Err(CliError::NoData { cause: None });
        }
        Err(err) => {
            warn!("failed to fetch countries: {err}");
            return Err(CliError::NoData { cause: Some(err) });
        }
    };
    let total = countries.len();
    let store = SqliteCountryStore::open(layout.database_path())?;

    let (sink, receiver) = ProgressSink::channel();
    let pipeline = FlagPipeline::new(services.flags, services.rasteriser, layout.clone())
        .with_known_bad(&config.known_bad)
        .with_cancellation(cancel)
        .with_progress(sink.clone());
    let persist = tokio::task::spawn_blocking({
        let countries = countries.clone();
        move || persist_countries(store, &countries, sink)
    });

    // Both producers own a sender; the printer stops once `work` drops them.
    let work = async move { tokio::join!(persist, pipeline.run(&countries)) };
    let ((persisted, flags), printed) = tokio::join!(work, print_progress(receiver, out));
    printed?;
    persisted.map_err(CliError::PersistTask)??;
    let report = flags?;

    status(
        out,
        &format!(
            "Flags ready for {} of {total} countries.",
            report.convert.converted()
        ),
    )?;
    status(out, &format!("Successfully loaded {total} countries."))?;
    Ok(SyncSummary {
        source: LoadSource::Remote,
        countries: total,
        flags: Some(report),
    })
}

fn load_local(layout: &DataLayout, out: &mut dyn Write) -> Result<SyncSummary, CliError> {
    let store = SqliteCountryStore::open(layout.database_path())?;
    let countries = store.read_all()?;
    if countries.is_empty() {
        return Err(CliError::NoData { cause: None });
    }
    status(
        out,
        &format!("Successfully loaded {} countries.", countries.len()),
    )?;
    Ok(SyncSummary {
        source: LoadSource::Local,
        countries: countries.len(),
        flags: None,
    })
}

fn persist_countries(
    mut store: SqliteCountryStore,
    countries: &[Country],
    sink: ProgressSink,
) -> Result<(), StoreError> {
    let mut reporter = ProgressReporter::new(ProgressSource::Persist, countries.len(), sink);
    store.upsert(countries, &mut reporter)
}

async fn print_progress(
    mut receiver: UnboundedReceiver<ProgressEvent>,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let mut result = Ok(());
    while let Some(event) = receiver.recv().await {
        if result.is_ok() {
            result = render_event(&event, out);
        }
    }
    result
}

fn render_event(event: &ProgressEvent, out: &mut dyn Write) -> Result<(), CliError> {
    writeln!(
        out,
        "[{:<7}] {:>3}% {}",
        event.source, event.percent_complete, event.status_message
    )
    .map_err(CliError::WriteOutput)
}

fn status(out: &mut dyn Write, message: &str) -> Result<(), CliError> {
    writeln!(out, "{message}").map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SyncConfig, CliError> {
    let merged = SyncArgs::merge_from_layers(layers).map_err(CliError::from)?;
    Ok(SyncConfig::from(merged))
}
