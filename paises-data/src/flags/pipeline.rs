use std::collections::BTreeSet;

use camino::Utf8Path;
use log::{debug, info, warn};
use paises_core::{Country, ProgressReporter, ProgressSink, ProgressSource};
use paises_fs::{DataLayout, LockedFile, is_non_empty_file, read_file, remove_file, write_file};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::{
    Cancelled, ConversionError, FlagFetchError, FlagSource, LockRetryPolicy, Rasteriser,
};

/// Keys whose flags are known not to render.
pub const DEFAULT_KNOWN_BAD: [&str; 2] = ["IOT", "SHN"];

/// Reports whether a file is still being written.
pub trait LockProbe {
    /// `true` while the file is missing or exclusively held.
    fn is_locked(&self, path: &Utf8Path) -> bool;
}

/// [`LockProbe`] backed by advisory file locks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLockProbe;

impl LockProbe for FileLockProbe {
    fn is_locked(&self, path: &Utf8Path) -> bool {
        paises_fs::is_locked(path)
    }
}

/// Result of fetching one record's vector flag.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Downloaded during this run.
    Fetched { bytes: u64 },
    /// A non-empty file from an earlier run was reused.
    Cached,
    /// Nothing usable is on disk for this record.
    Failed(FlagFetchError),
}

impl FetchOutcome {
    /// Whether a vector flag is available for conversion.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Fetched { .. } | Self::Cached)
    }
}

/// Result of converting one record's flag.
#[derive(Debug)]
pub enum ConvertOutcome {
    /// A JPEG was written during this run.
    Converted { bytes: u64 },
    /// A JPEG from an earlier run was kept.
    AlreadyConverted,
    /// The record's flag is known not to render; no JPEG will be produced.
    PermanentlySkipped,
    /// Conversion failed and the operator should be told.
    Failed(ConversionError),
}

/// Per-record fetch results in processing order.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// `(alpha3_code, outcome)` pairs.
    pub outcomes: Vec<(String, FetchOutcome)>,
}

impl FetchReport {
    /// Keys with a vector flag on disk.
    pub fn ready(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ready())
            .map(|(key, _)| key.as_str())
    }

    /// Failed fetches.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FlagFetchError)> {
        self.outcomes.iter().filter_map(|(key, outcome)| match outcome {
            FetchOutcome::Failed(err) => Some((key.as_str(), err)),
            _ => None,
        })
    }
}

/// Per-record conversion results in processing order.
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// `(alpha3_code, outcome)` pairs.
    pub outcomes: Vec<(String, ConvertOutcome)>,
}

impl ConvertReport {
    /// Conversion errors the operator should see.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ConversionError)> {
        self.outcomes.iter().filter_map(|(key, outcome)| match outcome {
            ConvertOutcome::Failed(err) => Some((key.as_str(), err)),
            _ => None,
        })
    }

    /// Number of records with a JPEG on disk after the run.
    #[must_use]
    pub fn converted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(
                    outcome,
                    ConvertOutcome::Converted { .. } | ConvertOutcome::AlreadyConverted
                )
            })
            .count()
    }
}

/// Results of a full fetch-then-convert run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Fetch step results.
    pub fetch: FetchReport,
    /// Convert step results, covering only records whose fetch succeeded.
    pub convert: ConvertReport,
}

/// Downloads and rasterises one flag per country, sequentially.
///
/// Each record's failure is recorded in the report and never aborts the
/// batch. The only early exit is cancellation, observed before every record
/// and at every suspension point.
#[derive(Debug)]
pub struct FlagPipeline<S, R, L = FileLockProbe> {
    source: S,
    rasteriser: R,
    lock_probe: L,
    layout: DataLayout,
    retry: LockRetryPolicy,
    known_bad: BTreeSet<String>,
    cancel: CancellationToken,
    sink: ProgressSink,
}

impl<S, R> FlagPipeline<S, R>
where
    S: FlagSource,
    R: Rasteriser,
{
    /// Build a pipeline writing under `layout` with default settings.
    pub fn new(source: S, rasteriser: R, layout: DataLayout) -> Self {
        Self {
            source,
            rasteriser,
            lock_probe: FileLockProbe,
            layout,
            retry: LockRetryPolicy::default(),
            known_bad: DEFAULT_KNOWN_BAD.iter().map(|key| (*key).to_owned()).collect(),
            cancel: CancellationToken::new(),
            sink: ProgressSink::discard(),
        }
    }
}

impl<S, R, L> FlagPipeline<S, R, L>
where
    S: FlagSource,
    R: Rasteriser,
    L: LockProbe,
{
    /// Replace the lock probe.
    pub fn with_lock_probe<P: LockProbe>(self, lock_probe: P) -> FlagPipeline<S, R, P> {
        FlagPipeline {
            source: self.source,
            rasteriser: self.rasteriser,
            lock_probe,
            layout: self.layout,
            retry: self.retry,
            known_bad: self.known_bad,
            cancel: self.cancel,
            sink: self.sink,
        }
    }

    /// Replace the backoff used while waiting on locked flags.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: LockRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the set of keys whose format errors are expected.
    #[must_use]
    pub fn with_known_bad<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.known_bad = keys
            .into_iter()
            .map(|key| key.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Observe `cancel` at every suspension point.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Publish progress events through `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Lock probe consulted before each conversion.
    pub fn lock_probe(&self) -> &L {
        &self.lock_probe
    }

    /// Fetch every flag, then convert those now on disk.
    pub async fn run(&self, countries: &[Country]) -> Result<PipelineReport, Cancelled> {
        let fetch = self.fetch(countries).await?;
        let ready: BTreeSet<&str> = fetch.ready().collect();
        let to_convert: Vec<Country> = countries
            .iter()
            .filter(|country| ready.contains(country.alpha3_code.as_str()))
            .cloned()
            .collect();
        let convert = self.convert(&to_convert).await?;
        info!(
            "flag pipeline finished: {} fetched, {} converted",
            ready.len(),
            convert.converted()
        );
        Ok(PipelineReport { fetch, convert })
    }

    /// Download each record's vector flag.
    pub async fn fetch(&self, countries: &[Country]) -> Result<FetchReport, Cancelled> {
        let mut reporter =
            ProgressReporter::new(ProgressSource::FetchFlags, countries.len(), self.sink.clone());
        let mut report = FetchReport::default();

        for country in countries {
            self.ensure_running(report.outcomes.len())?;
            let outcome = self
                .fetch_one(country)
                .await
                .ok_or(Cancelled {
                    completed: report.outcomes.len(),
                })?;
            let message = match &outcome {
                FetchOutcome::Fetched { .. } => format!("Fetched flag for {country}."),
                FetchOutcome::Cached => format!("Flag for {country} already downloaded."),
                FetchOutcome::Failed(err) => {
                    warn!("{err}");
                    format!("Could not fetch flag for {country}.")
                }
            };
            reporter.record(country, message);
            report
                .outcomes
                .push((country.alpha3_code.clone(), outcome));
        }
        Ok(report)
    }

    /// Rasterise each record's vector flag into a JPEG beside it.
    pub async fn convert(&self, countries: &[Country]) -> Result<ConvertReport, Cancelled> {
        let mut reporter = ProgressReporter::new(
            ProgressSource::ConvertFlags,
            countries.len(),
            self.sink.clone(),
        );
        let mut report = ConvertReport::default();

        for country in countries {
            self.ensure_running(report.outcomes.len())?;
            let outcome = self
                .convert_one(country)
                .await
                .ok_or(Cancelled {
                    completed: report.outcomes.len(),
                })?;
            let message = match &outcome {
                ConvertOutcome::Converted { .. } => format!("Converted flag for {country}."),
                ConvertOutcome::AlreadyConverted => {
                    format!("Flag for {country} already converted.")
                }
                ConvertOutcome::PermanentlySkipped => {
                    format!("Flag for {country} cannot be converted.")
                }
                ConvertOutcome::Failed(err) => {
                    warn!("{err}");
                    format!("Could not convert flag for {country}.")
                }
            };
            reporter.record(country, message);
            report
                .outcomes
                .push((country.alpha3_code.clone(), outcome));
        }
        Ok(report)
    }

    fn ensure_running(&self, completed: usize) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled { completed });
        }
        Ok(())
    }

    /// `None` when cancelled mid-download.
    async fn fetch_one(&self, country: &Country) -> Option<FetchOutcome> {
        let alpha3_code = &country.alpha3_code;
        let Some(stem) = country.file_stem() else {
            return Some(FetchOutcome::Failed(FlagFetchError::InvalidKey {
                alpha3_code: alpha3_code.clone(),
            }));
        };
        let path = self.layout.svg_path(&stem);

        match is_non_empty_file(&path) {
            Ok(true) => {
                debug!("reusing {path}");
                return Some(FetchOutcome::Cached);
            }
            Ok(false) => {}
            Err(source) => return Some(FetchOutcome::Failed(FlagFetchError::Io { path, source })),
        }

        let Some(url) = country.flag.as_deref().filter(|url| !url.trim().is_empty()) else {
            return Some(FetchOutcome::Failed(FlagFetchError::MissingUrl {
                alpha3_code: alpha3_code.clone(),
            }));
        };

        let mut file = match LockedFile::create(&path) {
            Ok(file) => file,
            Err(source) => return Some(FetchOutcome::Failed(FlagFetchError::Io { path, source })),
        };

        let downloaded = tokio::select! {
            () = self.cancel.cancelled() => None,
            result = self.source.download(url, &mut file) => Some(result),
        };

        let outcome = match downloaded {
            Some(Ok(_)) => match file.finish() {
                Ok(bytes) => return Some(FetchOutcome::Fetched { bytes }),
                Err(source) => Some(FetchOutcome::Failed(FlagFetchError::Io {
                    path: path.clone(),
                    source,
                })),
            },
            Some(Err(source)) => {
                drop(file);
                Some(FetchOutcome::Failed(FlagFetchError::Download {
                    alpha3_code: alpha3_code.clone(),
                    source,
                }))
            }
            None => {
                drop(file);
                None
            }
        };

        // A partial file would be mistaken for a cached download next run.
        if let Err(err) = remove_file(&path) {
            warn!("failed to remove partial flag {path}: {err}");
        }
        outcome
    }

    /// `None` when cancelled while waiting on the lock.
    async fn convert_one(&self, country: &Country) -> Option<ConvertOutcome> {
        match self.try_convert(country).await {
            Ok(outcome) => Some(outcome),
            Err(Interrupt::Cancelled) => None,
            Err(Interrupt::Failed(err)) if err.is_permanent() => {
                debug!("{err}");
                let reason = err.to_string();
                if let Some(stem) = country.file_stem() {
                    let marker = self.layout.unconvertible_marker(&stem);
                    if let Err(io) = write_file(&marker, reason.as_bytes()) {
                        warn!("failed to record {marker}: {io}");
                    }
                }
                Some(ConvertOutcome::PermanentlySkipped)
            }
            Err(Interrupt::Failed(err)) => Some(ConvertOutcome::Failed(err)),
        }
    }

    async fn try_convert(&self, country: &Country) -> Result<ConvertOutcome, Interrupt> {
        let alpha3_code = country.alpha3_code.as_str();
        let stem = country
            .file_stem()
            .ok_or_else(|| ConversionError::InvalidKey {
                alpha3_code: alpha3_code.to_owned(),
            })?;
        let svg = self.layout.svg_path(&stem);
        let jpg = self.layout.jpg_path(&stem);
        let marker = self.layout.unconvertible_marker(&stem);

        if is_non_empty_file(&jpg).map_err(|source| io_error(&jpg, source))? {
            return Ok(ConvertOutcome::AlreadyConverted);
        }
        if is_non_empty_file(&marker).map_err(|source| io_error(&marker, source))? {
            return Ok(ConvertOutcome::PermanentlySkipped);
        }

        self.wait_until_unlocked(&svg).await?;

        let document = read_file(&svg).map_err(|source| io_error(&svg, source))?;
        let known_bad = self.known_bad.contains(&alpha3_code.to_ascii_uppercase());
        let jpeg = self
            .rasteriser
            .rasterise(&document)
            .map_err(|source| ConversionError::from_raster(alpha3_code, known_bad, source))?;

        let mut file = LockedFile::create(&jpg).map_err(|source| io_error(&jpg, source))?;
        std::io::Write::write_all(&mut file, &jpeg).map_err(|source| io_error(&jpg, source))?;
        let bytes = file.finish().map_err(|source| io_error(&jpg, source))?;
        Ok(ConvertOutcome::Converted { bytes })
    }

    async fn wait_until_unlocked(&self, path: &Utf8Path) -> Result<(), Interrupt> {
        let started = Instant::now();
        let mut attempt = 0_u32;
        while self.lock_probe.is_locked(path) {
            let waited = started.elapsed();
            if waited >= self.retry.deadline {
                return Err(ConversionError::LockTimeout {
                    path: path.to_owned(),
                    waited,
                }
                .into());
            }
            let delay = self
                .retry
                .delay_for(attempt)
                .min(self.retry.deadline.saturating_sub(waited));
            tokio::select! {
                () = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
                () = sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        }
        Ok(())
    }
}

enum Interrupt {
    Cancelled,
    Failed(ConversionError),
}

impl From<ConversionError> for Interrupt {
    fn from(err: ConversionError) -> Self {
        Self::Failed(err)
    }
}

fn io_error(path: &Utf8Path, source: std::io::Error) -> ConversionError {
    ConversionError::Io {
        path: path.to_owned(),
        source,
    }
}
