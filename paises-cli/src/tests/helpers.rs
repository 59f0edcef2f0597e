//! Test helpers wiring stub collaborators into the sync routine.

use super::*;
use crate::sync::{SyncConfig, SyncServices, SyncSummary};
use camino::Utf8PathBuf;
use paises_core::{
    Country, CountryStore, ProgressReporter, ProgressSink, ProgressSource, SqliteCountryStore,
};
use paises_data::test_support::{
    StubConnectivityProbe, StubCountrySource, StubFlagSource, StubRasteriser, block_on_for_tests,
};
use paises_fs::DataLayout;
use std::time::Duration;
use tempfile::TempDir;

/// A scratch data directory.
pub(super) struct DataDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl DataDir {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root =
            Utf8PathBuf::from_path_buf(dir.path().join("data")).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8PathBuf {
        &self.root
    }

    pub(super) fn layout(&self) -> DataLayout {
        DataLayout::new(self.root.clone())
    }

    pub(super) fn config(&self) -> SyncConfig {
        SyncConfig {
            data_dir: self.root.clone(),
            api_url: "stub://countries".to_owned(),
            probe_url: "stub://probe".to_owned(),
            offline: false,
            known_bad: vec!["IOT".to_owned(), "SHN".to_owned()],
            flag_timeout: Duration::from_secs(1),
        }
    }

    /// Store `countries` as an earlier online run would have.
    pub(super) fn seed_database(&self, countries: &[Country]) {
        self.layout().ensure_dirs().expect("create data dir");
        let mut store =
            SqliteCountryStore::open(self.layout().database_path()).expect("open store");
        let mut reporter =
            ProgressReporter::new(ProgressSource::Persist, countries.len(), ProgressSink::discard());
        store
            .upsert(countries, &mut reporter)
            .expect("seed countries");
    }

    pub(super) fn stored(&self) -> Vec<Country> {
        SqliteCountryStore::open(self.layout().database_path())
            .expect("open store")
            .read_all()
            .expect("read countries")
    }
}

/// Stub collaborators for one scenario.
pub(super) struct Stubs {
    probe: StubConnectivityProbe,
    countries: StubCountrySource,
    flags: StubFlagSource,
    rasteriser: StubRasteriser,
}

impl Stubs {
    pub(super) fn online(countries: Vec<Country>) -> Self {
        Self {
            probe: StubConnectivityProbe::online(),
            flags: StubFlagSource::serving(&countries),
            countries: StubCountrySource::with_countries(countries),
            rasteriser: StubRasteriser::default(),
        }
    }

    pub(super) fn online_failing(status: u16) -> Self {
        Self {
            probe: StubConnectivityProbe::online(),
            countries: StubCountrySource::with_status(status),
            flags: StubFlagSource::default(),
            rasteriser: StubRasteriser::default(),
        }
    }

    pub(super) fn offline() -> Self {
        Self {
            probe: StubConnectivityProbe::offline(),
            ..Self::online_failing(503)
        }
    }

    pub(super) fn services(&self) -> SyncServices<'_> {
        SyncServices {
            probe: &self.probe,
            countries: &self.countries,
            flags: &self.flags,
            rasteriser: &self.rasteriser,
        }
    }

    pub(super) fn flag_requests(&self) -> usize {
        self.flags.requests().len()
    }
}

/// Run the sync routine and capture its status output.
pub(super) fn run_sync(
    config: &SyncConfig,
    stubs: &Stubs,
) -> (Result<SyncSummary, CliError>, String) {
    let mut out = Vec::new();
    let result = block_on_for_tests(load_catalogue(
        config,
        &stubs.services(),
        CancellationToken::new(),
        &mut out,
    ));
    let printed = String::from_utf8(out).expect("status output is UTF-8");
    (result, printed)
}

/// Sample countries in the order the store returns them.
pub(super) fn sorted_samples() -> Vec<Country> {
    let mut countries = paises_core::test_support::sample_countries();
    countries.sort_by(|left, right| left.alpha3_code.cmp(&right.alpha3_code));
    countries
}
