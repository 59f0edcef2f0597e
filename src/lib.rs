//! Facade crate for the Paises offline country catalogue.
//!
//! This crate re-exports the core domain types and exposes the SQLite store
//! and the network-facing pipeline behind feature flags.

#![forbid(unsafe_code)]

pub use paises_core::{
    Country, CountryStore, Currency, Language, LatLng, ProgressEvent, ProgressReporter,
    ProgressSink, ProgressSource, RegionalBloc, Translations,
};

#[cfg(feature = "store-sqlite")]
pub use paises_core::{SqliteCountryStore, StoreError};

pub use paises_fs::{DataLayout, is_locked};

#[cfg(feature = "pipeline")]
pub use paises_data::{
    ConnectivityProbe, CountrySource, FlagPipeline, FlagSource, HttpConnectivityProbe,
    HttpCountrySource, HttpFlagSource, PipelineReport, SvgRasteriser,
};
