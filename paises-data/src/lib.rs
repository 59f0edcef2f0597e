//! Remote collaborators and the flag asset pipeline.
//!
//! Responsibilities:
//! - Fetch the full country list from a REST Countries style endpoint.
//! - Probe connectivity so callers can choose between online and offline.
//! - Download and rasterise flag assets into the data directory.
//!
//! Boundaries:
//! - Persistence and the country model live in `paises-core`.
//! - Sources are traits so tests substitute deterministic doubles; see
//!   `test_support` behind the `test-support` feature.

mod http;

pub mod connectivity;
pub mod countries;
pub mod flags;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use connectivity::{
    ConnectivityError, ConnectivityProbe, DEFAULT_PROBE_URL, HttpConnectivityProbe,
};
pub use countries::{
    CountryFetchError, CountrySource, DEFAULT_COUNTRIES_URL, HttpCountrySource, decode_countries,
};
pub use flags::{
    Cancelled, ConversionError, ConvertOutcome, ConvertReport, FetchOutcome, FetchReport,
    FileLockProbe, FlagFetchError, FlagPipeline, FlagSource, HttpFlagSource, LockProbe,
    LockRetryPolicy, PipelineReport, RasterError, Rasteriser, SvgRasteriser,
};
pub use http::{DEFAULT_USER_AGENT, TransportError};
