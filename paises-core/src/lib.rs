//! Core domain types for the Paises country catalogue.
//!
//! The crate owns the in-memory country aggregate, the relational mapping
//! between that aggregate and its normalised tables, the progress reporting
//! contract shared by every long-running operation, and (behind the
//! `store-sqlite` feature) the SQLite-backed local store.
//!
//! Invariants:
//! - A country is identified by its ISO 3166-1 alpha-3 code.
//! - Shared entities (currencies, languages, regional blocs) are stored once
//!   per natural key and linked to countries through join rows.
//! - No global mutable state; stores are explicitly owned handles.

pub mod mapper;
pub mod model;
pub mod progress;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use mapper::{CountryRow, CountryRows, StringSet, TableSet, flatten, flatten_country, rebuild};
pub use model::{Country, Currency, Language, LatLng, LatLngError, RegionalBloc, Translations};
pub use progress::{ProgressEvent, ProgressReporter, ProgressSink, ProgressSource, percent_complete};
pub use store::CountryStore;

#[cfg(feature = "store-sqlite")]
pub use store::{SCHEMA_VERSION, SchemaError, SqliteCountryStore, StoreError};
