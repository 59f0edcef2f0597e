//! Local persistence for the country catalogue.
//!
//! - [`CountryStore`] is the seam callers program against.
//! - [`SqliteCountryStore`] (feature `store-sqlite`) keeps the normalised
//!   tables in a single SQLite database.

use crate::{Country, ProgressReporter};

#[cfg(feature = "store-sqlite")]
mod read;
#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;
#[cfg(feature = "store-sqlite")]
mod write;

#[cfg(feature = "store-sqlite")]
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteCountryStore, StoreError};


/// Read and write access to stored countries.
///
/// Writes are record-granular: an implementation commits each country
/// before reporting progress for it, so an interrupted batch leaves every
/// reported record durable. Re-running the batch is idempotent.
pub trait CountryStore {
    /// Failure raised by the backing storage.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert or replace every country, recording progress after each one.
    fn upsert(
        &mut self,
        countries: &[Country],
        reporter: &mut ProgressReporter,
    ) -> Result<(), Self::Error>;

    /// Rebuild every stored country, ordered by alpha-3 code.
    fn read_all(&self) -> Result<Vec<Country>, Self::Error>;

    /// Number of stored countries.
    fn count(&self) -> Result<usize, Self::Error>;
}
