use std::path::{Path, PathBuf};

use log::{debug, info};
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

use super::{
    CountryStore, read,
    schema::{SchemaError, initialise_schema},
    write,
};
use crate::{Country, ProgressReporter, flatten_country, rebuild};

/// Country store backed by a single SQLite connection.
///
/// The handle owns its connection for its whole lifetime; open one store per
/// database and pass it to whoever needs it.
///
/// # Examples
/// ```
/// use paises_core::{
///     Country, CountryStore, ProgressReporter, ProgressSink, ProgressSource, SqliteCountryStore,
/// };
///
/// let mut store = SqliteCountryStore::open_in_memory().expect("open store");
/// let countries = vec![Country {
///     alpha3_code: "PRT".into(),
///     name: Some("Portugal".into()),
///     ..Country::default()
/// }];
/// let mut reporter =
///     ProgressReporter::new(ProgressSource::Persist, countries.len(), ProgressSink::discard());
///
/// store.upsert(&countries, &mut reporter).expect("persist countries");
/// assert_eq!(store.read_all().expect("read countries"), countries);
/// ```
#[derive(Debug)]
pub struct SqliteCountryStore {
    connection: Connection,
}

impl SqliteCountryStore {
    /// Open (creating if needed) the database at `path` and initialise it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let connection = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database, mostly useful in tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Wrap an existing connection, initialising the schema inside it.
    pub fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        let mut store = Self { connection };
        store.initialise()?;
        Ok(store)
    }

    /// Create missing tables and verify the schema version.
    ///
    /// Safe to call repeatedly.
    pub fn initialise(&mut self) -> Result<(), StoreError> {
        initialise_schema(&mut self.connection)?;
        Ok(())
    }

    /// Insert or replace one country inside its own transaction.
    pub fn upsert_country(&mut self, country: &Country) -> Result<(), StoreError> {
        let rows = flatten_country(country);
        let key = rows.key();
        let transaction = self
            .connection
            .transaction()
            .map_err(write::write_error("begin record transaction", key))?;
        write::write_rows(&transaction, &rows)?;
        transaction
            .commit()
            .map_err(write::write_error("commit record transaction", key))
    }

    /// Borrow the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl CountryStore for SqliteCountryStore {
    type Error = StoreError;

    fn upsert(
        &mut self,
        countries: &[Country],
        reporter: &mut ProgressReporter,
    ) -> Result<(), StoreError> {
        for country in countries {
            self.upsert_country(country)?;
            let percent = reporter.record(country, format!("Saved {}.", country.label()));
            debug!("stored {} ({percent}%)", country.alpha3_code);
        }
        info!("persisted {} countries", countries.len());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Country>, StoreError> {
        let tables = read::load_tables(&self.connection)?;
        Ok(rebuild(&tables))
    }

    fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))
            .map_err(read::read_error("count countries"))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Errors raised by [`SqliteCountryStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open SQLite database at {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: SqliteError,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("population {population} of {alpha3_code} exceeds SQLite i64 range")]
    PopulationOutOfRange { alpha3_code: String, population: u64 },
    #[error("stored population {population} of {alpha3_code} is negative")]
    InvalidPopulation { alpha3_code: String, population: i64 },
    #[error("failed to {operation} for country {alpha3_code}")]
    Write {
        operation: &'static str,
        alpha3_code: String,
        #[source]
        source: SqliteError,
    },
    #[error("failed to {operation}")]
    Read {
        operation: &'static str,
        #[source]
        source: SqliteError,
    },
}
