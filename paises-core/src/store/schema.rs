use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use crate::StringSet;

/// Version recorded in `schema_version` by [`initialise_schema`].
pub const SCHEMA_VERSION: i64 = 1;

/// Create the catalogue tables inside an existing SQLite database.
///
/// Every statement is idempotent, so the function may run on each open. A
/// database created by a different schema version is rejected rather than
/// migrated in place.
///
/// Join tables deliberately carry no foreign keys to the shared tables: a
/// link whose target row is missing is a valid state that rebuilds to an
/// absent member.
///
/// # Examples
/// ```
/// use paises_core::store::{SCHEMA_VERSION, initialise_schema};
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("schema creation is idempotent");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, SCHEMA_VERSION);
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_country_tables(&transaction)?;
    create_shared_tables(&transaction)?;
    create_link_tables(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_country_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create countries",
        "CREATE TABLE IF NOT EXISTS countries (
            alpha3_code TEXT PRIMARY KEY CHECK (length(trim(alpha3_code)) > 0),
            name TEXT,
            native_name TEXT,
            alpha2_code TEXT,
            capital TEXT,
            region TEXT,
            subregion TEXT,
            population INTEGER NOT NULL CHECK (population >= 0),
            demonym TEXT,
            area REAL NOT NULL,
            gini REAL NOT NULL,
            numeric_code TEXT,
            flag TEXT,
            cioc TEXT,
            lat REAL,
            lng REAL,
            CHECK ((lat IS NULL) = (lng IS NULL))
        ) WITHOUT ROWID",
    )?;

    for set in StringSet::ALL {
        let table = set.table();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                alpha3_code TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (alpha3_code, value)
            ) WITHOUT ROWID"
        );
        run_migration_step(transaction, table, &sql)?;
    }

    run_migration_step(
        transaction,
        "create translations",
        "CREATE TABLE IF NOT EXISTS translations (
            alpha3_code TEXT PRIMARY KEY,
            de TEXT,
            es TEXT,
            fr TEXT,
            ja TEXT,
            it TEXT,
            br TEXT,
            pt TEXT,
            nl TEXT,
            hr TEXT,
            fa TEXT
        ) WITHOUT ROWID",
    )
}

fn create_shared_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create currencies",
        "CREATE TABLE IF NOT EXISTS currencies (
            code TEXT PRIMARY KEY,
            name TEXT,
            symbol TEXT
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create languages",
        "CREATE TABLE IF NOT EXISTS languages (
            iso639_2 TEXT PRIMARY KEY,
            iso639_1 TEXT,
            name TEXT,
            native_name TEXT
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create regional_blocs",
        "CREATE TABLE IF NOT EXISTS regional_blocs (
            acronym TEXT PRIMARY KEY,
            name TEXT
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create regional_bloc_other_acronyms",
        "CREATE TABLE IF NOT EXISTS regional_bloc_other_acronyms (
            acronym TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (acronym, value)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create regional_bloc_other_names",
        "CREATE TABLE IF NOT EXISTS regional_bloc_other_names (
            acronym TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (acronym, value)
        ) WITHOUT ROWID",
    )
}

fn create_link_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create country_currencies",
        "CREATE TABLE IF NOT EXISTS country_currencies (
            alpha3_code TEXT NOT NULL,
            code TEXT NOT NULL,
            PRIMARY KEY (alpha3_code, code)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create country_languages",
        "CREATE TABLE IF NOT EXISTS country_languages (
            alpha3_code TEXT NOT NULL,
            iso639_2 TEXT NOT NULL,
            PRIMARY KEY (alpha3_code, iso639_2)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create country_regional_blocs",
        "CREATE TABLE IF NOT EXISTS country_regional_blocs (
            alpha3_code TEXT NOT NULL,
            acronym TEXT NOT NULL,
            PRIMARY KEY (alpha3_code, acronym)
        ) WITHOUT ROWID",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}

/// Errors raised when initialising the catalogue schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to execute migration step '{step}'")]
    Migration {
        step: &'static str,
        #[source]
        source: SqliteError,
    },
    #[error(
        "expected catalogue schema version {expected} but found {found}; remove or migrate the database before retrying"
    )]
    VersionMismatch { expected: i64, found: i64 },
}
