//! Behavioural tests for `SqliteCountryStore` using rstest-bdd.

use std::{cell::RefCell, path::PathBuf};

use paises_core::{
    Country, CountryStore, Currency, ProgressReporter, ProgressSink, ProgressSource, SchemaError,
    SqliteCountryStore, StoreError,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use rusqlite::Connection;
use tempfile::TempDir;

struct StoreWorld {
    temp_dir: TempDir,
    batch: RefCell<Vec<Country>>,
    last_error: RefCell<Option<StoreError>>,
}

impl StoreWorld {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
            batch: RefCell::new(Vec::new()),
            last_error: RefCell::new(None),
        }
    }

    fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("countries.db")
    }

    fn open(&self) -> SqliteCountryStore {
        SqliteCountryStore::open(self.db_path()).expect("open country store")
    }

    fn save_batch(&self) {
        let batch = self.batch.borrow();
        let mut reporter =
            ProgressReporter::new(ProgressSource::Persist, batch.len(), ProgressSink::discard());
        let result = self.open().upsert(&batch, &mut reporter);
        self.last_error.replace(result.err());
    }
}

#[fixture]
fn world() -> StoreWorld {
    StoreWorld::new()
}

fn euro_country(alpha3_code: &str, name: &str) -> Country {
    Country {
        alpha3_code: alpha3_code.into(),
        name: Some(name.into()),
        currencies: vec![Some(Currency {
            code: "EUR".into(),
            name: Some("Euro".into()),
            symbol: Some("€".into()),
        })],
        ..Country::default()
    }
}

#[given("a temporary directory for the country database")]
fn given_temp_dir(world: &StoreWorld) {
    assert!(world.temp_dir.path().is_dir());
}

#[given("a batch of countries sharing the euro")]
fn given_euro_batch(world: &StoreWorld) {
    world.batch.replace(vec![
        euro_country("DEU", "Germany"),
        euro_country("ESP", "Spain"),
        euro_country("PRT", "Portugal"),
    ]);
}

#[given("a batch whose last country cannot be stored")]
fn given_broken_batch(world: &StoreWorld) {
    let mut broken = euro_country("PRT", "Portugal");
    broken.population = u64::MAX;
    world.batch.replace(vec![
        euro_country("DEU", "Germany"),
        euro_country("ESP", "Spain"),
        broken,
    ]);
}

#[given("a database written by a newer schema version")]
fn given_newer_database(world: &StoreWorld) {
    let connection = Connection::open(world.db_path()).expect("open database");
    connection
        .execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT '');
             INSERT INTO schema_version (version) VALUES (2);",
        )
        .expect("seed schema version");
}

#[when("I save the batch to the country store")]
fn when_save(world: &StoreWorld) {
    world.save_batch();
}

#[when("I repair the last country and save the batch again")]
fn when_repair(world: &StoreWorld) {
    if let Some(last) = world.batch.borrow_mut().last_mut() {
        last.population = 10_374_822;
    }
    world.save_batch();
}

#[when("I open the country store")]
fn when_open(world: &StoreWorld) {
    let result = SqliteCountryStore::open(world.db_path());
    world.last_error.replace(result.err());
}

#[then("reading the store returns the same countries")]
fn then_same_countries(world: &StoreWorld) {
    assert!(world.last_error.borrow().is_none(), "save should succeed");
    let stored = world.open().read_all().expect("read countries");
    assert_eq!(stored, *world.batch.borrow());
}

#[then("the euro is stored once")]
fn then_euro_once(world: &StoreWorld) {
    let store = world.open();
    let currencies: i64 = store
        .connection()
        .query_row("SELECT COUNT(*) FROM currencies", [], |row| row.get(0))
        .expect("count currencies");
    assert_eq!(currencies, 1);
}

#[then("the store holds three countries")]
fn then_three(world: &StoreWorld) {
    assert_eq!(world.open().count().expect("count"), 3);
}

#[then("the store holds two countries")]
fn then_two(world: &StoreWorld) {
    assert_eq!(world.open().count().expect("count"), 2);
}

#[then("saving fails for the last country")]
fn then_save_fails(world: &StoreWorld) {
    let binding = world.last_error.borrow();
    match binding.as_ref() {
        Some(StoreError::PopulationOutOfRange { alpha3_code, .. }) => {
            assert_eq!(alpha3_code, "PRT");
        }
        other => panic!("expected a population error, got {other:?}"),
    }
}

#[then("opening fails with a schema version mismatch")]
fn then_version_mismatch(world: &StoreWorld) {
    let binding = world.last_error.borrow();
    assert!(matches!(
        binding.as_ref(),
        Some(StoreError::Schema(SchemaError::VersionMismatch { found: 2, .. }))
    ));
}

#[scenario(path = "tests/features/country_store.feature", index = 0)]
fn saved_countries_round_trip(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/country_store.feature", index = 1)]
fn saving_twice_is_idempotent(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/country_store.feature", index = 2)]
fn interrupted_batch_resumes(world: StoreWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/country_store.feature", index = 3)]
fn newer_database_is_refused(world: StoreWorld) {
    let _ = world;
}
