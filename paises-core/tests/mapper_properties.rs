//! Property-based tests for the relational mapping.
//!
//! # Invariants tested
//!
//! - **Round-trip:** `rebuild(flatten(xs)) == xs` for catalogues whose shared
//!   entities agree on their attributes.
//! - **Storage round-trip:** the SQLite store reads back what it was given.
//! - **Progress:** percentages never decrease and finish at 100.

use std::collections::BTreeSet;

use paises_core::{
    Country, CountryStore, Currency, Language, LatLng, ProgressReporter, ProgressSink,
    ProgressSource, RegionalBloc, SqliteCountryStore, Translations, flatten, rebuild,
};
use proptest::prelude::*;
use proptest::sample::subsequence;

#[derive(Debug, Clone)]
struct Pools {
    currencies: Vec<Currency>,
    languages: Vec<Language>,
    blocs: Vec<RegionalBloc>,
}

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z' çãôポ-]{0,12}"
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    proptest::option::of(text())
}

fn string_set() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[A-Za-z0-9'+:.-]{1,8}", 0..4)
}

fn pools() -> impl Strategy<Value = Pools> {
    let currencies = prop::collection::btree_map("[A-Z]{3}", (optional_text(), optional_text()), 0..4);
    let languages = prop::collection::btree_map(
        "[a-z]{3}",
        (optional_text(), optional_text(), optional_text()),
        0..4,
    );
    let blocs = prop::collection::btree_map(
        "[A-Z]{2,5}",
        (optional_text(), string_set(), string_set()),
        0..3,
    );
    (currencies, languages, blocs).prop_map(|(currencies, languages, blocs)| Pools {
        currencies: currencies
            .into_iter()
            .map(|(code, (name, symbol))| Currency { code, name, symbol })
            .collect(),
        languages: languages
            .into_iter()
            .map(|(iso639_2, (iso639_1, name, native_name))| Language {
                iso639_2,
                iso639_1,
                name,
                native_name,
            })
            .collect(),
        blocs: blocs
            .into_iter()
            .map(|(acronym, (name, other_acronyms, other_names))| RegionalBloc {
                acronym,
                name,
                other_acronyms,
                other_names,
            })
            .collect(),
    })
}

fn translations() -> impl Strategy<Value = Translations> {
    (
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
        optional_text(),
    )
        .prop_map(|(de, es, fr, ja, it, br, pt, nl, hr, fa)| Translations {
            de,
            es,
            fr,
            ja,
            it,
            br,
            pt,
            nl,
            hr,
            fa,
        })
}

fn scalars() -> impl Strategy<Value = Country> {
    (
        (
            optional_text(),
            optional_text(),
            optional_text(),
            optional_text(),
            optional_text(),
            optional_text(),
        ),
        (
            0..=9_000_000_000_u64,
            optional_text(),
            -1.0e7..1.0e7_f64,
            0.0..100.0_f64,
            optional_text(),
            optional_text(),
            optional_text(),
        ),
        proptest::option::of((-90.0..90.0_f64, -180.0..180.0_f64)),
    )
        .prop_map(
            |(
                (name, native_name, alpha2_code, capital, region, subregion),
                (population, demonym, area, gini, numeric_code, flag, cioc),
                point,
            )| Country {
                name,
                native_name,
                alpha2_code,
                capital,
                region,
                subregion,
                population,
                demonym,
                area,
                gini,
                numeric_code,
                flag,
                cioc,
                lat_lng: point.map(|(lat, lng)| LatLng { lat, lng }),
                ..Country::default()
            },
        )
}

fn country(alpha3_code: String, pools: &Pools) -> BoxedStrategy<Country> {
    let members = (
        subsequence(pools.currencies.clone(), 0..=pools.currencies.len()),
        subsequence(pools.languages.clone(), 0..=pools.languages.len()),
        subsequence(pools.blocs.clone(), 0..=pools.blocs.len()),
    );
    let sets = (
        string_set(),
        string_set(),
        string_set(),
        string_set(),
        string_set(),
    );
    (scalars(), sets, members, proptest::option::of(translations()))
        .prop_map(
            move |(
                base,
                (top_level_domains, calling_codes, alt_spellings, timezones, borders),
                (currencies, languages, blocs),
                translations,
            )| Country {
                alpha3_code: alpha3_code.clone(),
                top_level_domains,
                calling_codes,
                alt_spellings,
                timezones,
                borders,
                currencies: currencies.into_iter().map(Some).collect(),
                languages: languages.into_iter().map(Some).collect(),
                regional_blocs: blocs.into_iter().map(Some).collect(),
                translations,
                ..base
            },
        )
        .boxed()
}

/// Catalogues ordered by alpha-3 code, as `rebuild` returns them.
fn catalogue() -> impl Strategy<Value = Vec<Country>> {
    (pools(), prop::collection::btree_set("[A-Z]{3}", 0..6)).prop_flat_map(|(pools, keys)| {
        keys.into_iter()
            .map(|key| country(key, &pools))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: flattening and rebuilding returns the original catalogue.
    #[test]
    fn flatten_then_rebuild_is_identity(countries in catalogue()) {
        let rebuilt = rebuild(&flatten(&countries));
        prop_assert_eq!(rebuilt, countries);
    }

    /// Property: the SQLite store preserves every field, including nulls,
    /// apostrophes and non-ASCII text.
    #[test]
    fn sqlite_store_round_trips(countries in catalogue()) {
        let mut store = SqliteCountryStore::open_in_memory().expect("open store");
        let mut reporter =
            ProgressReporter::new(ProgressSource::Persist, countries.len(), ProgressSink::discard());
        store.upsert(&countries, &mut reporter).expect("persist catalogue");

        prop_assert_eq!(store.read_all().expect("read catalogue"), countries);
    }

    /// Property: one event per record, non-decreasing percentages, ending at 100.
    #[test]
    fn progress_is_monotonic(total in 1_usize..300) {
        let (sink, mut receiver) = ProgressSink::channel();
        let mut reporter = ProgressReporter::new(ProgressSource::FetchFlags, total, sink);
        let record = Country { alpha3_code: "AAA".into(), ..Country::default() };
        for _ in 0..total {
            reporter.record(&record, "fetched");
        }
        drop(reporter);

        let mut last = 0_u8;
        let mut seen = 0_usize;
        while let Ok(event) = receiver.try_recv() {
            seen += 1;
            prop_assert_eq!(event.processed.len(), seen);
            prop_assert!(event.percent_complete >= last);
            last = event.percent_complete;
        }
        prop_assert_eq!(seen, total);
        prop_assert_eq!(last, 100);
    }
}
