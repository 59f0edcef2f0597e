use std::collections::BTreeSet;

use rusqlite::{Connection, Error as SqliteError, Row};

use super::sqlite::StoreError;
use crate::{CountryRow, Currency, Language, RegionalBloc, StringSet, TableSet, Translations};

pub(super) fn read_error(operation: &'static str) -> impl Fn(SqliteError) -> StoreError {
    move |source| StoreError::Read { operation, source }
}

fn query<T>(
    connection: &Connection,
    operation: &'static str,
    sql: &str,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>, StoreError> {
    let mut statement = connection.prepare(sql).map_err(read_error(operation))?;
    let rows = statement
        .query_map([], map)
        .map_err(read_error(operation))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(read_error(operation))
}

/// Load every table into memory for [`crate::rebuild`].
pub(super) fn load_tables(connection: &Connection) -> Result<TableSet, StoreError> {
    let mut tables = TableSet::default();

    let countries = query(
        connection,
        "read countries",
        "SELECT alpha3_code, name, native_name, alpha2_code, capital, region,
                subregion, population, demonym, area, gini, numeric_code, flag,
                cioc, lat, lng
         FROM countries",
        |row| {
            let population: i64 = row.get(7)?;
            let country = CountryRow {
                alpha3_code: row.get(0)?,
                name: row.get(1)?,
                native_name: row.get(2)?,
                alpha2_code: row.get(3)?,
                capital: row.get(4)?,
                region: row.get(5)?,
                subregion: row.get(6)?,
                population: 0,
                demonym: row.get(8)?,
                area: row.get(9)?,
                gini: row.get(10)?,
                numeric_code: row.get(11)?,
                flag: row.get(12)?,
                cioc: row.get(13)?,
                lat: row.get(14)?,
                lng: row.get(15)?,
            };
            Ok((country, population))
        },
    )?;
    for (mut country, population) in countries {
        country.population =
            u64::try_from(population).map_err(|_| StoreError::InvalidPopulation {
                alpha3_code: country.alpha3_code.clone(),
                population,
            })?;
        tables.countries.insert(country.alpha3_code.clone(), country);
    }

    for set in StringSet::ALL {
        let sql = format!("SELECT alpha3_code, value FROM {}", set.table());
        let rows = query(connection, "read string set", &sql, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        tables
            .strings
            .extend(rows.into_iter().map(|(owner, value)| (owner, set, value)));
    }

    let translations = query(
        connection,
        "read translations",
        "SELECT alpha3_code, de, es, fr, ja, it, br, pt, nl, hr, fa FROM translations",
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                Translations {
                    de: row.get(1)?,
                    es: row.get(2)?,
                    fr: row.get(3)?,
                    ja: row.get(4)?,
                    it: row.get(5)?,
                    br: row.get(6)?,
                    pt: row.get(7)?,
                    nl: row.get(8)?,
                    hr: row.get(9)?,
                    fa: row.get(10)?,
                },
            ))
        },
    )?;
    tables.translations.extend(translations);

    load_shared(connection, &mut tables)?;
    load_links(connection, &mut tables)?;
    Ok(tables)
}

fn load_shared(connection: &Connection, tables: &mut TableSet) -> Result<(), StoreError> {
    let currencies = query(
        connection,
        "read currencies",
        "SELECT code, name, symbol FROM currencies",
        |row| {
            Ok(Currency {
                code: row.get(0)?,
                name: row.get(1)?,
                symbol: row.get(2)?,
            })
        },
    )?;
    tables.currencies.extend(
        currencies
            .into_iter()
            .map(|currency| (currency.code.clone(), currency)),
    );

    let languages = query(
        connection,
        "read languages",
        "SELECT iso639_2, iso639_1, name, native_name FROM languages",
        |row| {
            Ok(Language {
                iso639_2: row.get(0)?,
                iso639_1: row.get(1)?,
                name: row.get(2)?,
                native_name: row.get(3)?,
            })
        },
    )?;
    tables.languages.extend(
        languages
            .into_iter()
            .map(|language| (language.iso639_2.clone(), language)),
    );

    let blocs = query(
        connection,
        "read regional blocs",
        "SELECT acronym, name FROM regional_blocs",
        |row| {
            Ok(RegionalBloc {
                acronym: row.get(0)?,
                name: row.get(1)?,
                other_acronyms: BTreeSet::new(),
                other_names: BTreeSet::new(),
            })
        },
    )?;
    tables
        .regional_blocs
        .extend(blocs.into_iter().map(|bloc| (bloc.acronym.clone(), bloc)));

    for (names, sql) in [
        (false, "SELECT acronym, value FROM regional_bloc_other_acronyms"),
        (true, "SELECT acronym, value FROM regional_bloc_other_names"),
    ] {
        for (acronym, value) in query(connection, "read regional bloc aliases", sql, pair)? {
            let Some(bloc) = tables.regional_blocs.get_mut(&acronym) else {
                continue;
            };
            let target = if names {
                &mut bloc.other_names
            } else {
                &mut bloc.other_acronyms
            };
            target.insert(value);
        }
    }
    Ok(())
}

fn load_links(connection: &Connection, tables: &mut TableSet) -> Result<(), StoreError> {
    tables.country_currencies.extend(query(
        connection,
        "read currency links",
        "SELECT alpha3_code, code FROM country_currencies",
        pair,
    )?);
    tables.country_languages.extend(query(
        connection,
        "read language links",
        "SELECT alpha3_code, iso639_2 FROM country_languages",
        pair,
    )?);
    tables.country_regional_blocs.extend(query(
        connection,
        "read regional bloc links",
        "SELECT alpha3_code, acronym FROM country_regional_blocs",
        pair,
    )?);
    Ok(())
}

fn pair(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get(0)?, row.get(1)?))
}
