use rusqlite::{Error as SqliteError, Transaction, params};

use super::sqlite::StoreError;
use crate::{CountryRows, StringSet};

const CHILD_TABLES: [&str; 4] = [
    "translations",
    "country_currencies",
    "country_languages",
    "country_regional_blocs",
];

pub(super) fn write_error(
    operation: &'static str,
    alpha3_code: &str,
) -> impl FnOnce(SqliteError) -> StoreError {
    let alpha3_code = alpha3_code.to_owned();
    move |source| StoreError::Write {
        operation,
        alpha3_code,
        source,
    }
}

/// Replace one country's rows. The caller owns the transaction boundary.
pub(super) fn write_rows(transaction: &Transaction<'_>, rows: &CountryRows) -> Result<(), StoreError> {
    let key = rows.key();
    let row = &rows.country;
    let population =
        i64::try_from(row.population).map_err(|_| StoreError::PopulationOutOfRange {
            alpha3_code: key.to_owned(),
            population: row.population,
        })?;

    transaction
        .prepare_cached(
            "INSERT OR REPLACE INTO countries (
                alpha3_code, name, native_name, alpha2_code, capital, region,
                subregion, population, demonym, area, gini, numeric_code, flag,
                cioc, lat, lng
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .and_then(|mut statement| {
            statement.execute(params![
                key,
                row.name,
                row.native_name,
                row.alpha2_code,
                row.capital,
                row.region,
                row.subregion,
                population,
                row.demonym,
                row.area,
                row.gini,
                row.numeric_code,
                row.flag,
                row.cioc,
                row.lat,
                row.lng,
            ])
        })
        .map_err(write_error("write country row", key))?;

    delete_children(transaction, key)?;
    write_strings(transaction, rows)?;
    write_translations(transaction, rows)?;
    write_shared(transaction, rows)
}

fn delete_children(transaction: &Transaction<'_>, key: &str) -> Result<(), StoreError> {
    let tables = StringSet::ALL
        .into_iter()
        .map(StringSet::table)
        .chain(CHILD_TABLES);
    for table in tables {
        transaction
            .execute(&format!("DELETE FROM {table} WHERE alpha3_code = ?1"), [key])
            .map_err(write_error("delete child rows", key))?;
    }
    Ok(())
}

fn write_strings(transaction: &Transaction<'_>, rows: &CountryRows) -> Result<(), StoreError> {
    let key = rows.key();
    for (set, value) in &rows.strings {
        let table = set.table();
        transaction
            .prepare_cached(&format!(
                "INSERT OR IGNORE INTO {table} (alpha3_code, value) VALUES (?1, ?2)"
            ))
            .and_then(|mut statement| statement.execute(params![key, value]))
            .map_err(write_error("write string set row", key))?;
    }
    Ok(())
}

fn write_translations(transaction: &Transaction<'_>, rows: &CountryRows) -> Result<(), StoreError> {
    let Some(t) = &rows.translations else {
        return Ok(());
    };
    let key = rows.key();
    transaction
        .execute(
            "INSERT INTO translations (alpha3_code, de, es, fr, ja, it, br, pt, nl, hr, fa)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![key, t.de, t.es, t.fr, t.ja, t.it, t.br, t.pt, t.nl, t.hr, t.fa],
        )
        .map(|_| ())
        .map_err(write_error("write translations", key))
}

fn write_shared(transaction: &Transaction<'_>, rows: &CountryRows) -> Result<(), StoreError> {
    let key = rows.key();

    for currency in &rows.currencies {
        transaction
            .execute(
                "INSERT OR REPLACE INTO currencies (code, name, symbol) VALUES (?1, ?2, ?3)",
                params![currency.code, currency.name, currency.symbol],
            )
            .map_err(write_error("upsert currency", key))?;
        link(transaction, key, "country_currencies", "code", &currency.code)?;
    }

    for language in &rows.languages {
        transaction
            .execute(
                "INSERT OR REPLACE INTO languages (iso639_2, iso639_1, name, native_name)
                    VALUES (?1, ?2, ?3, ?4)",
                params![
                    language.iso639_2,
                    language.iso639_1,
                    language.name,
                    language.native_name
                ],
            )
            .map_err(write_error("upsert language", key))?;
        link(
            transaction,
            key,
            "country_languages",
            "iso639_2",
            &language.iso639_2,
        )?;
    }

    for bloc in &rows.regional_blocs {
        transaction
            .execute(
                "INSERT OR REPLACE INTO regional_blocs (acronym, name) VALUES (?1, ?2)",
                params![bloc.acronym, bloc.name],
            )
            .map_err(write_error("upsert regional bloc", key))?;
        for (table, values) in [
            ("regional_bloc_other_acronyms", &bloc.other_acronyms),
            ("regional_bloc_other_names", &bloc.other_names),
        ] {
            transaction
                .execute(&format!("DELETE FROM {table} WHERE acronym = ?1"), [&bloc.acronym])
                .map_err(write_error("replace regional bloc aliases", key))?;
            for value in values {
                transaction
                    .execute(
                        &format!("INSERT OR IGNORE INTO {table} (acronym, value) VALUES (?1, ?2)"),
                        params![bloc.acronym, value],
                    )
                    .map_err(write_error("write regional bloc alias", key))?;
            }
        }
        link(
            transaction,
            key,
            "country_regional_blocs",
            "acronym",
            &bloc.acronym,
        )?;
    }

    Ok(())
}

fn link(
    transaction: &Transaction<'_>,
    key: &str,
    table: &'static str,
    column: &'static str,
    member: &str,
) -> Result<(), StoreError> {
    transaction
        .execute(
            &format!("INSERT OR IGNORE INTO {table} (alpha3_code, {column}) VALUES (?1, ?2)"),
            params![key, member],
        )
        .map(|_| ())
        .map_err(write_error("link shared entity", key))
}
