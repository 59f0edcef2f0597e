//! Fixtures shared by unit and behaviour tests across the workspace.

use std::collections::BTreeSet;

use crate::{Country, Currency, Language, LatLng, RegionalBloc, Translations};

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn euro() -> Currency {
    Currency {
        code: "EUR".into(),
        name: Some("Euro".into()),
        symbol: Some("€".into()),
    }
}

fn european_union() -> RegionalBloc {
    RegionalBloc {
        acronym: "EU".into(),
        name: Some("European Union".into()),
        other_acronyms: BTreeSet::new(),
        other_names: set(&["Europäische Union", "Unión Europea"]),
    }
}

/// A bare country carrying only its key and a flag URL.
#[must_use]
pub fn country(alpha3_code: &str) -> Country {
    Country {
        alpha3_code: alpha3_code.into(),
        name: Some(alpha3_code.into()),
        flag: Some(format!(
            "https://flags.example.test/{}.svg",
            alpha3_code.to_lowercase()
        )),
        ..Country::default()
    }
}

/// Three countries sharing currencies and blocs, one with an apostrophe.
#[must_use]
pub fn sample_countries() -> Vec<Country> {
    vec![
        Country {
            alpha3_code: "PRT".into(),
            name: Some("Portugal".into()),
            native_name: Some("Portugal".into()),
            alpha2_code: Some("PT".into()),
            capital: Some("Lisbon".into()),
            region: Some("Europe".into()),
            subregion: Some("Southern Europe".into()),
            population: 10_374_822,
            demonym: Some("Portuguese".into()),
            area: 92_090.0,
            gini: 38.5,
            numeric_code: Some("620".into()),
            flag: Some("https://restcountries.eu/data/prt.svg".into()),
            cioc: Some("POR".into()),
            top_level_domains: set(&[".pt"]),
            calling_codes: set(&["351"]),
            alt_spellings: set(&["PT", "Portuguesa", "Portuguese Republic"]),
            timezones: set(&["UTC-01:00", "UTC"]),
            borders: set(&["ESP"]),
            lat_lng: Some(LatLng {
                lat: 39.5,
                lng: -8.0,
            }),
            currencies: vec![Some(euro())],
            languages: vec![Some(Language {
                iso639_2: "por".into(),
                iso639_1: Some("pt".into()),
                name: Some("Portuguese".into()),
                native_name: Some("Português".into()),
            })],
            regional_blocs: vec![Some(european_union())],
            translations: Some(Translations {
                de: Some("Portugal".into()),
                es: Some("Portugal".into()),
                fr: Some("Portugal".into()),
                ja: Some("ポルトガル".into()),
                it: Some("Portogallo".into()),
                br: Some("Portugal".into()),
                pt: Some("Portugal".into()),
                nl: Some("Portugal".into()),
                hr: Some("Portugal".into()),
                fa: None,
            }),
        },
        Country {
            alpha3_code: "ESP".into(),
            name: Some("Spain".into()),
            native_name: Some("España".into()),
            alpha2_code: Some("ES".into()),
            capital: Some("Madrid".into()),
            region: Some("Europe".into()),
            population: 46_438_422,
            area: 505_992.0,
            flag: Some("https://restcountries.eu/data/esp.svg".into()),
            calling_codes: set(&["34"]),
            borders: set(&["AND", "FRA", "GIB", "PRT", "MAR"]),
            currencies: vec![Some(euro())],
            languages: vec![Some(Language {
                iso639_2: "spa".into(),
                iso639_1: Some("es".into()),
                name: Some("Spanish".into()),
                native_name: Some("Español".into()),
            })],
            regional_blocs: vec![Some(european_union())],
            ..Country::default()
        },
        Country {
            alpha3_code: "CIV".into(),
            name: Some("Côte d'Ivoire".into()),
            native_name: Some("Côte d'Ivoire".into()),
            alpha2_code: Some("CI".into()),
            capital: Some("Yamoussoukro".into()),
            population: 22_671_331,
            flag: Some("https://restcountries.eu/data/civ.svg".into()),
            alt_spellings: set(&["Republic of Côte d'Ivoire", "République de Côte d'Ivoire"]),
            currencies: vec![Some(Currency {
                code: "XOF".into(),
                name: Some("West African CFA franc".into()),
                symbol: Some("Fr".into()),
            })],
            translations: Some(Translations::default()),
            ..Country::default()
        },
    ]
}
